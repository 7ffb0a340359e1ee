//! # Region Maps
//!
//! Memory-region classification from the kernel's `/proc/<pid>/maps` table.
//! The parser takes the file *text*, so fixtures test it without a live
//! process. Regions are used to annotate dumps and to filter symbol sets,
//! never for the visitor's own decisions.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::error::Result;

/// One mapping of the debuggee address space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Region
{
    /// Inclusive start address
    pub low: u64,
    /// Exclusive end address
    pub high: u64,
    /// `rwxp`-style permission string
    pub perms: String,
    /// Backing path, a bracketed pseudo-path (`[heap]`, `[stack]`), or empty
    pub description: String,
}

impl Region
{
    pub fn size(&self) -> u64
    {
        self.high.saturating_sub(self.low)
    }

    pub fn contains(&self, address: u64) -> bool
    {
        address >= self.low && address < self.high
    }
}

/// Sorted table of debuggee memory regions.
#[derive(Debug, Clone, Default)]
pub struct RegionMap
{
    regions: Vec<Region>,
}

impl RegionMap
{
    /// Parse `/proc/<pid>/maps`-formatted text. Unparseable lines are
    /// skipped rather than failing the whole table.
    pub fn parse(text: &str) -> Self
    {
        let mut regions = Vec::new();
        for line in text.lines() {
            let mut parts = line.split_whitespace();
            let Some(range) = parts.next() else { continue };
            let Some((low, high)) = range.split_once('-') else { continue };
            let (Ok(low), Ok(high)) = (u64::from_str_radix(low, 16), u64::from_str_radix(high, 16)) else {
                continue;
            };
            let perms = parts.next().unwrap_or("").to_string();
            let _offset = parts.next();
            let _dev = parts.next();
            let _inode = parts.next();
            let description = parts.next().map(str::to_string).unwrap_or_default();
            regions.push(Region {
                low,
                high,
                perms,
                description,
            });
        }
        regions.sort_by_key(|r| r.low);
        RegionMap { regions }
    }

    /// Read and parse the mapping table of a live process.
    pub fn from_pid(pid: u32) -> Result<Self>
    {
        let text = fs::read_to_string(format!("/proc/{pid}/maps"))?;
        Ok(Self::parse(&text))
    }

    pub fn from_file(path: &Path) -> Result<Self>
    {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn is_empty(&self) -> bool
    {
        self.regions.is_empty()
    }

    pub fn len(&self) -> usize
    {
        self.regions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Region>
    {
        self.regions.iter()
    }

    /// The region containing `address`, if any.
    pub fn region_of(&self, address: u64) -> Option<&Region>
    {
        self.regions.iter().find(|r| r.contains(address))
    }

    /// Relabel the regions containing the given stack pointers. Thread
    /// stacks other than the main one are plain anonymous mappings in the
    /// kernel table; only the debug host knows where the stacks actually
    /// are.
    pub fn mark_stacks(&mut self, stack_pointers: &[u64])
    {
        for &sp in stack_pointers {
            if let Some(region) = self.regions.iter_mut().find(|r| r.contains(sp)) {
                region.description = "[stack]".to_string();
            }
        }
    }

    /// Regions whose bracketed name or backing-file basename is in `names`.
    pub fn regions_named(&self, names: &[&str]) -> Vec<&Region>
    {
        self.regions
            .iter()
            .filter(|region| {
                let descr = region.description.as_str();
                if descr.is_empty() {
                    return false;
                }
                if descr.starts_with('[') {
                    return names.contains(&descr);
                }
                let basename = descr.rsplit('/').next().unwrap_or(descr);
                names.contains(&basename)
            })
            .collect()
    }

    /// Render the table: start, end, size, description per row.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()>
    {
        if self.regions.is_empty() {
            return writeln!(out, "<empty>");
        }
        writeln!(out, "{:>16} {:>16} {:>10} {}", "Start", "End", "Size", "Description")?;
        for region in &self.regions {
            writeln!(
                out,
                "{:016x} {:016x} {:>10} {}",
                region.low,
                region.high,
                region.size(),
                region.description
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    const FIXTURE: &str = "\
00400000-00452000 r-xp 00000000 08:02 173521 /usr/bin/uut
00651000-00652000 rw-p 00051000 08:02 173521 /usr/bin/uut
00e03000-00e24000 rw-p 00000000 00:00 0 [heap]
7f5accc26000-7f5accdea000 r-xp 00000000 08:02 135522 /usr/lib/libc-2.31.so
7ffd6ac8e000-7ffd6acaf000 rw-p 00000000 00:00 0
ffffffffff600000-ffffffffff601000 r-xp 00000000 00:00 0 [vsyscall]
";

    #[test]
    fn test_parse_counts_and_bounds()
    {
        let maps = RegionMap::parse(FIXTURE);
        assert_eq!(maps.len(), 6);
        let first = maps.iter().next().unwrap();
        assert_eq!(first.low, 0x400000);
        assert_eq!(first.high, 0x452000);
        assert_eq!(first.perms, "r-xp");
        assert_eq!(first.description, "/usr/bin/uut");
    }

    #[test]
    fn test_region_of()
    {
        let maps = RegionMap::parse(FIXTURE);
        assert_eq!(maps.region_of(0x00e10000).unwrap().description, "[heap]");
        assert!(maps.region_of(0x1).is_none());
    }

    #[test]
    fn test_anonymous_mapping_has_empty_description()
    {
        let maps = RegionMap::parse(FIXTURE);
        let anon = maps.region_of(0x7ffd6ac8e000).unwrap();
        assert_eq!(anon.description, "");
    }

    #[test]
    fn test_mark_stacks_relabels_containing_region()
    {
        let mut maps = RegionMap::parse(FIXTURE);
        maps.mark_stacks(&[0x7ffd6ac90000]);
        assert_eq!(maps.region_of(0x7ffd6ac90000).unwrap().description, "[stack]");
    }

    #[test]
    fn test_regions_named_matches_brackets_and_basenames()
    {
        let maps = RegionMap::parse(FIXTURE);
        let named = maps.regions_named(&["[heap]", "libc-2.31.so"]);
        assert_eq!(named.len(), 2);

        let none = maps.regions_named(&["libm.so"]);
        assert!(none.is_empty());
    }

    #[test]
    fn test_dump_empty_table()
    {
        let maps = RegionMap::parse("");
        let mut out = Vec::new();
        maps.dump(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "<empty>\n");
    }
}
