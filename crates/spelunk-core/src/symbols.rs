//! # Symbol Index
//!
//! Address-keyed index of named, typed debuggee values. The index does not
//! know how symbols are found (the DWARF provider, a debug host or a test
//! fixture populates it); it only stores, filters and resolves them. Each
//! entry may carry the thread/frame it was evaluated under so callers can
//! restore that focus before re-reading the value.

use std::collections::BTreeMap;
use std::io::{self, Write};

use tracing::debug;

use crate::error::{Result, SpelunkError};
use crate::maps::Region;
use crate::selection::Focus;
use crate::typename::clean_type_name;
use crate::value::Value;

/// One named value in the debuggee.
#[derive(Debug, Clone)]
pub struct SymbolEntry<'m>
{
    pub name: String,
    pub value: Value<'m>,
    /// Thread/frame the value was evaluated under, for focus restoration
    pub origin: Option<Focus>,
    /// Basename of the binary or library that provides the symbol
    pub provider: Option<String>,
}

/// Symbols keyed and ordered by address.
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex<'m>
{
    entries: BTreeMap<u64, SymbolEntry<'m>>,
}

impl<'m> SymbolIndex<'m>
{
    pub fn new() -> Self
    {
        SymbolIndex {
            entries: BTreeMap::new(),
        }
    }

    /// Insert one entry. Values without a real address have no identity
    /// here and are dropped.
    pub fn insert(&mut self, entry: SymbolEntry<'m>)
    {
        match entry.value.address() {
            Some(addr) if addr != 0 => {
                self.entries.insert(addr, entry);
            }
            _ => debug!(name = %entry.name, "skipping symbol without address"),
        }
    }

    pub fn len(&self) -> usize
    {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.entries.is_empty()
    }

    /// Entries in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &SymbolEntry<'m>>
    {
        self.entries.values()
    }

    /// Entries whose address falls inside any of `regions`.
    pub fn filter_by_regions(&self, regions: &[&Region]) -> SymbolIndex<'m>
    {
        let entries = self
            .entries
            .iter()
            .filter(|(addr, _)| regions.iter().any(|r| r.contains(**addr)))
            .map(|(addr, entry)| (*addr, entry.clone()))
            .collect();
        SymbolIndex { entries }
    }

    /// Entries provided by any of the given binary/library basenames.
    pub fn filter_by_providers(&self, providers: &[&str]) -> SymbolIndex<'m>
    {
        let entries = self
            .entries
            .iter()
            .filter(|(_, entry)| {
                entry
                    .provider
                    .as_deref()
                    .map(|p| providers.contains(&p))
                    .unwrap_or(false)
            })
            .map(|(addr, entry)| (*addr, entry.clone()))
            .collect();
        SymbolIndex { entries }
    }

    /// All entries matching `name`, tolerating mangling suffixes such as
    /// `name[abi:cxx11]`.
    pub fn find(&self, name: &str) -> Vec<&SymbolEntry<'m>>
    {
        self.entries
            .values()
            .filter(|entry| {
                let candidate = entry.name.as_str();
                candidate.strip_prefix(name).map(|rest| rest.is_empty() || rest.starts_with('[')).unwrap_or(false)
            })
            .collect()
    }

    /// Resolve `name` to a single entry. Zero matches is an error; several
    /// matches resolve to the first, with the ambiguity reported in the
    /// returned count so callers can surface "N matches, using first".
    pub fn resolve(&self, name: &str) -> Result<(&SymbolEntry<'m>, usize)>
    {
        let matches = self.find(name);
        match matches.len() {
            0 => Err(SpelunkError::SymbolNotFound(name.to_string())),
            count => Ok((matches[0], count)),
        }
    }

    /// One line per symbol: address, byte size, name, cleaned type.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()>
    {
        for entry in self.entries.values() {
            let addr = entry.value.address().unwrap_or(0);
            writeln!(
                out,
                "{:016x} {:>10} {:<40} {}",
                addr,
                entry.value.byte_size(),
                entry.name,
                clean_type_name(&entry.value.ty().display_name())
            )?;
        }
        Ok(())
    }
}
