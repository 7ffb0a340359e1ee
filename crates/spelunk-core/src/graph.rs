//! # Memory Graph Analyzer
//!
//! The second visitor consumer: instead of building a tree it records every
//! distinct `(address, size)` region the traversal touches, plus directed
//! edges from a container/pointer to the regions it points at. Edges are
//! only created for dependents reached through a pointer dereference (`*`)
//! or a positional element (`[`); plain value composition is containment,
//! not pointing.
//!
//! The derived report lists regions by address with "outer containers
//! first" ordering and a nesting depth computed from span containment,
//! used purely for indentation.

use std::collections::{HashMap, HashSet};
use std::io::{self, Write};

use crate::value::{Scalar, Value};
use crate::visit::{Sink, Visitor};

/// Regions and points-to edges discovered by one analysis pass.
#[derive(Debug, Default)]
pub struct MemoryGraph
{
    /// (address, size) → first name bound to the region
    regions: HashMap<(u64, u64), String>,
    /// (from address, to address), set semantics
    edges: HashSet<(u64, u64)>,
}

impl MemoryGraph
{
    pub fn region_count(&self) -> usize
    {
        self.regions.len()
    }

    pub fn edge_count(&self) -> usize
    {
        self.edges.len()
    }

    pub fn has_edge(&self, from: u64, to: u64) -> bool
    {
        self.edges.contains(&(from, to))
    }

    pub fn region_name(&self, address: u64, size: u64) -> Option<&str>
    {
        self.regions.get(&(address, size)).map(String::as_str)
    }

    pub fn regions(&self) -> impl Iterator<Item = (u64, u64, &str)>
    {
        self.regions.iter().map(|(&(addr, size), name)| (addr, size, name.as_str()))
    }

    pub fn edges(&self) -> impl Iterator<Item = (u64, u64)> + '_
    {
        self.edges.iter().copied()
    }

    /// Regions sorted so enclosing regions come before their contents:
    /// ascending address, larger size first at equal addresses.
    fn sorted_regions(&self) -> Vec<(u64, u64, &str)>
    {
        let mut regions: Vec<_> = self.regions().collect();
        regions.sort_by_key(|&(addr, size, _)| ((addr as u128) << 16).wrapping_sub(size as u128));
        regions
    }

    /// Depth-indented `address name` listing with totals.
    pub fn report<W: Write>(&self, out: &mut W) -> io::Result<()>
    {
        writeln!(out, "{} regions, {} edges", self.region_count(), self.edge_count())?;
        let regions = self.sorted_regions();
        for (i, &(addr, _, name)) in regions.iter().enumerate() {
            // count the run of immediately preceding regions whose span
            // still contains this region's start
            let mut depth = 0;
            let mut j = i;
            while j > 0 && addr < regions[j - 1].0 + regions[j - 1].1 {
                j -= 1;
                depth += 1;
            }
            writeln!(out, "{addr:016x} {:indent$}{name}", "", indent = depth * 4)?;
        }
        Ok(())
    }
}

/// Sink that accumulates a [`MemoryGraph`].
#[derive(Default)]
pub struct GraphBuilder
{
    graph: MemoryGraph,
    /// Addresses of the aggregates currently being descended
    stack: Vec<u64>,
}

impl GraphBuilder
{
    pub fn new() -> Self
    {
        GraphBuilder::default()
    }

    pub fn finish(self) -> MemoryGraph
    {
        self.graph
    }

    /// Points-to edge from the enclosing region, for dereference and
    /// element dependents only.
    fn edge_from_parent(&mut self, name: &str, address: u64)
    {
        if address == 0 {
            return;
        }
        if !(name.starts_with('*') || name.starts_with('[')) {
            return;
        }
        if let Some(&parent) = self.stack.last() {
            self.graph.edges.insert((parent, address));
        }
    }

    /// Record a region once; the first name bound to it is kept.
    fn record(&mut self, name: &str, value: &Value<'_>) -> bool
    {
        let Some(address) = value.address().filter(|&a| a != 0) else {
            return false;
        };
        let key = (address, value.byte_size());
        if self.graph.regions.contains_key(&key) {
            return false;
        }
        self.graph.regions.insert(key, name.to_string());
        true
    }
}

impl Sink for GraphBuilder
{
    fn scalar(&mut self, name: &str, value: &Value<'_>, _scalar: Scalar)
    {
        if let Some(address) = value.address() {
            self.edge_from_parent(name, address);
        }
        self.record(name, value);
    }

    fn meta(&mut self, _name: &str, _scalar: Scalar)
    {
        // synthesized metadata has no storage; nothing to record
    }

    fn enter(&mut self, name: &str, value: &Value<'_>) -> bool
    {
        let Some(address) = value.address().filter(|&a| a != 0) else {
            return false;
        };
        self.edge_from_parent(name, address);
        if !self.record(name, value) {
            // region already known: keep its first name, do not re-descend
            return false;
        }
        self.stack.push(address);
        true
    }

    fn leave(&mut self, _name: &str)
    {
        self.stack.pop();
    }
}

/// Run a full analysis over a set of named values.
pub fn analyze<'m, I>(visitor: &Visitor, values: I) -> MemoryGraph
where
    I: IntoIterator<Item = (String, Value<'m>)>,
{
    let mut builder = GraphBuilder::new();
    for (name, value) in values {
        visitor.visit(&value, &name, &mut builder);
    }
    builder.finish()
}
