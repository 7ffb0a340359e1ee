//! # Snapshot Builder
//!
//! Materializes a visited value into a host-independent tree: aggregates
//! and containers become ordered-key map nodes (insertion order = visit
//! order), scalars become leaves. Nodes live in an arena and are addressed
//! by [`NodeId`], which makes structural sharing first-class: when the same
//! (address, type) is reached twice within one materialization, the second
//! encounter reuses the already-built node instead of re-visiting. The same
//! collapse turns cyclic object graphs into finite trees with
//! back-referencing nodes.
//!
//! Pointers are transparent: `p` maps directly to its pointee's node, and a
//! null or dangling pointer contributes *no* key at all. Callers test for
//! key presence, not for a null placeholder.

use std::collections::{HashMap, HashSet};
use std::fmt;

use crate::value::{Scalar, TypeCategory, Value};
use crate::visit::{Sink, Visitor};

/// Index of a node within its [`Snapshot`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// One snapshot node.
#[derive(Debug, Clone, PartialEq)]
pub enum Node
{
    Leaf(Scalar),
    /// Ordered key → child; several keys may reference the same child
    Map(Vec<(String, NodeId)>),
}

/// A fully materialized value tree.
#[derive(Debug, Clone, Default)]
pub struct Snapshot
{
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Snapshot
{
    pub fn root(&self) -> Option<NodeId>
    {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &Node
    {
        &self.nodes[id.0]
    }

    /// Child under `key`; `None` also when `id` is a leaf.
    pub fn get(&self, id: NodeId, key: &str) -> Option<NodeId>
    {
        match self.node(id) {
            Node::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, child)| *child),
            Node::Leaf(_) => None,
        }
    }

    /// Positional element `i` (key `[i]`).
    pub fn at(&self, id: NodeId, i: usize) -> Option<NodeId>
    {
        self.get(id, &format!("[{i}]"))
    }

    pub fn leaf(&self, id: NodeId) -> Option<&Scalar>
    {
        match self.node(id) {
            Node::Leaf(scalar) => Some(scalar),
            Node::Map(_) => None,
        }
    }

    /// Scalar at `key` below `id`, if present and a leaf.
    pub fn leaf_at(&self, id: NodeId, key: &str) -> Option<&Scalar>
    {
        self.get(id, key).and_then(|child| self.leaf(child))
    }

    pub fn keys(&self, id: NodeId) -> impl Iterator<Item = &str>
    {
        let entries = match self.node(id) {
            Node::Map(entries) => entries.as_slice(),
            Node::Leaf(_) => &[],
        };
        entries.iter().map(|(k, _)| k.as_str())
    }

    fn render(&self, id: NodeId, depth: usize, visited: &mut HashSet<NodeId>, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.node(id) {
            Node::Leaf(scalar) => writeln!(f, "{scalar}"),
            Node::Map(entries) => {
                if !visited.insert(id) {
                    // shared or cyclic node already printed
                    return writeln!(f, "<shared>");
                }
                writeln!(f)?;
                for (key, child) in entries {
                    write!(f, "{:indent$}{key}: ", "", indent = (depth + 1) * 2)?;
                    self.render(*child, depth + 1, visited, f)?;
                }
                visited.remove(&id);
                Ok(())
            }
        }
    }
}

impl fmt::Display for Snapshot
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.root {
            Some(root) => self.render(root, 0, &mut HashSet::new(), f),
            None => writeln!(f, "<absent>"),
        }
    }
}

enum Frame
{
    Aggregate
    {
        key: String,
        node: NodeId,
        entries: Vec<(String, NodeId)>,
    },
    /// Transparent: collapses to its single child, or to absence
    Pointer
    {
        key: String,
        child: Option<NodeId>,
        seen_key: Option<(u64, String)>,
    },
}

/// Sink that assembles a [`Snapshot`]. One builder is one materialization
/// scope: its seen-map persists across several `build` calls so repeated
/// sub-objects collapse across symbols too.
#[derive(Default)]
pub struct SnapshotBuilder
{
    nodes: Vec<Node>,
    seen: HashMap<(u64, String), NodeId>,
    /// Pointer chains currently being followed, to cut pure pointer cycles
    active_pointers: HashSet<(u64, String)>,
    stack: Vec<Frame>,
    root: Option<NodeId>,
}

impl SnapshotBuilder
{
    pub fn new() -> Self
    {
        SnapshotBuilder::default()
    }

    /// Materialize one named value into this builder's arena and return its
    /// node, if anything was produced.
    pub fn build(&mut self, visitor: &Visitor, value: &Value<'_>, name: &str) -> Option<NodeId>
    {
        self.root = None;
        visitor.visit(value, name, self);
        self.root
    }

    pub fn finish(self) -> Snapshot
    {
        Snapshot {
            nodes: self.nodes,
            root: self.root,
        }
    }

    fn alloc(&mut self, node: Node) -> NodeId
    {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn attach(&mut self, key: &str, id: NodeId)
    {
        match self.stack.last_mut() {
            Some(Frame::Aggregate { entries, .. }) => entries.push((key.to_string(), id)),
            Some(Frame::Pointer { child, .. }) => {
                if child.is_none() {
                    *child = Some(id);
                }
            }
            None => self.root = Some(id),
        }
    }

    fn identity(value: &Value<'_>) -> Option<(u64, String)>
    {
        match value.address() {
            Some(addr) if addr != 0 => Some((addr, value.ty().display_name())),
            _ => None,
        }
    }
}

impl Sink for SnapshotBuilder
{
    fn scalar(&mut self, name: &str, _value: &Value<'_>, scalar: Scalar)
    {
        let id = self.alloc(Node::Leaf(scalar));
        self.attach(name, id);
    }

    fn meta(&mut self, name: &str, scalar: Scalar)
    {
        let id = self.alloc(Node::Leaf(scalar));
        self.attach(name, id);
    }

    fn enter(&mut self, name: &str, value: &Value<'_>) -> bool
    {
        if value.ty().resolved().category() == TypeCategory::Pointer {
            let seen_key = Self::identity(value);
            if let Some(key) = &seen_key {
                // a pointer already on the path: following it again would
                // recurse forever without ever reaching an aggregate
                if !self.active_pointers.insert(key.clone()) {
                    return false;
                }
            }
            self.stack.push(Frame::Pointer {
                key: name.to_string(),
                child: None,
                seen_key,
            });
            return true;
        }

        if let Some(key) = Self::identity(value) {
            if let Some(&existing) = self.seen.get(&key) {
                self.attach(name, existing);
                return false;
            }
            // register before descending so cycles resolve to this node
            let id = self.alloc(Node::Map(Vec::new()));
            self.seen.insert(key, id);
            self.stack.push(Frame::Aggregate {
                key: name.to_string(),
                node: id,
                entries: Vec::new(),
            });
        } else {
            let id = self.alloc(Node::Map(Vec::new()));
            self.stack.push(Frame::Aggregate {
                key: name.to_string(),
                node: id,
                entries: Vec::new(),
            });
        }
        true
    }

    fn leave(&mut self, _name: &str)
    {
        match self.stack.pop() {
            Some(Frame::Aggregate { key, node, entries }) => {
                self.nodes[node.0] = Node::Map(entries);
                self.attach(&key, node);
            }
            Some(Frame::Pointer { key, child, seen_key }) => {
                if let Some(seen_key) = seen_key {
                    self.active_pointers.remove(&seen_key);
                }
                // no pointee: the key is simply absent
                if let Some(child) = child {
                    self.attach(&key, child);
                }
            }
            None => {}
        }
    }
}

/// Materialize one named value into a standalone snapshot.
pub fn materialize(visitor: &Visitor, value: &Value<'_>, name: &str) -> Snapshot
{
    let mut builder = SnapshotBuilder::new();
    builder.build(visitor, value, name);
    builder.finish()
}
