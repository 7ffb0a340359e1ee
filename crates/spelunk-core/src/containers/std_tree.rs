//! `std::map` / `std::set` decoder: classic red-black tree walk.
//!
//! libstdc++ keeps a node count and a header node in `_M_t._M_impl`; the
//! header's `_M_left` points at the leftmost (smallest) node. Iteration is
//! the textbook in-order successor: descend to the leftmost child of the
//! right subtree, otherwise climb while the current node is its parent's
//! right child. The walk is bounded by the stored count, which also spares
//! us the header-sentinel comparison.
//!
//! The payload sits right after the node header (`_Rb_tree_node_base`), in
//! `_M_storage` on C++11 ABIs and `_M_value_field` on C++03, both at the
//! same offset.

use super::{unsupported, unsupported_msg, ContainerView, Elements};
use crate::error::Result;
use crate::value::{MemberKind, MemorySource, Scalar, TypeRef, Value};

pub(super) fn decode_map<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    decode(value, "std::map")
}

pub(super) fn decode_set<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    decode(value, "std::set")
}

fn decode<'m>(value: &Value<'m>, tag: &'static str) -> Result<ContainerView<'m>>
{
    let tree = value.member("_M_t").map_err(|e| unsupported(tag, e))?;
    let impl_ = tree.member("_M_impl").map_err(|e| unsupported(tag, e))?;

    let size = impl_
        .member("_M_node_count")
        .and_then(|m| m.as_u64())
        .map_err(|e| unsupported(tag, e))?;
    let header = impl_.member("_M_header").map_err(|e| unsupported(tag, e))?;
    let leftmost = header
        .member("_M_left")
        .and_then(|m| m.read_pointer())
        .map_err(|e| unsupported(tag, e))?;

    let node_base = header.ty().resolved();
    let links = Links {
        parent: member_offset(node_base, "_M_parent").ok_or_else(|| unsupported_msg(tag, "node base has no parent link"))?,
        left: member_offset(node_base, "_M_left").ok_or_else(|| unsupported_msg(tag, "node base has no left link"))?,
        right: member_offset(node_base, "_M_right").ok_or_else(|| unsupported_msg(tag, "node base has no right link"))?,
        payload: node_base.byte_size(),
    };

    // _Rb_tree<_Key, _Val, ...>: payload is the second template argument
    let payload_ty: TypeRef = tree
        .ty()
        .resolved()
        .template_args()
        .get(1)
        .cloned()
        .ok_or_else(|| unsupported_msg(tag, "tree type carries no template arguments"))?;

    let mem = value.memory();
    let iter = InOrder {
        mem,
        node: leftmost,
        remaining: size,
        links,
        payload_ty,
    };

    Ok(ContainerView {
        tag,
        meta: vec![(".size", Scalar::UInt(size))],
        elements: Elements::Seq(Box::new(iter)),
    })
}

/// Byte offset of a named data member inside `ty`.
fn member_offset(ty: &crate::value::TypeDescriptor, name: &str) -> Option<u64>
{
    ty.members()
        .iter()
        .find(|m| m.kind == MemberKind::Field && m.name.as_deref() == Some(name))
        .map(|m| m.offset_bits / 8)
}

#[derive(Clone, Copy)]
struct Links
{
    parent: u64,
    left: u64,
    right: u64,
    /// Offset of the stored value from the node address
    payload: u64,
}

struct InOrder<'m>
{
    mem: &'m dyn MemorySource,
    node: u64,
    remaining: u64,
    links: Links,
    payload_ty: TypeRef,
}

impl InOrder<'_>
{
    fn successor(&self, node: u64) -> Result<u64>
    {
        let mem = self.mem;
        let right = mem.read_word(node + self.links.right)?;
        if right != 0 {
            let mut next = right;
            loop {
                let left = mem.read_word(next + self.links.left)?;
                if left == 0 {
                    return Ok(next);
                }
                next = left;
            }
        }
        let mut node = node;
        let mut parent = mem.read_word(node + self.links.parent)?;
        while node == mem.read_word(parent + self.links.right)? {
            node = parent;
            parent = mem.read_word(parent + self.links.parent)?;
        }
        // at the root, the header is the parent's "parent"; stay on the node
        if mem.read_word(node + self.links.right)? != parent {
            node = parent;
        }
        Ok(node)
    }
}

impl<'m> Iterator for InOrder<'m>
{
    type Item = Result<Value<'m>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.remaining == 0 || self.node == 0 {
            return None;
        }
        self.remaining -= 1;
        let elem = Value::new(self.mem, self.node + self.links.payload, self.payload_ty.clone());
        if self.remaining > 0 {
            match self.successor(self.node) {
                Ok(next) => self.node = next,
                Err(err) => {
                    self.remaining = 0;
                    return Some(Err(err));
                }
            }
        }
        Some(Ok(elem))
    }
}
