//! `std::list` decoder: circular doubly-linked list around a sentinel.
//!
//! `_M_impl._M_node` is the sentinel; following `_M_next` returns to it
//! after the last element. The stored value lives after the two link words
//! of each node. C++11 ABIs also keep a node count in the sentinel
//! (`_M_size`); when present it is reported, otherwise the decoder simply
//! iterates (the original container never stored one).

use super::{unsupported, unsupported_msg, ContainerView, Elements};
use crate::error::Result;
use crate::value::{MemorySource, Scalar, TypeRef, Value};

const TAG: &str = "std::list";

/// Two link words precede the stored value.
const NODE_HEADER: u64 = 16;

pub(super) fn decode<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    let sentinel_node = value
        .member("_M_impl")
        .and_then(|i| i.member("_M_node"))
        .map_err(|e| unsupported(TAG, e))?;
    let sentinel = sentinel_node
        .address()
        .ok_or_else(|| unsupported_msg(TAG, "sentinel has no address"))?;
    let first = sentinel_node
        .member("_M_next")
        .and_then(|m| m.read_pointer())
        .map_err(|e| unsupported(TAG, e))?;

    let payload = super::template_arg(value, 0, TAG)?;

    let mut meta = Vec::new();
    if let Ok(count) = sentinel_node.member("_M_size").and_then(|m| m.as_u64()) {
        meta.push((".size", Scalar::UInt(count)));
    }

    let mem = value.memory();
    let iter = ListIter {
        mem,
        node: first,
        sentinel,
        payload,
    };

    Ok(ContainerView {
        tag: TAG,
        meta,
        elements: Elements::Seq(Box::new(iter)),
    })
}

struct ListIter<'m>
{
    mem: &'m dyn MemorySource,
    node: u64,
    sentinel: u64,
    payload: TypeRef,
}

impl<'m> Iterator for ListIter<'m>
{
    type Item = Result<Value<'m>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.node == 0 || self.node == self.sentinel {
            return None;
        }
        let elem = Value::new(self.mem, self.node + NODE_HEADER, self.payload.clone());
        match self.mem.read_word(self.node) {
            Ok(next) => self.node = next,
            Err(err) => {
                self.node = 0;
                return Some(Err(err));
            }
        }
        Some(Ok(elem))
    }
}
