//! `std::deque` decoder: segmented buffer behind a block map.
//!
//! Elements live in fixed-capacity blocks (512 bytes' worth, at least one
//! element). `_M_start`/`_M_finish` are iterators holding the current
//! element (`_M_cur`), the block bounds (`_M_first`/`_M_last`) and the slot
//! in the block map (`_M_node`). Size combines whole blocks between the two
//! iterators with the partial spans at either end; iteration advances
//! within a block and hops through the map at block boundaries.

use super::{template_arg, unsupported, unsupported_msg, ContainerView, Elements};
use crate::error::Result;
use crate::value::{MemorySource, Scalar, TypeRef, Value};

const TAG: &str = "std::deque";
const WORD: u64 = 8;

struct DequeIterRaw
{
    cur: u64,
    first: u64,
    last: u64,
    node: u64,
}

fn read_iter(it: &Value<'_>) -> Result<DequeIterRaw>
{
    Ok(DequeIterRaw {
        cur: it.member("_M_cur")?.read_pointer()?,
        first: it.member("_M_first")?.read_pointer()?,
        last: it.member("_M_last")?.read_pointer()?,
        // the slot in the block map this iterator sits in
        node: it.member("_M_node")?.read_pointer()?,
    })
}

pub(super) fn decode<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    let elem: TypeRef = template_arg(value, 0, TAG)?;
    let elem_size = elem.byte_size();
    if elem_size == 0 {
        return Err(unsupported_msg(TAG, "zero-sized element type"));
    }
    let block_elems = if elem_size < 512 { 512 / elem_size } else { 1 };

    let impl_ = value.member("_M_impl").map_err(|e| unsupported(TAG, e))?;
    let start = impl_
        .member("_M_start")
        .and_then(|it| read_iter(&it))
        .map_err(|e| unsupported(TAG, e))?;
    let finish = impl_
        .member("_M_finish")
        .and_then(|it| read_iter(&it))
        .map_err(|e| unsupported(TAG, e))?;

    let mem = value.memory();
    let finish_node = finish.node;
    let start_node = start.node;

    // whole blocks strictly between the two iterators
    let interior_blocks = (finish_node.saturating_sub(start_node) / WORD).saturating_sub(1);
    let head = start.last.saturating_sub(start.cur) / elem_size;
    let tail = finish.cur.saturating_sub(finish.first) / elem_size;
    let size = if finish_node == start_node {
        finish.cur.saturating_sub(start.cur) / elem_size
    } else {
        interior_blocks * block_elems + head + tail
    };
    let blocks = finish_node.saturating_sub(start_node) / WORD + 1;

    let iter = DequeElems {
        mem,
        elem,
        elem_size,
        block_bytes: block_elems * elem_size,
        cur: start.cur,
        block_end: start.last,
        node: start_node,
        stop: finish.cur,
        remaining: size,
    };

    Ok(ContainerView {
        tag: TAG,
        meta: vec![(".size", Scalar::UInt(size)), (".buckets", Scalar::UInt(blocks))],
        elements: Elements::Seq(Box::new(iter)),
    })
}

struct DequeElems<'m>
{
    mem: &'m dyn MemorySource,
    elem: TypeRef,
    elem_size: u64,
    block_bytes: u64,
    cur: u64,
    block_end: u64,
    node: u64,
    stop: u64,
    remaining: u64,
}

impl<'m> Iterator for DequeElems<'m>
{
    type Item = Result<Value<'m>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.remaining == 0 || self.cur == self.stop {
            return None;
        }
        self.remaining -= 1;
        let item = Value::new(self.mem, self.cur, self.elem.clone());

        self.cur += self.elem_size;
        if self.cur == self.block_end && self.remaining > 0 {
            // hop to the next block through the map
            self.node += WORD;
            match self.mem.read_word(self.node) {
                Ok(first) => {
                    self.cur = first;
                    self.block_end = first + self.block_bytes;
                }
                Err(err) => {
                    self.remaining = 0;
                    return Some(Err(err));
                }
            }
        }
        Some(Ok(item))
    }
}
