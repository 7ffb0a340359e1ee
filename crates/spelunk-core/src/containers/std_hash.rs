//! `std::unordered_map` / `std::unordered_set` decoder.
//!
//! libstdc++ open hashing: `_M_h._M_before_begin._M_nxt` heads a single
//! forward-linked chain threading every node in the table; each node is a
//! forward link followed by the payload in aligned storage. Element count
//! and bucket count are stored counters, so no bucket array walk is needed.
//!
//! The payload type (the key, or the key/value pair) is taken from the
//! hashtable's second template argument. Payload storage is assumed to sit
//! at pointer alignment right after the link word.

use super::{unsupported, unsupported_msg, ContainerView, Elements};
use crate::error::Result;
use crate::value::{MemorySource, Scalar, TypeRef, Value};

const WORD: u64 = 8;

pub(super) fn decode_map<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    decode(value, "std::unordered_map")
}

pub(super) fn decode_set<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    decode(value, "std::unordered_set")
}

fn decode<'m>(value: &Value<'m>, tag: &'static str) -> Result<ContainerView<'m>>
{
    let table = value.member("_M_h").map_err(|e| unsupported(tag, e))?;

    // pre-4.9 hashtables stored `_M_bbegin` instead; recognized, not decoded
    let head = table
        .member("_M_before_begin")
        .and_then(|b| b.member("_M_nxt"))
        .and_then(|n| n.read_pointer())
        .map_err(|e| match table.member("_M_bbegin") {
            Ok(_) => unsupported_msg(tag, "hashtable predates the cached before-begin node"),
            Err(_) => unsupported(tag, e),
        })?;

    let size = table
        .member("_M_element_count")
        .and_then(|m| m.as_u64())
        .map_err(|e| unsupported(tag, e))?;
    let buckets = table
        .member("_M_bucket_count")
        .and_then(|m| m.as_u64())
        .map_err(|e| unsupported(tag, e))?;

    // _Hashtable<_Key, _Value, ...>: the second argument is the node payload
    // (the key itself for sets, pair<const K, V> for maps)
    let payload: TypeRef = table
        .ty()
        .resolved()
        .template_args()
        .get(1)
        .cloned()
        .ok_or_else(|| unsupported_msg(tag, "hashtable type carries no template arguments"))?;

    let mem = value.memory();
    let iter = NodeChain {
        mem,
        node: head,
        remaining: size,
        payload,
    };

    Ok(ContainerView {
        tag,
        meta: vec![(".size", Scalar::UInt(size)), (".buckets", Scalar::UInt(buckets))],
        elements: Elements::Seq(Box::new(iter)),
    })
}

/// Forward chain walker. Bounded by the stored element count so a corrupt
/// link can never loop.
struct NodeChain<'m>
{
    mem: &'m dyn MemorySource,
    node: u64,
    remaining: u64,
    payload: TypeRef,
}

impl<'m> Iterator for NodeChain<'m>
{
    type Item = Result<Value<'m>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.node == 0 || self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let elem = Value::new(self.mem, self.node + WORD, self.payload.clone());
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
