//! Lock-free container decoders (`frame::lf::` family).
//!
//! The building block is `Chunk`: a tagged pointer whose low four bits carry
//! a "collected" flag and whose masked value points at a directory of three
//! control words (begin, capacity-end, end) placed ahead of the element
//! storage. `Vector<T>` divides the chunk's byte spans by the element size.
//! The hash maps layer a bucket vector of `(kv, next, free)` triples over a
//! vector: `next` heads a bucket's chain, `free` links the chain onward,
//! both as indices into the same bucket store. Iteration scans buckets from
//! the top down, draining each chain before moving on.

use super::{template_arg, unsupported, unsupported_msg, ContainerView, Elements};
use crate::error::Result;
use crate::value::{MemorySource, Scalar, TypeRef, Value};

const WORD: u64 = 8;
/// Low bits of the tagged chunk pointer: collected flag and allocator tag
const TAG_BITS: u64 = 15;
/// Directory alignment mask applied to the tagged pointer
const DIR_MASK: u64 = !31;

struct ChunkRaw
{
    begin: u64,
    size_bytes: u64,
    capacity_bytes: u64,
    collected: bool,
    initialized: bool,
}

/// Decode the chunk directory behind a `Chunk` struct value.
fn read_chunk(chunk: &Value<'_>, container: &'static str) -> Result<ChunkRaw>
{
    let tagged = chunk
        .member("chunk")
        .and_then(|c| c.read_pointer())
        .map_err(|e| unsupported(container, e))?;
    if tagged == 0 {
        return Ok(ChunkRaw {
            begin: 0,
            size_bytes: 0,
            capacity_bytes: 0,
            collected: false,
            initialized: false,
        });
    }

    let mem = chunk.memory();
    let directory = tagged & DIR_MASK;
    let begin = mem.read_word(directory).map_err(|e| unsupported(container, e))?;
    let capacity_end = mem.read_word(directory + WORD).map_err(|e| unsupported(container, e))?;
    let end = mem.read_word(directory + 2 * WORD).map_err(|e| unsupported(container, e))?;

    Ok(ChunkRaw {
        begin,
        size_bytes: end.saturating_sub(begin),
        capacity_bytes: capacity_end.saturating_sub(begin),
        collected: (tagged & TAG_BITS) != 0,
        initialized: true,
    })
}

pub(super) fn decode_chunk<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    const TAG: &str = "frame::lf::Chunk";

    let chunk = read_chunk(value, TAG)?;
    Ok(ContainerView {
        tag: TAG,
        meta: vec![
            (".size", Scalar::UInt(chunk.size_bytes)),
            (".capacity", Scalar::UInt(chunk.capacity_bytes)),
            (".collected", Scalar::Bool(chunk.collected)),
        ],
        elements: Elements::None,
    })
}

/// Typed element store over a chunk or a raw begin/count pair.
struct ElemStore<'m>
{
    mem: &'m dyn MemorySource,
    begin: u64,
    count: u64,
    elem: TypeRef,
    elem_size: u64,
}

impl<'m> ElemStore<'m>
{
    fn item(&self, i: u64) -> Value<'m>
    {
        Value::new(self.mem, self.begin + i * self.elem_size, self.elem.clone())
    }
}

fn lf_vector_store<'m>(value: &Value<'m>, container: &'static str) -> Result<ElemStore<'m>>
{
    let elem: TypeRef = template_arg(value, 0, container)?;
    let elem_size = elem.byte_size();
    if elem_size == 0 {
        return Err(unsupported_msg(container, "zero-sized element type"));
    }
    let chunk_struct = value.member("chunk").map_err(|e| unsupported(container, e))?;
    let chunk = read_chunk(&chunk_struct, container)?;
    Ok(ElemStore {
        mem: value.memory(),
        begin: chunk.begin,
        count: if chunk.initialized { chunk.size_bytes / elem_size } else { 0 },
        elem,
        elem_size,
    })
}

pub(super) fn decode_vector<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    const TAG: &str = "frame::lf::Vector";

    let elem: TypeRef = template_arg(value, 0, TAG)?;
    let elem_size = elem.byte_size();
    if elem_size == 0 {
        return Err(unsupported_msg(TAG, "zero-sized element type"));
    }
    let chunk_struct = value.member("chunk").map_err(|e| unsupported(TAG, e))?;
    let chunk = read_chunk(&chunk_struct, TAG)?;

    let size = if chunk.initialized { chunk.size_bytes / elem_size } else { 0 };
    let capacity = if chunk.initialized { chunk.capacity_bytes / elem_size } else { 0 };

    let mem = value.memory();
    let begin = chunk.begin;
    let elem_for_iter = elem.clone();
    let iter = (0..size).map(move |i| Ok(Value::new(mem, begin + i * elem_size, elem_for_iter.clone())));

    Ok(ContainerView {
        tag: TAG,
        meta: vec![(".size", Scalar::UInt(size)), (".capacity", Scalar::UInt(capacity))],
        elements: Elements::Seq(Box::new(iter)),
    })
}

pub(super) fn decode_hashmap<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    const TAG: &str = "frame::lf::HashMap";

    let size = value
        .member("size_")
        .and_then(|s| s.as_u64())
        .map_err(|e| unsupported(TAG, e))?;
    let buckets = value.member("buckets_").map_err(|e| unsupported(TAG, e))?;
    let store = lf_vector_store(&buckets, TAG)?;

    bucket_view(TAG, size, store)
}

pub(super) fn decode_close_addressing<'m>(value: &Value<'m>) -> Result<ContainerView<'m>>
{
    const TAG: &str = "frame::HashMapCloseAddressing";

    let size = value
        .member("size_")
        .and_then(|s| s.as_u64())
        .map_err(|e| unsupported(TAG, e))?;

    // bucket store is a plain std::vector here
    let buckets = value.member("buckets_").map_err(|e| unsupported(TAG, e))?;
    let impl_ = buckets.member("_M_impl").map_err(|e| unsupported(TAG, e))?;
    let begin = impl_
        .member("_M_start")
        .and_then(|s| s.read_pointer())
        .map_err(|e| unsupported(TAG, e))?;
    let finish = impl_
        .member("_M_finish")
        .and_then(|s| s.read_pointer())
        .map_err(|e| unsupported(TAG, e))?;
    let elem: TypeRef = buckets
        .ty()
        .resolved()
        .template_args()
        .first()
        .cloned()
        .ok_or_else(|| unsupported_msg(TAG, "bucket vector carries no template arguments"))?;
    let elem_size = elem.byte_size();
    if elem_size == 0 {
        return Err(unsupported_msg(TAG, "zero-sized bucket type"));
    }
    let store = ElemStore {
        mem: value.memory(),
        begin,
        count: finish.saturating_sub(begin) / elem_size,
        elem,
        elem_size,
    };

    bucket_view(TAG, size, store)
}

fn bucket_view<'m>(tag: &'static str, size: u64, store: ElemStore<'m>) -> Result<ContainerView<'m>>
{
    let buckets = store.count;
    let iter = BucketChains {
        store,
        bucket: buckets as i64,
        chain: 0,
        remaining: size,
    };

    Ok(ContainerView {
        tag,
        meta: vec![(".size", Scalar::UInt(size)), (".buckets", Scalar::UInt(buckets))],
        elements: Elements::Seq(Box::new(iter)),
    })
}

/// Bucket-then-chain walker over `(kv, next, free)` triples. `next` is the
/// head index of a bucket's chain, `free` the link to the chain's next
/// entry; index 0 terminates. Bounded by the stored element count so a
/// cyclic chain cannot spin.
struct BucketChains<'m>
{
    store: ElemStore<'m>,
    bucket: i64,
    chain: u64,
    remaining: u64,
}

impl<'m> BucketChains<'m>
{
    fn entry_index(&self, i: u64, field: &'static str) -> Result<u64>
    {
        self.store.item(i).member(field).and_then(|f| f.as_u64())
    }

    fn advance(&mut self) -> Result<Option<Value<'m>>>
    {
        if self.chain != 0 {
            let link = self.entry_index(self.chain, "free")?;
            if link != 0 && link < self.store.count {
                self.chain = link;
                return Ok(Some(self.store.item(link).member("kv")?));
            }
        }
        self.chain = 0;
        self.bucket -= 1;
        while self.bucket >= 0 {
            let head = self.entry_index(self.bucket as u64, "next")?;
            if head != 0 && head < self.store.count {
                self.chain = head;
                return Ok(Some(self.store.item(head).member("kv")?));
            }
            self.bucket -= 1;
        }
        Ok(None)
    }
}

impl<'m> Iterator for BucketChains<'m>
{
    type Item = Result<Value<'m>>;

    fn next(&mut self) -> Option<Self::Item>
    {
        if self.remaining == 0 {
            return None;
        }
        match self.advance() {
            Ok(Some(kv)) => {
                self.remaining -= 1;
                Some(Ok(kv))
            }
            Ok(None) => {
                self.remaining = 0;
                None
            }
            Err(err) => {
                self.remaining = 0;
                Some(Err(err))
            }
        }
    }
}
