//! # Container Decoders
//!
//! One decoder per recognized container ABI. A decoder is handed a [`Value`]
//! whose declared type name matched a registry prefix, reads the container's
//! *raw* internal layout (never running debuggee code), and produces a
//! [`ContainerView`]: a type tag, the metadata this ABI actually supports
//! (size/capacity/bucket-count/ref-count/...), and the logical elements.
//!
//! Decoders are deliberately paranoid. When the bytes do not look like the
//! ABI revision they understand (a missing member, a non-pointer where a
//! pointer belongs) they fail with
//! [`UnsupportedLayout`](crate::error::SpelunkError::UnsupportedLayout)
//! instead of misreading memory. The visitor turns that into a single
//! diagnostic leaf and moves on.

mod function;
mod list;
mod lockfree;
mod mutex;
mod smart_ptr;
mod std_deque;
mod std_hash;
mod std_string;
mod std_tree;
mod std_vector;

use crate::error::{Result, SpelunkError};
use crate::value::{Scalar, TypeRef, Value};

/// Decoded view of one container instance. Transient: constructed per visit,
/// discarded after traversal.
pub struct ContainerView<'m>
{
    /// Canonical tag emitted as the `.type` metadata leaf
    pub tag: &'static str,
    /// Metadata leaves in emission order; which keys appear here *is* the
    /// decoder's capability record, fixed at construction
    pub meta: Vec<(&'static str, Scalar)>,
    /// Logical contents
    pub elements: Elements<'m>,
}

/// Logical element shapes a decoder can expose.
pub enum Elements<'m>
{
    /// No elements at all (mutex, lock-free chunk)
    None,
    /// Character data as one string leaf under `*`; `None` when the data
    /// pointer is null or unreadable
    Text(Option<(Value<'m>, String)>),
    /// Zero or one owned pointee under `*` (smart pointers)
    Pointee(Option<Value<'m>>),
    /// An opaque stored address under `*` (type-erased callables)
    Address(Option<u64>),
    /// Positional elements under `[i]`
    Seq(Box<dyn Iterator<Item = Result<Value<'m>>> + 'm>),
}

/// Decoder entry point: build a view from a matched value.
pub type DecodeFn = for<'m> fn(&Value<'m>) -> Result<ContainerView<'m>>;

/// One recognized ABI: a qualified-name prefix and its decoder.
pub struct AbiEntry
{
    /// Type name up to (not including) the template argument list
    pub prefix: &'static str,
    /// Tag reported even when decoding fails
    pub tag: &'static str,
    pub decode: DecodeFn,
}

/// Closed, ordered decoder table. Adding an ABI is adding a row.
pub static ABI_REGISTRY: &[AbiEntry] = &[
    AbiEntry {
        prefix: "std::vector",
        tag: "std::vector",
        decode: std_vector::decode,
    },
    AbiEntry {
        prefix: "std::__cxx11::list",
        tag: "std::list",
        decode: list::decode,
    },
    AbiEntry {
        prefix: "std::list",
        tag: "std::list",
        decode: list::decode,
    },
    AbiEntry {
        prefix: "std::deque",
        tag: "std::deque",
        decode: std_deque::decode,
    },
    AbiEntry {
        prefix: "std::map",
        tag: "std::map",
        decode: std_tree::decode_map,
    },
    AbiEntry {
        prefix: "std::set",
        tag: "std::set",
        decode: std_tree::decode_set,
    },
    AbiEntry {
        prefix: "std::unordered_map",
        tag: "std::unordered_map",
        decode: std_hash::decode_map,
    },
    AbiEntry {
        prefix: "std::unordered_set",
        tag: "std::unordered_set",
        decode: std_hash::decode_set,
    },
    AbiEntry {
        prefix: "std::unique_ptr",
        tag: "std::unique_ptr",
        decode: smart_ptr::decode_unique,
    },
    AbiEntry {
        prefix: "std::shared_ptr",
        tag: "std::shared_ptr",
        decode: smart_ptr::decode_shared,
    },
    AbiEntry {
        prefix: "std::__cxx11::basic_string",
        tag: "std::string",
        decode: std_string::decode,
    },
    AbiEntry {
        prefix: "std::basic_string",
        tag: "std::string",
        decode: std_string::decode,
    },
    AbiEntry {
        prefix: "std::mutex",
        tag: "std::mutex",
        decode: mutex::decode,
    },
    AbiEntry {
        prefix: "std::recursive_mutex",
        tag: "std::mutex",
        decode: mutex::decode,
    },
    AbiEntry {
        prefix: "std::function",
        tag: "std::function",
        decode: function::decode,
    },
    AbiEntry {
        prefix: "frame::lf::HashMap",
        tag: "frame::lf::HashMap",
        decode: lockfree::decode_hashmap,
    },
    AbiEntry {
        prefix: "frame::lf::Vector",
        tag: "frame::lf::Vector",
        decode: lockfree::decode_vector,
    },
    AbiEntry {
        prefix: "frame::lf::Chunk",
        tag: "frame::lf::Chunk",
        decode: lockfree::decode_chunk,
    },
    AbiEntry {
        prefix: "frame::HashMapCloseAddressing",
        tag: "frame::HashMapCloseAddressing",
        decode: lockfree::decode_close_addressing,
    },
];

/// Find the decoder for a qualified type name: the longest registry prefix
/// that either equals the name or is followed by its template argument list.
pub fn lookup(type_name: &str) -> Option<&'static AbiEntry>
{
    let mut best: Option<&'static AbiEntry> = None;
    for entry in ABI_REGISTRY {
        let matched = type_name == entry.prefix
            || (type_name.starts_with(entry.prefix) && type_name[entry.prefix.len()..].starts_with('<'));
        if matched && best.map(|b| entry.prefix.len() > b.prefix.len()).unwrap_or(true) {
            best = Some(entry);
        }
    }
    best
}

/// Wrap a layout-navigation failure into the decoder's own error.
fn unsupported(container: &'static str, err: SpelunkError) -> SpelunkError
{
    match err {
        already @ SpelunkError::UnsupportedLayout { .. } => already,
        other => SpelunkError::UnsupportedLayout {
            container,
            detail: other.to_string(),
        },
    }
}

fn unsupported_msg(container: &'static str, detail: &str) -> SpelunkError
{
    SpelunkError::UnsupportedLayout {
        container,
        detail: detail.to_string(),
    }
}

/// Template type argument `i` of the container's declared type, which the
/// raw layout alone cannot name (element and payload types).
fn template_arg(value: &Value<'_>, i: usize, container: &'static str) -> Result<TypeRef>
{
    let ty = value.ty().resolved();
    ty.template_args()
        .get(i)
        .cloned()
        .ok_or_else(|| unsupported_msg(container, "type carries no template arguments"))
}
