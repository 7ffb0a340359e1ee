//! # spelunk-core
//!
//! Typed inspection of another process's live memory.
//!
//! Given a value (an address plus a static type description) the visitor
//! classifies it, decodes well-known container ABIs straight from their raw
//! bytes, and streams structure events to a consumer:
//!
//! - [`dump`] renders a human-readable outline
//! - [`snapshot`] materializes a tree with cycle/aliasing collapse
//! - [`graph`] records a containment/pointer graph for memory analysis
//!
//! Process attachment, thread enumeration and the command surface live in
//! the surrounding tooling; this crate consumes raw byte reads
//! ([`value::MemorySource`]) and static type structure (built by hand or by
//! the [`dwarf`] provider) and nothing else.
//!
//! ## Failure philosophy
//!
//! Debuggee memory is hostile: pointers dangle, layouts drift across
//! library versions, types arrive half-stripped. Every read is fallible and
//! every failure is local. A bad branch becomes a diagnostic leaf, never
//! an aborted traversal.

pub mod containers;
pub mod dump;
pub mod dwarf;
pub mod error;
pub mod graph;
pub mod maps;
pub mod procmem;
pub mod selection;
pub mod snapshot;
pub mod symbols;
pub mod typename;
pub mod value;
pub mod visit;

// Re-export commonly used types
pub use error::{Result, SpelunkError};
pub use graph::{GraphBuilder, MemoryGraph};
pub use maps::{Region, RegionMap};
pub use selection::{Focus, FocusGuard, FocusHost};
pub use snapshot::{Snapshot, SnapshotBuilder};
pub use symbols::{SymbolEntry, SymbolIndex};
pub use value::{MemorySource, Scalar, TypeCategory, TypeDescriptor, TypeRef, Value};
pub use visit::{Sink, Visitor};
