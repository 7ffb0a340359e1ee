//! # Error Types
//!
//! General error handling for memory inspection.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Most variants describe conditions that are *recovered locally*: a decoder
//! that cannot make sense of a container's bytes, or a pointer that lands in
//! unmapped memory, truncates one branch of a traversal rather than aborting
//! the whole inspection. Only fundamentally broken preconditions (no process
//! to inspect at all) are expected to reach the user as hard errors.

use thiserror::Error;

/// Main error type for inspection operations
///
/// ## Error Categories
///
/// 1. **Layout errors**: UnsupportedLayout, MissingMember
/// 2. **Memory errors**: Inaccessible, NoAddress, ShortRead
/// 3. **Symbol errors**: SymbolNotFound, AmbiguousSymbol
/// 4. **Type errors**: UnhandledType
/// 5. **Host errors**: NotAttached, Dwarf, Io
#[derive(Error, Debug)]
pub enum SpelunkError
{
    /// A container's in-memory shape does not match the ABI revision the
    /// decoder expects
    ///
    /// This happens when the debuggee was built against a standard library
    /// release whose internals moved, or when a type name merely resembles a
    /// known container. The decoder refuses to guess rather than misread
    /// bytes; the visitor reports a diagnostic leaf and carries on.
    #[error("unsupported {container} layout: {detail}")]
    UnsupportedLayout
    {
        /// Container tag whose decode failed (e.g. `std::vector`)
        container: &'static str,
        /// What was missing or mismatched
        detail: String,
    },

    /// A read landed outside any readable region of the debuggee
    ///
    /// Expected for dangling pointers, pointers into foreign mappings, and
    /// partially initialized objects. Treated as "no further structure".
    #[error("memory not accessible at 0x{address:016x}")]
    Inaccessible
    {
        /// Address of the failed read
        address: u64,
    },

    /// A value has no stable address to read from
    ///
    /// Synthetic values (decoder metadata, computed temporaries) carry no
    /// address; asking them for debuggee bytes is a caller bug surfaced as
    /// an error rather than a panic.
    #[error("value has no address")]
    NoAddress,

    /// A struct layout is missing a member the decoder navigates through
    #[error("type {type_name} has no member {member}")]
    MissingMember
    {
        /// Qualified name of the type that was searched
        type_name: String,
        /// The member that could not be found
        member: &'static str,
    },

    /// No symbol matched the requested name
    #[error("no symbol matches {0:?}")]
    SymbolNotFound(String),

    /// More than one symbol matched a name that must resolve uniquely
    #[error("{count} symbols match {name:?}")]
    AmbiguousSymbol
    {
        /// The ambiguous name
        name: String,
        /// How many candidates matched
        count: usize,
    },

    /// The classifier has no handling for a value's type category
    ///
    /// Recovered with a best-effort diagnostic; never propagates out of a
    /// traversal.
    #[error("unhandled type category {0:?}")]
    UnhandledType(crate::value::TypeCategory),

    /// Operation requires an inspectable process
    #[error("not attached to a process")]
    NotAttached,

    /// Restoring the debug host's thread/frame focus failed
    #[error("failed to restore focus: {0}")]
    FocusRestore(String),

    /// DWARF parsing failed
    #[error("dwarf: {0}")]
    Dwarf(String),

    /// I/O error (for `/proc` reads, binary parsing, report writing)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for `Result<T, SpelunkError>`
pub type Result<T> = std::result::Result<T, SpelunkError>;
