//! # Dump Rendering
//!
//! Human-readable renderings over any `io::Write`: the one-line-per-symbol
//! table lives on [`SymbolIndex`](crate::symbols::SymbolIndex); this module
//! renders full values, one indented line per visitor event. No color;
//! presentation belongs to the surrounding tool.

use std::collections::HashSet;
use std::io::{self, Write};

use crate::typename::clean_type_name;
use crate::value::{Scalar, TypeCategory, Value};
use crate::visit::{Sink, Visitor};

/// Sink that prints the event stream as an indented outline.
///
/// Revisit policy matches the snapshot builder: an aggregate already printed
/// is referenced by address instead of expanded again, which also keeps
/// cyclic values finite on the page.
pub struct DumpSink<'w, W: Write>
{
    out: &'w mut W,
    depth: usize,
    seen: HashSet<(u64, String)>,
    active_pointers: HashSet<(u64, String)>,
    /// Pointer identity per open frame, released again on leave
    frames: Vec<Option<(u64, String)>>,
    error: Option<io::Error>,
}

impl<'w, W: Write> DumpSink<'w, W>
{
    pub fn new(out: &'w mut W) -> Self
    {
        DumpSink {
            out,
            depth: 0,
            seen: HashSet::new(),
            active_pointers: HashSet::new(),
            frames: Vec::new(),
            error: None,
        }
    }

    /// First write error, if any line failed.
    pub fn finish(self) -> io::Result<()>
    {
        match self.error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn line(&mut self, text: &str)
    {
        if self.error.is_some() {
            return;
        }
        let indent = self.depth * 2;
        if let Err(err) = writeln!(self.out, "{:indent$}{text}", "") {
            self.error = Some(err);
        }
    }

    fn identity(value: &Value<'_>) -> Option<(u64, String)>
    {
        value
            .address()
            .filter(|&a| a != 0)
            .map(|addr| (addr, value.ty().display_name()))
    }
}

impl<W: Write> Sink for DumpSink<'_, W>
{
    fn scalar(&mut self, name: &str, _value: &Value<'_>, scalar: Scalar)
    {
        self.line(&format!("{name} = {scalar}"));
    }

    fn meta(&mut self, name: &str, scalar: Scalar)
    {
        self.line(&format!("{name} = {scalar}"));
    }

    fn enter(&mut self, name: &str, value: &Value<'_>) -> bool
    {
        if value.ty().resolved().category() == TypeCategory::Pointer {
            let key = Self::identity(value);
            if let Some(key) = &key {
                if !self.active_pointers.insert(key.clone()) {
                    self.line(&format!("{name} = <cycle>"));
                    return false;
                }
            }
            self.line(&format!("{name}:"));
            self.depth += 1;
            self.frames.push(key);
            return true;
        }
        if let Some(key) = Self::identity(value) {
            if self.seen.contains(&key) {
                self.line(&format!("{name} = <shared 0x{:016x}>", key.0));
                return false;
            }
            self.seen.insert(key);
        }
        self.line(&format!("{name}:"));
        self.depth += 1;
        self.frames.push(None);
        true
    }

    fn leave(&mut self, _name: &str)
    {
        self.depth = self.depth.saturating_sub(1);
        // pointer frames release their cycle marker so siblings may follow
        // the same chain again
        if let Some(Some(key)) = self.frames.pop() {
            self.active_pointers.remove(&key);
        }
    }

    fn diagnostic(&mut self, name: &str, message: &str)
    {
        self.line(&format!("{name} = <{message}>"));
    }
}

/// Dump a collection of named values: a header line with address, size and
/// cleaned type per symbol, then the value outline.
pub fn dump_values<'m, W, I>(visitor: &Visitor, values: I, out: &mut W) -> io::Result<()>
where
    W: Write,
    I: IntoIterator<Item = (String, Value<'m>)>,
{
    for (name, value) in values {
        writeln!(
            out,
            "{:016x} {:>10} {:<40} {}",
            value.address().unwrap_or(0),
            value.byte_size(),
            name,
            clean_type_name(&value.ty().display_name())
        )?;
        let mut sink = DumpSink::new(out);
        visitor.visit(&value, &name, &mut sink);
        sink.finish()?;
    }
    Ok(())
}
