//! # Type Classifier & Generic Visitor
//!
//! The traversal core. [`Visitor::visit`] classifies a value by type
//! category and walks it recursively, handing events to a pluggable
//! [`Sink`]: scalar leaves, synthesized metadata, and enter/leave pairs
//! around aggregates, containers and followed pointers.
//!
//! Path segments encode structural role so a flat event stream can
//! reconstruct structure unambiguously:
//!
//! - `field`: a struct member, by name
//! - `[3]`: a positional element of an array or container
//! - `+alt`: a union alternative (overlap expected)
//! - `*p`: the pointee reached through pointer `p`
//! - `&r`: the value behind reference `r`
//! - `.base`: an inherited base-class subobject
//! - `.type`, `.size`, ...: decoder metadata
//!
//! Nothing in here aborts a traversal: inaccessible pointees truncate their
//! branch, decoders that reject a layout become a single `.error` leaf, and
//! unknown categories produce a diagnostic.

use tracing::debug;

use crate::containers::{self, Elements};
use crate::value::{Scalar, TypeCategory, Value};

/// Receives traversal events. Implementations decide both representation
/// (tree, graph, text) and revisit policy via the return value of
/// [`Sink::enter`].
pub trait Sink
{
    /// Leaf backed by debuggee storage. `value` carries address and type for
    /// consumers that track identity.
    fn scalar(&mut self, name: &str, value: &Value<'_>, scalar: Scalar);

    /// Synthesized leaf with no storage of its own (container metadata).
    fn meta(&mut self, name: &str, scalar: Scalar);

    /// About to descend into `value`. Return `false` to skip the subtree;
    /// the visitor will not descend and will *not* call [`Sink::leave`].
    fn enter(&mut self, name: &str, value: &Value<'_>) -> bool;

    /// Done with a subtree previously entered.
    fn leave(&mut self, name: &str);

    /// A branch that could not be interpreted; traversal continues.
    fn diagnostic(&mut self, _name: &str, _message: &str) {}
}

/// Recursive typed-memory traversal with per-container element capping.
#[derive(Debug, Clone)]
pub struct Visitor
{
    max_elements: u64,
}

impl Default for Visitor
{
    fn default() -> Self
    {
        Visitor {
            max_elements: u64::MAX,
        }
    }
}

impl Visitor
{
    pub fn new() -> Self
    {
        Visitor::default()
    }

    /// Cap the number of elements enumerated per container. Truncation stops
    /// enumerating that container; everything else continues.
    pub fn with_element_limit(limit: u64) -> Self
    {
        Visitor { max_elements: limit }
    }

    /// Classify `value` and stream its structure into `sink` under `name`.
    pub fn visit(&self, value: &Value<'_>, name: &str, sink: &mut dyn Sink)
    {
        match value.ty().resolved().category() {
            TypeCategory::Int
            | TypeCategory::Enum
            | TypeCategory::Float
            | TypeCategory::Bool
            | TypeCategory::Char => self.visit_scalar(value, name, sink),
            TypeCategory::Pointer => self.visit_pointer(value, name, sink),
            TypeCategory::Reference => self.visit_reference(value, name, sink),
            TypeCategory::Function | TypeCategory::MethodPtr => self.visit_code(value, name, sink),
            TypeCategory::Array => self.visit_array(value, name, sink),
            TypeCategory::Union => self.visit_union(value, name, sink),
            TypeCategory::Struct => self.visit_struct(value, name, sink),
            // Typedef is resolved before dispatch; Void and Other carry no
            // readable structure
            category => {
                debug!(?category, name, "unhandled type category");
                sink.diagnostic(name, &format!("unhandled type category {category:?}"));
            }
        }
    }

    fn visit_scalar(&self, value: &Value<'_>, name: &str, sink: &mut dyn Sink)
    {
        match value.scalar() {
            // characters surface as one-character strings
            Ok(Scalar::Char(c)) => sink.scalar(name, value, Scalar::Str(c.to_string())),
            Ok(scalar) => sink.scalar(name, value, scalar),
            Err(err) => sink.diagnostic(name, &err.to_string()),
        }
    }

    /// Function values and method pointers are opaque identities, not
    /// further interpreted.
    fn visit_code(&self, value: &Value<'_>, name: &str, sink: &mut dyn Sink)
    {
        let address = value.address().unwrap_or(0);
        sink.scalar(name, value, Scalar::UInt(address));
    }

    fn visit_pointer(&self, value: &Value<'_>, name: &str, sink: &mut dyn Sink)
    {
        let ty = value.ty().resolved();
        let Some(target) = ty.target().cloned() else {
            sink.diagnostic(name, "pointer without target type");
            return;
        };

        // `const char*` is a C string, not a pointer to descend
        let pointee = target.resolved();
        if pointee.category() == TypeCategory::Char && pointee.is_const() {
            match value.read_pointer() {
                Ok(0) | Err(_) => {}
                Ok(addr) => match value.memory().read_c_string(addr, MAX_C_STRING) {
                    Ok(Some(text)) => sink.scalar(name, value, Scalar::Str(text)),
                    // unreadable data: absent, not an error
                    Ok(None) | Err(_) => {}
                },
            }
            return;
        }

        // dangling and foreign pointers are expected; absence, not failure
        let Ok(dereferenced) = value.deref() else {
            return;
        };

        if !sink.enter(name, value) {
            return;
        }
        self.visit(&dereferenced, &format!("*{name}"), sink);
        sink.leave(name);
    }

    fn visit_reference(&self, value: &Value<'_>, name: &str, sink: &mut dyn Sink)
    {
        // the referenced address is re-read from the member's own storage,
        // so references embedded by value resolve like pointers
        match value.deref() {
            Ok(referenced) => self.visit(&referenced, &format!("&{name}"), sink),
            Err(err) => {
                debug!(name, %err, "reference does not resolve");
            }
        }
    }

    fn visit_array(&self, value: &Value<'_>, name: &str, sink: &mut dyn Sink)
    {
        let ty = value.ty().resolved();
        let Some(elem) = ty.target().cloned() else {
            sink.diagnostic(name, "array without element type");
            return;
        };

        // char[N] is a fixed-size string leaf
        if elem.resolved().category() == TypeCategory::Char {
            if let Some(addr) = value.address() {
                match value.memory().read_string_exact(addr, ty.byte_size() as usize) {
                    Ok(text) => sink.scalar(name, value, Scalar::Str(text)),
                    Err(err) => sink.diagnostic(name, &err.to_string()),
                }
            }
            return;
        }

        if !sink.enter(name, value) {
            return;
        }
        sink.meta(".type", Scalar::Str("array".to_string()));
        let count = ty.element_count();
        sink.meta(".size", Scalar::UInt(count));
        for i in 0..count.min(self.max_elements) {
            match value.index(i) {
                Ok(elem_value) => self.visit(&elem_value, &format!("[{i}]"), sink),
                Err(err) => {
                    sink.diagnostic(&format!("[{i}]"), &err.to_string());
                    break;
                }
            }
        }
        sink.leave(name);
    }

    /// Unions carry no discriminant in raw memory: every alternative is
    /// visited, tagged so consumers know the storage overlaps.
    fn visit_union(&self, value: &Value<'_>, name: &str, sink: &mut dyn Sink)
    {
        if !sink.enter(name, value) {
            return;
        }
        for member in value.ty().resolved().members() {
            let label = match member.name.as_deref() {
                Some(member_name) => format!("+{member_name}"),
                None => "+<anonymous>".to_string(),
            };
            match value.field(member) {
                Ok(alt) => self.visit(&alt, &label, sink),
                Err(err) => sink.diagnostic(&label, &err.to_string()),
            }
        }
        sink.leave(name);
    }

    fn visit_struct(&self, value: &Value<'_>, name: &str, sink: &mut dyn Sink)
    {
        let ty = value.ty().resolved();

        if let Some(type_name) = ty.name() {
            if let Some(entry) = containers::lookup(type_name) {
                self.visit_container(value, name, entry, sink);
                return;
            }
        }

        if !sink.enter(name, value) {
            return;
        }
        for member in ty.members() {
            if member.artificial {
                continue;
            }
            match member.kind {
                crate::value::MemberKind::BaseClass => {
                    // empty bases contribute nothing worth descending into
                    if member.ty.resolved().byte_size() > 1 {
                        match value.field(member) {
                            Ok(base) => self.visit(&base, ".base", sink),
                            Err(err) => sink.diagnostic(".base", &err.to_string()),
                        }
                    }
                }
                crate::value::MemberKind::Field => {
                    let label = member.name.clone().unwrap_or_else(|| "<anonymous>".to_string());
                    match value.field(member) {
                        Ok(field) => self.visit(&field, &label, sink),
                        Err(err) => sink.diagnostic(&label, &err.to_string()),
                    }
                }
                crate::value::MemberKind::Static => {}
            }
        }
        sink.leave(name);
    }

    fn visit_container(
        &self,
        value: &Value<'_>,
        name: &str,
        entry: &'static containers::AbiEntry,
        sink: &mut dyn Sink,
    )
    {
        if !sink.enter(name, value) {
            return;
        }
        match (entry.decode)(value) {
            Ok(view) => {
                sink.meta(".type", Scalar::Str(view.tag.to_string()));
                for (key, scalar) in view.meta {
                    sink.meta(key, scalar);
                }
                match view.elements {
                    Elements::None => {}
                    Elements::Text(Some((leaf, text))) => sink.scalar("*", &leaf, Scalar::Str(text)),
                    Elements::Text(None) => {}
                    Elements::Pointee(Some(pointee)) => self.visit(&pointee, "*", sink),
                    Elements::Pointee(None) => {}
                    Elements::Address(Some(address)) => sink.meta("*", Scalar::UInt(address)),
                    Elements::Address(None) => {}
                    Elements::Seq(iter) => {
                        for (i, item) in iter.take(self.max_elements as usize).enumerate() {
                            match item {
                                Ok(elem) => self.visit(&elem, &format!("[{i}]"), sink),
                                Err(err) => {
                                    sink.diagnostic(&format!("[{i}]"), &err.to_string());
                                    break;
                                }
                            }
                        }
                    }
                }
            }
            Err(err) => {
                debug!(container = entry.tag, %err, "container decode failed");
                sink.meta(".type", Scalar::Str(entry.tag.to_string()));
                sink.meta(".error", Scalar::Str(err.to_string()));
            }
        }
        sink.leave(name);
    }
}

/// Upper bound on speculative C-string reads.
const MAX_C_STRING: usize = 4096;
