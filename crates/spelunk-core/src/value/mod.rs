//! # Value Model
//!
//! The memory value abstraction: a [`Value`] couples an address in the
//! debuggee with a [`TypeDescriptor`] and a [`MemorySource`], and exposes the
//! navigation the visitor needs (member access, indexing, dereferencing,
//! casting, and scalar reads). A `Value` never owns debuggee memory; it is a
//! typed view that reads on demand.

pub mod memory;
pub mod ty;

use std::fmt;
use std::sync::Arc;

pub use memory::MemorySource;
pub use ty::{Member, MemberKind, TypeCategory, TypeDescriptor, TypeRef};

use crate::error::{Result, SpelunkError};

/// A leaf value produced at the end of a visit.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar
{
    /// Signed integer (includes enums, visited as their underlying value)
    Int(i64),
    /// Unsigned integer (includes opaque pointers and code addresses)
    UInt(u64),
    /// Float of any width
    Float(f64),
    Bool(bool),
    /// Single character
    Char(char),
    /// Decoded C or `std::string` contents
    Str(String),
}

impl fmt::Display for Scalar
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::UInt(v) => write!(f, "{v}"),
            Scalar::Float(v) => write!(f, "{v}"),
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Char(v) => write!(f, "{v:?}"),
            Scalar::Str(v) => write!(f, "{v:?}"),
        }
    }
}

/// Typed view over a location in debuggee memory.
///
/// `address` is `None` only for computed temporaries that have no stable
/// identity; such values cannot be read and never participate in cycle
/// detection.
#[derive(Clone)]
pub struct Value<'m>
{
    mem: &'m dyn MemorySource,
    address: Option<u64>,
    ty: TypeRef,
}

impl fmt::Debug for Value<'_>
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self.address {
            Some(addr) => write!(f, "Value({} @ 0x{addr:016x})", self.ty.display_name()),
            None => write!(f, "Value({} @ <none>)", self.ty.display_name()),
        }
    }
}

impl<'m> Value<'m>
{
    /// View of `ty` at `address`.
    pub fn new(mem: &'m dyn MemorySource, address: u64, ty: TypeRef) -> Self
    {
        Value {
            mem,
            address: Some(address),
            ty,
        }
    }

    pub fn address(&self) -> Option<u64>
    {
        self.address
    }

    pub fn ty(&self) -> &TypeRef
    {
        &self.ty
    }

    pub fn byte_size(&self) -> u64
    {
        self.ty.byte_size()
    }

    pub fn memory(&self) -> &'m dyn MemorySource
    {
        self.mem
    }

    /// Reinterpret the same storage as another type.
    pub fn cast(&self, ty: TypeRef) -> Value<'m>
    {
        Value {
            mem: self.mem,
            address: self.address,
            ty,
        }
    }

    fn require_address(&self) -> Result<u64>
    {
        self.address.ok_or(SpelunkError::NoAddress)
    }

    /// Raw bytes of this value's storage.
    pub fn read_bytes(&self) -> Result<Vec<u8>>
    {
        let addr = self.require_address()?;
        let mut buf = vec![0u8; self.ty.byte_size() as usize];
        self.mem.read(addr, &mut buf)?;
        Ok(buf)
    }

    /// Data member or base-class subobject described by `member`.
    pub fn field(&self, member: &Member) -> Result<Value<'m>>
    {
        if member.kind == MemberKind::Static {
            return Err(SpelunkError::NoAddress);
        }
        let addr = self.require_address()?;
        Ok(Value {
            mem: self.mem,
            address: Some(addr + member.offset_bits / 8),
            ty: Arc::clone(&member.ty),
        })
    }

    /// Look up a data member by name, searching anonymous aggregates and
    /// base classes the way the debuggee language would.
    pub fn member(&self, name: &'static str) -> Result<Value<'m>>
    {
        let ty = self.ty.resolved();
        match find_member(ty, name) {
            Some((offset_bits, member_ty)) => {
                let addr = self.require_address()?;
                Ok(Value {
                    mem: self.mem,
                    address: Some(addr + offset_bits / 8),
                    ty: member_ty,
                })
            }
            None => Err(SpelunkError::MissingMember {
                type_name: ty.display_name(),
                member: name,
            }),
        }
    }

    /// Element `i` of an array, or of the pointed-to storage for pointers.
    pub fn index(&self, i: u64) -> Result<Value<'m>>
    {
        let ty = self.ty.resolved();
        let elem = ty
            .target()
            .cloned()
            .ok_or_else(|| SpelunkError::UnhandledType(ty.category()))?;
        let base = match ty.category() {
            TypeCategory::Array => self.require_address()?,
            TypeCategory::Pointer => self.read_pointer()?,
            other => return Err(SpelunkError::UnhandledType(other)),
        };
        Ok(Value {
            mem: self.mem,
            address: Some(base + i * elem.byte_size()),
            ty: elem,
        })
    }

    /// The stored pointer word of a pointer/reference value.
    pub fn read_pointer(&self) -> Result<u64>
    {
        let addr = self.require_address()?;
        self.mem.read_word(addr)
    }

    /// Follow a pointer or reference. Fails with [`SpelunkError::Inaccessible`]
    /// for null pointers and for pointees outside readable memory, the
    /// expected outcome for dangling pointers rather than a crash.
    pub fn deref(&self) -> Result<Value<'m>>
    {
        let ty = self.ty.resolved();
        match ty.category() {
            TypeCategory::Pointer | TypeCategory::Reference => {}
            other => return Err(SpelunkError::UnhandledType(other)),
        }
        let target = ty
            .target()
            .cloned()
            .ok_or_else(|| SpelunkError::UnhandledType(ty.category()))?;
        let pointee = self.read_pointer()?;
        if pointee == 0 || !self.mem.is_readable(pointee) {
            return Err(SpelunkError::Inaccessible { address: pointee });
        }
        Ok(Value {
            mem: self.mem,
            address: Some(pointee),
            ty: target,
        })
    }

    pub fn as_u64(&self) -> Result<u64>
    {
        let addr = self.require_address()?;
        read_unsigned(self.mem, addr, self.ty.resolved().byte_size())
    }

    pub fn as_i64(&self) -> Result<i64>
    {
        let addr = self.require_address()?;
        read_signed(self.mem, addr, self.ty.resolved().byte_size())
    }

    pub fn as_f64(&self) -> Result<f64>
    {
        let addr = self.require_address()?;
        let ty = self.ty.resolved();
        match ty.byte_size() {
            4 => Ok(f32::from_bits(self.mem.read_u32(addr)?) as f64),
            8 => Ok(f64::from_bits(self.mem.read_u64(addr)?)),
            _ => Err(SpelunkError::UnhandledType(TypeCategory::Float)),
        }
    }

    pub fn as_bool(&self) -> Result<bool>
    {
        let addr = self.require_address()?;
        Ok(self.mem.read_u8(addr)? != 0)
    }

    /// Interpret this value as a leaf, per its category.
    pub fn scalar(&self) -> Result<Scalar>
    {
        let ty = self.ty.resolved();
        match ty.category() {
            TypeCategory::Int if ty.is_signed() => Ok(Scalar::Int(self.as_i64()?)),
            TypeCategory::Int => Ok(Scalar::UInt(self.as_u64()?)),
            TypeCategory::Enum => Ok(Scalar::Int(self.as_i64()?)),
            TypeCategory::Float => Ok(Scalar::Float(self.as_f64()?)),
            TypeCategory::Bool => Ok(Scalar::Bool(self.as_bool()?)),
            TypeCategory::Char => {
                let addr = self.require_address()?;
                Ok(Scalar::Char(self.mem.read_u8(addr)? as char))
            }
            TypeCategory::Pointer | TypeCategory::Function | TypeCategory::MethodPtr => {
                Ok(Scalar::UInt(self.read_pointer()?))
            }
            other => Err(SpelunkError::UnhandledType(other)),
        }
    }
}

/// Recursive member search: direct fields first, then anonymous aggregate
/// members, then base classes. Returns (bit offset from `ty`, member type).
fn find_member(ty: &TypeDescriptor, name: &str) -> Option<(u64, TypeRef)>
{
    for member in ty.members() {
        if member.kind != MemberKind::Field {
            continue;
        }
        if member.name.as_deref() == Some(name) {
            return Some((member.offset_bits, Arc::clone(&member.ty)));
        }
    }
    // anonymous unions/structs contribute their members to the parent scope
    for member in ty.members() {
        if member.kind != MemberKind::Field || member.name.is_some() {
            continue;
        }
        let inner = member.ty.resolved();
        if matches!(inner.category(), TypeCategory::Struct | TypeCategory::Union) {
            if let Some((bits, found)) = find_member(inner, name) {
                return Some((member.offset_bits + bits, found));
            }
        }
    }
    for member in ty.members() {
        if member.kind != MemberKind::BaseClass {
            continue;
        }
        let base = member.ty.resolved();
        if let Some((bits, found)) = find_member(base, name) {
            return Some((member.offset_bits + bits, found));
        }
    }
    None
}

fn read_unsigned(mem: &dyn MemorySource, addr: u64, size: u64) -> Result<u64>
{
    match size {
        1 => Ok(mem.read_u8(addr)? as u64),
        2 => Ok(mem.read_u16(addr)? as u64),
        4 => Ok(mem.read_u32(addr)? as u64),
        8 => mem.read_u64(addr),
        _ => Err(SpelunkError::UnhandledType(TypeCategory::Int)),
    }
}

fn read_signed(mem: &dyn MemorySource, addr: u64, size: u64) -> Result<i64>
{
    match size {
        1 => Ok(mem.read_u8(addr)? as i8 as i64),
        2 => Ok(mem.read_u16(addr)? as i16 as i64),
        4 => Ok(mem.read_u32(addr)? as i32 as i64),
        8 => Ok(mem.read_u64(addr)? as i64),
        _ => Err(SpelunkError::UnhandledType(TypeCategory::Int)),
    }
}
