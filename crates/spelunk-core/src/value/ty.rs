//! Static type descriptions for debuggee values.
//!
//! A [`TypeDescriptor`] is the inspection-side view of a debuggee type: its
//! category, qualified name, byte size, and (for aggregates) member layout.
//! Descriptors form a graph (pointers, arrays, typedefs and members all
//! reference other descriptors), and real type graphs are cyclic: a struct
//! can point to itself. Targets, members and template arguments therefore
//! live in [`OnceCell`]s so a descriptor can be registered first and completed
//! after its dependencies exist.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

/// Shared handle to a type descriptor.
pub type TypeRef = Arc<TypeDescriptor>;

/// Classification of a debuggee type, driving visitor dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCategory
{
    /// Raw pointer (`T*`)
    Pointer,
    /// Fixed-size array (`T[N]`)
    Array,
    /// Struct or class
    Struct,
    /// Union (no discriminant in raw memory)
    Union,
    /// Enumeration (visited as its underlying integer)
    Enum,
    /// Function value (visited as an opaque code address)
    Function,
    /// Pointer-to-member-function (visited as an opaque address)
    MethodPtr,
    /// C++ reference (`T&`), stored as a pointer word
    Reference,
    /// Type alias; stripped transparently during visits
    Typedef,
    /// Integer of any width and signedness
    Int,
    /// Floating point number
    Float,
    /// Boolean
    Bool,
    /// Character (visited as a one-character string)
    Char,
    /// `void`
    Void,
    /// Anything the classifier does not understand
    Other,
}

/// How a struct/union member participates in the layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind
{
    /// Inherited base class subobject
    BaseClass,
    /// Ordinary data member
    Field,
    /// Static member; occupies no storage in the object
    Static,
}

/// One entry of a struct/union member list.
#[derive(Debug, Clone)]
pub struct Member
{
    /// Member name; `None` for anonymous members
    pub name: Option<String>,
    /// Member type
    pub ty: TypeRef,
    /// Offset from the enclosing object's address, in bits
    pub offset_bits: u64,
    /// Base class, field, or static
    pub kind: MemberKind,
    /// Compiler-injected member (vtable pointers and the like)
    pub artificial: bool,
}

impl Member
{
    /// Ordinary field at a byte offset.
    pub fn field(name: impl Into<String>, ty: TypeRef, offset: u64) -> Self
    {
        Member {
            name: Some(name.into()),
            ty,
            offset_bits: offset * 8,
            kind: MemberKind::Field,
            artificial: false,
        }
    }

    /// Base class subobject at a byte offset.
    pub fn base(ty: TypeRef, offset: u64) -> Self
    {
        Member {
            name: None,
            ty,
            offset_bits: offset * 8,
            kind: MemberKind::BaseClass,
            artificial: false,
        }
    }
}

/// Static description of one debuggee type.
///
/// Descriptors are immutable once complete; `target`, `members` and
/// `template_args` are set at most once, possibly after construction, to
/// allow self-referential type graphs.
#[derive(Debug)]
pub struct TypeDescriptor
{
    category: TypeCategory,
    name: Option<String>,
    size: u64,
    signed: bool,
    const_qualified: bool,
    target: OnceCell<TypeRef>,
    members: OnceCell<Vec<Member>>,
    template_args: OnceCell<Vec<TypeRef>>,
}

impl TypeDescriptor
{
    /// Bare descriptor; callers fill target/members afterwards as needed.
    pub fn new(category: TypeCategory, name: Option<String>, size: u64) -> TypeRef
    {
        Arc::new(TypeDescriptor {
            category,
            name,
            size,
            signed: false,
            const_qualified: false,
            target: OnceCell::new(),
            members: OnceCell::new(),
            template_args: OnceCell::new(),
        })
    }

    /// Signed integer of `size` bytes.
    pub fn int(name: &str, size: u64) -> TypeRef
    {
        Arc::new(TypeDescriptor {
            category: TypeCategory::Int,
            name: Some(name.to_string()),
            size,
            signed: true,
            const_qualified: false,
            target: OnceCell::new(),
            members: OnceCell::new(),
            template_args: OnceCell::new(),
        })
    }

    /// Unsigned integer of `size` bytes.
    pub fn uint(name: &str, size: u64) -> TypeRef
    {
        Arc::new(TypeDescriptor {
            category: TypeCategory::Int,
            name: Some(name.to_string()),
            size,
            signed: false,
            const_qualified: false,
            target: OnceCell::new(),
            members: OnceCell::new(),
            template_args: OnceCell::new(),
        })
    }

    /// IEEE float of `size` bytes (4 or 8).
    pub fn float(name: &str, size: u64) -> TypeRef
    {
        let mut descr = Self::raw(TypeCategory::Float, Some(name.to_string()), size);
        descr.signed = true;
        Arc::new(descr)
    }

    /// One-byte boolean.
    pub fn boolean() -> TypeRef
    {
        TypeDescriptor::new(TypeCategory::Bool, Some("bool".to_string()), 1)
    }

    /// One-byte character.
    pub fn character() -> TypeRef
    {
        let mut descr = Self::raw(TypeCategory::Char, Some("char".to_string()), 1);
        descr.signed = true;
        Arc::new(descr)
    }

    /// `const char` (used by the C-string special case).
    pub fn const_character() -> TypeRef
    {
        let mut descr = Self::raw(TypeCategory::Char, Some("char".to_string()), 1);
        descr.signed = true;
        descr.const_qualified = true;
        Arc::new(descr)
    }

    /// Pointer to `target` (8-byte word).
    pub fn pointer(target: TypeRef) -> TypeRef
    {
        let descr = Self::raw(TypeCategory::Pointer, None, 8);
        descr.target.set(target).ok();
        Arc::new(descr)
    }

    /// Reference to `target`, stored as a pointer word.
    pub fn reference(target: TypeRef) -> TypeRef
    {
        let descr = Self::raw(TypeCategory::Reference, None, 8);
        descr.target.set(target).ok();
        Arc::new(descr)
    }

    /// Alias `name` for `target`.
    pub fn typedef(name: &str, target: TypeRef) -> TypeRef
    {
        let descr = Self::raw(TypeCategory::Typedef, Some(name.to_string()), target.size);
        descr.target.set(target).ok();
        Arc::new(descr)
    }

    /// `element[count]`.
    pub fn array(element: TypeRef, count: u64) -> TypeRef
    {
        let size = element.size * count;
        let descr = Self::raw(TypeCategory::Array, None, size);
        descr.target.set(element).ok();
        Arc::new(descr)
    }

    /// Struct/class with a complete member list.
    pub fn structure(name: &str, size: u64, members: Vec<Member>) -> TypeRef
    {
        let descr = Self::raw(TypeCategory::Struct, Some(name.to_string()), size);
        descr.members.set(members).ok();
        Arc::new(descr)
    }

    /// Union with a complete member list.
    pub fn union(name: &str, size: u64, members: Vec<Member>) -> TypeRef
    {
        let descr = Self::raw(TypeCategory::Union, Some(name.to_string()), size);
        descr.members.set(members).ok();
        Arc::new(descr)
    }

    /// Enumeration over a signed underlying integer.
    pub fn enumeration(name: &str, size: u64) -> TypeRef
    {
        let mut descr = Self::raw(TypeCategory::Enum, Some(name.to_string()), size);
        descr.signed = true;
        Arc::new(descr)
    }

    fn raw(category: TypeCategory, name: Option<String>, size: u64) -> TypeDescriptor
    {
        TypeDescriptor {
            category,
            name,
            size,
            signed: false,
            const_qualified: false,
            target: OnceCell::new(),
            members: OnceCell::new(),
            template_args: OnceCell::new(),
        }
    }

    pub fn category(&self) -> TypeCategory
    {
        self.category
    }

    /// Qualified name as the debug info spells it, if any.
    pub fn name(&self) -> Option<&str>
    {
        self.name.as_deref()
    }

    /// Size of a value of this type, in bytes.
    pub fn byte_size(&self) -> u64
    {
        self.size
    }

    pub fn is_signed(&self) -> bool
    {
        self.signed
    }

    pub fn is_const(&self) -> bool
    {
        self.const_qualified
    }

    /// Pointee/element/aliased type for pointer, reference, array and typedef.
    pub fn target(&self) -> Option<&TypeRef>
    {
        self.target.get()
    }

    /// Member list; empty for non-aggregates and for incomplete types.
    pub fn members(&self) -> &[Member]
    {
        self.members.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Template type arguments in declaration order, when the debug info
    /// records them.
    pub fn template_args(&self) -> &[TypeRef]
    {
        self.template_args.get().map(Vec::as_slice).unwrap_or(&[])
    }

    /// Complete a descriptor created before its target existed.
    /// Returns false if the target was already set.
    pub fn set_target(&self, target: TypeRef) -> bool
    {
        self.target.set(target).is_ok()
    }

    /// Complete a descriptor created before its members existed.
    pub fn set_members(&self, members: Vec<Member>) -> bool
    {
        self.members.set(members).is_ok()
    }

    pub fn set_template_args(&self, args: Vec<TypeRef>) -> bool
    {
        self.template_args.set(args).is_ok()
    }

    /// Mark this descriptor const-qualified (builder step, before sharing).
    pub fn with_const(self: TypeRef) -> TypeRef
    {
        let descr = TypeDescriptor {
            category: self.category,
            name: self.name.clone(),
            size: self.size,
            signed: self.signed,
            const_qualified: true,
            target: self.target.clone(),
            members: self.members.clone(),
            template_args: self.template_args.clone(),
        };
        Arc::new(descr)
    }

    /// Strip typedef aliasing down to the underlying type.
    pub fn resolved(&self) -> &TypeDescriptor
    {
        let mut ty = self;
        // guard against typedef loops in malformed debug info
        for _ in 0..64 {
            if ty.category != TypeCategory::Typedef {
                break;
            }
            match ty.target() {
                Some(target) => ty = target,
                None => break,
            }
        }
        ty
    }

    /// Element count for arrays; 0 when the element size is unknown.
    pub fn element_count(&self) -> u64
    {
        match self.target() {
            Some(elem) if elem.size > 0 => self.size / elem.size,
            _ => 0,
        }
    }

    /// Name used for display, seen-set keys and ABI matching. Synthesized
    /// from the target for unnamed derived types.
    pub fn display_name(&self) -> String
    {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match self.category {
            TypeCategory::Pointer => match self.target() {
                Some(t) => format!("{} *", t.display_name()),
                None => "void *".to_string(),
            },
            TypeCategory::Reference => match self.target() {
                Some(t) => format!("{} &", t.display_name()),
                None => "&".to_string(),
            },
            TypeCategory::Array => match self.target() {
                Some(t) => format!("{} [{}]", t.display_name(), self.element_count()),
                None => "[]".to_string(),
            },
            TypeCategory::Void => "void".to_string(),
            _ => format!("<{:?}:{}>", self.category, self.size),
        }
    }
}

impl fmt::Display for TypeDescriptor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        write!(f, "{}", self.display_name())
    }
}
