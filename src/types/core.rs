//! Core type definitions
//!
//! Every type the marshaler sees lives in a [`TypeContext`] arena and is
//! addressed by a copyable [`TypeId`]. Two handles are the same type exactly
//! when they are equal, which is what the mapping cache relies on.

use id_arena::{Arena, Id};
use rustc_hash::FxHashMap;
use std::fmt;
use std::sync::Arc;

/// Handle to a type registered in a [`TypeContext`]
pub type TypeId = Id<TypeDef>;

/// Primitive scalar types understood by every backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    F16,
    F32,
    F64,
}

impl PrimitiveType {
    pub const ALL: [PrimitiveType; 12] = [
        PrimitiveType::Bool,
        PrimitiveType::I8,
        PrimitiveType::I16,
        PrimitiveType::I32,
        PrimitiveType::I64,
        PrimitiveType::U8,
        PrimitiveType::U16,
        PrimitiveType::U32,
        PrimitiveType::U64,
        PrimitiveType::F16,
        PrimitiveType::F32,
        PrimitiveType::F64,
    ];

    pub fn size_bytes(self) -> u32 {
        match self {
            PrimitiveType::Bool | PrimitiveType::I8 | PrimitiveType::U8 => 1,
            PrimitiveType::I16 | PrimitiveType::U16 | PrimitiveType::F16 => 2,
            PrimitiveType::I32 | PrimitiveType::U32 | PrimitiveType::F32 => 4,
            PrimitiveType::I64 | PrimitiveType::U64 | PrimitiveType::F64 => 8,
        }
    }

    /// Check if this is an integer type (the only valid enum representations)
    pub fn is_integer(self) -> bool {
        !matches!(
            self,
            PrimitiveType::Bool | PrimitiveType::F16 | PrimitiveType::F32 | PrimitiveType::F64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            PrimitiveType::F16 | PrimitiveType::F32 | PrimitiveType::F64
        )
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }

    pub fn name(self) -> &'static str {
        match self {
            PrimitiveType::Bool => "bool",
            PrimitiveType::I8 => "i8",
            PrimitiveType::I16 => "i16",
            PrimitiveType::I32 => "i32",
            PrimitiveType::I64 => "i64",
            PrimitiveType::U8 => "u8",
            PrimitiveType::U16 => "u16",
            PrimitiveType::U32 => "u32",
            PrimitiveType::U64 => "u64",
            PrimitiveType::F16 => "f16",
            PrimitiveType::F32 => "f32",
            PrimitiveType::F64 => "f64",
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Shape of a view: pointer + length, optionally with an element stride
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Linear,
    Strided,
}

/// A single field of a structure type
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldDescriptor {
    /// Position of the field in declaration order
    pub ordinal: u32,
    pub name: Arc<str>,
    pub field_type: TypeId,
    /// The structure this field belongs to
    pub containing_type: TypeId,
    /// Byte offset from the start of the containing structure
    pub offset: u32,
}

/// Body of a structure type, including its computed layout
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StructDef {
    pub name: String,
    pub fields: Arc<[FieldDescriptor]>,
    pub size: u32,
    pub align: u32,
    /// Created by the marshaler rather than declared by the host
    pub synthesized: bool,
}

/// Type representation
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Primitive(PrimitiveType),
    /// Backend-native vector: vec2/vec3/vec4 of a primitive
    Vector { element: PrimitiveType, lanes: u8 },
    /// Opaque device address sanctioned by every backend
    NativeAddress,
    /// Raw pointer: *T
    Pointer(TypeId),
    /// By-reference parameter type: &T
    ByRef(TypeId),
    /// Managed array: T[]
    Array(TypeId),
    /// Pointer + length (+ stride) buffer abstraction
    View { element: TypeId, kind: ViewKind },
    /// Managed reference (class) type
    Class { name: String },
    /// Callable reference type
    Delegate { name: String },
    Enum {
        name: String,
        underlying: PrimitiveType,
    },
    Struct(StructDef),
}

impl TypeKind {
    /// Structural kinds are interned; nominal kinds always get a fresh handle.
    fn is_structural(&self) -> bool {
        !matches!(
            self,
            TypeKind::Class { .. }
                | TypeKind::Delegate { .. }
                | TypeKind::Enum { .. }
                | TypeKind::Struct(_)
        )
    }
}

/// An entry in the type arena
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeDef {
    pub kind: TypeKind,
}

/// Owner of every type definition the marshaler works with
#[derive(Debug)]
pub struct TypeContext {
    arena: Arena<TypeDef>,
    interned: FxHashMap<TypeKind, TypeId>,
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            arena: Arena::new(),
            interned: FxHashMap::default(),
        };
        ctx.intern(TypeKind::Void);
        for prim in PrimitiveType::ALL {
            ctx.intern(TypeKind::Primitive(prim));
        }
        ctx.intern(TypeKind::NativeAddress);
        ctx
    }

    fn intern(&mut self, kind: TypeKind) -> TypeId {
        debug_assert!(kind.is_structural());
        if let Some(&id) = self.interned.get(&kind) {
            return id;
        }
        let id = self.arena.alloc(TypeDef { kind: kind.clone() });
        self.interned.insert(kind, id);
        id
    }

    /// Handle the next allocation will receive
    pub(crate) fn next_id(&self) -> TypeId {
        self.arena.next_id()
    }

    pub(crate) fn alloc_nominal(&mut self, kind: TypeKind) -> TypeId {
        debug_assert!(!kind.is_structural());
        self.arena.alloc(TypeDef { kind })
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.len() == 0
    }

    pub fn kind(&self, ty: TypeId) -> &TypeKind {
        &self.arena[ty].kind
    }

    // === Constructors ===

    pub fn void(&mut self) -> TypeId {
        self.intern(TypeKind::Void)
    }

    pub fn primitive(&mut self, prim: PrimitiveType) -> TypeId {
        self.intern(TypeKind::Primitive(prim))
    }

    pub fn native_address(&mut self) -> TypeId {
        self.intern(TypeKind::NativeAddress)
    }

    pub fn vector(&mut self, element: PrimitiveType, lanes: u8) -> TypeId {
        self.intern(TypeKind::Vector { element, lanes })
    }

    pub fn pointer(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeKind::Pointer(pointee))
    }

    pub fn by_ref(&mut self, inner: TypeId) -> TypeId {
        self.intern(TypeKind::ByRef(inner))
    }

    pub fn array(&mut self, element: TypeId) -> TypeId {
        self.intern(TypeKind::Array(element))
    }

    pub fn view(&mut self, element: TypeId) -> TypeId {
        self.intern(TypeKind::View {
            element,
            kind: ViewKind::Linear,
        })
    }

    pub fn strided_view(&mut self, element: TypeId) -> TypeId {
        self.intern(TypeKind::View {
            element,
            kind: ViewKind::Strided,
        })
    }

    pub fn class(&mut self, name: impl Into<String>) -> TypeId {
        self.alloc_nominal(TypeKind::Class { name: name.into() })
    }

    pub fn delegate(&mut self, name: impl Into<String>) -> TypeId {
        self.alloc_nominal(TypeKind::Delegate { name: name.into() })
    }

    pub fn enumeration(&mut self, name: impl Into<String>, underlying: PrimitiveType) -> TypeId {
        self.alloc_nominal(TypeKind::Enum {
            name: name.into(),
            underlying,
        })
    }

    // === Queries ===

    pub fn is_struct(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Struct(_))
    }

    pub fn is_enum(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::Enum { .. })
    }

    pub fn is_view(&self, ty: TypeId) -> bool {
        matches!(self.kind(ty), TypeKind::View { .. })
    }

    /// Element type and shape of a view type
    pub fn view_info(&self, ty: TypeId) -> Option<(TypeId, ViewKind)> {
        match self.kind(ty) {
            TypeKind::View { element, kind } => Some((*element, *kind)),
            _ => None,
        }
    }

    pub fn struct_def(&self, ty: TypeId) -> Option<&StructDef> {
        match self.kind(ty) {
            TypeKind::Struct(def) => Some(def),
            _ => None,
        }
    }

    /// Shared handle to the fields of a structure (empty for everything else)
    pub fn field_list(&self, ty: TypeId) -> Arc<[FieldDescriptor]> {
        match self.kind(ty) {
            TypeKind::Struct(def) => Arc::clone(&def.fields),
            _ => Arc::from(Vec::new()),
        }
    }

    /// Human-readable type name used in diagnostics
    pub fn display(&self, ty: TypeId) -> String {
        match self.kind(ty) {
            TypeKind::Void => "void".to_string(),
            TypeKind::Primitive(p) => p.name().to_string(),
            TypeKind::Vector { element, lanes } => format!("vec{}<{}>", lanes, element),
            TypeKind::NativeAddress => "native_address".to_string(),
            TypeKind::Pointer(inner) => format!("*{}", self.display(*inner)),
            TypeKind::ByRef(inner) => format!("&{}", self.display(*inner)),
            TypeKind::Array(inner) => format!("{}[]", self.display(*inner)),
            TypeKind::View { element, kind } => match kind {
                ViewKind::Linear => format!("View<{}>", self.display(*element)),
                ViewKind::Strided => format!("StridedView<{}>", self.display(*element)),
            },
            TypeKind::Class { name } | TypeKind::Delegate { name } | TypeKind::Enum { name, .. } => {
                name.clone()
            }
            TypeKind::Struct(def) => def.name.clone(),
        }
    }

    /// The kind of parameter this type can never be passed as, if any
    pub fn unsupported_kind(&self, ty: TypeId) -> Option<UnsupportedKind> {
        match self.kind(ty) {
            TypeKind::ByRef(_) => Some(UnsupportedKind::ByRef),
            TypeKind::Class { .. } => Some(UnsupportedKind::Reference),
            TypeKind::Array(_) => Some(UnsupportedKind::Array),
            TypeKind::Void => Some(UnsupportedKind::Void),
            TypeKind::Pointer(_) => Some(UnsupportedKind::Pointer),
            TypeKind::Delegate { .. } => Some(UnsupportedKind::Delegate),
            _ => None,
        }
    }

    /// Check whether a value of this type has a fixed, reference-free layout
    pub fn is_blittable(&self, ty: TypeId) -> bool {
        self.find_non_blittable(ty).is_none()
    }

    /// Innermost type that makes `ty` non-blittable
    pub fn find_non_blittable(&self, ty: TypeId) -> Option<TypeId> {
        match self.kind(ty) {
            TypeKind::Primitive(_)
            | TypeKind::Vector { .. }
            | TypeKind::NativeAddress
            | TypeKind::Pointer(_)
            | TypeKind::Enum { .. } => None,
            // A view transfers device pointers to its elements
            TypeKind::View { element, .. } => self.find_non_blittable(*element),
            TypeKind::Void
            | TypeKind::ByRef(_)
            | TypeKind::Array(_)
            | TypeKind::Class { .. }
            | TypeKind::Delegate { .. } => Some(ty),
            TypeKind::Struct(def) => def
                .fields
                .iter()
                .find_map(|field| self.find_non_blittable(field.field_type)),
        }
    }
}

/// Parameter kinds that can never be transferred to a kernel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsupportedKind {
    ByRef,
    Reference,
    Array,
    Void,
    Pointer,
    Delegate,
}

impl fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            UnsupportedKind::ByRef => "by-reference parameter",
            UnsupportedKind::Reference => "reference type",
            UnsupportedKind::Array => "array type",
            UnsupportedKind::Void => "void type",
            UnsupportedKind::Pointer => "raw pointer",
            UnsupportedKind::Delegate => "delegate type",
        };
        f.write_str(text)
    }
}
