//! Explicit data layout
//!
//! Sizes and offsets follow natural alignment: every field starts at the next
//! multiple of its own alignment and a structure's size is rounded up to its
//! largest field alignment. Nothing here consults the host compiler's layout.

use super::core::{TypeContext, TypeId, TypeKind, ViewKind};

/// Size of device addresses and host references, in bytes
pub const POINTER_SIZE: u32 = 8;

/// Round `value` up to a multiple of `align` (a power of two)
pub fn align_up(value: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());
    (value + align - 1) & !(align - 1)
}

/// Field placement computed for an ordered list of field types
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructLayout {
    pub offsets: Vec<u32>,
    pub size: u32,
    pub align: u32,
}

impl StructLayout {
    /// Lay out `fields` in declaration order
    pub fn compute(types: &TypeContext, fields: &[TypeId]) -> Self {
        let mut offsets = Vec::with_capacity(fields.len());
        let mut cursor = 0;
        let mut align = 1;
        for &field in fields {
            let field_align = align_of(types, field);
            cursor = align_up(cursor, field_align);
            offsets.push(cursor);
            cursor += size_of(types, field);
            align = align.max(field_align);
        }
        Self {
            offsets,
            size: align_up(cursor, align),
            align,
        }
    }
}

/// Host storage size of a type, including trailing padding
pub fn size_of(types: &TypeContext, ty: TypeId) -> u32 {
    match types.kind(ty) {
        TypeKind::Void => 0,
        TypeKind::Primitive(p) => p.size_bytes(),
        TypeKind::Vector { element, lanes } => element.size_bytes() * *lanes as u32,
        TypeKind::Enum { underlying, .. } => underlying.size_bytes(),
        TypeKind::NativeAddress
        | TypeKind::Pointer(_)
        | TypeKind::ByRef(_)
        | TypeKind::Array(_)
        | TypeKind::Class { .. }
        | TypeKind::Delegate { .. } => POINTER_SIZE,
        // Host views carry a base pointer and a 64-bit length (and stride)
        TypeKind::View { kind, .. } => match kind {
            ViewKind::Linear => POINTER_SIZE + 8,
            ViewKind::Strided => POINTER_SIZE + 16,
        },
        TypeKind::Struct(def) => def.size,
    }
}

pub fn align_of(types: &TypeContext, ty: TypeId) -> u32 {
    match types.kind(ty) {
        TypeKind::Void => 1,
        TypeKind::Primitive(p) => p.size_bytes(),
        // vec3 keeps the element alignment, like float3 in CUDA
        TypeKind::Vector { element, lanes } if *lanes == 3 => element.size_bytes(),
        TypeKind::Vector { element, lanes } => element.size_bytes() * *lanes as u32,
        TypeKind::Enum { underlying, .. } => underlying.size_bytes(),
        TypeKind::NativeAddress
        | TypeKind::Pointer(_)
        | TypeKind::ByRef(_)
        | TypeKind::Array(_)
        | TypeKind::Class { .. }
        | TypeKind::Delegate { .. }
        | TypeKind::View { .. } => POINTER_SIZE,
        TypeKind::Struct(def) => def.align,
    }
}
