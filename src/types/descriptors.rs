//! Structure descriptor service
//!
//! The read-only view of the type universe that passes such as view
//! resolution run against.

use super::core::{FieldDescriptor, TypeContext, TypeId, ViewKind};
use super::layout;

/// Reports fields, layout and transferability of types
pub trait StructureDescriptors {
    /// Ordered fields of a structure; empty for every other type
    fn fields(&self, ty: TypeId) -> &[FieldDescriptor];

    /// Element type and shape if `ty` is a view
    fn view_info(&self, ty: TypeId) -> Option<(TypeId, ViewKind)>;

    fn is_blittable(&self, ty: TypeId) -> bool;

    fn size_of(&self, ty: TypeId) -> u32;

    fn align_of(&self, ty: TypeId) -> u32;

    fn type_name(&self, ty: TypeId) -> String;

    fn offset_of(&self, ty: TypeId, ordinal: u32) -> Option<u32> {
        self.fields(ty).get(ordinal as usize).map(|f| f.offset)
    }

    fn field(&self, ty: TypeId, ordinal: u32) -> Option<&FieldDescriptor> {
        self.fields(ty).get(ordinal as usize)
    }
}

impl StructureDescriptors for TypeContext {
    fn fields(&self, ty: TypeId) -> &[FieldDescriptor] {
        match self.struct_def(ty) {
            Some(def) => &def.fields,
            None => &[],
        }
    }

    fn view_info(&self, ty: TypeId) -> Option<(TypeId, ViewKind)> {
        TypeContext::view_info(self, ty)
    }

    fn is_blittable(&self, ty: TypeId) -> bool {
        TypeContext::is_blittable(self, ty)
    }

    fn size_of(&self, ty: TypeId) -> u32 {
        layout::size_of(self, ty)
    }

    fn align_of(&self, ty: TypeId) -> u32 {
        layout::align_of(self, ty)
    }

    fn type_name(&self, ty: TypeId) -> String {
        self.display(ty)
    }
}
