//! Structure synthesis
//!
//! Builds fixed-layout structure types from an ordered list of named fields.
//! Field types must already exist, so a structure can never contain itself.

use super::core::{FieldDescriptor, StructDef, TypeContext, TypeId, TypeKind};
use super::layout::StructLayout;
use std::sync::Arc;

/// Builder for structure types
#[derive(Debug, Clone)]
pub struct StructBuilder {
    name: String,
    fields: Vec<(Arc<str>, TypeId)>,
    synthesized: bool,
}

impl StructBuilder {
    /// Start a host-declared structure
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
            synthesized: false,
        }
    }

    /// Start a structure created by the marshaler itself
    pub fn synthesized(name: impl Into<String>) -> Self {
        Self {
            synthesized: true,
            ..Self::new(name)
        }
    }

    pub fn field(mut self, name: impl Into<Arc<str>>, ty: TypeId) -> Self {
        self.add_field(name, ty);
        self
    }

    pub fn add_field(&mut self, name: impl Into<Arc<str>>, ty: TypeId) {
        self.fields.push((name.into(), ty));
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Lay the fields out and register the structure
    pub fn build(self, types: &mut TypeContext) -> TypeId {
        let field_types: Vec<TypeId> = self.fields.iter().map(|(_, ty)| *ty).collect();
        let layout = StructLayout::compute(types, &field_types);
        let id = types.next_id();

        let fields: Arc<[FieldDescriptor]> = self
            .fields
            .into_iter()
            .zip(layout.offsets)
            .enumerate()
            .map(|(ordinal, ((name, field_type), offset))| FieldDescriptor {
                ordinal: ordinal as u32,
                name,
                field_type,
                containing_type: id,
                offset,
            })
            .collect();

        let allocated = types.alloc_nominal(TypeKind::Struct(StructDef {
            name: self.name,
            fields,
            size: layout.size,
            align: layout.align,
            synthesized: self.synthesized,
        }));
        debug_assert_eq!(allocated, id);
        allocated
    }
}
