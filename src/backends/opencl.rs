//! OpenCL-style argument ABI
//!
//! Every parameter is bound as its own kernel argument. Buffers cannot live
//! inside value arguments, so a view keeps only its length (and stride) in
//! place while its base pointer is bound as an extra buffer argument through
//! [`ArgumentBinder`](super::ArgumentBinder).

use super::{expect_view_layout, store_field};
use crate::codegen::Emitter;
use crate::diagnostics::MarshalResult;
use crate::marshal::{Backend, ClearCacheMode, Source, Target};
use crate::types::{PrimitiveType, StructBuilder, TypeContext, TypeId, ViewKind};
use rustc_hash::FxHashMap;

/// OpenCL backend hooks
#[derive(Debug, Default)]
pub struct ClBackend {
    view_types: FxHashMap<TypeId, TypeId>,
}

impl ClBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cached_view_types(&self) -> usize {
        self.view_types.len()
    }
}

impl Backend for ClBackend {
    fn name(&self) -> &str {
        "opencl"
    }

    fn map_view_type(
        &mut self,
        types: &mut TypeContext,
        view_type: TypeId,
        element_type: TypeId,
    ) -> MarshalResult<TypeId> {
        if let Some(&mapped) = self.view_types.get(&view_type) {
            return Ok(mapped);
        }

        let strided = matches!(types.view_info(view_type), Some((_, ViewKind::Strided)));
        let i64_ty = types.primitive(PrimitiveType::I64);
        let mut builder = StructBuilder::synthesized(format!("{}$Cl", types.display(view_type)))
            .field("length", i64_ty);
        if strided {
            builder.add_field("stride", i64_ty);
        }
        let mapped = builder.build(types);

        tracing::debug!(
            view = %types.display(view_type),
            element = %types.display(element_type),
            strided,
            "synthesized opencl view layout"
        );
        self.view_types.insert(view_type, mapped);
        Ok(mapped)
    }

    fn map_view_instance<S: Source, T: Target>(
        &self,
        types: &TypeContext,
        emitter: &mut Emitter,
        _element_type: TypeId,
        source: &S,
        target: &T,
    ) -> MarshalResult<()> {
        let view_type = source.source_type();
        let strided = matches!(types.view_info(view_type), Some((_, ViewKind::Strided)));
        expect_view_layout(types, view_type, target.target_type(), 1 + usize::from(strided))?;

        let view = source.emit_load(emitter);
        let length = emitter.view_length(view);
        store_field(emitter, target, 0, length);
        if strided {
            let stride = emitter.view_stride(view);
            store_field(emitter, target, 1, stride);
        }
        Ok(())
    }

    fn clear_cache(&mut self, mode: ClearCacheMode) {
        if mode == ClearCacheMode::Everything {
            self.view_types.clear();
        }
    }
}
