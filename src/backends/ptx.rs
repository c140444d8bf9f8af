//! PTX-style argument ABI
//!
//! Kernels receive a single packed parameter buffer. The first field is the
//! launch length, followed by every argument in declaration order. Views are
//! flattened to a device pointer plus a 64-bit element count (and stride).

use super::{expect_view_layout, store_field};
use crate::codegen::{Emitter, MarshalOp};
use crate::diagnostics::MarshalResult;
use crate::marshal::{Backend, ClearCacheMode, Source, StructMappingHandler, Target};
use crate::types::{PrimitiveType, StructBuilder, TypeContext, TypeId, ViewKind};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// PTX backend hooks
#[derive(Debug, Default)]
pub struct PtxBackend {
    /// Native layout per host view type
    view_types: FxHashMap<TypeId, TypeId>,
}

impl PtxBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of view layouts synthesized and still cached
    pub fn cached_view_types(&self) -> usize {
        self.view_types.len()
    }
}

impl Backend for PtxBackend {
    fn name(&self) -> &str {
        "ptx"
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
        let address = types.native_address();
        let i64_ty = types.primitive(PrimitiveType::I64);
        let mut builder = StructBuilder::synthesized(format!("{}$Ptx", types.display(view_type)))
            .field("ptr", address)
            .field("length", i64_ty);
        if strided {
            builder.add_field("stride", i64_ty);
        }
        let mapped = builder.build(types);

        tracing::debug!(
            view = %types.display(view_type),
            element = %types.display(element_type),
            strided,
            "synthesized ptx view layout"
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
        expect_view_layout(types, view_type, target.target_type(), 2 + usize::from(strided))?;

        let view = source.emit_load(emitter);
        let base = emitter.view_base(view);
        store_field(emitter, target, 0, base);
        let length = emitter.view_length(view);
        store_field(emitter, target, 1, length);
        if strided {
            let stride = emitter.view_stride(view);
            store_field(emitter, target, 2, stride);
        }
        Ok(())
    }

    fn clear_cache(&mut self, mode: ClearCacheMode) {
        if mode == ClearCacheMode::Everything {
            self.view_types.clear();
        }
    }
}

/// Packed argument buffer handed to the launcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PackedArguments {
    #[serde(skip)]
    pub struct_type: TypeId,
    /// Bytes transferred, without trailing padding
    pub raw_size: u32,
}

/// Grouped-marshaling handler for PTX launches
#[derive(Debug, Clone, Copy)]
pub struct PtxLaunchHandler {
    kernel_length: Option<PrimitiveType>,
}

impl PtxLaunchHandler {
    pub fn new(kernel_length: PrimitiveType) -> Self {
        Self {
            kernel_length: Some(kernel_length),
        }
    }

    /// Launcher that passes no implicit kernel length
    pub fn without_kernel_length() -> Self {
        Self { kernel_length: None }
    }
}

impl Default for PtxLaunchHandler {
    fn default() -> Self {
        Self::new(PrimitiveType::I32)
    }
}

impl StructMappingHandler for PtxLaunchHandler {
    type Output = PackedArguments;

    fn kernel_length_type(&mut self, types: &mut TypeContext) -> Option<TypeId> {
        self.kernel_length.map(|prim| types.primitive(prim))
    }

    fn map_kernel_length<T: Target>(
        &mut self,
        emitter: &mut Emitter,
        target: &T,
    ) -> MarshalResult<()> {
        let address = target.emit_load_address(emitter);
        let length = emitter.kernel_length();
        emitter.store(address, length);
        Ok(())
    }

    fn map_argument_struct<S: Source>(
        &mut self,
        emitter: &mut Emitter,
        source: &S,
        raw_size: u32,
    ) -> MarshalResult<PackedArguments> {
        let address = source.emit_load_address(emitter);
        emitter.emit(MarshalOp::SubmitBuffer(address, raw_size));
        Ok(PackedArguments {
            struct_type: source.source_type(),
            raw_size,
        })
    }
}
