//! Kernel argument marshaling
//!
//! The [`ArgumentMapper`] turns a host kernel signature into:
//! - backend-compatible argument types (memoized in a [`TypeMappingCache`])
//! - code copying every argument into that layout
//! - a decomposition of view parameters into native buffer form
//!
//! A mapper borrows its [`TypeContext`] exclusively and is meant to be used
//! by one thread at a time; use one mapper per thread.

pub mod backend;
pub mod cache;
pub mod handler;
pub mod source;
pub mod views;

pub use backend::Backend;
pub use cache::{ClearCacheMode, TypeMappingCache};
pub use handler::{MappingHandler, StructMappingHandler, ViewMappingHandler};
pub use source::{
    ArgumentSource, LocalSource, LocalTarget, Source, StructureSource, StructureTarget, Target,
    ViewSource,
};
pub use views::{FieldAccessChain, ViewParameter, ViewResolver};

use crate::codegen::Emitter;
use crate::diagnostics::{MarshalError, MarshalResult};
use crate::signature::{EntryPoint, KernelSignature, ParameterSpec};
use crate::types::{self, PrimitiveType, StructBuilder, TypeContext, TypeId, TypeKind};
use std::sync::Arc;

/// Name of the implicit kernel-length field of grouped argument structures
pub const KERNEL_LENGTH_FIELD: &str = "kernel_length";

/// How a type is mapped, decided before any mutation happens
enum MappingRule {
    Identity,
    Enum(PrimitiveType),
    View(TypeId),
    Struct,
}

/// A parent place and the field path walked below it so far
struct PlacePath<'p, P> {
    parent: &'p P,
    path: Vec<u32>,
}

impl<'p, P> PlacePath<'p, P> {
    fn new(parent: &'p P) -> Self {
        Self {
            parent,
            path: Vec::new(),
        }
    }
}

impl<P: Source> PlacePath<'_, P> {
    fn as_source(&self, ty: TypeId) -> StructureSource<'_, P> {
        StructureSource::nested(self.parent, &self.path, ty)
    }
}

impl<P: Target> PlacePath<'_, P> {
    fn as_target(&self, ty: TypeId) -> StructureTarget<'_, P> {
        StructureTarget::nested(self.parent, &self.path, ty)
    }
}

/// Maps kernel signatures onto a backend's native argument layout
pub struct ArgumentMapper<'t, B> {
    types: &'t mut TypeContext,
    backend: B,
    cache: TypeMappingCache,
}

impl<'t, B: Backend> ArgumentMapper<'t, B> {
    pub fn new(types: &'t mut TypeContext, backend: B) -> Self {
        Self {
            types,
            backend,
            cache: TypeMappingCache::new(),
        }
    }

    pub fn types(&self) -> &TypeContext {
        self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeContext {
        self.types
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn cache(&self) -> &TypeMappingCache {
        &self.cache
    }

    /// Discard memoized mappings
    ///
    /// Types synthesized before the call stay valid; mapping the same host
    /// type again afterwards may synthesize a new one.
    pub fn clear_cache(&mut self, mode: ClearCacheMode) {
        tracing::debug!(backend = self.backend.name(), ?mode, entries = self.cache.len(), "clearing type mapping cache");
        self.cache.clear();
        if mode == ClearCacheMode::Everything {
            self.backend.clear_cache(mode);
        }
    }

    // === Type mapping ===

    /// Map a host type to the backend-compatible type transferred in its place
    pub fn map_type(&mut self, ty: TypeId) -> MarshalResult<TypeId> {
        if let Some(mapped) = self.cache.get(ty) {
            return Ok(mapped);
        }

        if let Some(kind) = self.types.unsupported_kind(ty) {
            return Err(MarshalError::UnsupportedParameterKind {
                kind,
                ty: self.types.display(ty),
            });
        }

        let rule = match self.types.kind(ty) {
            TypeKind::Primitive(_) | TypeKind::Vector { .. } | TypeKind::NativeAddress => {
                MappingRule::Identity
            }
            TypeKind::Enum { underlying, .. } => MappingRule::Enum(*underlying),
            TypeKind::View { element, .. } => MappingRule::View(*element),
            _ => MappingRule::Struct,
        };

        let mapped = match rule {
            MappingRule::Identity => ty,
            MappingRule::Enum(underlying) => self.types.primitive(underlying),
            MappingRule::View(element) => {
                if let Some(offending) = self.types.find_non_blittable(element) {
                    return Err(MarshalError::NonBlittableType {
                        ty: self.types.display(offending),
                    });
                }
                self.backend.map_view_type(self.types, ty, element)?
            }
            MappingRule::Struct => self.map_struct_type(ty)?,
        };

        tracing::debug!(
            from = %self.types.display(ty),
            to = %self.types.display(mapped),
            "mapped type"
        );
        self.cache.insert(ty, mapped);
        Ok(mapped)
    }

    fn map_struct_type(&mut self, ty: TypeId) -> MarshalResult<TypeId> {
        let fields = self.types.field_list(ty);
        let mut mapped_fields = Vec::with_capacity(fields.len());
        let mut changed = false;
        for field in fields.iter() {
            let mapped = self.map_type(field.field_type)?;
            changed |= mapped != field.field_type;
            mapped_fields.push(mapped);
        }

        if !changed {
            return Ok(ty);
        }

        let mut builder = StructBuilder::synthesized(format!("{}$Mapped", self.types.display(ty)));
        for (field, mapped) in fields.iter().zip(mapped_fields) {
            builder.add_field(Arc::clone(&field.name), mapped);
        }
        Ok(builder.build(self.types))
    }

    // === Instance mapping ===

    /// Emit code copying the value of `source` into `target`
    pub fn map_instance<S: Source, T: Target>(
        &mut self,
        emitter: &mut Emitter,
        source: &S,
        target: &T,
    ) -> MarshalResult<()> {
        let (source_type, target_type) = (source.source_type(), target.target_type());
        self.map_nested(
            emitter,
            &mut PlacePath::new(source),
            &mut PlacePath::new(target),
            source_type,
            target_type,
        )
    }

    /// Recursion over nested fields. Each side keeps its parent place and one
    /// field-path stack; wrappers are only built where code is emitted, which
    /// keeps the instantiated types finite no matter how deep the structures
    /// nest.
    fn map_nested<S: Source, T: Target>(
        &mut self,
        emitter: &mut Emitter,
        source: &mut PlacePath<'_, S>,
        target: &mut PlacePath<'_, T>,
        source_type: TypeId,
        target_type: TypeId,
    ) -> MarshalResult<()> {
        // Types that map to themselves are copied whole
        if source_type == target_type || self.types.is_enum(source_type) {
            target
                .as_target(target_type)
                .emit_store(emitter, &source.as_source(source_type));
            return Ok(());
        }

        if let Some((element_type, _)) = self.types.view_info(source_type) {
            return self.backend.map_view_instance(
                self.types,
                emitter,
                element_type,
                &source.as_source(source_type),
                &target.as_target(target_type),
            );
        }

        let source_fields = self.types.field_list(source_type);
        let target_fields = self.types.field_list(target_type);
        if !self.types.is_struct(source_type)
            || !self.types.is_struct(target_type)
            || source_fields.len() != target_fields.len()
        {
            let error = MarshalError::StructuralMismatch {
                source_type: self.types.display(source_type),
                target_type: self.types.display(target_type),
                source_fields: source_fields.len(),
                target_fields: target_fields.len(),
            };
            tracing::error!(%error, "internal marshaling inconsistency");
            return Err(error);
        }

        for (source_field, target_field) in source_fields.iter().zip(target_fields.iter()) {
            source.path.push(source_field.ordinal);
            target.path.push(target_field.ordinal);
            let result = self.map_nested(
                emitter,
                source,
                target,
                source_field.field_type,
                target_field.field_type,
            );
            source.path.pop();
            target.path.pop();
            result?;
        }
        Ok(())
    }

    // === Parameter marshaling ===

    fn parameter_error(&self, param: &ParameterSpec, error: MarshalError) -> MarshalError {
        MarshalError::in_parameter(param.index, self.types.display(param.declared_type), error)
    }

    /// Validate one parameter and map its type
    fn prepare_parameter(&mut self, param: &ParameterSpec) -> MarshalResult<TypeId> {
        let ty = param.declared_type;
        if param.is_by_ref {
            return Err(MarshalError::UnsupportedParameterKind {
                kind: types::UnsupportedKind::ByRef,
                ty: self.types.display(ty),
            });
        }
        if let Some(kind) = self.types.unsupported_kind(ty) {
            return Err(MarshalError::UnsupportedParameterKind {
                kind,
                ty: self.types.display(ty),
            });
        }
        if let Some(offending) = self.types.find_non_blittable(ty) {
            return Err(MarshalError::NonBlittableType {
                ty: self.types.display(offending),
            });
        }
        self.map_type(ty)
    }

    /// Validate and map every parameter before anything is emitted
    fn prepare_parameters(&mut self, signature: &KernelSignature) -> MarshalResult<Vec<TypeId>> {
        signature
            .parameters()
            .iter()
            .map(|param| {
                self.prepare_parameter(param)
                    .map_err(|error| self.parameter_error(param, error))
            })
            .collect()
    }

    /// Direct marshaling: one local per parameter, each handed to `handler`
    pub fn map_arguments<H: MappingHandler>(
        &mut self,
        emitter: &mut Emitter,
        handler: &mut H,
        signature: &KernelSignature,
    ) -> MarshalResult<()> {
        let mapped_types = self.prepare_parameters(signature)?;
        tracing::debug!(
            kernel = signature.name(),
            backend = self.backend.name(),
            params = signature.len(),
            "direct argument marshaling"
        );

        for (param, &mapped) in signature.parameters().iter().zip(&mapped_types) {
            let local = emitter.declare_local(mapped);
            let target = LocalTarget::new(mapped, local);
            let source = ArgumentSource::new(param.declared_type, param.index);
            self.map_instance(emitter, &source, &target)
                .and_then(|()| handler.map_argument(emitter, &target.as_source(), param.index))
                .map_err(|error| self.parameter_error(param, error))?;
        }
        Ok(())
    }

    /// Grouped marshaling: every parameter becomes a field `param<i>` of one
    /// synthesized structure, preceded by the kernel length if the handler
    /// asks for it
    pub fn map_arguments_struct<H: StructMappingHandler>(
        &mut self,
        emitter: &mut Emitter,
        handler: &mut H,
        signature: &KernelSignature,
    ) -> MarshalResult<H::Output> {
        let mapped_types = self.prepare_parameters(signature)?;
        let kernel_length = handler.kernel_length_type(self.types);

        let mut builder = StructBuilder::synthesized(format!("{}$Arguments", signature.name()));
        if let Some(length_type) = kernel_length {
            builder.add_field(KERNEL_LENGTH_FIELD, length_type);
        }
        for (param, &mapped) in signature.parameters().iter().zip(&mapped_types) {
            builder.add_field(format!("param{}", param.index), mapped);
        }
        let struct_type = builder.build(self.types);
        let fields = self.types.field_list(struct_type);
        debug_assert_eq!(
            fields.len(),
            signature.len() + usize::from(kernel_length.is_some())
        );

        let local = emitter.declare_local(struct_type);
        let target = LocalTarget::new(struct_type, local);

        let mut param_fields = fields.iter();
        if kernel_length.is_some()
            && let Some(length_field) = param_fields.next()
        {
            handler.map_kernel_length(emitter, &StructureTarget::new(&target, length_field))?;
        }

        for (param, field) in signature.parameters().iter().zip(param_fields) {
            let source = ArgumentSource::new(param.declared_type, param.index);
            self.map_instance(emitter, &source, &StructureTarget::new(&target, field))
                .map_err(|error| self.parameter_error(param, error))?;
        }

        let raw_size = raw_transfer_size(self.types, &fields);
        tracing::debug!(
            kernel = signature.name(),
            backend = self.backend.name(),
            raw_size,
            storage_size = types::size_of(self.types, struct_type),
            "grouped argument marshaling"
        );
        handler.map_argument_struct(emitter, &target.as_source(), raw_size)
    }

    /// View-only marshaling for backends that bind buffers out-of-band
    pub fn map_views<H: ViewMappingHandler>(
        &self,
        emitter: &mut Emitter,
        handler: &mut H,
        entry_point: &EntryPoint,
    ) -> MarshalResult<()> {
        let parameters = entry_point.signature().parameters();
        for (view_index, view) in entry_point.view_parameters().iter().enumerate() {
            let param = &parameters[view.parameter_index];
            let argument = ArgumentSource::new(param.declared_type, param.index);
            let source = ViewSource::new(&argument, view);
            handler
                .map_view_argument(emitter, &source, view, view_index)
                .map_err(|error| self.parameter_error(param, error))?;
        }
        Ok(())
    }
}

/// Bytes actually transferred for a packed structure: the end of the last
/// field. Trailing padding is never part of the native argument buffer.
///
/// Relies on fields being laid out in declaration order without overlap.
pub fn raw_transfer_size(types: &TypeContext, fields: &[types::FieldDescriptor]) -> u32 {
    fields
        .last()
        .map(|field| field.offset + crate::types::size_of(types, field.field_type))
        .unwrap_or(0)
}
