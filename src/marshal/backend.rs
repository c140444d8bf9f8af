//! Backend hooks for view types

use super::cache::ClearCacheMode;
use super::source::{Source, Target};
use crate::codegen::Emitter;
use crate::diagnostics::MarshalResult;
use crate::types::{TypeContext, TypeId};

/// Backend-specific part of argument mapping
pub trait Backend {
    /// Short backend name used in logs and reports
    fn name(&self) -> &str;

    /// Native representation of a view over `element_type`
    fn map_view_type(
        &mut self,
        types: &mut TypeContext,
        view_type: TypeId,
        element_type: TypeId,
    ) -> MarshalResult<TypeId>;

    /// Decompose the view held by `source` into `target`, whose type is the
    /// result of [`Backend::map_view_type`]
    fn map_view_instance<S: Source, T: Target>(
        &self,
        types: &TypeContext,
        emitter: &mut Emitter,
        element_type: TypeId,
        source: &S,
        target: &T,
    ) -> MarshalResult<()>;

    /// Drop backend-owned cached state
    fn clear_cache(&mut self, mode: ClearCacheMode) {
        let _ = mode;
    }
}
