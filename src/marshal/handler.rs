//! Callbacks that fold marshaled arguments into a concrete kernel launch

use super::source::{Source, Target};
use super::views::ViewParameter;
use crate::codegen::Emitter;
use crate::diagnostics::MarshalResult;
use crate::types::{TypeContext, TypeId};

/// Receives each argument of direct marshaling
pub trait MappingHandler {
    /// Called once per parameter, in parameter order, with a source holding
    /// the fully mapped value
    fn map_argument<S: Source>(
        &mut self,
        emitter: &mut Emitter,
        source: &S,
        index: usize,
    ) -> MarshalResult<()>;
}

/// Receives the packed argument structure of grouped marshaling
pub trait StructMappingHandler {
    type Output;

    /// Type of the implicit kernel-length field, if the launcher wants one
    fn kernel_length_type(&mut self, types: &mut TypeContext) -> Option<TypeId> {
        let _ = types;
        None
    }

    /// Store the kernel length into `target`
    fn map_kernel_length<T: Target>(
        &mut self,
        emitter: &mut Emitter,
        target: &T,
    ) -> MarshalResult<()> {
        let _ = (emitter, target);
        Ok(())
    }

    /// Consume the packed structure; `raw_size` excludes trailing padding
    fn map_argument_struct<S: Source>(
        &mut self,
        emitter: &mut Emitter,
        source: &S,
        raw_size: u32,
    ) -> MarshalResult<Self::Output>;
}

/// Receives views bound outside the regular argument list
pub trait ViewMappingHandler {
    fn map_view_argument<S: Source>(
        &mut self,
        emitter: &mut Emitter,
        source: &S,
        view: &ViewParameter,
        view_index: usize,
    ) -> MarshalResult<()>;
}
