//! Per-slot argument binding
//!
//! Direct marshaling binds every mapped parameter to the native argument slot
//! of the same index. Backends whose view layout drops the base pointer also
//! bind one buffer per view, in view-argument order, after the last
//! parameter.

use crate::codegen::{Emitter, MarshalOp};
use crate::diagnostics::MarshalResult;
use crate::marshal::{MappingHandler, Source, ViewMappingHandler, ViewParameter};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingKind {
    /// A mapped value argument
    Argument,
    /// The base pointer of a view
    Buffer,
}

/// One native kernel argument slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ArgumentBinding {
    pub slot: u32,
    pub kind: BindingKind,
    /// Declared parameter the slot belongs to
    pub parameter: usize,
}

/// Binds direct arguments and view buffers to native argument slots
#[derive(Debug, Clone)]
pub struct ArgumentBinder {
    param_count: usize,
    bindings: Vec<ArgumentBinding>,
}

impl ArgumentBinder {
    /// Binder for a kernel with `param_count` declared parameters
    pub fn new(param_count: usize) -> Self {
        Self {
            param_count,
            bindings: Vec::new(),
        }
    }

    pub fn bindings(&self) -> &[ArgumentBinding] {
        &self.bindings
    }

    pub fn into_bindings(self) -> Vec<ArgumentBinding> {
        self.bindings
    }

    /// Slot of the buffer bound for view `view_index`
    pub fn buffer_slot(&self, view_index: usize) -> u32 {
        (self.param_count + view_index) as u32
    }
}

impl MappingHandler for ArgumentBinder {
    fn map_argument<S: Source>(
        &mut self,
        emitter: &mut Emitter,
        source: &S,
        index: usize,
    ) -> MarshalResult<()> {
        let slot = index as u32;
        let address = source.emit_load_address(emitter);
        emitter.emit(MarshalOp::BindArgument(slot, address));
        self.bindings.push(ArgumentBinding {
            slot,
            kind: BindingKind::Argument,
            parameter: index,
        });
        Ok(())
    }
}

impl ViewMappingHandler for ArgumentBinder {
    fn map_view_argument<S: Source>(
        &mut self,
        emitter: &mut Emitter,
        source: &S,
        view: &ViewParameter,
        view_index: usize,
    ) -> MarshalResult<()> {
        let slot = self.buffer_slot(view_index);
        let value = source.emit_load(emitter);
        let base = emitter.view_base(value);
        emitter.emit(MarshalOp::BindBuffer(slot, base));
        tracing::trace!(slot, parameter = view.parameter_index, chain = %view.access_chain, "bound view buffer");
        self.bindings.push(ArgumentBinding {
            slot,
            kind: BindingKind::Buffer,
            parameter: view.parameter_index,
        });
        Ok(())
    }
}
