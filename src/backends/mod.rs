//! Concrete backend ABIs
//!
//! - [`ptx`]: views as `{ptr, length[, stride]}`, one packed argument buffer
//! - [`opencl`]: views as `{length[, stride]}`, base pointers bound as
//!   separate buffer arguments
//! - [`binding`]: slot binding for direct marshaling, shared by both

pub mod binding;
pub mod opencl;
pub mod ptx;

pub use binding::{ArgumentBinder, ArgumentBinding, BindingKind};
pub use opencl::ClBackend;
pub use ptx::{PackedArguments, PtxBackend, PtxLaunchHandler};

use crate::codegen::{Emitter, ValueId};
use crate::diagnostics::{MarshalError, MarshalResult};
use crate::marshal::Target;
use crate::types::{TypeContext, TypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Backend selector
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Ptx,
    OpenCL,
}

impl BackendKind {
    pub const ALL: [BackendKind; 2] = [BackendKind::Ptx, BackendKind::OpenCL];

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ptx" | "cuda" => Some(BackendKind::Ptx),
            "opencl" | "cl" => Some(BackendKind::OpenCL),
            _ => None,
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Ptx => write!(f, "ptx"),
            BackendKind::OpenCL => write!(f, "opencl"),
        }
    }
}

/// Store `value` into field `ordinal` of the structure held by `target`
pub(crate) fn store_field<T: Target>(
    emitter: &mut Emitter,
    target: &T,
    ordinal: u32,
    value: ValueId,
) {
    let base = target.emit_load_address(emitter);
    let field = emitter.field_address(base, ordinal);
    emitter.store(field, value);
}

/// Check that a view target has the field count its backend layout promises
pub(crate) fn expect_view_layout(
    types: &TypeContext,
    view_type: TypeId,
    target_type: TypeId,
    expected_fields: usize,
) -> MarshalResult<()> {
    let actual = types.field_list(target_type).len();
    if types.is_struct(target_type) && actual == expected_fields {
        return Ok(());
    }
    let error = MarshalError::StructuralMismatch {
        source_type: types.display(view_type),
        target_type: types.display(target_type),
        source_fields: expected_fields,
        target_fields: actual,
    };
    tracing::error!(%error, "view target does not match backend layout");
    Err(error)
}
