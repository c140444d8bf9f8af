//! Marshaling diagnostics
//!
//! Errors carry enough context for a caller to learn which parameter failed
//! and why; they render through miette like every other error in the crate.

use crate::types::UnsupportedKind;
use miette::Diagnostic;
use thiserror::Error;

/// Result type used throughout the marshaler
pub type MarshalResult<T> = Result<T, MarshalError>;

/// Marshaling error
#[derive(Error, Debug, Diagnostic, Clone, PartialEq)]
pub enum MarshalError {
    #[error("Unsupported kernel parameter: {kind} `{ty}`")]
    #[diagnostic(
        code(marshal::unsupported_parameter),
        help("kernel parameters must be passed by value and contain no references, arrays or pointers")
    )]
    UnsupportedParameterKind { kind: UnsupportedKind, ty: String },

    #[error("Type `{ty}` is not blittable")]
    #[diagnostic(
        code(marshal::non_blittable),
        help("only primitives, enums, views and structures of those can be transferred")
    )]
    NonBlittableType { ty: String },

    #[error(
        "Structural mismatch mapping `{source_type}` to `{target_type}`: {source_fields} source fields, {target_fields} target fields"
    )]
    #[diagnostic(
        code(marshal::structural_mismatch),
        help("this is an internal error in a backend view or type hook")
    )]
    StructuralMismatch {
        source_type: String,
        target_type: String,
        source_fields: usize,
        target_fields: usize,
    },

    #[error("Cannot marshal parameter {index} of type `{declared_type}`")]
    #[diagnostic(code(marshal::parameter))]
    Parameter {
        index: usize,
        declared_type: String,
        #[source]
        source: Box<MarshalError>,
    },
}

impl MarshalError {
    /// Attach parameter context to an error raised while marshaling it
    pub fn in_parameter(index: usize, declared_type: impl Into<String>, error: MarshalError) -> Self {
        MarshalError::Parameter {
            index,
            declared_type: declared_type.into(),
            source: Box::new(error),
        }
    }

    /// The innermost error, skipping parameter context
    pub fn root_cause(&self) -> &MarshalError {
        match self {
            MarshalError::Parameter { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// Index of the failing parameter, if known
    pub fn parameter_index(&self) -> Option<usize> {
        match self {
            MarshalError::Parameter { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Check whether this is an internal consistency failure rather than a
    /// problem with the kernel signature
    pub fn is_internal(&self) -> bool {
        matches!(self.root_cause(), MarshalError::StructuralMismatch { .. })
    }
}
