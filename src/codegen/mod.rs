//! Code emission for argument marshaling
//!
//! Architecture:
//! ```text
//! KernelSignature -> ArgumentMapper -> Emitter (MarshalOp listing) -> backend launcher
//! ```

pub mod ir;

pub use ir::{Emitter, Instruction, LocalDecl, LocalId, MarshalOp, ValueId};
