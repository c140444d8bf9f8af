//! kernarg: kernel argument marshaling for accelerator backends
//!
//! Given a host kernel signature, kernarg produces:
//! - a binary-compatible native argument layout for a backend
//! - a listing of the instructions copying each host value into it
//! - the decomposition of buffer views into pointer + metadata form
//!
//! # Architecture
//!
//! ```text
//! Manifest → TypeContext + KernelSignature → EntryPoint (views)
//!          → ArgumentMapper<Backend> → Emitter listing → MarshalPlan
//! ```
//!
//! # Example
//!
//! ```
//! use kernarg::backends::{PtxBackend, PtxLaunchHandler};
//! use kernarg::codegen::Emitter;
//! use kernarg::marshal::ArgumentMapper;
//! use kernarg::signature::KernelSignature;
//! use kernarg::types::{PrimitiveType, TypeContext};
//!
//! let mut types = TypeContext::new();
//! let i32_ty = types.primitive(PrimitiveType::I32);
//! let f32_ty = types.primitive(PrimitiveType::F32);
//! let data = types.view(f32_ty);
//! let signature = KernelSignature::new("scale").param("n", i32_ty).param("data", data);
//!
//! let mut mapper = ArgumentMapper::new(&mut types, PtxBackend::new());
//! let mut emitter = Emitter::new();
//! let packed = mapper
//!     .map_arguments_struct(&mut emitter, &mut PtxLaunchHandler::default(), &signature)
//!     .unwrap();
//! assert_eq!(packed.raw_size, 24);
//! ```

pub mod backends;
pub mod codegen;
pub mod config;
pub mod diagnostics;
pub mod manifest;
pub mod marshal;
pub mod plan;
pub mod signature;
pub mod types;

pub use config::MarshalConfig;
pub use diagnostics::{MarshalError, MarshalResult};
pub use manifest::Manifest;
pub use marshal::ArgumentMapper;
pub use plan::{MarshalPlan, plan};
pub use signature::{EntryPoint, KernelSignature, ParameterSpec};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
