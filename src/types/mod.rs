//! Type universe for kernel arguments
//!
//! This module holds everything the marshaler knows about types:
//! - Core definitions and the interning arena
//! - Explicit layout (sizes, alignments, field offsets)
//! - Structure synthesis
//! - The structure descriptor service
//! - Textual type expressions

pub mod builder;
pub mod core;
pub mod descriptors;
pub mod layout;
pub mod parse;

pub use self::core::*;
pub use builder::StructBuilder;
pub use descriptors::StructureDescriptors;
pub use layout::{StructLayout, align_of, size_of};
pub use parse::{TypeParseError, is_builtin_name, parse_type};
