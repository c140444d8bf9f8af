//! Kernel manifests
//!
//! A manifest declares the host types and kernel signatures the marshaler
//! works on:
//!
//! ```toml
//! [[types]]
//! kind = "struct"
//! name = "Point3"
//! fields = [
//!     { name = "x", type = "f32" },
//!     { name = "y", type = "f32" },
//!     { name = "z", type = "f32" },
//! ]
//!
//! [[kernels]]
//! name = "translate"
//! params = [
//!     { name = "n", type = "i32" },
//!     { name = "points", type = "View<Point3>" },
//!     { name = "offset", type = "Point3" },
//! ]
//! ```
//!
//! Types are resolved in declaration order, so a type may only refer to
//! types declared above it.

use crate::signature::KernelSignature;
use crate::types::{
    PrimitiveType, StructBuilder, TypeContext, TypeId, TypeParseError, is_builtin_name, parse_type,
};
use indexmap::IndexMap;
use miette::Diagnostic;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest loading error
#[derive(Error, Debug, Diagnostic)]
pub enum ManifestError {
    #[error("Cannot read manifest `{}`", path.display())]
    #[diagnostic(code(manifest::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest")]
    #[diagnostic(code(manifest::toml))]
    Toml(#[from] toml::de::Error),

    #[error("Invalid type expression in {context}")]
    #[diagnostic(code(manifest::type_expression))]
    TypeExpression {
        context: String,
        #[source]
        #[diagnostic_source]
        source: TypeParseError,
    },

    #[error("Type `{name}` is already defined")]
    #[diagnostic(
        code(manifest::duplicate_type),
        help("type names must be unique and must not shadow built-in types")
    )]
    DuplicateType { name: String },

    #[error("Kernel `{name}` is declared twice")]
    #[diagnostic(code(manifest::duplicate_kernel))]
    DuplicateKernel { name: String },

    #[error("Enum `{name}` has non-integer underlying type `{underlying}`")]
    #[diagnostic(
        code(manifest::enum_underlying),
        help("use one of i8, i16, i32, i64, u8, u16, u32, u64")
    )]
    InvalidEnumUnderlying { name: String, underlying: String },

    #[error("No kernel named `{name}`")]
    #[diagnostic(code(manifest::unknown_kernel))]
    UnknownKernel {
        name: String,
        #[help]
        available: Option<String>,
    },
}

// === Raw TOML shape ===

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    types: Vec<RawType>,
    #[serde(default)]
    kernels: Vec<RawKernel>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum RawType {
    Struct {
        name: String,
        #[serde(default)]
        fields: Vec<RawField>,
    },
    Enum {
        name: String,
        #[serde(default = "default_underlying")]
        underlying: String,
    },
    Class {
        name: String,
    },
    Delegate {
        name: String,
    },
}

impl RawType {
    fn name(&self) -> &str {
        match self {
            RawType::Struct { name, .. }
            | RawType::Enum { name, .. }
            | RawType::Class { name }
            | RawType::Delegate { name } => name,
        }
    }
}

fn default_underlying() -> String {
    "i32".to_string()
}

#[derive(Debug, Deserialize)]
struct RawField {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

#[derive(Debug, Deserialize)]
struct RawKernel {
    name: String,
    #[serde(default)]
    params: Vec<RawParam>,
}

#[derive(Debug, Deserialize)]
struct RawParam {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    by_ref: bool,
}

// === Resolved manifest ===

/// Declared types and kernels, resolved into a type context
#[derive(Debug)]
pub struct Manifest {
    types: TypeContext,
    named_types: IndexMap<String, TypeId>,
    kernels: IndexMap<String, KernelSignature>,
}

impl Manifest {
    /// Parse a manifest from TOML text
    pub fn parse(source: &str) -> Result<Self, ManifestError> {
        let raw: RawManifest = toml::from_str(source)?;
        let mut manifest = Manifest {
            types: TypeContext::new(),
            named_types: IndexMap::new(),
            kernels: IndexMap::new(),
        };

        for raw_type in raw.types {
            manifest.declare_type(raw_type)?;
        }
        for raw_kernel in raw.kernels {
            manifest.declare_kernel(raw_kernel)?;
        }

        tracing::debug!(
            types = manifest.named_types.len(),
            kernels = manifest.kernels.len(),
            "loaded manifest"
        );
        Ok(manifest)
    }

    /// Read and parse a manifest file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    fn declare_type(&mut self, raw: RawType) -> Result<(), ManifestError> {
        let name = raw.name().to_string();
        if self.named_types.contains_key(&name) || is_builtin_name(&name) {
            return Err(ManifestError::DuplicateType { name });
        }

        let ty = match raw {
            RawType::Struct { name, fields } => {
                let mut builder = StructBuilder::new(name.as_str());
                for field in fields {
                    let context = format!("field `{}.{}`", name, field.name);
                    let field_type = self.resolve_type(&field.ty, context)?;
                    builder.add_field(field.name, field_type);
                }
                builder.build(&mut self.types)
            }
            RawType::Enum { name, underlying } => {
                match PrimitiveType::from_name(&underlying).filter(|p| p.is_integer()) {
                    Some(prim) => self.types.enumeration(name.as_str(), prim),
                    None => return Err(ManifestError::InvalidEnumUnderlying { name, underlying }),
                }
            }
            RawType::Class { name } => self.types.class(name),
            RawType::Delegate { name } => self.types.delegate(name),
        };

        self.named_types.insert(name, ty);
        Ok(())
    }

    fn declare_kernel(&mut self, raw: RawKernel) -> Result<(), ManifestError> {
        if self.kernels.contains_key(&raw.name) {
            return Err(ManifestError::DuplicateKernel { name: raw.name });
        }

        let mut signature = KernelSignature::new(raw.name.as_str());
        for param in raw.params {
            let context = format!("parameter `{}` of kernel `{}`", param.name, raw.name);
            let ty = self.resolve_type(&param.ty, context)?;
            signature.push(param.name, ty, param.by_ref);
        }
        self.kernels.insert(raw.name, signature);
        Ok(())
    }

    fn resolve_type(&mut self, input: &str, context: String) -> Result<TypeId, ManifestError> {
        let named_types = &self.named_types;
        parse_type(&mut self.types, input, |name| named_types.get(name).copied())
            .map_err(|source| ManifestError::TypeExpression { context, source })
    }

    pub fn types(&self) -> &TypeContext {
        &self.types
    }

    pub fn types_mut(&mut self) -> &mut TypeContext {
        &mut self.types
    }

    /// Look up a declared type by name
    pub fn named_type(&self, name: &str) -> Option<TypeId> {
        self.named_types.get(name).copied()
    }

    /// Declared types in declaration order
    pub fn named_types(&self) -> impl Iterator<Item = (&str, TypeId)> {
        self.named_types.iter().map(|(name, &ty)| (name.as_str(), ty))
    }

    /// Kernels in declaration order
    pub fn kernels(&self) -> impl Iterator<Item = &KernelSignature> {
        self.kernels.values()
    }

    pub fn kernel(&self, name: &str) -> Result<&KernelSignature, ManifestError> {
        self.kernels.get(name).ok_or_else(|| ManifestError::UnknownKernel {
            name: name.to_string(),
            available: self.available_kernels(),
        })
    }

    /// The kernel called `name`, or the only kernel if `name` is `None`
    pub fn select_kernel(&self, name: Option<&str>) -> Result<&KernelSignature, ManifestError> {
        match name {
            Some(name) => self.kernel(name),
            None if self.kernels.len() == 1 => Ok(&self.kernels[0]),
            None => Err(ManifestError::UnknownKernel {
                name: String::new(),
                available: self.available_kernels(),
            }),
        }
    }

    fn available_kernels(&self) -> Option<String> {
        if self.kernels.is_empty() {
            return None;
        }
        let names: Vec<&str> = self.kernels.keys().map(String::as_str).collect();
        Some(format!("available kernels: {}", names.join(", ")))
    }
}
