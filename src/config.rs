//! Marshaling configuration
//!
//! Loaded from a TOML file; every key is optional:
//!
//! ```toml
//! backend = "opencl"
//! strategy = "direct"
//! kernel_length = "i64"
//! log_filter = "kernarg=debug"
//! ```

use crate::backends::BackendKind;
use crate::types::PrimitiveType;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Value of `kernel_length` that turns the implicit length field off
pub const NO_KERNEL_LENGTH: &str = "none";

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("Cannot read config `{}`", path.display())]
    #[diagnostic(code(config::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config")]
    #[diagnostic(code(config::toml))]
    Toml(#[from] toml::de::Error),

    #[error("Invalid kernel length type `{name}`")]
    #[diagnostic(
        code(config::kernel_length),
        help("use an integer primitive such as i32 or u64, or \"none\"")
    )]
    InvalidKernelLength { name: String },

    #[error("The {backend} backend cannot launch with {strategy} marshaling")]
    #[diagnostic(
        code(config::strategy),
        help("{backend} binds view buffers as separate arguments; use the direct strategy")
    )]
    UnsupportedStrategy {
        backend: BackendKind,
        strategy: Strategy,
    },
}

/// How parameters are handed to the launcher
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// One native argument per parameter
    Direct,
    /// All parameters packed into one argument structure
    Grouped,
}

impl Strategy {
    /// Strategy a backend launches with unless told otherwise
    pub fn default_for(backend: BackendKind) -> Self {
        match backend {
            BackendKind::Ptx => Strategy::Grouped,
            BackendKind::OpenCL => Strategy::Direct,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Direct => write!(f, "direct"),
            Strategy::Grouped => write!(f, "grouped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MarshalConfig {
    pub backend: BackendKind,
    /// Defaults to the backend's own strategy
    pub strategy: Option<Strategy>,
    /// Integer type of the implicit kernel-length field, or `"none"`
    pub kernel_length: String,
    /// Tracing filter used when `RUST_LOG` is unset
    pub log_filter: Option<String>,
}

impl Default for MarshalConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            strategy: None,
            kernel_length: PrimitiveType::I32.name().to_string(),
            log_filter: None,
        }
    }
}

impl MarshalConfig {
    pub fn parse(source: &str) -> Result<Self, ConfigError> {
        let config: MarshalConfig = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source)
    }

    pub fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Reject settings no backend ABI can honor
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.kernel_length_type()?;
        let strategy = self.effective_strategy();
        // OpenCL view layouts keep their base pointers in buffer slots
        if self.backend == BackendKind::OpenCL && strategy == Strategy::Grouped {
            return Err(ConfigError::UnsupportedStrategy {
                backend: self.backend,
                strategy,
            });
        }
        Ok(())
    }

    pub fn effective_strategy(&self) -> Strategy {
        self.strategy.unwrap_or_else(|| Strategy::default_for(self.backend))
    }

    /// Primitive type of the kernel-length field, `None` if disabled
    pub fn kernel_length_type(&self) -> Result<Option<PrimitiveType>, ConfigError> {
        if self.kernel_length == NO_KERNEL_LENGTH {
            return Ok(None);
        }
        match PrimitiveType::from_name(&self.kernel_length) {
            Some(prim) if prim.is_integer() => Ok(Some(prim)),
            _ => Err(ConfigError::InvalidKernelLength {
                name: self.kernel_length.clone(),
            }),
        }
    }
}
