//! Errors surfaced by native targets.
//!
//! Every error is scoped to the target whose operation produced it.

use std::io;
use std::path::{Path, PathBuf};

use native_props::PropsError;
use native_toolchain::ToolchainError;
use thiserror::Error;

use crate::config::ConfigError;

/// Result type for native target operations.
pub type NativeResult<T> = Result<T, NativeError>;

#[derive(Debug, Error)]
pub enum NativeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("property expansion failed: {0}")]
    Props(#[from] PropsError),

    #[error(transparent)]
    Toolchain(#[from] ToolchainError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("no toolchain registered as '{0}'")]
    UnknownToolchain(String),

    #[error("failed to canonicalize implicit inputs: {0}")]
    Canonicalize(String),
}

impl NativeError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        NativeError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    /// Whether this is a configuration problem rather than a build failure.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            NativeError::Config(_) | NativeError::Props(_) | NativeError::UnknownToolchain(_)
        )
    }
}
