//! Toolchain errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for toolchain operations.
pub type ToolchainResult<T> = Result<T, ToolchainError>;

/// Errors from running a toolchain operation.
#[derive(Debug, Error)]
pub enum ToolchainError {
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{program} exited with {}: {stderr}", code.map_or_else(|| "signal".to_string(), |c| format!("status {c}")))]
    ProcessFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed dependency output: {0}")]
    Depfile(String),

    #[error("{0} requires an output path")]
    MissingOutput(String),

    #[error("toolchain '{toolchain}' does not support {operation}")]
    Unsupported { toolchain: String, operation: String },
}
