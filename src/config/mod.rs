//! Native build configuration
//!
//! Options are plain JSON values keyed by dotted names (`native.cxx.flags`)
//! and merged in layers, last wins:
//! 1. Built-in platform defaults
//! 2. Build configuration file / context overrides
//! 3. Per-target overrides
//!
//! The merged layer is converted once per call into an immutable
//! [`NativeOptions`] snapshot.

mod defaults;
mod effective;
mod merge;
mod options;

use thiserror::Error;

pub use defaults::BuiltinDefaults;
pub use effective::{BuildConfig, ConfigOrigin, ConfigSource};
pub use merge::{merge_layers, merge_options, OptionLayer};
pub use options::{keys, NativeOptions};
pub(crate) use options::expand_tokens;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown option: {0}")]
    UnknownOption(String),

    #[error("invalid value for option {key}: {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("invalid file name formatter '{0}': expected exactly one %s")]
    InvalidFormatter(String),

    #[error("identity signature must be a single line: {0:?}")]
    MultiLineSignature(String),

    #[error("target {0} has no inputs")]
    EmptyInputs(String),
}
