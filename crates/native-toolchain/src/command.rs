//! Vendor-neutral description of one toolchain invocation.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Source language of a compile or scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Language::C => write!(f, "c"),
            Language::Cpp => write!(f, "c++"),
        }
    }
}

/// What the invocation should do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommandMode {
    Compile(Language),
    Link { shared: bool },
    Archive,
    Scan(Language),
}

impl fmt::Display for CommandMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandMode::Compile(lang) => write!(f, "compile ({lang})"),
            CommandMode::Link { shared: true } => write!(f, "link (shared)"),
            CommandMode::Link { shared: false } => write!(f, "link"),
            CommandMode::Archive => write!(f, "archive"),
            CommandMode::Scan(lang) => write!(f, "scan dependencies ({lang})"),
        }
    }
}

/// Inputs, outputs and flags for one toolchain operation.
///
/// Owned transiently by the target that builds it; nothing here is
/// property-expanded any further.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolchainCommand {
    pub mode: CommandMode,
    /// Artifact to produce (absent for scans).
    pub output: Option<PathBuf>,
    /// Sources or objects, in order.
    pub inputs: Vec<PathBuf>,
    pub flags: Vec<String>,
    pub include_dirs: Vec<PathBuf>,
    pub lib_dirs: Vec<PathBuf>,
    /// Platform-neutral library names (`"ssl"`, not `"libssl.so"`).
    pub libs: Vec<String>,
    /// Directories prepended to `PATH` when locating the tools.
    pub search_path: Vec<PathBuf>,
}

impl ToolchainCommand {
    fn new(mode: CommandMode, output: Option<PathBuf>, inputs: Vec<PathBuf>) -> Self {
        Self {
            mode,
            output,
            inputs,
            flags: Vec::new(),
            include_dirs: Vec::new(),
            lib_dirs: Vec::new(),
            libs: Vec::new(),
            search_path: Vec::new(),
        }
    }

    pub fn compile(language: Language, output: impl Into<PathBuf>, sources: Vec<PathBuf>) -> Self {
        Self::new(CommandMode::Compile(language), Some(output.into()), sources)
    }

    pub fn link(output: impl Into<PathBuf>, objects: Vec<PathBuf>, shared: bool) -> Self {
        Self::new(CommandMode::Link { shared }, Some(output.into()), objects)
    }

    pub fn archive(output: impl Into<PathBuf>, objects: Vec<PathBuf>) -> Self {
        Self::new(CommandMode::Archive, Some(output.into()), objects)
    }

    pub fn scan(language: Language, sources: Vec<PathBuf>) -> Self {
        Self::new(CommandMode::Scan(language), None, sources)
    }

    pub fn with_flags(mut self, flags: Vec<String>) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_include_dirs(mut self, dirs: Vec<PathBuf>) -> Self {
        self.include_dirs = dirs;
        self
    }

    pub fn with_libs(mut self, libs: Vec<String>, lib_dirs: Vec<PathBuf>) -> Self {
        self.libs = libs;
        self.lib_dirs = lib_dirs;
        self
    }

    pub fn with_search_path(mut self, dirs: Vec<PathBuf>) -> Self {
        self.search_path = dirs;
        self
    }

    /// Output path, or an error naming the operation if it is missing.
    pub fn require_output(&self) -> Result<&Path, crate::ToolchainError> {
        self.output
            .as_deref()
            .ok_or_else(|| crate::ToolchainError::MissingOutput(self.mode.to_string()))
    }

    pub fn is_shared(&self) -> bool {
        matches!(self.mode, CommandMode::Link { shared: true })
    }
}
