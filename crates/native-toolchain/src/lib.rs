//! Toolchain adapters for native compilation.
//!
//! A [`Toolchain`] exposes the five blocking operations the native targets
//! need: compile C, compile C++, link, archive and dependency scan. Each
//! operation receives a [`ToolchainCommand`] describing inputs and outputs
//! in vendor-neutral form; the implementation turns it into a concrete
//! command line.
//!
//! Two families are provided:
//! - [`GccToolchain`] for gcc and clang style drivers (`-M` dependency output)
//! - [`MsvcToolchain`] for `cl.exe`/`link.exe`/`lib.exe` (`/showIncludes`)

mod command;
mod depfile;
mod error;
mod family;
mod gcc;
mod msvc;
mod process;

pub use command::{CommandMode, Language, ToolchainCommand};
pub use depfile::parse_depfile;
pub use error::{ToolchainError, ToolchainResult};
pub use family::ToolchainFamily;
pub use gcc::GccToolchain;
pub use msvc::{parse_show_includes, MsvcToolchain};
pub use process::{run_tool, ToolOutput};

use std::fmt;
use std::path::PathBuf;

/// Capability set of one compiler family.
///
/// Implementations must be shareable across worker threads; every method is
/// a blocking call that either completes or reports a process failure.
pub trait Toolchain: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and option values (e.g. `"gcc"`).
    fn name(&self) -> &str;

    fn compile_c(&self, cmd: &ToolchainCommand) -> ToolchainResult<()>;

    fn compile_cpp(&self, cmd: &ToolchainCommand) -> ToolchainResult<()>;

    fn link(&self, cmd: &ToolchainCommand) -> ToolchainResult<()>;

    fn archive(&self, cmd: &ToolchainCommand) -> ToolchainResult<()>;

    /// Return every file the command's inputs transitively include.
    ///
    /// The inputs themselves are not part of the result.
    fn scan_dependencies(&self, cmd: &ToolchainCommand) -> ToolchainResult<Vec<PathBuf>>;

    /// Dispatch a compile command on its language.
    fn compile(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        match cmd.mode {
            CommandMode::Compile(Language::C) => self.compile_c(cmd),
            CommandMode::Compile(Language::Cpp) => self.compile_cpp(cmd),
            other => Err(ToolchainError::Unsupported {
                toolchain: self.name().to_string(),
                operation: other.to_string(),
            }),
        }
    }
}
