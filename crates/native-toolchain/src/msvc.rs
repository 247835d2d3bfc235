//! Microsoft `cl.exe` family.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::ToolchainCommand;
use crate::error::ToolchainResult;
use crate::process::{run_tool, ToolOutput};
use crate::Toolchain;

/// Prefix `cl.exe /showIncludes` prints before every included file
/// (English locale).
const SHOW_INCLUDES_PREFIX: &str = "Note: including file:";

/// Adapter for the MSVC tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsvcToolchain {
    cl: String,
    link: String,
    lib: String,
}

impl Default for MsvcToolchain {
    fn default() -> Self {
        Self {
            cl: "cl.exe".to_string(),
            link: "link.exe".to_string(),
            lib: "lib.exe".to_string(),
        }
    }
}

impl MsvcToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    fn compile_args(cmd: &ToolchainCommand, output: &Path, language_flag: &str) -> Vec<String> {
        let mut args = vec![
            "/nologo".to_string(),
            "/c".to_string(),
            format!("/Fo{}", output.display()),
        ];
        args.extend(cmd.flags.iter().cloned());
        args.extend(cmd.include_dirs.iter().map(|d| format!("/I{}", d.display())));
        args.push(language_flag.to_string());
        args.extend(cmd.inputs.iter().map(|p| p.to_string_lossy().into_owned()));
        args
    }
}

impl Toolchain for MsvcToolchain {
    fn name(&self) -> &str {
        "msvc"
    }

    fn compile_c(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        let output = cmd.require_output()?;
        run_tool(&self.cl, &Self::compile_args(cmd, output, "/TC"), &cmd.search_path)?;
        Ok(())
    }

    fn compile_cpp(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        let output = cmd.require_output()?;
        run_tool(&self.cl, &Self::compile_args(cmd, output, "/TP"), &cmd.search_path)?;
        Ok(())
    }

    fn link(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        let output = cmd.require_output()?;
        let mut args = vec!["/nologo".to_string()];
        if cmd.is_shared() {
            args.push("/DLL".to_string());
        }
        args.push(format!("/OUT:{}", output.display()));
        args.extend(cmd.flags.iter().cloned());
        args.extend(cmd.inputs.iter().map(|p| p.to_string_lossy().into_owned()));
        args.extend(cmd.lib_dirs.iter().map(|d| format!("/LIBPATH:{}", d.display())));
        args.extend(cmd.libs.iter().map(|l| format!("{l}.lib")));

        run_tool(&self.link, &args, &cmd.search_path)?;
        Ok(())
    }

    fn archive(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        let output = cmd.require_output()?;
        let mut args = vec!["/nologo".to_string(), format!("/OUT:{}", output.display())];
        args.extend(cmd.inputs.iter().map(|p| p.to_string_lossy().into_owned()));

        run_tool(&self.lib, &args, &cmd.search_path)?;
        Ok(())
    }

    fn scan_dependencies(&self, cmd: &ToolchainCommand) -> ToolchainResult<Vec<PathBuf>> {
        // /Zs: syntax check only, no object written.
        let mut args = vec![
            "/nologo".to_string(),
            "/showIncludes".to_string(),
            "/Zs".to_string(),
        ];
        args.extend(cmd.flags.iter().cloned());
        args.extend(cmd.include_dirs.iter().map(|d| format!("/I{}", d.display())));
        args.extend(cmd.inputs.iter().map(|p| p.to_string_lossy().into_owned()));

        let out = run_tool(&self.cl, &args, &cmd.search_path)?;
        let deps = scanned_includes(&out);
        debug!(toolchain = "msvc", count = deps.len(), "scanned dependencies");
        Ok(deps)
    }
}

/// Extract included file paths from `/showIncludes` output, first
/// occurrence order.
pub fn parse_show_includes(output: &str) -> Vec<PathBuf> {
    let mut seen = std::collections::HashSet::new();
    output
        .lines()
        .filter_map(|line| line.strip_prefix(SHOW_INCLUDES_PREFIX))
        .map(|rest| PathBuf::from(rest.trim()))
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

/// `cl` versions differ on which stream carries `/showIncludes` notes.
fn scanned_includes(out: &ToolOutput) -> Vec<PathBuf> {
    parse_show_includes(&format!("{}\n{}", out.stdout, out.stderr))
}
