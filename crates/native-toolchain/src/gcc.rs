//! gcc/clang driver family.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::command::{Language, ToolchainCommand};
use crate::depfile::parse_depfile;
use crate::error::ToolchainResult;
use crate::process::run_tool;
use crate::Toolchain;

/// Adapter for gcc-compatible drivers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GccToolchain {
    name: String,
    cc: String,
    cxx: String,
    ar: String,
}

impl GccToolchain {
    pub fn gcc() -> Self {
        Self::with_programs("gcc", "gcc", "g++", "ar")
    }

    pub fn clang() -> Self {
        Self::with_programs("clang", "clang", "clang++", "ar")
    }

    /// Use explicit program names (e.g. a cross-compiler prefix).
    pub fn with_programs(
        name: impl Into<String>,
        cc: impl Into<String>,
        cxx: impl Into<String>,
        ar: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            cc: cc.into(),
            cxx: cxx.into(),
            ar: ar.into(),
        }
    }

    fn driver(&self, language: Language) -> &str {
        match language {
            Language::C => &self.cc,
            Language::Cpp => &self.cxx,
        }
    }

    fn compile_args(cmd: &ToolchainCommand, output: &Path) -> Vec<String> {
        let mut args = vec!["-c".to_string(), "-o".to_string(), path_arg(output)];
        args.extend(cmd.flags.iter().cloned());
        args.extend(include_args(&cmd.include_dirs));
        args.extend(cmd.inputs.iter().map(|p| path_arg(p)));
        args
    }

    fn compile_with(&self, language: Language, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        let output = cmd.require_output()?;
        run_tool(self.driver(language), &Self::compile_args(cmd, output), &cmd.search_path)?;
        Ok(())
    }
}

impl Toolchain for GccToolchain {
    fn name(&self) -> &str {
        &self.name
    }

    fn compile_c(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        self.compile_with(Language::C, cmd)
    }

    fn compile_cpp(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        self.compile_with(Language::Cpp, cmd)
    }

    fn link(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        let output = cmd.require_output()?;
        let mut args = Vec::new();
        if cmd.is_shared() {
            args.push("-shared".to_string());
        }
        args.push("-o".to_string());
        args.push(path_arg(output));
        args.extend(cmd.flags.iter().cloned());
        args.extend(cmd.inputs.iter().map(|p| path_arg(p)));
        args.extend(cmd.lib_dirs.iter().map(|d| format!("-L{}", d.display())));
        args.extend(cmd.libs.iter().map(|l| format!("-l{l}")));

        run_tool(&self.cxx, &args, &cmd.search_path)?;
        Ok(())
    }

    fn archive(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        let output = cmd.require_output()?;
        // `ar r` replaces members in place; start from an empty archive so
        // removed or reordered objects are reflected.
        if output.exists() {
            std::fs::remove_file(output).map_err(|source| crate::ToolchainError::Io {
                path: output.to_path_buf(),
                source,
            })?;
        }
        let mut args = vec!["-rcs".to_string(), path_arg(output)];
        args.extend(cmd.inputs.iter().map(|p| path_arg(p)));

        run_tool(&self.ar, &args, &cmd.search_path)?;
        Ok(())
    }

    fn scan_dependencies(&self, cmd: &ToolchainCommand) -> ToolchainResult<Vec<PathBuf>> {
        let language = match cmd.mode {
            crate::CommandMode::Scan(language) => language,
            _ => Language::Cpp,
        };
        let mut args = vec!["-M".to_string()];
        args.extend(cmd.flags.iter().cloned());
        args.extend(include_args(&cmd.include_dirs));
        args.extend(cmd.inputs.iter().map(|p| path_arg(p)));

        let out = run_tool(self.driver(language), &args, &cmd.search_path)?;
        let deps: Vec<PathBuf> = parse_depfile(&out.stdout)?
            .into_iter()
            .map(PathBuf::from)
            .filter(|p| !cmd.inputs.contains(p))
            .collect();

        debug!(toolchain = %self.name, count = deps.len(), "scanned dependencies");
        Ok(deps)
    }
}

fn include_args(dirs: &[PathBuf]) -> impl Iterator<Item = String> + '_ {
    dirs.iter().map(|d| format!("-I{}", d.display()))
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_args_order() {
        let cmd = ToolchainCommand::compile(Language::Cpp, "obj/a.o", vec!["src/a.cpp".into()])
            .with_flags(vec!["-O2".to_string(), "-Wall".to_string()])
            .with_include_dirs(vec!["include".into(), "/opt/inc".into()]);
        let args = GccToolchain::compile_args(&cmd, Path::new("obj/a.o"));
        assert_eq!(
            args,
            vec!["-c", "-o", "obj/a.o", "-O2", "-Wall", "-Iinclude", "-I/opt/inc", "src/a.cpp"]
        );
    }

    #[test]
    fn test_driver_selection() {
        let tc = GccToolchain::clang();
        assert_eq!(tc.name(), "clang");
        assert_eq!(tc.driver(Language::C), "clang");
        assert_eq!(tc.driver(Language::Cpp), "clang++");
    }

    #[test]
    fn test_compile_without_output_fails_before_spawning() {
        let tc = GccToolchain::with_programs("x", "no-such-cc", "no-such-cxx", "no-such-ar");
        let cmd = ToolchainCommand::scan(Language::C, vec!["a.c".into()]);
        assert!(matches!(
            tc.compile_c(&cmd),
            Err(crate::ToolchainError::MissingOutput(_))
        ));
    }

    #[test]
    fn test_missing_driver_is_spawn_error() {
        let tc = GccToolchain::with_programs("x", "no-such-cc", "no-such-cxx", "no-such-ar");
        let cmd = ToolchainCommand::scan(Language::Cpp, vec!["a.cpp".into()]);
        assert!(matches!(
            tc.scan_dependencies(&cmd),
            Err(crate::ToolchainError::Spawn { .. })
        ));
    }
}
