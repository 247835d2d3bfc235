//! Blocking tool invocation.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Command;

use tracing::debug;

use crate::error::{ToolchainError, ToolchainResult};

/// Captured output of a successful tool run.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Run `program` with `args`, prepending `search_path` to `PATH`.
///
/// A non-zero exit status is an error carrying the tool's stderr (or stdout,
/// for tools such as `cl.exe` that report diagnostics there).
pub fn run_tool(program: &str, args: &[String], search_path: &[PathBuf]) -> ToolchainResult<ToolOutput> {
    debug!(program, args = %args.join(" "), "running tool");

    let mut command = Command::new(program);
    command.args(args);
    if let Some(path) = joined_path(search_path) {
        command.env("PATH", path);
    }

    let output = command.output().map_err(|source| ToolchainError::Spawn {
        program: program.to_string(),
        source,
    })?;

    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

    if !output.status.success() {
        let detail = if stderr.trim().is_empty() { &stdout } else { &stderr };
        return Err(ToolchainError::ProcessFailed {
            program: program.to_string(),
            code: output.status.code(),
            stderr: detail.trim().to_string(),
        });
    }

    Ok(ToolOutput { stdout, stderr })
}

fn joined_path(search_path: &[PathBuf]) -> Option<OsString> {
    if search_path.is_empty() {
        return None;
    }
    let mut dirs: Vec<PathBuf> = search_path.to_vec();
    if let Some(existing) = std::env::var_os("PATH") {
        dirs.extend(std::env::split_paths(&existing));
    }
    std::env::join_paths(dirs).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spawn_failure_is_reported() {
        let err = run_tool("definitely-not-a-real-compiler-xyz", &[], &[]).unwrap_err();
        assert!(matches!(err, ToolchainError::Spawn { ref program, .. } if program == "definitely-not-a-real-compiler-xyz"));
    }

    #[test]
    fn test_joined_path_prepends() {
        let joined = joined_path(&[PathBuf::from("/opt/tools/bin")]).unwrap();
        let first = std::env::split_paths(&joined).next().unwrap();
        assert_eq!(first, PathBuf::from("/opt/tools/bin"));
    }

    #[test]
    fn test_joined_path_empty() {
        assert!(joined_path(&[]).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_is_process_failure() {
        let err = run_tool("sh", &["-c".to_string(), "echo boom >&2; exit 3".to_string()], &[])
            .unwrap_err();
        match err {
            ToolchainError::ProcessFailed { code, stderr, .. } => {
                assert_eq!(code, Some(3));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
