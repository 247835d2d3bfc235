//! In-process toolchain double.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::thread;

use native_toolchain::{Toolchain, ToolchainCommand, ToolchainError, ToolchainResult};
use regex_lite::Regex;

use super::failure::{FailureConfig, FailureInjector, Operation};

const PROGRAM: &str = "mock-cc";

/// Recorded calls
#[derive(Debug, Default)]
pub struct MockState {
    pub commands: Vec<ToolchainCommand>,
    pub scan_count: usize,
}

/// Toolchain that never spawns a process.
///
/// Compiles, links and archives write a small text artifact listing their
/// inputs. Scans follow `#include "..."` and `#include <...>` lines
/// recursively: quoted includes are looked up next to the including file,
/// then in the include dirs, and a missing one fails the scan like a real
/// preprocessor would; unresolved angle includes are treated as system
/// headers and skipped.
///
/// Clones share state, so a test can keep one handle while the build
/// context owns another.
#[derive(Debug, Clone, Default)]
pub struct MockToolchain {
    state: Arc<Mutex<MockState>>,
    failures: Arc<Mutex<FailureInjector>>,
}

fn include_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"^\s*#\s*include\s*([<"])([^>"]+)[>"]"#).expect("include pattern is valid")
    })
}

impl MockToolchain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inject_failure(&self, op: Operation, config: FailureConfig) {
        lock(&self.failures).inject(op, config);
    }

    /// Fail the next call of `op` only.
    pub fn fail_next(&self, op: Operation) {
        self.inject_failure(op, FailureConfig::error(format!("injected {op} failure")).with_fail_count(1));
    }

    pub fn clear_failures(&self) {
        lock(&self.failures).clear();
    }

    pub fn commands(&self) -> Vec<ToolchainCommand> {
        lock(&self.state).commands.clone()
    }

    pub fn last_command(&self) -> Option<ToolchainCommand> {
        lock(&self.state).commands.last().cloned()
    }

    pub fn scan_count(&self) -> usize {
        lock(&self.state).scan_count
    }

    /// Number of compile commands seen.
    pub fn compile_count(&self) -> usize {
        lock(&self.state)
            .commands
            .iter()
            .filter(|c| matches!(c.mode, native_toolchain::CommandMode::Compile(_)))
            .count()
    }

    fn record(&self, op: Operation, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        {
            let mut state = lock(&self.state);
            state.commands.push(cmd.clone());
            if op == Operation::Scan {
                state.scan_count += 1;
            }
        }

        let Some(config) = lock(&self.failures).check(op) else {
            return Ok(());
        };
        if let Some(delay) = config.delay {
            thread::sleep(delay);
        }
        let Some(message) = config.message else {
            return Ok(());
        };
        if config.partial_output {
            if let Some(output) = &cmd.output {
                let _ = fs::write(output, b"partial");
            }
        }
        Err(process_failed(message))
    }

    fn produce(&self, op: Operation, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        self.record(op, cmd)?;
        let output = cmd.require_output()?;

        let mut contents = format!("{}\n", cmd.mode);
        for input in &cmd.inputs {
            if !input.exists() {
                return Err(process_failed(format!(
                    "{}: No such file or directory",
                    input.display()
                )));
            }
            contents.push_str(&format!("{}\n", input.display()));
        }
        fs::write(output, contents).map_err(|e| ToolchainError::Io {
            path: output.to_path_buf(),
            source: e,
        })
    }

    fn scan_file(
        &self,
        file: &Path,
        include_dirs: &[PathBuf],
        seen: &mut HashSet<PathBuf>,
        out: &mut Vec<PathBuf>,
    ) -> ToolchainResult<()> {
        let text = fs::read_to_string(file).map_err(|e| ToolchainError::Io {
            path: file.to_path_buf(),
            source: e,
        })?;

        for line in text.lines() {
            let Some(caps) = include_pattern().captures(line) else {
                continue;
            };
            let quoted = &caps[1] == "\"";
            let name = &caps[2];

            let local = file.parent().map(|dir| dir.join(name)).filter(|_| quoted);
            let found = local
                .into_iter()
                .chain(include_dirs.iter().map(|dir| dir.join(name)))
                .find(|candidate| candidate.is_file());

            match found {
                Some(header) => {
                    if seen.insert(header.clone()) {
                        out.push(header.clone());
                        self.scan_file(&header, include_dirs, seen, out)?;
                    }
                }
                None if quoted => {
                    return Err(process_failed(format!(
                        "{}: fatal error: {}: No such file or directory",
                        file.display(),
                        name
                    )));
                }
                None => {}
            }
        }
        Ok(())
    }
}

impl Toolchain for MockToolchain {
    fn name(&self) -> &str {
        "mock"
    }

    fn compile_c(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        self.produce(Operation::Compile, cmd)
    }

    fn compile_cpp(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        self.produce(Operation::Compile, cmd)
    }

    fn link(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        self.produce(Operation::Link, cmd)
    }

    fn archive(&self, cmd: &ToolchainCommand) -> ToolchainResult<()> {
        self.produce(Operation::Archive, cmd)
    }

    fn scan_dependencies(&self, cmd: &ToolchainCommand) -> ToolchainResult<Vec<PathBuf>> {
        self.record(Operation::Scan, cmd)?;

        let mut seen: HashSet<PathBuf> = cmd.inputs.iter().cloned().collect();
        let mut out = Vec::new();
        for input in &cmd.inputs {
            self.scan_file(input, &cmd.include_dirs, &mut seen, &mut out)?;
        }
        Ok(out)
    }
}

fn process_failed(stderr: String) -> ToolchainError {
    ToolchainError::ProcessFailed {
        program: PROGRAM.to_string(),
        code: Some(1),
        stderr,
    }
}

/// Lock, recovering the data if a panicking test poisoned the mutex.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
