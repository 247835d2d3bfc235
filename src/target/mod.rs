//! Native target types.
//!
//! Each target produces one artifact. The surrounding engine asks for its
//! prerequisites, decides staleness from timestamps plus the digest of
//! [`Target::implicit_inputs`], then calls [`Target::run`] or
//! [`Target::clean`]. Targets are immutable after construction.

mod archive;
mod compile;
mod link;
mod staleness;

pub use archive::Archive;
pub use compile::{CompileUnit, CompileUnitBuilder};
pub use link::{Link, LinkBuilder, LinkInputs};
pub use staleness::{check_staleness, StaleReason, Staleness};

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use native_props::Expr;
use native_toolchain::ToolchainResult;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::config::{keys, ConfigError, OptionLayer};
use crate::context::BuildContext;
use crate::error::{NativeError, NativeResult};
use crate::pathset::Dependency;

/// A buildable unit producing one output artifact.
pub trait Target: Send + Sync + fmt::Debug {
    /// Output path as declared, relative to the context base directory.
    fn output(&self) -> &Path;

    /// Files and targets that must be up to date before this one runs.
    fn prerequisites(&self, ctx: &BuildContext) -> NativeResult<Vec<Dependency>>;

    fn run(&self, ctx: &BuildContext) -> NativeResult<()>;

    /// Extra staleness inputs beyond timestamps.
    fn implicit_inputs(&self, ctx: &BuildContext) -> NativeResult<Vec<String>>;

    fn name(&self) -> String {
        self.output().to_string_lossy().into_owned()
    }

    fn output_path(&self, ctx: &BuildContext) -> PathBuf {
        ctx.resolve_path(self.output())
    }

    /// Delete the artifact; absent artifacts are fine.
    fn clean(&self, ctx: &BuildContext) -> NativeResult<()> {
        remove_if_exists(&self.output_path(ctx))
    }

    /// SHA-256 hex of the RFC 8785 canonical JSON of the implicit inputs.
    fn implicit_inputs_digest(&self, ctx: &BuildContext) -> NativeResult<String> {
        let inputs = self.implicit_inputs(ctx)?;
        let jcs = serde_json_canonicalizer::to_vec(&inputs)
            .map_err(|e| NativeError::Canonicalize(e.to_string()))?;
        let mut hasher = Sha256::new();
        hasher.update(&jcs);
        Ok(hex::encode(hasher.finalize()))
    }
}

pub(crate) fn remove_if_exists(path: &Path) -> NativeResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(NativeError::io(path, e)),
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> NativeResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| NativeError::io(parent, e))
        }
        _ => Ok(()),
    }
}

/// Run a toolchain operation producing `output`; on failure, remove any
/// partial artifact so it is never mistaken for a fresh one.
pub(crate) fn produce(
    output: &Path,
    operation: impl FnOnce() -> ToolchainResult<()>,
) -> NativeResult<()> {
    if let Err(e) = operation() {
        debug!(path = %output.display(), "removing partial output after failure");
        let _ = fs::remove_file(output);
        return Err(e.into());
    }
    Ok(())
}

pub(crate) fn parse_exprs<I, S>(values: I) -> NativeResult<Vec<Expr>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Ok(values
        .into_iter()
        .map(|v| Expr::parse(v.as_ref()))
        .collect::<Result<_, _>>()?)
}

pub(crate) fn validate_overrides(overrides: &OptionLayer) -> Result<(), ConfigError> {
    match overrides.keys().find(|k| !keys::is_known(k)) {
        Some(unknown) => Err(ConfigError::UnknownOption(unknown.clone())),
        None => Ok(()),
    }
}

/// Expand each value in list mode, trimming and dropping empty items.
pub(crate) fn expand_names(values: &[Expr], ctx: &BuildContext) -> NativeResult<Vec<String>> {
    let mut out = Vec::new();
    for value in values {
        for item in value.expand_list(ctx.properties())? {
            let item = item.trim();
            if !item.is_empty() {
                out.push(item.to_string());
            }
        }
    }
    Ok(out)
}

/// Keep the first occurrence of each path.
pub(crate) fn dedupe(deps: Vec<Dependency>) -> Vec<Dependency> {
    let mut out: Vec<Dependency> = Vec::with_capacity(deps.len());
    for dep in deps {
        if !out.iter().any(|d| d.path == dep.path) {
            out.push(dep);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use native_toolchain::ToolchainError;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_produce_removes_partial_output() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("a.o");
        let result = produce(&out, || {
            fs::write(&out, b"partial").unwrap();
            Err(ToolchainError::ProcessFailed {
                program: "cc".to_string(),
                code: Some(1),
                stderr: "error".to_string(),
            })
        });
        assert!(matches!(result, Err(NativeError::Toolchain(_))));
        assert!(!out.exists());
    }

    #[test]
    fn test_remove_if_exists_tolerates_missing() {
        let dir = TempDir::new().unwrap();
        remove_if_exists(&dir.path().join("nothing")).unwrap();
    }

    #[test]
    fn test_validate_overrides() {
        let mut layer = OptionLayer::new();
        layer.insert(keys::LIBS.into(), json!(["m"]));
        assert!(validate_overrides(&layer).is_ok());
        layer.insert("native.lib".into(), json!(["m"]));
        assert!(matches!(
            validate_overrides(&layer),
            Err(ConfigError::UnknownOption(ref k)) if k == "native.lib"
        ));
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let deps = vec![
            Dependency::from_path("/a/x.h"),
            Dependency::from_path("/a/y.h"),
            Dependency::from_path("/a/x.h"),
        ];
        let out = dedupe(deps);
        assert_eq!(out.len(), 2);
        assert_eq!(out[1].display_name, "y.h");
    }
}
