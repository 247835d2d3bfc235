//! Lazily resolved, composable path sets.
//!
//! Entries are property expressions; nothing touches the filesystem or the
//! property environment until a [`BuildContext`] is supplied.

use std::fmt;
use std::path::{Path, PathBuf};

use native_props::{Expr, PropsResult};
use serde::Serialize;

use crate::context::BuildContext;
use crate::error::NativeResult;

/// A resolved dependency as handed to the build engine.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Dependency {
    pub path: PathBuf,
    /// Final path component, used in progress output.
    pub display_name: String,
}

impl Dependency {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let display_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self { path, display_name }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name)
    }
}

/// Ordered set of source descriptors.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    paths: Vec<Expr>,
    /// Further structural dependencies declared by the set itself.
    extra_dependencies: Vec<Expr>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse every entry; a malformed expression fails the whole set.
    pub fn from_paths<I, S>(paths: I) -> PropsResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let paths = paths
            .into_iter()
            .map(|p| Expr::parse(p.as_ref()))
            .collect::<PropsResult<Vec<_>>>()?;
        Ok(Self {
            paths,
            extra_dependencies: Vec::new(),
        })
    }

    pub fn push(&mut self, path: &str) -> PropsResult<()> {
        self.paths.push(Expr::parse(path)?);
        Ok(())
    }

    /// Declare a dependency that is not itself a source, such as a
    /// generated header produced by another target.
    pub fn with_dependency(mut self, path: &str) -> PropsResult<Self> {
        self.extra_dependencies.push(Expr::parse(path)?);
        Ok(self)
    }

    /// Append `other`, preserving order.
    pub fn extend(&mut self, other: SourceSet) {
        self.paths.extend(other.paths);
        self.extra_dependencies.extend(other.extra_dependencies);
    }

    pub fn concat(mut self, other: SourceSet) -> Self {
        self.extend(other);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Number of unexpanded entries.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// Unexpanded entries, joined for diagnostics.
    pub fn describe(&self) -> String {
        self.paths
            .iter()
            .map(Expr::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Absolute paths in declaration order.
    pub fn resolve(&self, ctx: &BuildContext) -> NativeResult<Vec<PathBuf>> {
        resolve_all(&self.paths, ctx)
    }

    pub fn resolve_with_destinations(&self, ctx: &BuildContext) -> NativeResult<Vec<Dependency>> {
        Ok(self
            .resolve(ctx)?
            .into_iter()
            .map(Dependency::from_path)
            .collect())
    }

    /// Everything this set depends on without scanning: its own entries,
    /// then declared extras, deduplicated in order.
    pub fn structural_dependencies(&self, ctx: &BuildContext) -> NativeResult<Vec<String>> {
        let mut out: Vec<String> = Vec::new();
        for path in self
            .resolve(ctx)?
            .into_iter()
            .chain(resolve_all(&self.extra_dependencies, ctx)?)
        {
            let entry = path_string(&path);
            if !out.contains(&entry) {
                out.push(entry);
            }
        }
        Ok(out)
    }
}

fn resolve_all(exprs: &[Expr], ctx: &BuildContext) -> NativeResult<Vec<PathBuf>> {
    let mut out = Vec::new();
    for expr in exprs {
        for value in expr.expand_list(ctx.properties())? {
            out.push(ctx.resolve_path(value));
        }
    }
    Ok(out)
}

pub(crate) fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
