//! C and C++ compile units.

use std::path::{Path, PathBuf};

use native_props::Expr;
use native_toolchain::{Language, ToolchainCommand};
use serde_json::Value;
use tracing::info;

use super::{dedupe, ensure_parent_dir, parse_exprs, produce, remove_if_exists, Target};
use crate::config::{ConfigError, OptionLayer};
use crate::context::BuildContext;
use crate::depcache::DependencyCache;
use crate::error::NativeResult;
use crate::pathset::{path_string, Dependency, SourceSet};

/// Compiles one or more sources into a single object file.
///
/// The unit's [`DependencyCache`] is one of its prerequisites, so a changed
/// header makes the unit stale just like a changed source.
#[derive(Debug, Clone)]
pub struct CompileUnit {
    object: PathBuf,
    language: Language,
    sources: SourceSet,
    dependencies: SourceSet,
    overrides: OptionLayer,
    cache: DependencyCache,
}

impl CompileUnit {
    pub fn cpp<I, S>(object: impl Into<PathBuf>, sources: I) -> CompileUnitBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CompileUnitBuilder::new(Language::Cpp, object.into(), sources)
    }

    pub fn c<I, S>(object: impl Into<PathBuf>, sources: I) -> CompileUnitBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CompileUnitBuilder::new(Language::C, object.into(), sources)
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn dependency_cache(&self) -> &DependencyCache {
        &self.cache
    }
}

impl Target for CompileUnit {
    fn output(&self) -> &Path {
        &self.object
    }

    fn prerequisites(&self, ctx: &BuildContext) -> NativeResult<Vec<Dependency>> {
        let mut deps = self.dependencies.resolve_with_destinations(ctx)?;
        deps.extend(self.sources.resolve_with_destinations(ctx)?);
        deps.extend(self.cache.resolve(ctx)?);
        Ok(dedupe(deps))
    }

    fn run(&self, ctx: &BuildContext) -> NativeResult<()> {
        let options = ctx.merge_options(&self.overrides)?;
        let inputs = self.cache.effective_inputs(ctx, &options)?;
        let object = self.output_path(ctx);
        ensure_parent_dir(&object)?;

        let toolchain = ctx.toolchain(&options)?;
        let cmd = ToolchainCommand::compile(self.language, &object, inputs.sources)
            .with_flags(inputs.flags)
            .with_include_dirs(inputs.include_dirs)
            .with_search_path(ctx.search_path(&options)?);

        info!(
            unit = %self.name(),
            toolchain = toolchain.name(),
            language = %self.language,
            "compiling"
        );
        produce(&object, || toolchain.compile(&cmd))
    }

    fn clean(&self, ctx: &BuildContext) -> NativeResult<()> {
        self.cache.clean(ctx)?;
        remove_if_exists(&self.output_path(ctx))
    }

    fn implicit_inputs(&self, ctx: &BuildContext) -> NativeResult<Vec<String>> {
        Ok(vec![format!("depends: {}", self.cache.signature(ctx)?)])
    }
}

/// Builder for [`CompileUnit`].
#[derive(Debug, Clone)]
pub struct CompileUnitBuilder {
    language: Language,
    object: PathBuf,
    sources: Vec<String>,
    includes: Vec<String>,
    flags: Vec<String>,
    dependencies: Vec<String>,
    options: OptionLayer,
}

impl CompileUnitBuilder {
    fn new<I, S>(language: Language, object: PathBuf, sources: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            language,
            object,
            sources: sources.into_iter().map(Into::into).collect(),
            includes: Vec::new(),
            flags: Vec::new(),
            dependencies: Vec::new(),
            options: OptionLayer::new(),
        }
    }

    /// Include directories searched before `native.include`.
    pub fn includes<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(dirs.into_iter().map(Into::into));
        self
    }

    /// Flags appended after the language flags from the options. Each value
    /// may hold several whitespace-separated flags.
    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    /// Extra prerequisites, e.g. a generated header's target output.
    pub fn dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    /// Per-target option overrides.
    pub fn options(mut self, options: OptionLayer) -> Self {
        self.options.extend(options);
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> NativeResult<CompileUnit> {
        if self.sources.is_empty() {
            return Err(ConfigError::EmptyInputs(path_string(&self.object)).into());
        }
        super::validate_overrides(&self.options)?;

        let sources = SourceSet::from_paths(&self.sources)?;
        let includes = SourceSet::from_paths(&self.includes)?;
        let dependencies = SourceSet::from_paths(&self.dependencies)?;
        let flags: Vec<Expr> = parse_exprs(&self.flags)?;

        let cache = DependencyCache::new(
            self.object.clone(),
            self.language,
            sources.clone(),
            flags,
            includes,
            self.options.clone(),
        );

        Ok(CompileUnit {
            object: self.object,
            language: self.language,
            sources,
            dependencies,
            overrides: self.options,
            cache,
        })
    }
}
