//! Linking objects into executables and shared libraries.

use std::path::{Path, PathBuf};

use native_props::{expand_all, Expr};
use native_toolchain::ToolchainCommand;
use serde_json::Value;
use tracing::info;

use super::{dedupe, ensure_parent_dir, expand_names, parse_exprs, produce, Target};
use crate::config::{expand_tokens, ConfigError, NativeOptions, OptionLayer};
use crate::context::BuildContext;
use crate::error::NativeResult;
use crate::pathset::{path_string, Dependency, SourceSet};

/// Links objects into an executable or a shared library.
#[derive(Debug, Clone)]
pub struct Link {
    output: PathBuf,
    objects: SourceSet,
    libs: Vec<Expr>,
    lib_paths: SourceSet,
    shared: bool,
    flags: Vec<Expr>,
    dependencies: SourceSet,
    overrides: OptionLayer,
}

/// Expanded link inputs for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInputs {
    pub objects: Vec<PathBuf>,
    /// Target libraries, then `native.libs`.
    pub libs: Vec<String>,
    /// Target library paths, then `native.libpaths`.
    pub lib_dirs: Vec<PathBuf>,
    /// `native.link.flags`, then the target's flags.
    pub flags: Vec<String>,
}

impl Link {
    pub fn executable<I, S>(output: impl Into<PathBuf>, objects: I) -> LinkBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LinkBuilder::new(output.into(), objects, false)
    }

    pub fn shared_library<I, S>(output: impl Into<PathBuf>, objects: I) -> LinkBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        LinkBuilder::new(output.into(), objects, true)
    }

    pub fn is_shared(&self) -> bool {
        self.shared
    }

    pub fn effective_inputs(
        &self,
        ctx: &BuildContext,
        options: &NativeOptions,
    ) -> NativeResult<LinkInputs> {
        let objects = self.objects.resolve(ctx)?;

        let mut libs = expand_names(&self.libs, ctx)?;
        libs.extend(expand_names(&parse_exprs(&options.libs)?, ctx)?);

        let mut lib_dirs = self.lib_paths.resolve(ctx)?;
        lib_dirs.extend(global_lib_dirs(ctx, options)?);

        let mut flags = expand_tokens(&options.link_flags, ctx.properties())?;
        for flag in &self.flags {
            flags.extend(flag.tokens(ctx.properties())?);
        }

        Ok(LinkInputs {
            objects,
            libs,
            lib_dirs,
            flags,
        })
    }
}

fn global_lib_dirs(ctx: &BuildContext, options: &NativeOptions) -> NativeResult<Vec<PathBuf>> {
    Ok(expand_all(&options.lib_paths, ctx.properties())?
        .into_iter()
        .map(|dir| ctx.resolve_path(dir))
        .collect())
}

fn join_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| path_string(p))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Target for Link {
    fn output(&self) -> &Path {
        &self.output
    }

    fn prerequisites(&self, ctx: &BuildContext) -> NativeResult<Vec<Dependency>> {
        let mut deps = self.objects.resolve_with_destinations(ctx)?;
        deps.extend(self.dependencies.resolve_with_destinations(ctx)?);
        Ok(dedupe(deps))
    }

    fn run(&self, ctx: &BuildContext) -> NativeResult<()> {
        let options = ctx.merge_options(&self.overrides)?;
        let inputs = self.effective_inputs(ctx, &options)?;
        let output = self.output_path(ctx);
        ensure_parent_dir(&output)?;

        let toolchain = ctx.toolchain(&options)?;
        let cmd = ToolchainCommand::link(&output, inputs.objects, self.shared)
            .with_flags(inputs.flags)
            .with_libs(inputs.libs, inputs.lib_dirs)
            .with_search_path(ctx.search_path(&options)?);

        info!(
            unit = %self.name(),
            toolchain = toolchain.name(),
            shared = self.shared,
            "linking"
        );
        produce(&output, || toolchain.link(&cmd))
    }

    fn implicit_inputs(&self, ctx: &BuildContext) -> NativeResult<Vec<String>> {
        let options = ctx.merge_options(&self.overrides)?;
        let inputs = self.effective_inputs(ctx, &options)?;
        Ok(vec![
            format!("libs: [{}]", inputs.libs.join(", ")),
            format!("libpaths: [{}]", join_paths(&self.lib_paths.resolve(ctx)?)),
            format!(
                "native.libpaths: [{}]",
                join_paths(&global_lib_dirs(ctx, &options)?)
            ),
            format!("shared: {}, flags=[{}]", self.shared, inputs.flags.join(" ")),
        ])
    }
}

/// Builder for [`Link`].
#[derive(Debug, Clone)]
pub struct LinkBuilder {
    output: PathBuf,
    objects: Vec<String>,
    libs: Vec<String>,
    lib_paths: Vec<String>,
    shared: bool,
    flags: Vec<String>,
    dependencies: Vec<String>,
    options: OptionLayer,
}

impl LinkBuilder {
    fn new<I, S>(output: PathBuf, objects: I, shared: bool) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output,
            objects: objects.into_iter().map(Into::into).collect(),
            libs: Vec::new(),
            lib_paths: Vec::new(),
            shared,
            flags: Vec::new(),
            dependencies: Vec::new(),
            options: OptionLayer::new(),
        }
    }

    /// Platform-neutral library names; `${NAMES[]}` expands to several.
    pub fn libs<I, S>(mut self, libs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.libs.extend(libs.into_iter().map(Into::into));
        self
    }

    pub fn lib_paths<I, S>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lib_paths.extend(dirs.into_iter().map(Into::into));
        self
    }

    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn dependencies<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn options(mut self, options: OptionLayer) -> Self {
        self.options.extend(options);
        self
    }

    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    pub fn build(self) -> NativeResult<Link> {
        if self.objects.is_empty() {
            return Err(ConfigError::EmptyInputs(path_string(&self.output)).into());
        }
        super::validate_overrides(&self.options)?;

        Ok(Link {
            objects: SourceSet::from_paths(&self.objects)?,
            libs: parse_exprs(&self.libs)?,
            lib_paths: SourceSet::from_paths(&self.lib_paths)?,
            shared: self.shared,
            flags: parse_exprs(&self.flags)?,
            dependencies: SourceSet::from_paths(&self.dependencies)?,
            overrides: self.options,
            output: self.output,
        })
    }
}
