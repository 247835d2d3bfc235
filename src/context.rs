//! Build context threaded through every target operation.
//!
//! The context is assembled once while the build graph is initialized and
//! is immutable afterwards, so it can be shared by worker threads running
//! different targets.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use native_props::{expand_all, Expr, Properties};
use native_toolchain::{Toolchain, ToolchainFamily};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::config::{
    merge_layers, merge_options, BuildConfig, BuiltinDefaults, ConfigError, ConfigOrigin,
    ConfigSource, NativeOptions, OptionLayer,
};
use crate::error::{NativeError, NativeResult};
use crate::naming::Platform;

/// Default work directory, relative to the base directory.
const DEFAULT_WORK_DIR: &str = ".native-work";

/// Immutable per-build state.
#[derive(Debug)]
pub struct BuildContext {
    base_dir: PathBuf,
    work_root: PathBuf,
    platform: Platform,
    properties: Properties,
    global_options: OptionLayer,
    targets: BTreeSet<String>,
    toolchains: BTreeMap<String, Arc<dyn Toolchain>>,
    config_sources: Vec<ConfigSource>,
}

impl BuildContext {
    pub fn builder(base_dir: impl Into<PathBuf>) -> BuildContextBuilder {
        BuildContextBuilder::new(base_dir)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn work_root(&self) -> &Path {
        &self.work_root
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn properties(&self) -> &Properties {
        &self.properties
    }

    pub fn config_sources(&self) -> &[ConfigSource] {
        &self.config_sources
    }

    /// Expand property references in `value`.
    pub fn expand(&self, value: &str) -> NativeResult<String> {
        Ok(Expr::parse(value)?.expand(&self.properties)?)
    }

    /// Anchor a relative path at the base directory.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        self.base_dir.join(path)
    }

    /// Whether `name` is the output of a registered target.
    pub fn is_target(&self, name: &str) -> bool {
        self.targets.contains(name)
    }

    /// Global options with no target overrides applied.
    pub fn global_options(&self) -> NativeResult<NativeOptions> {
        Ok(NativeOptions::from_layer(&self.global_options)?)
    }

    /// Effective options for a target: global values, then `overrides`.
    pub fn merge_options(&self, overrides: &OptionLayer) -> NativeResult<NativeOptions> {
        Ok(NativeOptions::from_layer(&merge_options(
            &self.global_options,
            overrides,
        ))?)
    }

    /// Toolchain selected by `native.compilers`.
    pub fn toolchain(&self, options: &NativeOptions) -> NativeResult<Arc<dyn Toolchain>> {
        let name = self.expand(&options.compilers)?;
        self.toolchains
            .get(&name)
            .cloned()
            .ok_or(NativeError::UnknownToolchain(name))
    }

    /// Compiler search directories from `native.cxx.path`.
    pub fn search_path(&self, options: &NativeOptions) -> NativeResult<Vec<PathBuf>> {
        Ok(expand_all(&options.compiler_path, &self.properties)?
            .into_iter()
            .map(|dir| self.resolve_path(dir))
            .collect())
    }

    /// Work directory owned by the target producing `output`.
    ///
    /// Derived from the full output path, so distinct outputs never share a
    /// directory even when their file names collide.
    pub fn work_dir_for(&self, output: &Path) -> PathBuf {
        let full = self.resolve_path(output);
        let digest = hex::encode(Sha256::digest(full.to_string_lossy().as_bytes()));
        let stem = full
            .file_name()
            .map(|n| sanitize(&n.to_string_lossy()))
            .unwrap_or_else(|| "target".to_string());
        self.work_root.join(format!("{}-{}", stem, &digest[..12]))
    }
}

/// Replace anything outside `[A-Za-z0-9._-]` with an underscore.
fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Builder for [`BuildContext`].
#[derive(Debug)]
pub struct BuildContextBuilder {
    base_dir: PathBuf,
    work_root: Option<PathBuf>,
    platform: Platform,
    config: BuildConfig,
    toolchains: BTreeMap<String, Arc<dyn Toolchain>>,
    targets: Vec<PathBuf>,
    error: Option<ConfigError>,
}

impl BuildContextBuilder {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            work_root: None,
            platform: Platform::host(),
            config: BuildConfig::new(),
            toolchains: BTreeMap::new(),
            targets: Vec::new(),
            error: None,
        }
    }

    pub fn work_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.work_root = Some(dir.into());
        self
    }

    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    /// Layer a loaded configuration over what has been set so far.
    pub fn config(mut self, config: BuildConfig) -> Self {
        self.config = std::mem::take(&mut self.config).merged_with(config);
        self
    }

    pub fn property(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.properties.set(name, value);
        self
    }

    pub fn property_list<I, S>(mut self, name: impl Into<String>, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.properties.set_list(name, items);
        self
    }

    /// Set a global option. Unknown names fail at [`build`](Self::build).
    pub fn option(mut self, key: &str, value: impl Into<Value>) -> Self {
        match std::mem::take(&mut self.config).with_option(key, value) {
            Ok(config) => self.config = config,
            Err(e) => {
                self.error.get_or_insert(e);
            }
        }
        self
    }

    /// Register a toolchain under `name`, replacing any built-in family of
    /// the same name.
    pub fn toolchain(mut self, name: impl Into<String>, toolchain: Arc<dyn Toolchain>) -> Self {
        self.toolchains.insert(name.into(), toolchain);
        self
    }

    /// Declare the output of a target in the build graph.
    pub fn target(mut self, output: impl Into<PathBuf>) -> Self {
        self.targets.push(output.into());
        self
    }

    pub fn build(self) -> NativeResult<BuildContext> {
        if let Some(e) = self.error {
            return Err(e.into());
        }

        let defaults = BuiltinDefaults::for_platform(self.platform).to_layer();
        let global_options = merge_layers([&defaults, &self.config.options]);
        NativeOptions::from_layer(&global_options)?;

        let mut toolchains = self.toolchains;
        for family in ToolchainFamily::ALL {
            toolchains
                .entry(family.as_str().to_string())
                .or_insert_with(|| family.instantiate());
        }

        let work_root = self
            .work_root
            .unwrap_or_else(|| self.base_dir.join(DEFAULT_WORK_DIR));
        let targets = self
            .targets
            .iter()
            .map(|t| self.base_dir.join(t).to_string_lossy().into_owned())
            .collect();

        let mut config_sources = vec![ConfigSource {
            origin: ConfigOrigin::Builtin,
            path: None,
            digest: None,
        }];
        config_sources.extend(self.config.sources);

        Ok(BuildContext {
            base_dir: self.base_dir,
            work_root,
            platform: self.platform,
            properties: self.config.properties,
            global_options,
            targets,
            toolchains,
            config_sources,
        })
    }
}
