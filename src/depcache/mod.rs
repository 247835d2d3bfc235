//! Cached header discovery for compile units.
//!
//! Scanning spawns the compiler's preprocessor, so the result is persisted
//! per target at `<work dir>.makedepend` and reused while it is still
//! trustworthy. A record is trusted when, in order:
//! 1. it exists,
//! 2. every primary source exists (otherwise only the structural
//!    dependencies are returned, without scanning),
//! 3. no primary source is newer than the record,
//! 4. its first line equals the current [`IdentitySignature`],
//! 5. every entry is an existing path or a registered target, and no entry
//!    is newer than the record.
//!
//! The first failing check decides; anything other than a trusted record or
//! a missing source triggers a rescan and an atomic rewrite.

mod record;
mod signature;

pub use record::DependencyRecord;
pub use signature::IdentitySignature;

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant, SystemTime};

use native_props::Expr;
use native_toolchain::{Language, ToolchainCommand};
use tracing::{debug, info, warn};

use crate::config::{NativeOptions, OptionLayer};
use crate::context::BuildContext;
use crate::error::{NativeError, NativeResult};
use crate::pathset::{path_string, Dependency, SourceSet};

/// Scans slower than this are reported; they usually mean a misconfigured
/// target (e.g. an include path pointing at a huge tree).
pub const SLOW_SCAN_THRESHOLD: Duration = Duration::from_secs(5);

/// Fully expanded inputs of one compile or scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileInputs {
    pub sources: Vec<PathBuf>,
    /// Language flags from the options, then the target's own flags.
    pub flags: Vec<String>,
    /// Target includes, then `native.include`.
    pub include_dirs: Vec<PathBuf>,
}

/// Why a cached record was not trusted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidReason {
    NoRecord,
    SourceNewer(PathBuf),
    SignatureChanged { cached: String, current: String },
    MissingEntry(String),
    EntryNewer(String),
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidReason::NoRecord => write!(f, "no cached dependency record"),
            InvalidReason::SourceNewer(p) => {
                write!(f, "source {} is newer than the cached record", p.display())
            }
            InvalidReason::SignatureChanged { cached, current } => {
                write!(f, "target options changed ({cached} != {current})")
            }
            InvalidReason::MissingEntry(e) => write!(f, "dependency {e} is missing"),
            InvalidReason::EntryNewer(e) => {
                write!(f, "dependency {e} is newer than the cached record")
            }
        }
    }
}

/// Outcome of checking the cached record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheStatus {
    /// Record trusted; its entries in order.
    Valid(Vec<String>),
    /// A primary source does not exist; no scan is attempted.
    Degraded { missing: PathBuf },
    Invalid(InvalidReason),
}

/// Dependency cache of one compile unit.
#[derive(Debug, Clone)]
pub struct DependencyCache {
    name: String,
    output: PathBuf,
    language: Language,
    sources: SourceSet,
    flags: Vec<Expr>,
    includes: SourceSet,
    overrides: OptionLayer,
    slow_scan_threshold: Duration,
}

impl DependencyCache {
    pub(crate) fn new(
        output: PathBuf,
        language: Language,
        sources: SourceSet,
        flags: Vec<Expr>,
        includes: SourceSet,
        overrides: OptionLayer,
    ) -> Self {
        Self {
            name: path_string(&output),
            output,
            language,
            sources,
            flags,
            includes,
            overrides,
            slow_scan_threshold: SLOW_SCAN_THRESHOLD,
        }
    }

    #[cfg(test)]
    fn with_slow_scan_threshold(mut self, threshold: Duration) -> Self {
        self.slow_scan_threshold = threshold;
        self
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn sources(&self) -> &SourceSet {
        &self.sources
    }

    pub fn record_path(&self, ctx: &BuildContext) -> PathBuf {
        let mut path = ctx.work_dir_for(&self.output).into_os_string();
        path.push(".makedepend");
        PathBuf::from(path)
    }

    /// Expand sources, flags and include paths against `options`.
    pub fn effective_inputs(
        &self,
        ctx: &BuildContext,
        options: &NativeOptions,
    ) -> NativeResult<CompileInputs> {
        let props = ctx.properties();

        let sources = self.sources.resolve(ctx)?;

        let mut flags = crate::config::expand_tokens(options.flags_for(self.language), props)?;
        for flag in &self.flags {
            flags.extend(flag.tokens(props)?);
        }

        let mut include_dirs = self.includes.resolve(ctx)?;
        for include in &options.include {
            for dir in Expr::parse(include)?.expand_list(props)? {
                include_dirs.push(ctx.resolve_path(dir));
            }
        }

        Ok(CompileInputs {
            sources,
            flags,
            include_dirs,
        })
    }

    /// Current identity signature.
    pub fn signature(&self, ctx: &BuildContext) -> NativeResult<IdentitySignature> {
        let options = ctx.merge_options(&self.overrides)?;
        let inputs = self.effective_inputs(ctx, &options)?;
        Ok(signature_of(&inputs)?)
    }

    /// Check the cached record without scanning.
    pub fn status(&self, ctx: &BuildContext) -> NativeResult<CacheStatus> {
        let options = ctx.merge_options(&self.overrides)?;
        let inputs = self.effective_inputs(ctx, &options)?;
        let signature = signature_of(&inputs)?;
        Ok(self.evaluate(ctx, &inputs, &signature))
    }

    /// Dependencies as `(path, display name)` pairs for the engine.
    pub fn resolve(&self, ctx: &BuildContext) -> NativeResult<Vec<Dependency>> {
        Ok(self
            .dependencies(ctx)?
            .into_iter()
            .map(Dependency::from_path)
            .collect())
    }

    /// Every file the unit transitively depends on, scanning if needed.
    pub fn dependencies(&self, ctx: &BuildContext) -> NativeResult<Vec<String>> {
        let options = ctx.merge_options(&self.overrides)?;
        let inputs = self.effective_inputs(ctx, &options)?;
        let signature = signature_of(&inputs)?;
        let structural = self.sources.structural_dependencies(ctx)?;

        let reason = match self.evaluate(ctx, &inputs, &signature) {
            CacheStatus::Valid(mut entries) => {
                debug!(unit = %self.name, count = entries.len(), "using cached dependencies");
                merge_unseen(&mut entries, structural);
                return Ok(entries);
            }
            CacheStatus::Degraded { missing } => {
                warn!(
                    unit = %self.name,
                    source = %missing.display(),
                    "source missing, returning structural dependencies only"
                );
                return Ok(structural);
            }
            CacheStatus::Invalid(reason) => reason,
        };

        match &reason {
            InvalidReason::MissingEntry(_) => {
                warn!(unit = %self.name, %reason, "rebuilding dependencies")
            }
            _ => info!(unit = %self.name, %reason, "rebuilding dependencies"),
        }

        let mut entries = self.scan(ctx, &options, &inputs)?;
        merge_unseen(&mut entries, structural);
        DependencyRecord::write(&self.record_path(ctx), &signature, &entries)?;
        Ok(entries)
    }

    /// Delete the cached record; a missing record is not an error.
    pub fn clean(&self, ctx: &BuildContext) -> NativeResult<()> {
        let path = self.record_path(ctx);
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(unit = %self.name, path = %path.display(), "removed dependency record");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(NativeError::io(&path, e)),
        }
    }

    fn evaluate(
        &self,
        ctx: &BuildContext,
        inputs: &CompileInputs,
        signature: &IdentitySignature,
    ) -> CacheStatus {
        let record = DependencyRecord::read(&self.record_path(ctx));

        if let Some(missing) = inputs.sources.iter().find(|s| !s.exists()) {
            return CacheStatus::Degraded {
                missing: missing.clone(),
            };
        }

        let Some(record) = record else {
            return CacheStatus::Invalid(InvalidReason::NoRecord);
        };

        if let Some(newer) = inputs
            .sources
            .iter()
            .find(|s| is_newer(s, record.modified))
        {
            return CacheStatus::Invalid(InvalidReason::SourceNewer(newer.clone()));
        }

        if record.signature != signature.as_str() {
            return CacheStatus::Invalid(InvalidReason::SignatureChanged {
                cached: record.signature,
                current: signature.to_string(),
            });
        }

        for entry in &record.entries {
            let path = Path::new(entry);
            if path.exists() {
                if is_newer(path, record.modified) {
                    return CacheStatus::Invalid(InvalidReason::EntryNewer(entry.clone()));
                }
            } else if !ctx.is_target(entry) {
                return CacheStatus::Invalid(InvalidReason::MissingEntry(entry.clone()));
            }
        }

        CacheStatus::Valid(record.entries)
    }

    fn scan(
        &self,
        ctx: &BuildContext,
        options: &NativeOptions,
        inputs: &CompileInputs,
    ) -> NativeResult<Vec<String>> {
        let toolchain = ctx.toolchain(options)?;
        let cmd = ToolchainCommand::scan(self.language, inputs.sources.clone())
            .with_flags(inputs.flags.clone())
            .with_include_dirs(inputs.include_dirs.clone())
            .with_search_path(ctx.search_path(options)?);

        info!(unit = %self.name, toolchain = toolchain.name(), "generating dependencies");
        let started = Instant::now();
        let scanned = toolchain.scan_dependencies(&cmd)?;
        let elapsed = started.elapsed();
        if elapsed > self.slow_scan_threshold {
            warn!(
                unit = %self.name,
                elapsed_secs = format_args!("{:.1}", elapsed.as_secs_f64()),
                "dependency generation took a long time"
            );
        }

        let mut entries = Vec::with_capacity(scanned.len());
        merge_unseen(
            &mut entries,
            scanned
                .into_iter()
                .map(|p| path_string(&ctx.resolve_path(p))),
        );
        Ok(entries)
    }
}

fn signature_of(inputs: &CompileInputs) -> Result<IdentitySignature, crate::config::ConfigError> {
    IdentitySignature::from_inputs(&inputs.sources, &inputs.flags, &inputs.include_dirs)
}

fn is_newer(path: &Path, than: SystemTime) -> bool {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_or(false, |t| t > than)
}

/// Append entries of `extra` not already in `entries`, keeping order.
fn merge_unseen(entries: &mut Vec<String>, extra: impl IntoIterator<Item = String>) {
    for entry in extra {
        if !entries.contains(&entry) {
            entries.push(entry);
        }
    }
}
