//! Staleness verdicts for a single target.
//!
//! The build engine owns scheduling; this helper folds the same signals it
//! would use (output presence, prerequisite timestamps, implicit-input
//! digest) into one answer so callers and tests can ask "would this
//! rebuild?".

use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::SystemTime;

use super::Target;
use crate::context::BuildContext;
use crate::error::NativeResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    OutputMissing,
    /// A prerequisite changed after the output was written.
    PrerequisiteNewer(PathBuf),
    /// Implicit inputs differ from the digest recorded at the last build.
    InputsChanged,
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::OutputMissing => write!(f, "output does not exist"),
            StaleReason::PrerequisiteNewer(p) => {
                write!(f, "{} is newer than the output", p.display())
            }
            StaleReason::InputsChanged => write!(f, "implicit inputs changed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    UpToDate,
    Stale(StaleReason),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }
}

/// Decide whether `target` needs to run.
///
/// `recorded_digest` is the [`Target::implicit_inputs_digest`] stored after
/// the last successful run; `None` means no build has been recorded.
/// Resolving prerequisites may regenerate a compile unit's dependency
/// record.
pub fn check_staleness(
    target: &dyn Target,
    ctx: &BuildContext,
    recorded_digest: Option<&str>,
) -> NativeResult<Staleness> {
    let output = target.output_path(ctx);
    let Some(built) = modified(&output) else {
        return Ok(Staleness::Stale(StaleReason::OutputMissing));
    };

    let digest = target.implicit_inputs_digest(ctx)?;
    if recorded_digest != Some(digest.as_str()) {
        return Ok(Staleness::Stale(StaleReason::InputsChanged));
    }

    for dep in target.prerequisites(ctx)? {
        if modified(&dep.path).is_some_and(|t| t > built) {
            return Ok(Staleness::Stale(StaleReason::PrerequisiteNewer(dep.path)));
        }
    }

    Ok(Staleness::UpToDate)
}

fn modified(path: &std::path::Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}
