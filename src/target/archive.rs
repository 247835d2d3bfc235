//! Static archives.

use std::path::{Path, PathBuf};

use native_toolchain::ToolchainCommand;
use tracing::info;

use super::{ensure_parent_dir, produce, Target};
use crate::config::ConfigError;
use crate::context::BuildContext;
use crate::error::NativeResult;
use crate::pathset::{path_string, Dependency, SourceSet};

/// Collects objects into a static archive.
///
/// Member order is part of the artifact, so reordering the objects makes
/// the target stale.
#[derive(Debug, Clone)]
pub struct Archive {
    output: PathBuf,
    objects: SourceSet,
}

impl Archive {
    pub fn new<I, S>(output: impl Into<PathBuf>, objects: I) -> NativeResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let output = output.into();
        let objects = SourceSet::from_paths(objects)?;
        if objects.is_empty() {
            return Err(ConfigError::EmptyInputs(path_string(&output)).into());
        }
        Ok(Self { output, objects })
    }
}

impl Target for Archive {
    fn output(&self) -> &Path {
        &self.output
    }

    fn prerequisites(&self, ctx: &BuildContext) -> NativeResult<Vec<Dependency>> {
        self.objects.resolve_with_destinations(ctx)
    }

    fn run(&self, ctx: &BuildContext) -> NativeResult<()> {
        let options = ctx.global_options()?;
        let output = self.output_path(ctx);
        ensure_parent_dir(&output)?;

        let toolchain = ctx.toolchain(&options)?;
        let cmd = ToolchainCommand::archive(&output, self.objects.resolve(ctx)?)
            .with_search_path(ctx.search_path(&options)?);

        info!(unit = %self.name(), toolchain = toolchain.name(), "archiving");
        produce(&output, || toolchain.archive(&cmd))
    }

    fn implicit_inputs(&self, _ctx: &BuildContext) -> NativeResult<Vec<String>> {
        Ok(vec![format!("objects: {}", self.objects.describe())])
    }
}
