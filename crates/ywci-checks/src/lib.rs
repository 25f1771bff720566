//! ywci checks - tool wrappers and action pipelines
//!
//! Every tool is wrapped as a [`ywci_core::Check`]: one command through the
//! process boundary, one pure parser in [`parsers`], findings emitted as
//! annotations. [`actions`] assembles them into the pipelines each action
//! runs; [`youwol`] starts and stops a py-youwol server around a job.

pub mod actions;
pub mod finding;
pub mod git;
pub mod health;
pub mod parsers;
pub mod py;
pub mod ts;
pub mod youwol;

pub use finding::Finding;
pub use git::GitCleanness;
pub use health::{HealthPoller, HealthProbe, HttpProbe, PollOutcome, ProbeResponse};
pub use youwol::{ArtifactManifest, PreparedPaths, RunConfig, RunState};

use std::path::Path;
use ywci_core::{ActionError, Result};

/// A path as a command-line argument.
pub(crate) fn path_arg(path: &Path) -> Result<String> {
    path.to_str()
        .map(str::to_string)
        .ok_or_else(|| ActionError::NonUtf8Path(path.to_path_buf()))
}
