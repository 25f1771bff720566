//! Check definitions and the context they run in.

use crate::annotate::Annotator;
use crate::error::Result;
use crate::outcome::Outcome;
use crate::process::{CommandOutput, CommandSpec, ProcessRunner};
use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Everything a check needs from its environment.
///
/// The working directory is carried here instead of being set process-wide,
/// so every command a check spawns names its directory explicitly.
#[derive(Clone)]
pub struct CheckContext {
    work_dir: PathBuf,
    annotator: Arc<dyn Annotator>,
    runner: Arc<dyn ProcessRunner>,
}

impl CheckContext {
    pub fn new(
        work_dir: impl Into<PathBuf>,
        annotator: Arc<dyn Annotator>,
        runner: Arc<dyn ProcessRunner>,
    ) -> Self {
        Self {
            work_dir: work_dir.into(),
            annotator,
            runner,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub fn annotator(&self) -> &dyn Annotator {
        self.annotator.as_ref()
    }

    pub fn runner(&self) -> &dyn ProcessRunner {
        self.runner.as_ref()
    }

    /// Same collaborators, different working directory.
    pub fn with_work_dir(&self, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            annotator: Arc::clone(&self.annotator),
            runner: Arc::clone(&self.runner),
        }
    }

    /// Start a command rooted at the context's working directory.
    pub fn command(&self, program: impl Into<String>) -> CommandSpec {
        CommandSpec::new(program).cwd(&self.work_dir)
    }

    /// Run a command through the context's process runner.
    pub async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        self.runner.run(spec).await
    }
}

/// A named verification step producing one [`Outcome`].
///
/// Returning `Err` means something unexpected happened (the tool could not be
/// spawned, its output was unreadable); the run is aborted. Problems the tool
/// reports are `Ok(Outcome::Failure)`.
#[async_trait]
pub trait Check: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome>;
}

type CheckFn = dyn Fn(CheckContext) -> BoxFuture<'static, Result<Outcome>> + Send + Sync;

/// A check backed by a closure.
pub struct FnCheck {
    name: String,
    op: Box<CheckFn>,
}

/// Build a [`Check`] from a name and an async closure.
pub fn check_fn<F, Fut>(name: impl Into<String>, op: F) -> FnCheck
where
    F: Fn(CheckContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Outcome>> + Send + 'static,
{
    FnCheck {
        name: name.into(),
        op: Box::new(move |ctx| op(ctx).boxed()),
    }
}

#[async_trait]
impl Check for FnCheck {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        (self.op)(ctx.clone()).await
    }
}
