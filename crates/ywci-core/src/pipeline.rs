//! Declarative check pipelines.

use crate::aggregator::{CheckAggregator, JobStatus, RunResult};
use crate::check::{Check, CheckContext};
use crate::error::Result;
use crate::outcome::SkipSet;
use tracing::info;

/// An ordered list of checks plus how to report their aggregate.
pub struct Pipeline {
    title: String,
    failure_message: String,
    checks: Vec<Box<dyn Check>>,
}

impl Pipeline {
    /// `title` groups annotations; `failure_message` is reported when any
    /// check fails.
    pub fn new(title: impl Into<String>, failure_message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            failure_message: failure_message.into(),
            checks: Vec::new(),
        }
    }

    pub fn with_check(mut self, check: impl Check + 'static) -> Self {
        self.checks.push(Box::new(check));
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn check_names(&self) -> Vec<&str> {
        self.checks.iter().map(|c| c.name()).collect()
    }

    /// Run the pipeline and report its status on the host.
    pub async fn execute(&self, ctx: &CheckContext, skips: SkipSet) -> Result<(RunResult, JobStatus)> {
        info!(title = %self.title, checks = ?self.check_names(), skips = ?skips, "Starting pipeline");
        ctx.annotator().debug("Starting action");

        let aggregator = CheckAggregator::new(self.title.clone(), skips);
        let result = aggregator.run_all(&self.checks, ctx).await?;
        let status = result.report(ctx.annotator(), &self.failure_message);
        Ok((result, status))
    }
}
