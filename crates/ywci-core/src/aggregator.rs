//! Multi-check aggregation: skip-list gating, grouping, and overall status.

use crate::annotate::{AnnotationProperties, Annotator};
use crate::check::{Check, CheckContext};
use crate::error::{ActionError, Result};
use crate::outcome::{Outcome, SkipSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::info;

/// Outcome of one check within a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CheckRecord {
    pub name: String,
    pub outcome: Outcome,
    /// Wall-clock time spent in the check (0 when skipped).
    pub duration_ms: u64,
}

/// Ordered outcomes of one invocation plus the derived overall status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    pub title: String,
    pub records: Vec<CheckRecord>,
    pub overall: Outcome,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl RunResult {
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.records.iter().map(|r| r.outcome).collect()
    }

    pub fn outcome_of(&self, name: &str) -> Option<Outcome> {
        self.records.iter().find(|r| r.name == name).map(|r| r.outcome)
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }

    /// Render the run as a Markdown table for the job summary.
    pub fn to_markdown(&self) -> String {
        let mut md = format!("### {}\n\n", self.title);
        md.push_str("| Check | Outcome | Duration |\n");
        md.push_str("|---|---|---|\n");
        for record in &self.records {
            let icon = match record.outcome {
                Outcome::Ok => "✅",
                Outcome::Failure => "❌",
                Outcome::Skipped => "⚠️",
            };
            md.push_str(&format!(
                "| {} | {} {} | {}ms |\n",
                record.name, icon, record.outcome, record.duration_ms
            ));
        }
        md.push_str(&format!(
            "\n**Overall: {}** ({} ok, {} failed, {} skipped)\n",
            self.overall,
            self.count(Outcome::Ok),
            self.count(Outcome::Failure),
            self.count(Outcome::Skipped)
        ));
        md
    }
}

/// Runs checks one after the other under a shared skip set.
pub struct CheckAggregator {
    title: String,
    skips: SkipSet,
}

impl CheckAggregator {
    /// `title` prefixes annotation titles, e.g. `Static Analysis: eslint`.
    pub fn new(title: impl Into<String>, skips: SkipSet) -> Self {
        Self {
            title: title.into(),
            skips,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn skips(&self) -> &SkipSet {
        &self.skips
    }

    /// Run a single check unless it is skip-listed.
    ///
    /// A skip-listed check is never started. Errors from the check are not
    /// caught; the group is closed and the error propagates.
    pub async fn run_check(&self, check: &dyn Check, ctx: &CheckContext) -> Result<Outcome> {
        let name = check.name();
        let annotator = ctx.annotator();
        if self.skips.contains(name) {
            info!(check = %name, "Skipping check");
            annotator.warning(
                &format!("Skipping {name} check"),
                &AnnotationProperties::titled(format!("{}: {name}", self.title)),
            );
            return Ok(Outcome::Skipped);
        }

        info!(check = %name, "Executing check");
        annotator.start_group(name);
        let result = check.run(ctx).await;
        annotator.end_group();
        let outcome = result?;
        info!(check = %name, outcome = %outcome, "Check finished");
        Ok(outcome)
    }

    /// Run every check in order and derive the overall status.
    ///
    /// Check names must be unique. The first error aborts the run; checks
    /// after it are not executed.
    pub async fn run_all(&self, checks: &[Box<dyn Check>], ctx: &CheckContext) -> Result<RunResult> {
        let mut seen = HashSet::new();
        for check in checks {
            if !seen.insert(check.name()) {
                return Err(ActionError::InvalidInput {
                    name: "checks".to_string(),
                    reason: format!("duplicate check name '{}'", check.name()),
                });
            }
        }

        let started_at = Utc::now();
        let mut records = Vec::with_capacity(checks.len());
        for check in checks {
            let start = Instant::now();
            let outcome = self.run_check(check.as_ref(), ctx).await?;
            let duration_ms = match outcome {
                Outcome::Skipped => 0,
                _ => start.elapsed().as_millis() as u64,
            };
            records.push(CheckRecord {
                name: check.name().to_string(),
                outcome,
                duration_ms,
            });
        }

        let overall = Outcome::overall(records.iter().map(|r| &r.outcome));
        info!(title = %self.title, overall = %overall, checks = records.len(), "Run finished");
        Ok(RunResult {
            title: self.title.clone(),
            records,
            overall,
            started_at,
            finished_at: Utc::now(),
        })
    }
}

/// What an action reports back to the entry point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Succeeded,
    /// Checks ran and reported problems; carries the job failure message.
    Failed(String),
}

impl JobStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Succeeded)
    }
}

impl RunResult {
    /// Surface the overall status on the host.
    ///
    /// Skips are always surfaced as a warning, even next to a failure.
    pub fn report(&self, annotator: &dyn Annotator, failure_message: &str) -> JobStatus {
        if self.count(Outcome::Skipped) > 0 {
            annotator.warning(
                "Some checks skipped",
                &AnnotationProperties::titled(self.title.clone()),
            );
        }
        match self.overall {
            Outcome::Failure => JobStatus::Failed(failure_message.to_string()),
            Outcome::Ok | Outcome::Skipped => JobStatus::Succeeded,
        }
    }
}
