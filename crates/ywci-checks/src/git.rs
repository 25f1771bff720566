//! Working-tree cleanness check shared by the build and static-analysis actions.

use async_trait::async_trait;
use tracing::debug;
use ywci_core::{Check, CheckContext, Outcome, Result};

use crate::finding::{emit_all, Finding};
use crate::parsers::lines;

/// `git status -s` must exit 0 and print nothing.
#[derive(Debug, Clone)]
pub struct GitCleanness {
    title: String,
}

impl GitCleanness {
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into() }
    }
}

#[async_trait]
impl Check for GitCleanness {
    fn name(&self) -> &str {
        "cleanness"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let output = ctx.run(&ctx.command("git").args(["status", "-s"])).await?;

        if !output.success() {
            Finding::error(
                format!("Git cleanness exit with non-zero code {}", output.exit_code),
                self.title.as_str(),
            )
            .emit(ctx.annotator());
            return Ok(Outcome::Failure);
        }

        let findings = lines::git_status(output.lines(), &self.title);
        debug!(changes = findings.len(), "git status");
        emit_all(&findings, ctx.annotator());
        Ok(if findings.is_empty() {
            Outcome::Ok
        } else {
            Outcome::Failure
        })
    }
}
