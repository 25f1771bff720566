//! Checks for TypeScript packages installed with yarn.

use async_trait::async_trait;
use tracing::{debug, info};
use ywci_core::{ActionError, Check, CheckContext, CommandOutput, OutputMode, Outcome, Result};

use crate::finding::{emit_all, Finding};
use crate::parsers::{eslint, lines, yarn_audit, AdvisoryLedger};

fn json_records(tool: &str, output: &CommandOutput) -> Result<Vec<serde_json::Value>> {
    output
        .json_lines()
        .map_err(|e| ActionError::tool_output(tool, e.to_string()))
}

/// `yarn audit`, failing on advisories not in the accepted GHSA list.
#[derive(Debug, Clone, Default)]
pub struct YarnAudit {
    accepted_ghsa_ids: Vec<String>,
}

impl YarnAudit {
    pub fn new(accepted_ghsa_ids: Vec<String>) -> Self {
        Self { accepted_ghsa_ids }
    }
}

#[async_trait]
impl Check for YarnAudit {
    fn name(&self) -> &str {
        "audit"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let output = ctx.run(&ctx.command("yarn").args(["-s", "audit", "--json"])).await?;
        let records = json_records("yarn audit", &output)?;

        let mut ledger = AdvisoryLedger::new(self.accepted_ghsa_ids.iter().cloned());
        let findings = yarn_audit::parse(&records, &mut ledger)?;
        emit_all(&findings, ctx.annotator());
        emit_all(&yarn_audit::unseen_accepted(&ledger), ctx.annotator());

        // yarn audit exits non-zero whenever anything is found, accepted or not.
        if output.success() || !ledger.has_fatal() {
            Ok(Outcome::Ok)
        } else {
            Ok(Outcome::Failure)
        }
    }
}

/// `eslint` with JSON output mapped to annotations.
#[derive(Debug, Clone, Copy, Default)]
pub struct Eslint;

#[async_trait]
impl Check for Eslint {
    fn name(&self) -> &str {
        "eslint"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let output = ctx
            .run(&ctx.command("yarn").args(["-s", "eslint", ".", "-f", "json"]))
            .await?;
        let records = json_records("eslint", &output)?;
        let findings = eslint::parse(&records, ctx.work_dir())?;
        debug!(findings = findings.len(), exit_code = output.exit_code, "eslint done");
        emit_all(&findings, ctx.annotator());
        Ok(Outcome::from_exit_code(output.exit_code))
    }
}

/// `prettier --list-different`: every listed file is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct Prettier;

#[async_trait]
impl Check for Prettier {
    fn name(&self) -> &str {
        "prettier"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let output = ctx
            .run(&ctx.command("yarn").args(["-s", "prettier", "--list-different", "."]))
            .await?;
        emit_all(&lines::prettier(output.lines()), ctx.annotator());
        Ok(Outcome::from_exit_code(output.exit_code))
    }
}

/// A `yarn <script>` build step.
#[derive(Debug, Clone)]
pub struct YarnScript {
    name: String,
    script: String,
}

impl YarnScript {
    /// Check `name` running `yarn <script>`.
    pub fn new(name: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: script.into(),
        }
    }

    pub fn autogen() -> Self {
        Self::new("autogen", "auto-gen")
    }

    pub fn build() -> Self {
        Self::new("build", "build")
    }

    pub fn doc() -> Self {
        Self::new("doc", "doc")
    }
}

#[async_trait]
impl Check for YarnScript {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let output = ctx.run(&ctx.command("yarn").arg(self.script.as_str())).await?;
        if output.success() {
            let log = output.stdout.trim_end();
            if !log.is_empty() {
                ctx.annotator().info(log);
            }
            return Ok(Outcome::Ok);
        }
        Finding::error(
            format!("Failure:\n{}", output.stdout),
            format!("Build: {}", self.name),
        )
        .emit(ctx.annotator());
        Ok(Outcome::Failure)
    }
}

/// `yarn test` (or `yarn test-coverage`), streamed to the job log.
#[derive(Debug, Clone, Copy, Default)]
pub struct YarnTests {
    coverage: bool,
}

impl YarnTests {
    pub fn new(coverage: bool) -> Self {
        Self { coverage }
    }
}

#[async_trait]
impl Check for YarnTests {
    fn name(&self) -> &str {
        "tests"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let script = if self.coverage { "test-coverage" } else { "test" };
        info!(script, "Running tests");
        let output = ctx
            .run(&ctx.command("yarn").arg(script).output(OutputMode::Inherit))
            .await?;
        Ok(Outcome::from_exit_code(output.exit_code))
    }
}
