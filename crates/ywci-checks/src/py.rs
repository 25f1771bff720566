//! Checks for the py-youwol sources.

use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use tracing::{debug, warn};
use ywci_core::{ActionError, AnnotationProperties, Check, CheckContext, OutputMode, Outcome, Result};

use crate::finding::emit_all;
use crate::parsers::{lines, pip_audit, pylint, AdvisoryLedger};
use crate::path_arg;

/// Directory, relative to the sources, holding a checkout of the main branch.
pub const MAIN_BRANCH_DIR: &str = ".py-youwol_main";

/// `pycodestyle .`
#[derive(Debug, Clone, Copy, Default)]
pub struct Pycodestyle;

#[async_trait]
impl Check for Pycodestyle {
    fn name(&self) -> &str {
        "pycodestyle"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let output = ctx.run(&ctx.command("pycodestyle").arg(".")).await?;
        emit_all(&lines::pycodestyle(output.lines(), ctx.work_dir()), ctx.annotator());
        Ok(Outcome::from_exit_code(output.exit_code))
    }
}

/// `isort --check-only .`
#[derive(Debug, Clone, Copy, Default)]
pub struct Isort;

#[async_trait]
impl Check for Isort {
    fn name(&self) -> &str {
        "isort"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let output = ctx.run(&ctx.command("isort").args(["--check-only", "."])).await?;
        emit_all(&lines::isort(output.all_lines(), ctx.work_dir()), ctx.annotator());
        Ok(Outcome::from_exit_code(output.exit_code))
    }
}

/// `black --check .`
#[derive(Debug, Clone, Copy, Default)]
pub struct Black;

#[async_trait]
impl Check for Black {
    fn name(&self) -> &str {
        "black"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let output = ctx.run(&ctx.command("black").args(["--check", "."])).await?;
        emit_all(&lines::black(output.all_lines(), ctx.work_dir()), ctx.annotator());
        Ok(Outcome::from_exit_code(output.exit_code))
    }
}

/// `pylint` over the given targets.
#[derive(Debug, Clone)]
pub struct Pylint {
    targets: Vec<String>,
}

impl Pylint {
    pub fn new(targets: Vec<String>) -> Self {
        Self { targets }
    }
}

impl Default for Pylint {
    fn default() -> Self {
        Self::new(vec!["src".to_string()])
    }
}

#[async_trait]
impl Check for Pylint {
    fn name(&self) -> &str {
        "pylint"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let spec = ctx
            .command("pylint")
            .arg("--output-format=json")
            .args(self.targets.iter().cloned());
        let output = ctx.run(&spec).await?;

        // pylint pretty-prints a single array, possibly empty.
        let records: Vec<Value> = if output.stdout.trim().is_empty() {
            Vec::new()
        } else {
            serde_json::from_str(&output.stdout).map_err(|e| ActionError::tool_output("pylint", e.to_string()))?
        };
        emit_all(&pylint::parse(&records, ctx.work_dir())?, ctx.annotator());
        Ok(Outcome::from_exit_code(output.exit_code))
    }
}

/// `pip-audit` on a requirements file, failing on non-accepted vulnerabilities.
#[derive(Debug, Clone)]
pub struct PipAudit {
    requirements: String,
    accepted_vuln_ids: Vec<String>,
}

impl PipAudit {
    pub fn new(requirements: impl Into<String>, accepted_vuln_ids: Vec<String>) -> Self {
        Self {
            requirements: requirements.into(),
            accepted_vuln_ids,
        }
    }
}

#[async_trait]
impl Check for PipAudit {
    fn name(&self) -> &str {
        "pip_audit"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let spec = ctx.command("pip-audit").args([
            "-r",
            self.requirements.as_str(),
            "-f",
            "json",
            "--progress-spinner",
            "off",
        ]);
        let output = ctx.run(&spec).await?;

        let mut ledger = AdvisoryLedger::new(self.accepted_vuln_ids.iter().cloned());
        let findings = pip_audit::parse(&output.stdout, &mut ledger)
            .map_err(|e| ActionError::tool_output("pip-audit", e.to_string()))?;
        emit_all(&findings, ctx.annotator());
        emit_all(&pip_audit::unseen_accepted(&ledger), ctx.annotator());

        if output.success() || !ledger.has_fatal() {
            Ok(Outcome::Ok)
        } else {
            Ok(Outcome::Failure)
        }
    }
}

/// The branch version must be greater than the main branch version.
///
/// The main branch checkout in [`MAIN_BRANCH_DIR`] is removed once its
/// version has been read.
#[derive(Debug, Clone, Copy, Default)]
pub struct VersionMonotony;

impl VersionMonotony {
    const TITLE: &'static str = "Static Analysis: version_monotony";

    fn fail(ctx: &CheckContext, message: &str) -> Outcome {
        ctx.annotator()
            .error(message, &AnnotationProperties::titled(Self::TITLE));
        Outcome::Failure
    }
}

#[async_trait]
impl Check for VersionMonotony {
    fn name(&self) -> &str {
        "version_monotony"
    }

    async fn run(&self, ctx: &CheckContext) -> Result<Outcome> {
        let script = path_arg(&ctx.work_dir().join("version_management.py"))?;
        let main_dir = ctx.work_dir().join(MAIN_BRANCH_DIR);

        let main = ctx
            .run(&ctx.command("python3").args([script.as_str(), "get_current"]).cwd(&main_dir))
            .await?;
        if !main.success() {
            return Ok(Self::fail(ctx, "Failed to get version of main branch"));
        }
        match tokio::fs::remove_dir_all(&main_dir).await {
            Ok(()) => debug!(dir = %main_dir.display(), "removed main branch checkout"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(dir = %main_dir.display(), error = %e, "could not remove main branch checkout"),
        }
        let main_version = main.stdout.trim().to_string();

        let current = ctx
            .run(&ctx.command("python3").args(["version_management.py", "get_current"]))
            .await?;
        if !current.success() {
            return Ok(Self::fail(ctx, "Failed to get current version"));
        }
        let current_version = current.stdout.trim();

        ctx.annotator().notice(
            &format!("Branch version is {current_version}, main branch version is {main_version}"),
            &AnnotationProperties::titled(Self::TITLE),
        );

        let check = ctx
            .run(
                &ctx.command("python3")
                    .args(["version_management.py", "check", main_version.as_str()])
                    .output(OutputMode::Inherit),
            )
            .await?;
        if !check.success() {
            return Ok(Self::fail(
                ctx,
                &format!("Branch version {current_version} is not greater than main branch version {main_version}"),
            ));
        }
        Ok(Outcome::Ok)
    }
}
