//! The check pipelines behind each action.

use std::path::PathBuf;
use ywci_core::host::required_path;
use ywci_core::{CheckContext, HostFiles, JobStatus, Pipeline, Result, SkipSet};

use crate::git::GitCleanness;
use crate::py::{Black, Isort, PipAudit, Pycodestyle, Pylint, VersionMonotony};
use crate::ts::{Eslint, Prettier, YarnAudit, YarnScript, YarnTests};
use crate::youwol::{PREPARE_STEP as PY_PREPARE_STEP, SOURCES_VAR};

pub const YARN_INSTALLED_VAR: &str = "YARN_INSTALLED";
pub const TS_PREPARE_STEP: &str = "ts/prepare";

const STATIC_ANALYSIS_FAILED: &str = "Job failed because some static analysis checks failed";

/// Directory of the installed TypeScript package.
pub fn yarn_installed() -> Result<PathBuf> {
    required_path(YARN_INSTALLED_VAR, TS_PREPARE_STEP)
}

/// Directory of the py-youwol sources.
pub fn py_youwol_sources() -> Result<PathBuf> {
    required_path(SOURCES_VAR, PY_PREPARE_STEP)
}

pub fn ts_static_analysis(accepted_ghsa_ids: Vec<String>) -> Pipeline {
    Pipeline::new("Static Analysis", STATIC_ANALYSIS_FAILED)
        .with_check(YarnAudit::new(accepted_ghsa_ids))
        .with_check(Eslint)
        .with_check(Prettier)
}

pub fn ts_build() -> Pipeline {
    Pipeline::new("Build", "Job failed because build failed")
        .with_check(YarnScript::autogen())
        .with_check(YarnScript::build())
        .with_check(YarnScript::doc())
        .with_check(GitCleanness::new("Build: git cleanness"))
}

pub fn ts_tests(coverage: bool) -> Pipeline {
    Pipeline::new("Tests", "Job failed because tests failed").with_check(YarnTests::new(coverage))
}

/// Inputs of the py-youwol static analysis.
#[derive(Debug, Clone)]
pub struct PyStaticAnalysis {
    pub requirements: String,
    pub accepted_vuln_ids: Vec<String>,
    pub pylint_targets: Vec<String>,
}

impl Default for PyStaticAnalysis {
    fn default() -> Self {
        Self {
            requirements: "requirements.txt".to_string(),
            accepted_vuln_ids: Vec::new(),
            pylint_targets: vec!["src".to_string()],
        }
    }
}

pub fn py_static_analysis(inputs: PyStaticAnalysis) -> Pipeline {
    Pipeline::new("Static Analysis", STATIC_ANALYSIS_FAILED)
        .with_check(Pycodestyle)
        .with_check(Isort)
        .with_check(Black)
        .with_check(Pylint::new(inputs.pylint_targets))
        .with_check(PipAudit::new(inputs.requirements, inputs.accepted_vuln_ids))
        .with_check(VersionMonotony)
        .with_check(GitCleanness::new("Static Analysis: git cleanness"))
}

/// Execute a pipeline and append its report to the job summary.
pub async fn run_pipeline(
    pipeline: &Pipeline,
    ctx: &CheckContext,
    skips: SkipSet,
    host: &HostFiles,
) -> Result<JobStatus> {
    let (result, status) = pipeline.execute(ctx, skips).await?;
    host.append_step_summary(&result.to_markdown())?;
    Ok(status)
}
