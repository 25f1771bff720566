//! Starting a py-youwol server for the job and stopping it in the post step.
//!
//! The main step saves a [`RunState`] on the host before spawning anything so
//! the post step can always find the working directory, even when starting
//! failed. Post collects logs and coverage reports into an artifact manifest
//! published as step outputs.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use ywci_core::host::{optional_path, required_path};
use ywci_core::{
    ActionError, AnnotationProperties, Annotator, CheckContext, HostFiles, JobStatus, OutputMode, Result,
};

use crate::health::{HealthPoller, HealthProbe};
use crate::path_arg;

pub const STATE_NAME: &str = "state";
pub const BIN_VAR: &str = "PY_YOUWOL_BIN";
pub const BIN_COVERAGE_VAR: &str = "PY_YOUWOL_BIN_COVERAGE";
pub const SOURCES_VAR: &str = "PY_YOUWOL_SOURCES";
pub const PREPARE_STEP: &str = "py/prepare";

const ARTIFACTS_TITLE: &str = "Py-youwol execution artifacts";

/// What the post step needs to know about the started server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunState {
    pub working_dir: PathBuf,
    pub stop_script_path: PathBuf,
    pub logs_path: PathBuf,
    pub name: String,
    pub coverage: bool,
}

impl RunState {
    /// State for a server named `name`, working in `<tmp_dir>/<name>_start_py-youwol`.
    pub fn new(tmp_dir: &Path, name: &str, coverage: bool) -> Self {
        let working_dir = tmp_dir.join(format!("{name}_start_py-youwol"));
        Self {
            stop_script_path: working_dir.join("py-youwol.shutdown.sh"),
            logs_path: working_dir.join("py-youwol.log"),
            working_dir,
            name: name.to_string(),
            coverage,
        }
    }
}

/// Paths exported by the prepare step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedPaths {
    pub bin: PathBuf,
    pub bin_coverage: Option<PathBuf>,
    pub sources: Option<PathBuf>,
}

impl PreparedPaths {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            bin: required_path(BIN_VAR, PREPARE_STEP)?,
            bin_coverage: optional_path(BIN_COVERAGE_VAR),
            sources: optional_path(SOURCES_VAR),
        })
    }

    fn bin_coverage(&self) -> Result<&Path> {
        self.bin_coverage.as_deref().ok_or_else(|| missing_env(BIN_COVERAGE_VAR))
    }

    fn sources(&self) -> Result<&Path> {
        self.sources.as_deref().ok_or_else(|| missing_env(SOURCES_VAR))
    }
}

fn missing_env(var: &str) -> ActionError {
    ActionError::MissingEnv {
        var: var.to_string(),
        prepare: PREPARE_STEP.to_string(),
    }
}

/// Inputs of the run step.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub name: String,
    /// Defaults to `<sources>/integrations/yw_config.py`.
    pub conf: Option<PathBuf>,
    pub coverage: bool,
    pub coverage_omit: Option<String>,
    pub tmp_dir: PathBuf,
    pub poller: HealthPoller,
}

impl RunConfig {
    fn conf_path(&self, paths: &PreparedPaths) -> Result<PathBuf> {
        match &self.conf {
            Some(conf) => Ok(conf.clone()),
            None => Ok(paths.sources()?.join("integrations").join("yw_config.py")),
        }
    }

    fn omit(&self, conf: &str) -> String {
        match self.coverage_omit.as_deref().map(str::trim).filter(|o| !o.is_empty()) {
            Some(extra) => format!("{conf},{extra}"),
            None => conf.to_string(),
        }
    }
}

/// Start py-youwol detached and wait for it to answer its health endpoint.
pub async fn start(
    config: &RunConfig,
    paths: &PreparedPaths,
    ctx: &CheckContext,
    host: &HostFiles,
    probe: &dyn HealthProbe,
) -> Result<JobStatus> {
    let state = RunState::new(&config.tmp_dir, &config.name, config.coverage);
    tokio::fs::create_dir_all(&state.working_dir).await?;
    host.save_state(STATE_NAME, &state)?;

    let ctx = ctx.with_work_dir(state.working_dir.clone());
    ctx.annotator().debug("Starting action");

    if let Err(e) = launch(config, paths, &ctx).await {
        publish_failure_logs(&state, host);
        return Err(e);
    }

    if config.poller.wait(probe, ctx.annotator()).await.is_ready() {
        Ok(JobStatus::Succeeded)
    } else {
        publish_failure_logs(&state, host);
        Ok(JobStatus::Failed(
            "Job failed because py-youwol failed to start".to_string(),
        ))
    }
}

async fn launch(config: &RunConfig, paths: &PreparedPaths, ctx: &CheckContext) -> Result<u32> {
    let bin = path_arg(&paths.bin)?;
    let conf = path_arg(&config.conf_path(paths)?)?;

    let (group, spec) = if config.coverage {
        let bin_coverage = path_arg(paths.bin_coverage()?)?;
        let sources = paths.sources()?;
        tokio::fs::copy(sources.join("pyproject.toml"), ctx.work_dir().join("pyproject.toml")).await?;
        let spec = ctx
            .command(bin_coverage)
            .arg("run")
            .arg(format!("--omit={}", config.omit(&conf)))
            .args([bin.as_str(), "--conf", conf.as_str(), "--daemonize"])
            .env("COVERAGE_DEBUG_FILE", "coverage.debug")
            .env("PYTHONPATH", path_arg(&sources.join("src"))?);
        (format!("start coverage of {bin} with conf {conf}"), spec)
    } else {
        let spec = ctx.command(bin.as_str()).args(["--conf", conf.as_str(), "--daemonize"]);
        (format!("start {bin} with conf {conf}"), spec)
    };
    let spec = spec.output(OutputMode::Inherit);

    ctx.annotator().start_group(&group);
    let spawned = ctx.runner().spawn_detached(&spec).await;
    ctx.annotator().end_group();

    let pid = spawned?;
    info!(pid, command = %spec, "py-youwol spawned");
    Ok(pid)
}

fn publish_failure_logs(state: &RunState, host: &HostFiles) {
    if !state.logs_path.exists() {
        return;
    }
    let published = path_arg(&state.logs_path).and_then(|logs| host.set_output("failure-logs", &logs));
    if let Err(e) = published {
        warn!(error = %e, "could not publish failure logs");
    }
}

/// Files to hand over as job artifacts, relative to a root directory.
#[derive(Debug, Clone)]
pub struct ArtifactManifest {
    root: PathBuf,
    entries: Vec<PathBuf>,
}

impl ArtifactManifest {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, path: impl Into<PathBuf>) {
        self.entries.push(path.into());
    }

    pub fn entries(&self) -> &[PathBuf] {
        &self.entries
    }

    /// Existing entries relative to the root; missing ones are warned about.
    pub fn resolve(&self, annotator: &dyn Annotator) -> Vec<String> {
        let mut found = Vec::new();
        for entry in &self.entries {
            let absolute = self.root.join(entry);
            if !absolute.exists() {
                annotator.warning(
                    &format!("File not found: {}", entry.display()),
                    &AnnotationProperties::titled(ARTIFACTS_TITLE),
                );
                continue;
            }
            let relative = absolute.strip_prefix(&self.root).unwrap_or(&absolute);
            found.push(relative.to_string_lossy().into_owned());
        }
        found
    }

    /// Write the `artifacts` and `artifacts-root` outputs.
    pub fn publish(&self, annotator: &dyn Annotator, host: &HostFiles) -> Result<Vec<String>> {
        let found = self.resolve(annotator);
        host.set_output("artifacts", &found.join("\n"))?;
        host.set_output("artifacts-root", &path_arg(&self.root)?)?;
        info!(count = found.len(), "artifacts published");
        Ok(found)
    }
}

/// Stop the server, generate coverage reports and publish artifacts.
///
/// The artifact manifest is published even when stopping failed or errored.
pub async fn stop(state: &RunState, ctx: &CheckContext, host: &HostFiles) -> Result<JobStatus> {
    let ctx = ctx.with_work_dir(state.working_dir.clone());
    let mut manifest = ArtifactManifest::new(&state.working_dir);
    manifest.push(&state.logs_path);

    let status = shutdown(state, &ctx, &mut manifest).await;
    let published = manifest.publish(ctx.annotator(), host);
    let status = status?;
    published?;
    Ok(status)
}

async fn shutdown(state: &RunState, ctx: &CheckContext, manifest: &mut ArtifactManifest) -> Result<JobStatus> {
    ctx.annotator().start_group("stopping py-youwol");
    let stopped = stop_server(state, ctx).await;
    ctx.annotator().end_group();
    if let Some(failure) = stopped? {
        return Ok(JobStatus::Failed(failure));
    }

    if state.coverage {
        manifest.push("coverage.coverage");
        manifest.push("coverage.debug");

        ctx.annotator().start_group("generate HTML coverage report");
        let html = coverage_report(ctx, "html", "coverage_html").await;
        ctx.annotator().end_group();
        manifest.push("coverage_html.debug");
        manifest.push("coverage_html.log");
        if html? {
            manifest.push("htmlcov");
        }

        ctx.annotator().start_group("generate XML coverage report");
        let xml = coverage_report(ctx, "xml", "coverage_xml").await;
        ctx.annotator().end_group();
        manifest.push("coverage_xml.debug");
        manifest.push("coverage_xml.log");
        if xml? {
            manifest.push("coverage.xml");
        }
    }
    Ok(JobStatus::Succeeded)
}

/// `None` once stopped, otherwise the failure message.
async fn stop_server(state: &RunState, ctx: &CheckContext) -> Result<Option<String>> {
    if !tokio::fs::try_exists(&state.stop_script_path).await? {
        return Ok(Some(format!(
            "Job failed because py-youwol stopping script {} does not exist",
            state.stop_script_path.display()
        )));
    }
    let spec = ctx
        .command("sh")
        .arg(path_arg(&state.stop_script_path)?)
        .output(OutputMode::Inherit);
    let output = ctx.run(&spec).await?;
    if output.success() {
        Ok(None)
    } else {
        Ok(Some("Job failed because py-youwol failed to stop".to_string()))
    }
}

async fn coverage_report(ctx: &CheckContext, cmd: &str, prefix: &str) -> Result<bool> {
    let spec = ctx
        .command("coverage")
        .arg(cmd)
        .env("COVERAGE_DEBUG_FILE", format!("{prefix}.debug"))
        .output(OutputMode::File(PathBuf::from(format!("{prefix}.log"))));
    let output = ctx.run(&spec).await?;
    if !output.success() {
        ctx.annotator().error(
            &format!("execution of coverage {cmd} failed"),
            &AnnotationProperties::titled(format!("Coverage {cmd}")),
        );
    }
    Ok(output.success())
}
