//! ywci - youwol CI actions
//!
//! Each subcommand is one GitHub Action step. Inputs come from flags or the
//! `INPUT_<NAME>` variables the runner exports; annotations are written to
//! stdout as workflow commands and logs go to stderr.
//!
//! ## Commands
//!
//! - `ts static-analysis | build | tests`: checks of an installed yarn package
//! - `py static-analysis`: checks of the py-youwol sources
//! - `py run` / `py post`: start py-youwol for the job, stop it afterwards
//!
//! Exit code 1 means checks failed, 2 means the action itself broke.

use anyhow::{Context, Result};
use clap::builder::FalseyValueParser;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};

use ywci_checks::actions::{self, PyStaticAnalysis};
use ywci_checks::health::{DEFAULT_ATTEMPTS, DEFAULT_HEALTH_URL};
use ywci_checks::youwol::{self, STATE_NAME};
use ywci_checks::{HealthPoller, HttpProbe, PreparedPaths, RunConfig, RunState};
use ywci_core::host::load_state;
use ywci_core::{
    AnnotationProperties, Annotator, CheckContext, HostFiles, JobStatus, Pipeline, ProcessRunner, SkipSet,
    SystemRunner, WorkflowCommands,
};

const DEFAULT_INSTANCE_NAME: &str = "py-youwol";

#[derive(Parser)]
#[command(name = "ywci")]
#[command(author = "youwol")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "youwol CI actions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Actions for TypeScript packages (run from $YARN_INSTALLED)
    Ts {
        #[command(subcommand)]
        action: TsAction,
    },

    /// Actions for py-youwol
    Py {
        #[command(subcommand)]
        action: PyAction,
    },
}

#[derive(Args, Debug, Clone)]
struct SkipArgs {
    /// Space separated names of checks to skip
    #[arg(long, env = "INPUT_SKIP", default_value = "")]
    skip: String,
}

impl SkipArgs {
    fn skips(&self) -> SkipSet {
        SkipSet::parse(&self.skip)
    }
}

#[derive(Subcommand)]
enum TsAction {
    /// yarn audit, eslint and prettier
    StaticAnalysis {
        #[command(flatten)]
        skip: SkipArgs,

        /// GHSA ids of advisories to accept
        #[arg(long, env = "INPUT_ACCEPTEDGHSAIDS", default_value = "")]
        accepted_ghsa_ids: String,
    },

    /// auto-gen, build, doc and git cleanness
    Build {
        #[command(flatten)]
        skip: SkipArgs,
    },

    /// yarn test (or test-coverage)
    Tests {
        /// Run `yarn test-coverage` instead of `yarn test`
        #[arg(long, env = "INPUT_COVERAGE", value_parser = FalseyValueParser::new())]
        coverage: bool,
    },
}

#[derive(Subcommand)]
enum PyAction {
    /// pycodestyle, isort, black, pylint, pip-audit, version monotony and git cleanness
    StaticAnalysis {
        #[command(flatten)]
        skip: SkipArgs,

        /// Vulnerability ids (or aliases) to accept in pip-audit
        #[arg(long, env = "INPUT_ACCEPTEDVULNIDS", default_value = "")]
        accepted_vuln_ids: String,

        /// Requirements file audited by pip-audit (default: requirements.txt)
        #[arg(long, env = "INPUT_REQUIREMENTS")]
        requirements: Option<String>,

        /// Paths linted by pylint
        #[arg(long = "pylint-target", default_value = "src")]
        pylint_targets: Vec<String>,
    },

    /// Start py-youwol and wait until it is healthy
    Run(RunArgs),

    /// Stop py-youwol and publish its artifacts
    Post,
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Name of the instance, used for its working directory (default: py-youwol)
    #[arg(long, env = "INPUT_NAME")]
    name: Option<String>,

    /// Configuration file (default: <sources>/integrations/yw_config.py)
    #[arg(long, env = "INPUT_CONF")]
    conf: Option<String>,

    /// Run py-youwol under coverage
    #[arg(long, env = "INPUT_COVERAGE", value_parser = FalseyValueParser::new())]
    coverage: bool,

    /// Extra `--omit` patterns for coverage, comma separated
    #[arg(long, env = "INPUT_COVERAGEOMIT")]
    coverage_omit: Option<String>,

    /// Health endpoint polled after start
    #[arg(long, default_value = DEFAULT_HEALTH_URL)]
    url: String,

    /// Health poll attempts
    #[arg(long, default_value_t = DEFAULT_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    attempts: u32,

    /// Delay between health poll attempts, in milliseconds
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,
}

impl RunArgs {
    fn name(&self) -> String {
        input(self.name.clone()).unwrap_or_else(|| DEFAULT_INSTANCE_NAME.to_string())
    }

    fn conf(&self) -> Option<PathBuf> {
        input(self.conf.clone()).map(PathBuf::from)
    }
}

/// The runner exports undeclared or unset inputs as empty strings.
fn input(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Split an id list input on whitespace and commas.
fn parse_ids(raw: &str) -> Vec<String> {
    raw.split(|c: char| c.is_whitespace() || c == ',')
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    ywci_core::init_tracing(cli.json_logs, level);

    let annotator: Arc<dyn Annotator> = Arc::new(WorkflowCommands::stdout());
    let result = run(cli.command, Arc::clone(&annotator)).await;
    ExitCode::from(conclude(result, annotator.as_ref()))
}

/// Report the job's end on the host and pick the exit code.
fn conclude(result: Result<JobStatus>, annotator: &dyn Annotator) -> u8 {
    match result {
        Ok(JobStatus::Succeeded) => {
            info!("Job succeeded");
            0
        }
        Ok(JobStatus::Failed(message)) => {
            annotator.error(&message, &AnnotationProperties::default());
            1
        }
        Err(e) => {
            error!(error = ?e, "Job failed because of unexpected error");
            annotator.error(
                &format!("Job failed because of unexpected error : {e:#}"),
                &AnnotationProperties::default(),
            );
            2
        }
    }
}

async fn run(command: Commands, annotator: Arc<dyn Annotator>) -> Result<JobStatus> {
    let runner: Arc<dyn ProcessRunner> = Arc::new(SystemRunner);
    let host = HostFiles::from_env();

    match command {
        Commands::Ts { action } => {
            let work_dir = actions::yarn_installed()?;
            let ctx = CheckContext::new(work_dir, annotator, runner);
            let (pipeline, skips) = ts_pipeline(action);
            Ok(actions::run_pipeline(&pipeline, &ctx, skips, &host).await?)
        }
        Commands::Py { action } => match action {
            PyAction::StaticAnalysis {
                skip,
                accepted_vuln_ids,
                requirements,
                pylint_targets,
            } => {
                let work_dir = actions::py_youwol_sources()?;
                let ctx = CheckContext::new(work_dir, annotator, runner);
                let inputs = py_static_analysis_inputs(requirements, &accepted_vuln_ids, pylint_targets);
                let pipeline = actions::py_static_analysis(inputs);
                Ok(actions::run_pipeline(&pipeline, &ctx, skip.skips(), &host).await?)
            }
            PyAction::Run(args) => cmd_py_run(args, annotator, runner, &host).await,
            PyAction::Post => {
                let state: RunState =
                    load_state(STATE_NAME).context("Failed to read the state saved by py run")?;
                let ctx = CheckContext::new(state.working_dir.clone(), annotator, runner);
                Ok(youwol::stop(&state, &ctx, &host).await?)
            }
        },
    }
}

fn ts_pipeline(action: TsAction) -> (Pipeline, SkipSet) {
    match action {
        TsAction::StaticAnalysis {
            skip,
            accepted_ghsa_ids,
        } => (
            actions::ts_static_analysis(parse_ids(&accepted_ghsa_ids)),
            skip.skips(),
        ),
        TsAction::Build { skip } => (actions::ts_build(), skip.skips()),
        TsAction::Tests { coverage } => (actions::ts_tests(coverage), SkipSet::new()),
    }
}

fn py_static_analysis_inputs(
    requirements: Option<String>,
    accepted_vuln_ids: &str,
    pylint_targets: Vec<String>,
) -> PyStaticAnalysis {
    let defaults = PyStaticAnalysis::default();
    PyStaticAnalysis {
        requirements: input(requirements).unwrap_or(defaults.requirements),
        accepted_vuln_ids: parse_ids(accepted_vuln_ids),
        pylint_targets,
    }
}

async fn cmd_py_run(
    args: RunArgs,
    annotator: Arc<dyn Annotator>,
    runner: Arc<dyn ProcessRunner>,
    host: &HostFiles,
) -> Result<JobStatus> {
    let paths = PreparedPaths::from_env()?;
    let probe = HttpProbe::new(args.url.as_str())?;
    let config = RunConfig {
        name: args.name(),
        conf: args.conf(),
        coverage: args.coverage,
        coverage_omit: input(args.coverage_omit),
        tmp_dir: std::env::temp_dir(),
        poller: HealthPoller::new(args.attempts, Duration::from_millis(args.interval_ms)),
    };
    info!(name = %config.name, coverage = config.coverage, url = %probe.url(), "Starting py-youwol");

    let ctx = CheckContext::new(config.tmp_dir.clone(), annotator, runner);
    Ok(youwol::start(&config, &paths, &ctx, host, &probe).await?)
}
