//! ywci core - check aggregation for youwol CI actions
//!
//! Provides the pieces every action shares:
//! - [`CheckAggregator`]: skip-list gating, log grouping and the overall
//!   ok/failure/skipped derivation across an ordered list of checks
//! - [`Annotator`]: the CI host annotation API (workflow commands)
//! - [`ProcessRunner`]: the subprocess boundary checks shell out through
//! - [`HostFiles`]: step state, outputs and job summary

pub mod aggregator;
pub mod annotate;
pub mod check;
pub mod error;
pub mod fakes;
pub mod host;
pub mod outcome;
pub mod pipeline;
pub mod process;
pub mod telemetry;

// Re-export key types
pub use aggregator::{CheckAggregator, CheckRecord, JobStatus, RunResult};
pub use annotate::{AnnotationProperties, Annotator, Level, WorkflowCommands};
pub use check::{check_fn, Check, CheckContext, FnCheck};
pub use error::{ActionError, Result};
pub use host::HostFiles;
pub use outcome::{Outcome, SkipSet};
pub use pipeline::Pipeline;
pub use process::{CommandOutput, CommandSpec, OutputMode, ProcessRunner, SystemRunner};
pub use telemetry::init_tracing;
