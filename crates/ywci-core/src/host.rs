//! CI host file commands and environment preconditions.
//!
//! The runner exposes per-step files (`GITHUB_STATE`, `GITHUB_OUTPUT`,
//! `GITHUB_STEP_SUMMARY`); values are appended in heredoc form so they may
//! span lines. Saved state comes back to the post step as `STATE_<name>`.

use crate::error::{ActionError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;
use uuid::Uuid;

pub const STATE_FILE_VAR: &str = "GITHUB_STATE";
pub const OUTPUT_FILE_VAR: &str = "GITHUB_OUTPUT";
pub const SUMMARY_FILE_VAR: &str = "GITHUB_STEP_SUMMARY";

/// Paths of the host's file commands for the current step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostFiles {
    pub state: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub summary: Option<PathBuf>,
}

impl HostFiles {
    /// Read the file command paths from the environment.
    pub fn from_env() -> Self {
        let path = |var: &str| std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from);
        Self {
            state: path(STATE_FILE_VAR),
            output: path(OUTPUT_FILE_VAR),
            summary: path(SUMMARY_FILE_VAR),
        }
    }

    /// Save a value for the post step of the same action.
    pub fn save_state<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let path = require_file(&self.state, STATE_FILE_VAR)?;
        let json = serde_json::to_string(value)?;
        append_key_value(path, name, &json)
    }

    /// Set a step output.
    pub fn set_output(&self, name: &str, value: &str) -> Result<()> {
        let path = require_file(&self.output, OUTPUT_FILE_VAR)?;
        append_key_value(path, name, value)
    }

    /// Append Markdown to the job summary; a no-op when the host offers none.
    pub fn append_step_summary(&self, markdown: &str) -> Result<()> {
        let Some(path) = &self.summary else {
            debug!("no step summary file, skipping summary");
            return Ok(());
        };
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{markdown}")?;
        Ok(())
    }
}

fn require_file<'a>(path: &'a Option<PathBuf>, var: &str) -> Result<&'a Path> {
    path.as_deref().ok_or_else(|| ActionError::MissingHostFile {
        var: var.to_string(),
    })
}

fn append_key_value(path: &Path, name: &str, value: &str) -> Result<()> {
    let delimiter = format!("ghadelimiter_{}", Uuid::new_v4());
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    write!(file, "{name}<<{delimiter}\n{value}\n{delimiter}\n")?;
    debug!(name, path = %path.display(), "Appended file command");
    Ok(())
}

/// Load state saved by [`HostFiles::save_state`] in the main step.
pub fn load_state<T: DeserializeOwned>(name: &str) -> Result<T> {
    parse_state(name, std::env::var(format!("STATE_{name}")).ok())
}

/// Parse a raw `STATE_<name>` value.
pub fn parse_state<T: DeserializeOwned>(name: &str, raw: Option<String>) -> Result<T> {
    match raw.filter(|v| !v.is_empty()) {
        Some(json) => Ok(serde_json::from_str(&json)?),
        None => Err(ActionError::MissingState {
            name: name.to_string(),
        }),
    }
}

/// Read a required environment variable naming a prepared path.
///
/// `prepare` names the setup action that should have exported it.
pub fn required_path(var: &str, prepare: &str) -> Result<PathBuf> {
    match std::env::var_os(var).filter(|v| !v.is_empty()) {
        Some(value) => Ok(PathBuf::from(value)),
        None => Err(ActionError::MissingEnv {
            var: var.to_string(),
            prepare: prepare.to_string(),
        }),
    }
}

/// Read an optional environment variable naming a path.
pub fn optional_path(var: &str) -> Option<PathBuf> {
    std::env::var_os(var).filter(|v| !v.is_empty()).map(PathBuf::from)
}

/// Parse a heredoc-formatted file command back into `(name, value)` pairs.
pub fn parse_file_commands(content: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut lines = content.lines();
    while let Some(line) = lines.next() {
        if let Some((name, delimiter)) = line.split_once("<<") {
            let mut value = Vec::new();
            for body in lines.by_ref() {
                if body == delimiter {
                    break;
                }
                value.push(body);
            }
            pairs.push((name.to_string(), value.join("\n")));
        } else if let Some((name, value)) = line.split_once('=') {
            pairs.push((name.to_string(), value.to_string()));
        }
    }
    pairs
}
