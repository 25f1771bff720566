//! Subprocess execution boundary.
//!
//! Checks describe a command with [`CommandSpec`] and receive the raw exit
//! code and output back. A non-zero exit code is data for the check to
//! interpret; only failing to start the program is an error.

use crate::error::{ActionError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Where a command's stdout/stderr go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputMode {
    /// Buffer both streams and hand them back.
    Capture,
    /// Stream straight into the job log.
    Inherit,
    /// Write both streams to a file (relative paths resolve against `cwd`).
    File(PathBuf),
}

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
    pub env: Vec<(String, String)>,
    pub output: OutputMode,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            env: Vec::new(),
            output: OutputMode::Capture,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Add an environment override on top of the inherited environment.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn output(mut self, mode: OutputMode) -> Self {
        self.output = mode;
        self
    }

    /// The command line as a single string (`program arg1 arg2`).
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn to_command(&self) -> Result<Command> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &self.env {
            command.env(key, value);
        }
        command.stdin(Stdio::null());
        match &self.output {
            OutputMode::Capture => {
                command.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
            OutputMode::Inherit => {
                command.stdout(Stdio::inherit()).stderr(Stdio::inherit());
            }
            OutputMode::File(path) => {
                let path = match (&self.cwd, path.is_relative()) {
                    (Some(dir), true) => dir.join(path),
                    _ => path.clone(),
                };
                let file = std::fs::File::create(&path)?;
                let err = file.try_clone()?;
                command.stdout(Stdio::from(file)).stderr(Stdio::from(err));
            }
        }
        Ok(command)
    }

    fn spawn_error(&self, source: std::io::Error) -> ActionError {
        ActionError::Spawn {
            program: self.program.clone(),
            source,
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.command_line())
    }
}

/// Exit code and captured output of a finished command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,
    /// Captured stdout (empty unless [`OutputMode::Capture`]).
    pub stdout: String,
    /// Captured stderr (empty unless [`OutputMode::Capture`]).
    pub stderr: String,
}

impl CommandOutput {
    pub fn new(exit_code: i32, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Trimmed, non-empty stdout lines.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        non_empty_lines(&self.stdout)
    }

    /// Trimmed, non-empty lines of stdout followed by stderr.
    pub fn all_lines(&self) -> impl Iterator<Item = &str> {
        non_empty_lines(&self.stdout).chain(non_empty_lines(&self.stderr))
    }

    /// Parse every stdout line as JSON, flattening top-level arrays.
    ///
    /// Reads NDJSON and single-array outputs the same way.
    pub fn json_lines(&self) -> Result<Vec<Value>> {
        let mut values = Vec::new();
        for line in self.lines() {
            match serde_json::from_str::<Value>(line)? {
                Value::Array(items) => values.extend(items),
                value => values.push(value),
            }
        }
        Ok(values)
    }
}

fn non_empty_lines(text: &str) -> impl Iterator<Item = &str> {
    text.lines().map(str::trim).filter(|line| !line.is_empty())
}

/// Executes commands on behalf of checks.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run a command to completion.
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput>;

    /// Start a command without waiting for it; returns its pid.
    async fn spawn_detached(&self, spec: &CommandSpec) -> Result<u32>;
}

/// [`ProcessRunner`] spawning real processes through `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

#[async_trait]
impl ProcessRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput> {
        debug!(command = %spec, cwd = ?spec.cwd, "Executing command");
        let mut command = spec.to_command()?;

        if spec.output == OutputMode::Capture {
            let output = command.output().await.map_err(|e| spec.spawn_error(e))?;
            let result = CommandOutput {
                exit_code: output.status.code().unwrap_or(-1),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            };
            debug!(command = %spec, exit_code = result.exit_code, "Command finished");
            return Ok(result);
        }

        let status = command.status().await.map_err(|e| spec.spawn_error(e))?;
        let exit_code = status.code().unwrap_or(-1);
        debug!(command = %spec, exit_code, "Command finished");
        Ok(CommandOutput {
            exit_code,
            ..CommandOutput::default()
        })
    }

    async fn spawn_detached(&self, spec: &CommandSpec) -> Result<u32> {
        let mut command = spec.to_command()?;
        let mut child = command.spawn().map_err(|e| spec.spawn_error(e))?;
        let pid = child.id().unwrap_or_default();
        info!(command = %spec, pid, "Spawned detached process");

        let program = spec.program.clone();
        tokio::spawn(async move {
            match child.wait().await {
                Ok(status) => info!(%program, code = ?status.code(), "spawned process exited"),
                Err(e) => warn!(%program, error = %e, "failed to wait for spawned process"),
            }
        });
        Ok(pid)
    }
}
