//! Error taxonomy for unexpected (non-check) failures.
//!
//! A check reporting problems is an [`Outcome::Failure`](crate::Outcome), not
//! an error. Everything in this enum aborts the run and is reported once by
//! the top-level handler.

use std::path::PathBuf;

/// Unexpected or environment errors raised while running an action.
#[derive(Debug, thiserror::Error)]
pub enum ActionError {
    #[error("Env variable {var} not set. Did you run {prepare} ?")]
    MissingEnv { var: String, prepare: String },

    #[error("host file command {var} is not available")]
    MissingHostFile { var: String },

    #[error("no saved state named '{name}'")]
    MissingState { name: String },

    #[error("failed to spawn `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid input '{name}': {reason}")]
    InvalidInput { name: String, reason: String },

    #[error("unexpected {tool} output: {detail}")]
    ToolOutput { tool: String, detail: String },

    #[error("path {0} is not valid UTF-8")]
    NonUtf8Path(PathBuf),

    #[error("http error: {0}")]
    Http(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ActionError {
    /// Build a [`ActionError::ToolOutput`] for a tool whose output could not be read.
    pub fn tool_output(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        ActionError::ToolOutput {
            tool: tool.into(),
            detail: detail.into(),
        }
    }
}

/// Result type for action operations.
pub type Result<T> = std::result::Result<T, ActionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_env_message_names_variable_and_prepare_step() {
        let err = ActionError::MissingEnv {
            var: "YARN_INSTALLED".to_string(),
            prepare: "ts/prepare".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Env variable YARN_INSTALLED not set. Did you run ts/prepare ?"
        );
    }

    #[test]
    fn json_errors_convert() {
        let parse: std::result::Result<serde_json::Value, _> = serde_json::from_str("{");
        let err: ActionError = parse.unwrap_err().into();
        assert!(matches!(err, ActionError::Json(_)));
    }
}
