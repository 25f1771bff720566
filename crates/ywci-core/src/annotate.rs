//! CI host annotation API.
//!
//! The runner reads "workflow commands" from the step's stdout:
//!
//! ```text
//! ::group::eslint
//! ::error title=Eslint: no-unused-vars,file=src/a.ts,line=3,col=7::'x' is unused
//! ::endgroup::
//! ```
//!
//! [`Annotator`] is the seam checks report through; [`WorkflowCommands`]
//! renders it for the runner and [`crate::fakes::RecordingAnnotator`] keeps it
//! in memory for tests.

use serde::{Deserialize, Serialize};
use std::io::Write;
use std::sync::Mutex;
use tracing::{debug, error, info, warn};

/// Annotation level understood by the CI host.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Debug,
    Info,
    Notice,
    Warning,
    Error,
}

impl Level {
    fn command(&self) -> Option<&'static str> {
        match self {
            Level::Debug => Some("debug"),
            Level::Info => None,
            Level::Notice => Some("notice"),
            Level::Warning => Some("warning"),
            Level::Error => Some("error"),
        }
    }
}

/// Optional metadata attached to an annotation.
///
/// File/line/column place the annotation on the source in the host UI.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnnotationProperties {
    pub title: Option<String>,
    pub file: Option<String>,
    pub start_line: Option<u32>,
    pub end_line: Option<u32>,
    pub start_column: Option<u32>,
    pub end_column: Option<u32>,
}

impl AnnotationProperties {
    /// Properties carrying only a title.
    pub fn titled(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.file = Some(file.into());
        self
    }

    pub fn with_position(mut self, line: Option<u32>, column: Option<u32>) -> Self {
        self.start_line = line;
        self.start_column = column;
        self
    }

    pub fn with_end(mut self, line: Option<u32>, column: Option<u32>) -> Self {
        self.end_line = line;
        self.end_column = column;
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(title) = &self.title {
            pairs.push(("title", title.clone()));
        }
        if let Some(file) = &self.file {
            pairs.push(("file", file.clone()));
        }
        if let Some(line) = self.start_line {
            pairs.push(("line", line.to_string()));
        }
        if let Some(line) = self.end_line {
            pairs.push(("endLine", line.to_string()));
        }
        if let Some(col) = self.start_column {
            pairs.push(("col", col.to_string()));
        }
        if let Some(col) = self.end_column {
            pairs.push(("endColumn", col.to_string()));
        }
        pairs
    }
}

/// CI host annotation API.
///
/// Levels with source-mapped metadata (`notice`, `warning`, `error`) take
/// [`AnnotationProperties`]; the other calls are plain log lines or grouping
/// markers.
pub trait Annotator: Send + Sync {
    /// Emit one annotation.
    fn annotate(&self, level: Level, message: &str, props: &AnnotationProperties);

    /// Open a collapsible log group.
    fn start_group(&self, name: &str);

    /// Close the innermost log group.
    fn end_group(&self);

    fn debug(&self, message: &str) {
        self.annotate(Level::Debug, message, &AnnotationProperties::default());
    }

    fn info(&self, message: &str) {
        self.annotate(Level::Info, message, &AnnotationProperties::default());
    }

    fn notice(&self, message: &str, props: &AnnotationProperties) {
        self.annotate(Level::Notice, message, props);
    }

    fn warning(&self, message: &str, props: &AnnotationProperties) {
        self.annotate(Level::Warning, message, props);
    }

    fn error(&self, message: &str, props: &AnnotationProperties) {
        self.annotate(Level::Error, message, props);
    }
}

/// Escape a command message.
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escape a command property value.
pub fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// Render a workflow command line (without trailing newline).
pub fn render_command(command: &str, props: &AnnotationProperties, message: &str) -> String {
    let pairs = props.pairs();
    let mut line = format!("::{command}");
    if !pairs.is_empty() {
        line.push(' ');
        let rendered: Vec<String> = pairs
            .iter()
            .map(|(key, value)| format!("{key}={}", escape_property(value)))
            .collect();
        line.push_str(&rendered.join(","));
    }
    line.push_str("::");
    line.push_str(&escape_data(message));
    line
}

/// Annotator writing workflow commands to a byte sink (stdout in production).
pub struct WorkflowCommands<W: Write + Send> {
    out: Mutex<W>,
}

impl WorkflowCommands<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> WorkflowCommands<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    /// Recover the sink, e.g. to inspect what was written.
    pub fn into_inner(self) -> W {
        match self.out.into_inner() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_line(&self, line: &str) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        // The host log is the only channel left if stdout is gone.
        if let Err(e) = writeln!(out, "{line}").and_then(|_| out.flush()) {
            error!(error = %e, "failed to write workflow command");
        }
    }
}

impl<W: Write + Send> Annotator for WorkflowCommands<W> {
    fn annotate(&self, level: Level, message: &str, props: &AnnotationProperties) {
        trace_annotation(level, message, props);
        match level.command() {
            Some(command) => self.write_line(&render_command(command, props, message)),
            None => self.write_line(message),
        }
    }

    fn start_group(&self, name: &str) {
        self.write_line(&format!("::group::{}", escape_data(name)));
    }

    fn end_group(&self) {
        self.write_line("::endgroup::");
    }
}

/// Mirror an annotation into the tracing stream.
pub(crate) fn trace_annotation(level: Level, message: &str, props: &AnnotationProperties) {
    let title = props.title.as_deref().unwrap_or("");
    match level {
        Level::Debug => debug!(title, "{message}"),
        Level::Info | Level::Notice => info!(title, "{message}"),
        Level::Warning => warn!(title, "{message}"),
        Level::Error => error!(title, file = props.file.as_deref().unwrap_or(""), "{message}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rendered(f: impl FnOnce(&WorkflowCommands<Vec<u8>>)) -> String {
        let annotator = WorkflowCommands::new(Vec::new());
        f(&annotator);
        String::from_utf8(annotator.into_inner()).unwrap()
    }

    #[test]
    fn test_plain_warning_has_no_properties_block() {
        let out = rendered(|a| a.warning("Some checks skipped", &AnnotationProperties::default()));
        assert_eq!(out, "::warning::Some checks skipped\n");
    }

    #[test]
    fn test_error_with_location() {
        let props = AnnotationProperties::titled("Eslint: no-unused-vars")
            .with_file("src/a.ts")
            .with_position(Some(3), Some(7))
            .with_end(Some(3), Some(9));
        let out = rendered(|a| a.error("'x' is unused", &props));
        assert_eq!(
            out,
            "::error title=Eslint%3A no-unused-vars,file=src/a.ts,line=3,endLine=3,col=7,endColumn=9::'x' is unused\n"
        );
    }

    #[test]
    fn test_message_escaping() {
        let out = rendered(|a| a.error("Failure:\nline 1\r\n100%", &AnnotationProperties::default()));
        assert_eq!(out, "::error::Failure:%0Aline 1%0D%0A100%25\n");
    }

    #[test]
    fn test_property_escaping() {
        assert_eq!(escape_property("a,b:c%"), "a%2Cb%3Ac%25");
    }

    #[test]
    fn test_groups_and_plain_info() {
        let out = rendered(|a| {
            a.start_group("git cleanness");
            a.info("spawned process exited");
            a.debug("Starting action");
            a.end_group();
        });
        assert_eq!(
            out,
            "::group::git cleanness\nspawned process exited\n::debug::Starting action\n::endgroup::\n"
        );
    }
}
