//! Normalized tool findings.

use serde::{Deserialize, Serialize};
use std::path::Path;
use ywci_core::{AnnotationProperties, Annotator, Level};

/// One problem (or notice) reported by a tool, ready to annotate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finding {
    pub level: Level,
    pub message: String,
    pub props: AnnotationProperties,
}

impl Finding {
    pub fn new(level: Level, message: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            props: AnnotationProperties::titled(title),
        }
    }

    pub fn error(message: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(Level::Error, message, title)
    }

    pub fn warning(message: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(Level::Warning, message, title)
    }

    pub fn notice(message: impl Into<String>, title: impl Into<String>) -> Self {
        Self::new(Level::Notice, message, title)
    }

    /// Plain log line, not an annotation.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            message: message.into(),
            props: AnnotationProperties::default(),
        }
    }

    pub fn with_file(mut self, file: impl Into<String>) -> Self {
        self.props.file = Some(file.into());
        self
    }

    pub fn with_position(mut self, line: Option<u32>, column: Option<u32>) -> Self {
        self.props = self.props.with_position(line, column);
        self
    }

    pub fn with_end(mut self, line: Option<u32>, column: Option<u32>) -> Self {
        self.props = self.props.with_end(line, column);
        self
    }

    pub fn emit(&self, annotator: &dyn Annotator) {
        annotator.annotate(self.level, &self.message, &self.props);
    }
}

/// Emit every finding in order.
pub fn emit_all(findings: &[Finding], annotator: &dyn Annotator) {
    for finding in findings {
        finding.emit(annotator);
    }
}

/// Express a tool-reported path relative to the checked directory.
///
/// Annotations must name files relative to the repository; tools print
/// either absolute paths or `./`-prefixed ones.
pub fn relative_path(base: &Path, path: &str) -> String {
    let candidate = Path::new(path);
    let stripped = candidate.strip_prefix(base).unwrap_or(candidate);
    let text = stripped.to_string_lossy();
    text.strip_prefix("./").unwrap_or(&text).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relative_path() {
        let base = Path::new("/work/py-youwol");
        assert_eq!(relative_path(base, "/work/py-youwol/src/a.py"), "src/a.py");
        assert_eq!(relative_path(base, "./src/a.py"), "src/a.py");
        assert_eq!(relative_path(base, "src/a.py"), "src/a.py");
        assert_eq!(relative_path(base, "/elsewhere/b.py"), "/elsewhere/b.py");
    }

    #[test]
    fn test_builders() {
        let finding = Finding::error("bad", "Tool: rule")
            .with_file("a.ts")
            .with_position(Some(1), Some(2))
            .with_end(Some(1), Some(5));
        assert_eq!(finding.level, Level::Error);
        assert_eq!(finding.props.title.as_deref(), Some("Tool: rule"));
        assert_eq!(finding.props.start_column, Some(2));
        assert_eq!(finding.props.end_column, Some(5));
    }
}
