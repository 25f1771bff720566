//! `eslint -f json` parsing.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use ywci_core::{Level, Result};

use crate::finding::{relative_path, Finding};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileReport {
    file_path: String,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    rule_id: Option<String>,
    message: String,
    line: Option<u32>,
    column: Option<u32>,
    end_line: Option<u32>,
    end_column: Option<u32>,
    severity: u8,
}

/// Map eslint file reports to findings.
///
/// Severity 1 is a warning, 2 an error; anything else is dropped. Values
/// without a `filePath` are not file reports and are ignored. Paths are made
/// relative to `base`.
pub fn parse(records: &[Value], base: &Path) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();
    for record in records.iter().filter(|r| r.get("filePath").is_some()) {
        let report: FileReport = serde_json::from_value(record.clone())?;
        let file = relative_path(base, &report.file_path);
        for msg in report.messages {
            let level = match msg.severity {
                1 => Level::Warning,
                2 => Level::Error,
                _ => continue,
            };
            // Parse errors carry no rule.
            let rule = msg.rule_id.as_deref().unwrap_or("fatal");
            findings.push(
                Finding::new(level, msg.message, format!("Eslint: {rule}"))
                    .with_file(file.clone())
                    .with_position(msg.line, msg.column)
                    .with_end(msg.end_line, msg.end_column),
            );
        }
    }
    Ok(findings)
}
