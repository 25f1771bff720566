//! `pylint --output-format=json` parsing.

use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use ywci_core::{Level, Result};

use crate::finding::{relative_path, Finding};

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(rename = "type")]
    kind: String,
    path: String,
    line: Option<u32>,
    column: Option<u32>,
    #[serde(rename = "endLine")]
    end_line: Option<u32>,
    #[serde(rename = "endColumn")]
    end_column: Option<u32>,
    symbol: String,
    message: String,
    #[serde(rename = "message-id")]
    message_id: String,
}

fn level_of(kind: &str) -> Level {
    match kind {
        "error" | "fatal" => Level::Error,
        "warning" => Level::Warning,
        _ => Level::Notice,
    }
}

/// Map pylint messages to findings.
///
/// pylint columns are 0-based; annotations are 1-based.
pub fn parse(records: &[Value], base: &Path) -> Result<Vec<Finding>> {
    let mut findings = Vec::with_capacity(records.len());
    for record in records {
        let msg: Message = serde_json::from_value(record.clone())?;
        findings.push(
            Finding::new(
                level_of(&msg.kind),
                msg.message,
                format!("Pylint: {} ({})", msg.symbol, msg.message_id),
            )
            .with_file(relative_path(base, &msg.path))
            .with_position(msg.line, msg.column.map(|c| c + 1))
            .with_end(msg.end_line, msg.end_column.map(|c| c + 1)),
        );
    }
    Ok(findings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_levels_and_positions() {
        let records = vec![
            json!({
                "type": "convention", "module": "youwol.app", "obj": "", "line": 1, "column": 0,
                "endLine": null, "endColumn": null, "path": "src/youwol/app.py",
                "symbol": "missing-module-docstring", "message": "Missing module docstring",
                "message-id": "C0114"
            }),
            json!({
                "type": "error", "module": "youwol.app", "obj": "main", "line": 10, "column": 4,
                "endLine": 10, "endColumn": 12, "path": "src/youwol/app.py",
                "symbol": "undefined-variable", "message": "Undefined variable 'foo'",
                "message-id": "E0602"
            }),
            json!({
                "type": "warning", "module": "m", "obj": "", "line": 2, "column": 0,
                "path": "m.py", "symbol": "unused-import", "message": "Unused import os",
                "message-id": "W0611"
            }),
        ];

        let findings = parse(&records, Path::new("/src")).unwrap();

        assert_eq!(findings[0].level, Level::Notice);
        assert_eq!(
            findings[0].props.title.as_deref(),
            Some("Pylint: missing-module-docstring (C0114)")
        );
        assert_eq!(findings[0].props.start_column, Some(1));
        assert_eq!(findings[1].level, Level::Error);
        assert_eq!(findings[1].props.start_column, Some(5));
        assert_eq!(findings[1].props.end_column, Some(13));
        assert_eq!(findings[2].level, Level::Warning);
    }

    #[test]
    fn test_malformed_record_is_error() {
        let records = vec![json!({ "type": "error" })];
        assert!(parse(&records, Path::new("/src")).is_err());
    }
}
