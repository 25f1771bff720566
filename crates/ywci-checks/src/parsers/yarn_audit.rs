//! `yarn audit --json` (NDJSON) parsing.

use serde::Deserialize;
use serde_json::Value;
use ywci_core::Result;

use super::advisories::{AdvisoryLedger, Verdict};
use crate::finding::Finding;

const VULNERABILITY_TITLE: &str = "Audit: Vulnerability";

#[derive(Debug, Deserialize)]
struct AdvisoryData {
    advisory: Advisory,
}

#[derive(Debug, Deserialize)]
struct Advisory {
    github_advisory_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SummaryData {
    vulnerabilities: Vulnerabilities,
    dependencies: u64,
    dev_dependencies: u64,
    optional_dependencies: u64,
    total_dependencies: u64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Vulnerabilities {
    info: u64,
    low: u64,
    moderate: u64,
    high: u64,
    critical: u64,
}

impl Vulnerabilities {
    fn describe(&self) -> Option<String> {
        let parts: Vec<String> = [
            ("low", self.low),
            ("moderate", self.moderate),
            ("info", self.info),
            ("high", self.high),
            ("critical", self.critical),
        ]
        .iter()
        .filter(|(_, count)| *count != 0)
        .map(|(name, count)| format!("{name}: {count}"))
        .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(", "))
        }
    }
}

/// Map yarn audit records to findings, updating the advisory ledger.
///
/// Records other than `auditAdvisory` and `auditSummary` are ignored.
pub fn parse(records: &[Value], ledger: &mut AdvisoryLedger) -> Result<Vec<Finding>> {
    let mut findings = Vec::new();
    for record in records {
        let data = record.get("data").cloned().unwrap_or(Value::Null);
        match record.get("type").and_then(Value::as_str) {
            Some("auditAdvisory") => {
                let data: AdvisoryData = serde_json::from_value(data)?;
                let id = data.advisory.github_advisory_id;
                match ledger.observe(&id, &[]) {
                    Verdict::Fatal => findings.push(Finding::error(
                        format!("found fatal advisory {id}"),
                        VULNERABILITY_TITLE,
                    )),
                    Verdict::Accepted(_) => findings.push(Finding::warning(
                        format!("accepting ghsaId {id}"),
                        VULNERABILITY_TITLE,
                    )),
                    Verdict::Duplicate => {}
                }
            }
            Some("auditSummary") => {
                let data: SummaryData = serde_json::from_value(data)?;
                findings.push(Finding::notice(
                    format!(
                        "{} dependencies (dev: {}, optional: {})",
                        data.total_dependencies, data.dev_dependencies, data.optional_dependencies
                    ),
                    "Audit: Dependencies",
                ));
                if let Some(description) = data.vulnerabilities.describe() {
                    findings.push(Finding::warning(description, "Audit: Vulnerabilities"));
                }
                tracing::debug!(dependencies = data.dependencies, "yarn audit summary");
            }
            _ => {}
        }
    }
    Ok(findings)
}

/// Warnings for accepted ids the audit never reported.
pub fn unseen_accepted(ledger: &AdvisoryLedger) -> Vec<Finding> {
    ledger
        .unseen_accepted()
        .iter()
        .map(|id| {
            Finding::warning(
                format!("Accepted GHSA id {id} not found"),
                "Audit: Vulnerability not found",
            )
        })
        .collect()
}
