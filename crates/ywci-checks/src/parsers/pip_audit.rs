//! `pip-audit -f json` parsing.

use serde::Deserialize;
use ywci_core::Result;

use super::advisories::{AdvisoryLedger, Verdict};
use crate::finding::Finding;

const VULNERABILITY_TITLE: &str = "Pip-audit: Vulnerability";

#[derive(Debug, Default, Deserialize)]
struct Report {
    #[serde(default)]
    dependencies: Vec<Dependency>,
}

#[derive(Debug, Deserialize)]
struct Dependency {
    name: String,
    version: Option<String>,
    #[serde(default)]
    vulns: Vec<Vulnerability>,
    skip_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Vulnerability {
    id: String,
    #[serde(default)]
    aliases: Vec<String>,
    #[serde(default)]
    fix_versions: Vec<String>,
}

/// Map a pip-audit JSON report to findings, updating the advisory ledger.
pub fn parse(stdout: &str, ledger: &mut AdvisoryLedger) -> Result<Vec<Finding>> {
    let report: Report = serde_json::from_str(stdout)?;
    let mut findings = Vec::new();

    let audited = report.dependencies.iter().filter(|d| d.skip_reason.is_none()).count();
    findings.push(Finding::notice(
        format!("{audited} dependencies audited"),
        "Pip-audit: Dependencies",
    ));

    for dep in &report.dependencies {
        if let Some(reason) = &dep.skip_reason {
            findings.push(Finding::info(format!("skipped {}: {reason}", dep.name)));
            continue;
        }
        let version = dep.version.as_deref().unwrap_or("?");
        for vuln in &dep.vulns {
            match ledger.observe(&vuln.id, &vuln.aliases) {
                Verdict::Fatal => {
                    let fix = if vuln.fix_versions.is_empty() {
                        "no fix available".to_string()
                    } else {
                        format!("fixed in {}", vuln.fix_versions.join(", "))
                    };
                    findings.push(Finding::error(
                        format!("found fatal vulnerability {} in {} {version} ({fix})", vuln.id, dep.name),
                        VULNERABILITY_TITLE,
                    ));
                }
                Verdict::Accepted(through) => findings.push(Finding::warning(
                    format!("accepting vulnerability {through} in {} {version}", dep.name),
                    VULNERABILITY_TITLE,
                )),
                Verdict::Duplicate => {}
            }
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
                format!("Accepted vulnerability id {id} not found"),
                "Pip-audit: Vulnerability not found",
            )
        })
        .collect()
}
