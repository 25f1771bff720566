//! Integration tests for the action pipelines against scripted tools.

use std::sync::Arc;

use ywci_checks::actions::{self, PyStaticAnalysis};
use ywci_core::fakes::{RecordingAnnotator, ScriptedRunner};
use ywci_core::{ActionError, CheckContext, CommandOutput, HostFiles, JobStatus, Level, Outcome, SkipSet};

const CLEAN_AUDIT: &str = r#"{"type":"auditSummary","data":{"vulnerabilities":{"info":0,"low":0,"moderate":0,"high":0,"critical":0},"dependencies":120,"devDependencies":80,"optionalDependencies":0,"totalDependencies":200}}"#;

fn context(work_dir: &str, runner: ScriptedRunner) -> (CheckContext, Arc<RecordingAnnotator>, Arc<ScriptedRunner>) {
    let annotator = Arc::new(RecordingAnnotator::new());
    let runner = Arc::new(runner);
    let ctx = CheckContext::new(work_dir, annotator.clone(), runner.clone());
    (ctx, annotator, runner)
}

/// Test: static analysis with one lint error fails the job and reports every check
#[tokio::test]
async fn test_ts_static_analysis_failure() {
    let eslint = r#"[{"filePath":"/pkg/src/lib/index.ts","messages":[{"ruleId":"no-console","message":"Unexpected console statement.","line":12,"column":5,"endLine":12,"endColumn":16,"severity":2}]}]"#;
    let runner = ScriptedRunner::new()
        .on("yarn -s audit --json", CommandOutput::new(0, CLEAN_AUDIT, ""))
        .on("yarn -s eslint . -f json", CommandOutput::new(1, eslint, ""))
        .on("yarn -s prettier --list-different .", CommandOutput::new(0, "", ""));
    let (ctx, annotator, runner) = context("/pkg", runner);

    let status = actions::run_pipeline(
        &actions::ts_static_analysis(Vec::new()),
        &ctx,
        SkipSet::new(),
        &HostFiles::default(),
    )
    .await
    .unwrap();

    assert_eq!(
        status,
        JobStatus::Failed("Job failed because some static analysis checks failed".to_string())
    );
    assert_eq!(runner.command_lines().len(), 3);
    assert_eq!(annotator.groups(), vec!["audit", "eslint", "prettier"]);
    assert!(annotator.groups_balanced());

    let errors = annotator.at(Level::Error);
    let lint = errors
        .iter()
        .find(|(message, _)| message == "Unexpected console statement.")
        .expect("eslint error annotated");
    assert_eq!(lint.1.file.as_deref(), Some("src/lib/index.ts"));
    assert_eq!(lint.1.start_line, Some(12));
    assert_eq!(lint.1.title.as_deref(), Some("Eslint: no-console"));
}

/// Test: skipped checks never spawn their tool and the job still succeeds
#[tokio::test]
async fn test_ts_build_with_skips_writes_summary() {
    let dir = tempfile::tempdir().unwrap();
    let host = HostFiles {
        summary: Some(dir.path().join("summary.md")),
        ..HostFiles::default()
    };
    let runner = ScriptedRunner::new()
        .on("yarn build", CommandOutput::new(0, "built in 3s\n", ""))
        .on("git status -s", CommandOutput::new(0, "", ""));
    let (ctx, annotator, runner) = context("/pkg", runner);

    let status = actions::run_pipeline(&actions::ts_build(), &ctx, SkipSet::parse("autogen doc"), &host)
        .await
        .unwrap();

    assert_eq!(status, JobStatus::Succeeded);
    assert_eq!(runner.command_lines(), vec!["yarn build", "git status -s"]);
    assert!(annotator
        .messages(Level::Warning)
        .contains(&"Skipping autogen check".to_string()));
    assert!(annotator
        .messages(Level::Warning)
        .contains(&"Some checks skipped".to_string()));

    let summary = std::fs::read_to_string(dir.path().join("summary.md")).unwrap();
    assert!(summary.starts_with("### Build"));
    assert!(summary.contains("autogen"));
}

/// Test: an unrunnable tool aborts the run; later checks never start
#[tokio::test]
async fn test_py_static_analysis_missing_tool_is_unexpected_error() {
    let runner = ScriptedRunner::new().on("pycodestyle .", CommandOutput::new(0, "", ""));
    let (ctx, annotator, runner) = context("/src/py-youwol", runner);

    let err = actions::run_pipeline(
        &actions::py_static_analysis(PyStaticAnalysis::default()),
        &ctx,
        SkipSet::new(),
        &HostFiles::default(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ActionError::Spawn { ref program, .. } if program == "isort"));
    assert_eq!(runner.command_lines(), vec!["pycodestyle .", "isort --check-only ."]);
    assert!(annotator.groups_balanced());
}

/// Test: py static analysis passes when every tool is clean
#[tokio::test]
async fn test_py_static_analysis_clean() {
    let runner = ScriptedRunner::new()
        .on("pycodestyle .", CommandOutput::new(0, "", ""))
        .on("isort --check-only .", CommandOutput::new(0, "", ""))
        .on("black --check .", CommandOutput::new(0, "", "All done! ✨ 🍰 ✨\n"))
        .on("pylint --output-format=json src", CommandOutput::new(0, "[]", ""))
        .on(
            "pip-audit -r requirements-qa.txt -f json --progress-spinner off",
            CommandOutput::new(0, r#"{"dependencies":[{"name":"fastapi","version":"0.109.1","vulns":[]}],"fixes":[]}"#, ""),
        )
        .on("git status -s", CommandOutput::new(0, "", ""));
    let (ctx, annotator, _) = context("/src/py-youwol", runner);
    let inputs = PyStaticAnalysis {
        requirements: "requirements-qa.txt".to_string(),
        ..PyStaticAnalysis::default()
    };

    let pipeline = actions::py_static_analysis(inputs);
    let (result, status) = pipeline
        .execute(&ctx, SkipSet::parse("version_monotony"))
        .await
        .unwrap();

    assert_eq!(status, JobStatus::Succeeded);
    assert_eq!(result.overall, Outcome::Skipped);
    assert_eq!(result.outcome_of("version_monotony"), Some(Outcome::Skipped));
    assert_eq!(result.count(Outcome::Ok), 6);
    assert!(annotator.at(Level::Error).is_empty());
}

/// Test: tests action streams yarn output and maps its exit code
#[tokio::test]
async fn test_ts_tests_failure() {
    let runner = ScriptedRunner::new().on("yarn test", CommandOutput::new(1, "", ""));
    let (ctx, _, _) = context("/pkg", runner);

    let status = actions::run_pipeline(&actions::ts_tests(false), &ctx, SkipSet::new(), &HostFiles::default())
        .await
        .unwrap();

    assert_eq!(status, JobStatus::Failed("Job failed because tests failed".to_string()));
}
