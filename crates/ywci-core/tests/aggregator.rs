//! Integration tests for the check aggregator with recording fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ywci_core::fakes::{Recorded, RecordingAnnotator, ScriptedRunner};
use ywci_core::{
    check_fn, ActionError, Check, CheckAggregator, CheckContext, JobStatus, Level, Outcome,
    Pipeline, SkipSet,
};

fn context(annotator: &Arc<RecordingAnnotator>) -> CheckContext {
    CheckContext::new(".", annotator.clone(), Arc::new(ScriptedRunner::new()))
}

/// A check returning a fixed outcome and counting its invocations.
fn counting(name: &str, outcome: Outcome, calls: &Arc<AtomicUsize>) -> Box<dyn Check> {
    let calls = Arc::clone(calls);
    Box::new(check_fn(name, move |_ctx| {
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(outcome)
        }
    }))
}

/// Test: skip-listed check yields skipped and its operation never starts
#[tokio::test]
async fn test_skip_listed_check_is_never_invoked() {
    let annotator = Arc::new(RecordingAnnotator::new());
    let ctx = context(&annotator);
    let calls = Arc::new(AtomicUsize::new(0));
    let check = counting("eslint", Outcome::Failure, &calls);

    let aggregator = CheckAggregator::new("Static Analysis", SkipSet::parse("eslint prettier"));
    let outcome = aggregator.run_check(check.as_ref(), &ctx).await.unwrap();

    assert_eq!(outcome, Outcome::Skipped);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let warnings = annotator.at(Level::Warning);
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].0, "Skipping eslint check");
    assert_eq!(warnings[0].1.title.as_deref(), Some("Static Analysis: eslint"));
    assert!(annotator.groups().is_empty(), "skipped check must not open a group");
}

/// Test: executed check is wrapped in a group and its outcome propagated unchanged
#[tokio::test]
async fn test_executed_check_is_grouped() {
    let annotator = Arc::new(RecordingAnnotator::new());
    let ctx = context(&annotator);
    let calls = Arc::new(AtomicUsize::new(0));
    let check = counting("audit", Outcome::Failure, &calls);

    let aggregator = CheckAggregator::new("Static Analysis", SkipSet::new());
    let outcome = aggregator.run_check(check.as_ref(), &ctx).await.unwrap();

    assert_eq!(outcome, Outcome::Failure);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        annotator.records(),
        vec![Recorded::GroupStart("audit".to_string()), Recorded::GroupEnd]
    );
}

/// Test: the reference scenario [a ok, b skip-listed, c failure]
#[tokio::test]
async fn test_ok_skipped_failure_scenario() {
    let annotator = Arc::new(RecordingAnnotator::new());
    let ctx = context(&annotator);
    let a_calls = Arc::new(AtomicUsize::new(0));
    let b_calls = Arc::new(AtomicUsize::new(0));
    let c_calls = Arc::new(AtomicUsize::new(0));
    let checks = vec![
        counting("a", Outcome::Ok, &a_calls),
        counting("b", Outcome::Ok, &b_calls),
        counting("c", Outcome::Failure, &c_calls),
    ];

    let aggregator = CheckAggregator::new("Build", SkipSet::parse("b"));
    let result = aggregator.run_all(&checks, &ctx).await.unwrap();

    assert_eq!(
        result.outcomes(),
        vec![Outcome::Ok, Outcome::Skipped, Outcome::Failure]
    );
    assert_eq!(result.overall, Outcome::Failure);
    assert_eq!(b_calls.load(Ordering::SeqCst), 0);
    assert_eq!(a_calls.load(Ordering::SeqCst), 1);
    assert_eq!(c_calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.outcome_of("b"), Some(Outcome::Skipped));

    let status = result.report(annotator.as_ref(), "Job failed because build failed");
    assert_eq!(
        status,
        JobStatus::Failed("Job failed because build failed".to_string())
    );
    assert!(annotator
        .messages(Level::Warning)
        .contains(&"Some checks skipped".to_string()));
}

/// Test: skipped without failure is surfaced as a warning, not a failure
#[tokio::test]
async fn test_skipped_only_warns() {
    let annotator = Arc::new(RecordingAnnotator::new());
    let ctx = context(&annotator);
    let calls = Arc::new(AtomicUsize::new(0));
    let checks = vec![
        counting("build", Outcome::Ok, &calls),
        counting("doc", Outcome::Ok, &calls),
    ];

    let result = CheckAggregator::new("Build", SkipSet::parse("doc"))
        .run_all(&checks, &ctx)
        .await
        .unwrap();

    assert_eq!(result.overall, Outcome::Skipped);
    assert!(result.report(annotator.as_ref(), "failed").is_success());
    assert!(annotator.messages(Level::Error).is_empty());
}

/// Test: all ok derives ok and reports no warning
#[tokio::test]
async fn test_all_ok() {
    let annotator = Arc::new(RecordingAnnotator::new());
    let ctx = context(&annotator);
    let calls = Arc::new(AtomicUsize::new(0));
    let checks = vec![
        counting("x", Outcome::Ok, &calls),
        counting("y", Outcome::Ok, &calls),
        counting("z", Outcome::Ok, &calls),
    ];

    let result = CheckAggregator::new("T", SkipSet::new())
        .run_all(&checks, &ctx)
        .await
        .unwrap();

    assert_eq!(result.overall, Outcome::Ok);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(result.report(annotator.as_ref(), "failed"), JobStatus::Succeeded);
    assert!(annotator.messages(Level::Warning).is_empty());
    assert!(annotator.groups_balanced());
}

/// Test: checks run in declaration order, one at a time
#[tokio::test]
async fn test_checks_run_sequentially_in_order() {
    let annotator = Arc::new(RecordingAnnotator::new());
    let ctx = context(&annotator);
    let running = Arc::new(AtomicUsize::new(0));
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));

    let mut checks: Vec<Box<dyn Check>> = Vec::new();
    for name in ["first", "second", "third"] {
        let running = Arc::clone(&running);
        let order = Arc::clone(&order);
        checks.push(Box::new(check_fn(name, move |_ctx| {
            let running = Arc::clone(&running);
            let order = Arc::clone(&order);
            async move {
                assert_eq!(running.fetch_add(1, Ordering::SeqCst), 0, "checks overlapped");
                tokio::task::yield_now().await;
                order.lock().unwrap().push(name);
                running.fetch_sub(1, Ordering::SeqCst);
                Ok(Outcome::Ok)
            }
        })));
    }

    CheckAggregator::new("T", SkipSet::new())
        .run_all(&checks, &ctx)
        .await
        .unwrap();
    assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    assert_eq!(annotator.groups(), vec!["first", "second", "third"]);
}

/// Test: an erroring check aborts the run; later checks never start
#[tokio::test]
async fn test_error_aborts_remaining_checks() {
    let annotator = Arc::new(RecordingAnnotator::new());
    let ctx = context(&annotator);
    let after = Arc::new(AtomicUsize::new(0));
    let checks: Vec<Box<dyn Check>> = vec![
        Box::new(check_fn("broken", |_ctx| async {
            Err(ActionError::tool_output("yarn", "truncated JSON"))
        })),
        counting("after", Outcome::Ok, &after),
    ];

    let err = CheckAggregator::new("T", SkipSet::new())
        .run_all(&checks, &ctx)
        .await
        .unwrap_err();

    assert!(matches!(err, ActionError::ToolOutput { .. }));
    assert_eq!(after.load(Ordering::SeqCst), 0);
    assert!(annotator.groups_balanced(), "group must be closed before the error propagates");
}

/// Test: duplicate check names are rejected before anything runs
#[tokio::test]
async fn test_duplicate_names_rejected() {
    let annotator = Arc::new(RecordingAnnotator::new());
    let ctx = context(&annotator);
    let calls = Arc::new(AtomicUsize::new(0));
    let checks = vec![
        counting("cleanness", Outcome::Ok, &calls),
        counting("cleanness", Outcome::Ok, &calls),
    ];

    let err = CheckAggregator::new("T", SkipSet::new())
        .run_all(&checks, &ctx)
        .await
        .unwrap_err();
    assert!(matches!(err, ActionError::InvalidInput { .. }));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Test: two runs over identical stubs give identical results
#[tokio::test]
async fn test_runs_are_idempotent() {
    let make_checks = || {
        let calls = Arc::new(AtomicUsize::new(0));
        vec![
            counting("a", Outcome::Ok, &calls),
            counting("b", Outcome::Failure, &calls),
            counting("c", Outcome::Ok, &calls),
            counting("d", Outcome::Ok, &calls),
        ]
    };
    let aggregator = CheckAggregator::new("T", SkipSet::parse("c"));

    let first_annotator = Arc::new(RecordingAnnotator::new());
    let first = aggregator
        .run_all(&make_checks(), &context(&first_annotator))
        .await
        .unwrap();
    let second_annotator = Arc::new(RecordingAnnotator::new());
    let second = aggregator
        .run_all(&make_checks(), &context(&second_annotator))
        .await
        .unwrap();

    assert_eq!(first.outcomes(), second.outcomes());
    assert_eq!(first.overall, second.overall);
    assert_eq!(first_annotator.records(), second_annotator.records());
}

/// Test: a pipeline runs its checks and maps the overall to a job status
#[tokio::test]
async fn test_pipeline_execute() {
    let annotator = Arc::new(RecordingAnnotator::new());
    let ctx = context(&annotator);
    let pipeline = Pipeline::new("Static Analysis", "Static analysis failed")
        .with_check(check_fn("version_monotony", |_ctx| async { Ok(Outcome::Ok) }))
        .with_check(check_fn("cleanness", |_ctx| async { Ok(Outcome::Failure) }));

    assert_eq!(pipeline.check_names(), vec!["version_monotony", "cleanness"]);
    let (result, status) = pipeline.execute(&ctx, SkipSet::new()).await.unwrap();

    assert_eq!(result.overall, Outcome::Failure);
    assert_eq!(status, JobStatus::Failed("Static analysis failed".to_string()));
    assert_eq!(annotator.messages(Level::Debug), vec!["Starting action".to_string()]);

    let summary = result.to_markdown();
    assert!(summary.contains("### Static Analysis"));
    assert!(summary.contains("| cleanness | ❌ failure |"));
    assert!(summary.contains("**Overall: failure**"));
}
