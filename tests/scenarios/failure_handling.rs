//! Test: Failure Handling - abort vs warn-and-continue, timeouts and spawn errors

use crate::helpers::*;
use provision::core::{FailurePolicy, Step, StepOutcome};

/// A failing abort step halts the run; later steps are never started
#[tokio::test]
async fn test_abort_stops_pipeline() {
    let pipeline = pipeline_of(vec![
        Step::shell("A", "true"),
        Step::shell("B", "false"),
        Step::shell("C", "true"),
    ]);

    let result = run_with_script(&pipeline, vec![("B", fail(1, "boom"))]).await;

    assert_run_failed_at(&result, "B");
    assert_eq!(result.result_names(), vec!["A", "B"]);
    assert_invoked(&result, &["A", "B"]);
    assert_eq!(result.result("B").exit_code, 1);
    assert_eq!(result.result("B").outcome, StepOutcome::Failed);
    assert_eq!(result.result("B").stderr_excerpt, "boom");

    let failure = result.run.failure.as_ref().unwrap();
    assert_eq!(failure.reason, "step 'B' exited with code 1");

    // No success summary after a failure
    assert!(result.reporter.payloads("summary").is_empty());
    assert_eq!(result.reporter.payloads("finished"), vec!["Failed"]);
}

/// A failing warn-and-continue step is recorded and the run carries on
#[tokio::test]
async fn test_warn_and_continue() {
    let pipeline = pipeline_of(vec![
        Step::shell("A", "true"),
        Step::shell("B", "false").with_policy(FailurePolicy::WarnAndContinue),
        Step::shell("C", "true"),
    ]);

    let result = run_with_script(&pipeline, vec![("B", fail(1, "duplicate key"))]).await;

    assert_run_succeeded(&result);
    assert_eq!(result.result_names(), vec!["A", "B", "C"]);
    assert_invoked(&result, &["A", "B", "C"]);
    assert_eq!(result.result("B").exit_code, 1);
    assert_eq!(result.result("B").outcome, StepOutcome::Warned);
    assert!(!result.result("B").is_success());
    assert_eq!(result.run.warnings(), 1);

    let warned = result.reporter.payloads("warned");
    assert_eq!(warned.len(), 1);
    assert!(warned[0].contains("duplicate key"));

    let summary = result.reporter.payloads("summary");
    assert_eq!(summary.len(), 1);
    assert!(summary[0].contains(r#""warnings":1"#));
}

/// The note shows up only when a tolerated failure happens
#[tokio::test]
async fn test_note_attached_to_warning() {
    let yaml = r#"
name: "Seed"
steps:
  - name: "seed"
    run: "npm run seed"
    on_failure: warn-and-continue
    note: "Seeding failed - data may already exist"
  - name: "report"
    run: "echo done"
    note: "never shown"
"#;
    let pipeline = pipeline_from_yaml(yaml);

    let result = run_with_script(&pipeline, vec![("seed", fail(2, "unique constraint"))]).await;

    assert_run_succeeded(&result);
    let warned = result.reporter.payloads("warned");
    assert!(warned[0].contains("Seeding failed - data may already exist"));
    let succeeded = result.reporter.payloads("succeeded");
    assert!(succeeded[0].contains(r#""note":null"#));
}

/// Timeouts halt the run even under warn-and-continue
#[tokio::test]
async fn test_timeout_always_aborts() {
    let pipeline = pipeline_of(vec![
        Step::shell("A", "true"),
        Step::shell("B", "sleep 60")
            .with_policy(FailurePolicy::WarnAndContinue)
            .with_timeout(1),
        Step::shell("C", "true"),
    ]);

    let result = run_with_script(&pipeline, vec![("B", Scripted::Timeout)]).await;

    assert_run_failed_at(&result, "B");
    assert_invoked(&result, &["A", "B"]);
    // Timed-out steps leave no result; the failure lives on the run
    assert_eq!(result.result_names(), vec!["A"]);
    assert_eq!(
        result.run.failure.as_ref().unwrap().reason,
        "step 'B' timed out after 1 seconds"
    );
    assert_eq!(
        result.reporter.payloads("error"),
        vec!["B: step 'B' timed out after 1 seconds"]
    );
}

/// A command that cannot be started halts the run even under warn-and-continue
#[tokio::test]
async fn test_spawn_error_always_aborts() {
    let pipeline = pipeline_of(vec![
        Step::shell("A", "missing-binary").with_policy(FailurePolicy::WarnAndContinue),
        Step::shell("B", "true"),
    ]);

    let result = run_with_script(&pipeline, vec![("A", Scripted::SpawnFailure)]).await;

    assert_run_failed_at(&result, "A");
    assert_invoked(&result, &["A"]);
    assert!(result.run.results.is_empty());
    let reason = &result.run.failure.as_ref().unwrap().reason;
    assert!(reason.starts_with("failed to start step 'A'"));
    assert!(reason.contains("program not found"));
}

/// A zero exit that leaves an expected path missing counts as a failure
#[tokio::test]
async fn test_missing_expected_paths_fail_step() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("node_modules")).unwrap();

    let mut pipeline = pipeline_of(vec![
        Step::shell("install", "npm install")
            .with_expect_paths(vec!["node_modules".into()]),
        Step::shell("generate", "npx prisma generate")
            .with_expect_paths(vec!["node_modules/.prisma/client".into()]),
        Step::shell("seed", "npm run seed"),
    ]);
    pipeline.working_dir = dir.path().to_path_buf();

    let result = run_with_script(&pipeline, vec![]).await;

    assert_run_failed_at(&result, "generate");
    assert_invoked(&result, &["install", "generate"]);
    let generate = result.result("generate");
    assert_eq!(generate.exit_code, 0);
    assert_eq!(generate.missing_paths, vec!["node_modules/.prisma/client"]);
    assert_eq!(
        result.run.failure.as_ref().unwrap().reason,
        "step 'generate' did not create: node_modules/.prisma/client"
    );
}

/// Missing expected paths follow the step's policy like a bad exit code
#[tokio::test]
async fn test_missing_expected_paths_can_warn() {
    let dir = tempfile::tempdir().unwrap();

    let mut pipeline = pipeline_of(vec![
        Step::shell("build", "npm run build")
            .with_expect_paths(vec!["dist".into()])
            .with_policy(FailurePolicy::WarnAndContinue),
        Step::shell("serve", "true"),
    ]);
    pipeline.working_dir = dir.path().to_path_buf();

    let result = run_with_script(&pipeline, vec![]).await;

    assert_run_succeeded(&result);
    assert_eq!(result.result("build").outcome, StepOutcome::Warned);
    assert_invoked(&result, &["build", "serve"]);
}

/// Stdout is shown on failure even for steps that hide it on success
#[tokio::test]
async fn test_hidden_output_shown_on_failure() {
    let mut quiet = Step::shell("quiet", "npm ci");
    quiet.show_output = false;
    let mut noisy = Step::shell("noisy", "npm test");
    noisy.show_output = false;

    let pipeline = pipeline_of(vec![quiet, noisy]);
    let result = run_with_script(
        &pipeline,
        vec![
            ("quiet", ok("added 300 packages")),
            (
                "noisy",
                Scripted::Exit {
                    code: 1,
                    stdout: "3 tests failed".into(),
                    stderr: "assertion error".into(),
                },
            ),
        ],
    )
    .await;

    assert_run_failed_at(&result, "noisy");
    let succeeded = result.reporter.payloads("succeeded");
    assert!(succeeded[0].contains(r#""stdout_tail":[]"#));
    let failed = result.reporter.payloads("failed");
    assert!(failed[0].contains("3 tests failed"));
    assert!(failed[0].contains("assertion error"));

    // The recorded result keeps the tail regardless of display
    assert_eq!(result.result("quiet").stdout_tail, vec!["added 300 packages"]);
}
