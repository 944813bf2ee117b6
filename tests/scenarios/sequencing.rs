//! Test: Sequencing - steps run one at a time, in declaration order

use crate::helpers::*;
use provision::core::{SecretMasker, Step};
use provision::execution::{RunOptions, StepSelection};
use std::time::Duration;

/// Every step starts only after the previous one has finished
#[tokio::test]
async fn test_steps_run_strictly_in_order() {
    let pipeline = pipeline_of(vec![
        Step::shell("install", "npm install"),
        Step::shell("generate", "npx prisma generate"),
        Step::shell("migrate", "npx prisma migrate deploy"),
        Step::shell("seed", "npm run seed"),
    ]);

    let runner = ScriptedRunner::new(vec![]).with_delay(Duration::from_millis(20));
    let result = run_scripted(
        &pipeline,
        &env_with_url("mysql://root:pw@localhost:3306/app"),
        runner,
        RunOptions::default(),
        SecretMasker::new(),
    )
    .await;

    assert_run_succeeded(&result);
    assert_eq!(
        result.runner.log(),
        vec![
            "start:install",
            "end:install",
            "start:generate",
            "end:generate",
            "start:migrate",
            "end:migrate",
            "start:seed",
            "end:seed",
        ]
    );
    assert_eq!(
        result.result_names(),
        vec!["install", "generate", "migrate", "seed"]
    );
}

/// The reporter sees banner, config, each step, summary, then the end
#[tokio::test]
async fn test_reporter_event_order() {
    let pipeline = pipeline_of(vec![
        Step::shell("install", "npm install"),
        Step::shell("generate", "npx prisma generate"),
    ]);

    let result = run_with_script(&pipeline, vec![("install", ok("added 12 packages"))]).await;

    assert_run_succeeded(&result);
    assert_eq!(
        result.reporter.kinds(),
        vec![
            "banner",
            "config",
            "started",
            "succeeded",
            "started",
            "succeeded",
            "summary",
            "finished",
        ]
    );

    let started = result.reporter.payloads("started");
    assert!(started[0].contains(r#""index":1"#));
    assert!(started[1].contains(r#""index":2"#));
    assert!(started[1].contains(r#""total":2"#));
}

/// Results carry the captured tail, exit code and a timestamped run
#[tokio::test]
async fn test_results_capture_output() {
    let pipeline = pipeline_of(vec![Step::shell("install", "npm install")]);

    let result = run_with_script(
        &pipeline,
        vec![("install", ok("resolving\nfetching\n\nlinking\nbuilding\ndone\nadded 3 packages\n"))],
    )
    .await;

    assert_run_succeeded(&result);
    let install = result.result("install");
    assert!(install.is_success());
    assert_eq!(install.exit_code, 0);
    // Blank lines are dropped and only the last five kept
    assert_eq!(
        install.stdout_tail,
        vec!["fetching", "linking", "building", "done", "added 3 packages"]
    );
    assert!(result.run.started_at.is_some());
    assert!(result.run.completed_at.is_some());
}

/// `--step` runs exactly one step
#[tokio::test]
async fn test_select_single_step() {
    let pipeline = pipeline_of(vec![
        Step::shell("install", "npm install"),
        Step::shell("migrate", "npx prisma migrate deploy"),
        Step::shell("seed", "npm run seed"),
    ]);

    let result = run_scripted(
        &pipeline,
        &env_with_url("mysql://root:pw@localhost:3306/app"),
        ScriptedRunner::new(vec![]),
        RunOptions {
            dry_run: false,
            selection: StepSelection::Only("migrate".into()),
        },
        SecretMasker::new(),
    )
    .await;

    assert_run_succeeded(&result);
    assert_invoked(&result, &["migrate"]);

    // Banner numbering keeps the step's place in the whole pipeline
    let started = result.reporter.payloads("started");
    assert_eq!(started.len(), 1);
    assert!(started[0].contains(r#""index":2"#));
    assert!(started[0].contains(r#""total":3"#));
}

/// `--from-step` resumes from the named step
#[tokio::test]
async fn test_select_from_step() {
    let pipeline = pipeline_of(vec![
        Step::shell("install", "npm install"),
        Step::shell("migrate", "npx prisma migrate deploy"),
        Step::shell("seed", "npm run seed"),
    ]);

    let result = run_scripted(
        &pipeline,
        &env_with_url("mysql://root:pw@localhost:3306/app"),
        ScriptedRunner::new(vec![]),
        RunOptions {
            dry_run: false,
            selection: StepSelection::From("migrate".into()),
        },
        SecretMasker::new(),
    )
    .await;

    assert_run_succeeded(&result);
    assert_invoked(&result, &["migrate", "seed"]);
}

/// An unknown step name fails the run before anything executes
#[tokio::test]
async fn test_unknown_selection_runs_nothing() {
    let pipeline = pipeline_of(vec![Step::shell("install", "npm install")]);

    let result = run_scripted(
        &pipeline,
        &env_with_url("mysql://root:pw@localhost:3306/app"),
        ScriptedRunner::new(vec![]),
        RunOptions {
            dry_run: false,
            selection: StepSelection::Only("deploy".into()),
        },
        SecretMasker::new(),
    )
    .await;

    assert_run_failed_at(&result, "");
    assert!(result.run.results.is_empty());
    assert!(result.runner.invoked().is_empty());
    let failure = result.run.failure.as_ref().unwrap();
    assert!(failure.reason.contains("unknown step 'deploy'"));
    assert!(failure.reason.contains("install"));
    assert_eq!(result.reporter.kinds(), vec!["finished"]);
}
