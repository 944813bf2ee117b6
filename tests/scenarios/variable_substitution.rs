//! Test: Variable Substitution - `{{ KEY }}` placeholders in commands

use crate::helpers::*;
use provision::core::{SecretMasker, Step, StepCommand};
use provision::execution::RunOptions;

#[tokio::test]
async fn test_placeholders_resolved_from_config() {
    let yaml = r#"
name: "Templated"
steps:
  - name: "migrate"
    run: "dbmate --url {{ DATABASE_URL }} --schema {{SCHEMA}} up"
  - name: "unknown"
    run: "echo {{ NOT_SET }}"
"#;
    let pipeline = pipeline_from_yaml(yaml);
    let env = env_with(&[
        ("DATABASE_URL", "postgres://app@localhost/app"),
        ("SCHEMA", "public"),
    ]);

    let result = run_scripted(
        &pipeline,
        &env,
        ScriptedRunner::new(vec![]),
        RunOptions::default(),
        SecretMasker::new(),
    )
    .await;

    assert_run_succeeded(&result);
    assert_eq!(
        result.runner.command_for("migrate").as_deref(),
        Some("dbmate --url postgres://app@localhost/app --schema public up")
    );
    // Unknown keys pass through untouched
    assert_eq!(
        result.runner.command_for("unknown").as_deref(),
        Some("echo {{ NOT_SET }}")
    );
}

#[tokio::test]
async fn test_argv_steps_render_each_argument() {
    let mut step = Step::shell("seed", "unused");
    step.command = StepCommand::Argv(vec![
        "node".into(),
        "seed.js".into(),
        "--target={{ TARGET }}".into(),
    ]);
    let pipeline = pipeline_of(vec![step]);

    let result = run_scripted(
        &pipeline,
        &env_with(&[("DATABASE_URL", "sqlite://dev.db"), ("TARGET", "staging env")]),
        ScriptedRunner::new(vec![]),
        RunOptions::default(),
        SecretMasker::new(),
    )
    .await;

    assert_run_succeeded(&result);
    assert_eq!(
        result.runner.command_for("seed").as_deref(),
        Some("node seed.js '--target=staging env'")
    );
}

/// The pipeline definition itself is left unrendered
#[tokio::test]
async fn test_rendering_does_not_mutate_pipeline() {
    let pipeline = pipeline_of(vec![Step::shell("echo", "echo {{ DATABASE_URL }}")]);

    let result = run_with_script(&pipeline, vec![]).await;

    assert_run_succeeded(&result);
    assert_eq!(
        pipeline.steps[0].command,
        StepCommand::Shell("echo {{ DATABASE_URL }}".into())
    );
}
