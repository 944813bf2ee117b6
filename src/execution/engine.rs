//! Main execution engine - runs a pipeline's steps in order

use crate::{
    core::{
        EnvironmentConfig, Pipeline, PipelineRun, SecretMasker, Step, StepOutcome, StepResult,
    },
    execution::{
        reporter::{Reporter, RunSummary, StepAnnouncement, StepReport},
        CommandRunner, StepError, StepExecutor, StepSelection,
    },
};
use std::sync::Arc;
use tracing::{debug, info};

/// Options for a single run
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Announce steps without executing them
    pub dry_run: bool,

    /// Which steps to run
    pub selection: StepSelection,
}

/// Sequential, fail-fast pipeline runner
pub struct ExecutionEngine<R> {
    executor: StepExecutor<R>,
    reporter: Arc<dyn Reporter>,
    masker: SecretMasker,
    options: RunOptions,
}

impl<R: CommandRunner> ExecutionEngine<R> {
    pub fn new(runner: R, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            executor: StepExecutor::new(runner),
            reporter,
            masker: SecretMasker::new(),
            options: RunOptions::default(),
        }
    }

    /// Secrets to hide from everything the reporter receives
    pub fn with_masker(mut self, masker: SecretMasker) -> Self {
        self.masker = masker;
        self
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute the pipeline against `env`
    ///
    /// Steps run strictly one after another. The first failure under the
    /// abort policy, or any timeout or spawn failure, ends the run; nothing
    /// already done is rolled back.
    pub async fn execute(&self, pipeline: &Pipeline, env: &EnvironmentConfig) -> PipelineRun {
        let mut run = PipelineRun::new(&pipeline.name);

        // Config secrets join the ones supplied by the caller
        let mut masker = self.masker.clone();
        env.collect_secrets(&pipeline.secret_keys, &mut masker);

        let selected = match self.options.selection.resolve(pipeline) {
            Ok(selected) => selected,
            Err(e) => {
                run.fail("", e.to_string());
                self.reporter.finished(&run);
                return run;
            }
        };

        info!(
            "Starting pipeline execution: {} ({}, {} steps)",
            pipeline.name,
            run.execution_id,
            selected.len()
        );
        self.reporter.banner(
            &pipeline.name,
            run.execution_id,
            selected.len(),
            self.options.dry_run,
        );
        self.reporter.config_line(&env.display_line(&masker));

        run.start();

        for index in selected {
            let step = pipeline.steps[index].rendered(env.values());
            let command = masker.mask(&step.command.display());
            debug!("Step {} command: {}", step.name, command);

            self.reporter.step_started(&StepAnnouncement {
                index: index + 1,
                total: pipeline.len(),
                name: step.name.clone(),
                title: masker.mask(step.title()),
                command,
                hint: step.hint.as_deref().map(|h| masker.mask(h)),
                dry_run: self.options.dry_run,
            });

            if self.options.dry_run {
                continue;
            }

            let executed = self
                .executor
                .execute(&step, &pipeline.working_dir, pipeline.limits)
                .await;

            match executed {
                Ok(result) => {
                    let report = Self::report(&step, &result, &masker);
                    let outcome = result.outcome;
                    let reason = Self::failure_reason(&step, &result);
                    run.record(result);

                    match outcome {
                        StepOutcome::Succeeded => {
                            info!("Step {} completed successfully", step.name);
                            self.reporter.step_succeeded(&report);
                        }
                        StepOutcome::Warned => {
                            info!("Step {} failed, continuing: {}", step.name, reason);
                            self.reporter.step_warned(&report);
                        }
                        StepOutcome::Failed => {
                            info!("Step {} failed, aborting: {}", step.name, reason);
                            self.reporter.step_failed(&report);
                            run.fail(&step.name, masker.mask(&reason.to_string()));
                            break;
                        }
                    }
                }
                // Timeouts and spawn failures halt regardless of policy
                Err(e) => {
                    let reason = masker.mask(&e.to_string());
                    info!("Step {} could not complete: {}", step.name, reason);
                    self.reporter.step_error(&step.name, &reason);
                    run.fail(&step.name, reason);
                    break;
                }
            }
        }

        if run.failure.is_none() {
            run.succeed();
            if !self.options.dry_run {
                self.reporter.summary(&Self::summary(pipeline, env, &run, &masker));
            }
        }

        info!(
            "Pipeline execution finished: {} - {:?}",
            pipeline.name, run.status
        );
        self.reporter.finished(&run);
        run
    }

    fn failure_reason(step: &Step, result: &StepResult) -> StepError {
        if result.exit_code != 0 {
            StepError::StepFailed {
                step: step.name.clone(),
                exit_code: result.exit_code,
            }
        } else {
            StepError::MissingPaths {
                step: step.name.clone(),
                paths: result.missing_paths.clone(),
            }
        }
    }

    fn report(step: &Step, result: &StepResult, masker: &SecretMasker) -> StepReport {
        let show_tail = step.show_output || result.outcome != StepOutcome::Succeeded;
        StepReport {
            name: result.step_name.clone(),
            exit_code: result.exit_code,
            duration_ms: result.duration_ms,
            stdout_tail: if show_tail {
                masker.mask_lines(&result.stdout_tail)
            } else {
                Vec::new()
            },
            stderr_excerpt: masker.mask(&result.stderr_excerpt),
            missing_paths: result.missing_paths.clone(),
            note: match result.outcome {
                StepOutcome::Warned => step.note.as_deref().map(|n| masker.mask(n)),
                _ => None,
            },
        }
    }

    fn summary(
        pipeline: &Pipeline,
        env: &EnvironmentConfig,
        run: &PipelineRun,
        masker: &SecretMasker,
    ) -> RunSummary {
        let connection = if pipeline.summary.show_connection.unwrap_or(true) {
            env.connection_info().map(|mut info| {
                info.password = None;
                info
            })
        } else {
            None
        };

        RunSummary {
            title: pipeline.summary.title.clone(),
            connection_line: env.display_line(masker),
            connection,
            next_steps: pipeline
                .summary
                .next_steps
                .iter()
                .map(|s| masker.mask(s))
                .collect(),
            warnings: run.warnings(),
        }
    }
}
