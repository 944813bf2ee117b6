//! Execution state models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Pipeline run status
///
/// `Idle → Running → {Succeeded, Failed}`; the last two are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Run has not started
    Idle,
    /// Steps are being executed
    Running,
    /// Every abort-level step exited zero
    Succeeded,
    /// Halted by an abort-level failure
    Failed,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed)
    }
}

/// How a finished step is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOutcome {
    /// Exit code zero and every expected path present
    Succeeded,
    /// Failed under the abort policy
    Failed,
    /// Failed under the warn-and-continue policy
    Warned,
}

/// Result of one executed step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub step_name: String,

    /// Process exit code, -1 when terminated by a signal
    pub exit_code: i32,

    /// Last non-empty stdout lines
    pub stdout_tail: Vec<String>,

    /// Leading part of stderr
    pub stderr_excerpt: String,

    pub duration_ms: u64,

    /// Expected paths that were absent after the command exited
    #[serde(default)]
    pub missing_paths: Vec<String>,

    pub outcome: StepOutcome,
}

impl StepResult {
    /// Whether the command itself succeeded and produced what was expected
    pub fn is_success(&self) -> bool {
        self.exit_code == 0 && self.missing_paths.is_empty()
    }
}

/// Aggregate of one pipeline execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub execution_id: Uuid,

    pub pipeline_name: String,

    pub status: RunStatus,

    pub started_at: Option<DateTime<Utc>>,

    pub completed_at: Option<DateTime<Utc>>,

    /// Results in execution order
    pub results: Vec<StepResult>,

    /// Why the run halted, already masked for display
    pub failure: Option<RunFailure>,
}

/// The step and reason that stopped a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunFailure {
    pub step_name: String,
    pub reason: String,
}

impl PipelineRun {
    pub fn new(pipeline_name: impl Into<String>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            pipeline_name: pipeline_name.into(),
            status: RunStatus::Idle,
            started_at: None,
            completed_at: None,
            results: Vec::new(),
            failure: None,
        }
    }

    /// Mark the run as started
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Mark the run as succeeded
    pub fn succeed(&mut self) {
        self.status = RunStatus::Succeeded;
        self.completed_at = Some(Utc::now());
    }

    /// Mark the run as failed
    pub fn fail(&mut self, step_name: impl Into<String>, reason: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.completed_at = Some(Utc::now());
        self.failure = Some(RunFailure {
            step_name: step_name.into(),
            reason: reason.into(),
        });
    }

    pub fn record(&mut self, result: StepResult) {
        self.results.push(result);
    }

    pub fn success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Process exit code mirroring the outcome
    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    /// Number of steps that failed but were allowed to continue
    pub fn warnings(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.outcome == StepOutcome::Warned)
            .count()
    }

    /// Wall-clock duration of the run, if it has finished
    pub fn duration(&self) -> Option<std::time::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => end.signed_duration_since(start).to_std().ok(),
            _ => None,
        }
    }
}
