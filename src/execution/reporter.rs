//! Reporter - where the runner sends everything meant for the user
//!
//! The runner masks secrets before building any of the views below, so a
//! reporter can print them as-is.

use crate::core::{connection::ConnectionInfo, state::PipelineRun};
use serde::Serialize;
use uuid::Uuid;

/// Start of a step
#[derive(Debug, Clone, Serialize)]
pub struct StepAnnouncement {
    /// 1-based position in the full pipeline
    pub index: usize,
    pub total: usize,
    pub name: String,
    /// Banner text (description or name)
    pub title: String,
    /// Rendered command, masked
    pub command: String,
    pub hint: Option<String>,
    pub dry_run: bool,
}

/// Finished step, masked for display
#[derive(Debug, Clone, Serialize)]
pub struct StepReport {
    pub name: String,
    pub exit_code: i32,
    pub duration_ms: u64,
    /// Empty when the step hides its output
    pub stdout_tail: Vec<String>,
    pub stderr_excerpt: String,
    pub missing_paths: Vec<String>,
    /// Annotation for warn-and-continue failures
    pub note: Option<String>,
}

/// Block printed after a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub title: Option<String>,
    /// `KEY=value` line, masked
    pub connection_line: String,
    /// Connection breakdown without the password
    pub connection: Option<ConnectionInfo>,
    pub next_steps: Vec<String>,
    pub warnings: usize,
}

/// Receives progress from the pipeline runner
pub trait Reporter: Send + Sync {
    /// Pipeline header
    fn banner(&self, pipeline_name: &str, execution_id: Uuid, steps: usize, dry_run: bool);

    /// The masked configuration line
    fn config_line(&self, line: &str);

    fn step_started(&self, step: &StepAnnouncement);

    fn step_succeeded(&self, report: &StepReport);

    /// Step failed under warn-and-continue
    fn step_warned(&self, report: &StepReport);

    /// Step failed under abort
    fn step_failed(&self, report: &StepReport);

    /// Step could not run to completion (timeout, spawn failure)
    fn step_error(&self, step_name: &str, reason: &str);

    /// Only called when the run succeeded
    fn summary(&self, summary: &RunSummary);

    /// Last call of every run, successful or not
    fn finished(&self, run: &PipelineRun);
}

/// Reporter that discards everything
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn banner(&self, _: &str, _: Uuid, _: usize, _: bool) {}
    fn config_line(&self, _: &str) {}
    fn step_started(&self, _: &StepAnnouncement) {}
    fn step_succeeded(&self, _: &StepReport) {}
    fn step_warned(&self, _: &StepReport) {}
    fn step_failed(&self, _: &StepReport) {}
    fn step_error(&self, _: &str, _: &str) {}
    fn summary(&self, _: &RunSummary) {}
    fn finished(&self, _: &PipelineRun) {}
}
