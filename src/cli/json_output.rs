//! Line-delimited JSON reporter for scripting

use crate::{
    core::PipelineRun,
    execution::reporter::{Reporter, RunSummary, StepAnnouncement, StepReport},
};
use serde::Serialize;
use serde_json::{json, Value};
use std::io::{self, Write};
use std::sync::Mutex;
use tracing::warn;
use uuid::Uuid;

/// Writes one `{"event": ..., ...}` object per line
pub struct JsonReporter {
    out: Mutex<Box<dyn Write + Send>>,
}

impl Default for JsonReporter {
    fn default() -> Self {
        Self::new(Box::new(io::stdout()))
    }
}

impl JsonReporter {
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn stdout() -> Self {
        Self::default()
    }

    fn emit(&self, event: &str, data: Value) {
        let mut record = json!({ "event": event });
        if let (Value::Object(record), Value::Object(data)) = (&mut record, data) {
            record.extend(data);
        }

        let Ok(mut out) = self.out.lock() else {
            return;
        };
        if let Err(e) = writeln!(out, "{}", record).and_then(|_| out.flush()) {
            warn!("Failed to write JSON event: {}", e);
        }
    }

    fn emit_serialized<T: Serialize>(&self, event: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(data) => self.emit(event, data),
            Err(e) => warn!("Failed to serialize {} event: {}", event, e),
        }
    }
}

impl Reporter for JsonReporter {
    fn banner(&self, pipeline_name: &str, execution_id: Uuid, steps: usize, dry_run: bool) {
        self.emit(
            "pipeline_started",
            json!({
                "pipeline": pipeline_name,
                "execution_id": execution_id,
                "steps": steps,
                "dry_run": dry_run,
            }),
        );
    }

    fn config_line(&self, line: &str) {
        self.emit("config", json!({ "line": line }));
    }

    fn step_started(&self, step: &StepAnnouncement) {
        self.emit_serialized("step_started", step);
    }

    fn step_succeeded(&self, report: &StepReport) {
        self.emit_serialized("step_succeeded", report);
    }

    fn step_warned(&self, report: &StepReport) {
        self.emit_serialized("step_warned", report);
    }

    fn step_failed(&self, report: &StepReport) {
        self.emit_serialized("step_failed", report);
    }

    fn step_error(&self, step_name: &str, reason: &str) {
        self.emit("step_error", json!({ "name": step_name, "reason": reason }));
    }

    fn summary(&self, summary: &RunSummary) {
        self.emit_serialized("summary", summary);
    }

    fn finished(&self, run: &PipelineRun) {
        self.emit(
            "pipeline_finished",
            json!({
                "execution_id": run.execution_id,
                "status": run.status,
                "success": run.success(),
                "steps_run": run.results.len(),
                "duration_ms": run.duration().map(|d| d.as_millis() as u64),
                "failure": run.failure,
            }),
        );
    }
}
