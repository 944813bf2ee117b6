//! CLI output formatting

use crate::core::{FailurePolicy, RunStatus, SecretMasker, Step};
use console::Emoji;
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "! ");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");
pub static PARTY: Emoji<'_, '_> = Emoji("🎉 ", "* ");
pub static HOST: Emoji<'_, '_> = Emoji("📍 ", "");
pub static PORT: Emoji<'_, '_> = Emoji("🔌 ", "");
pub static USER: Emoji<'_, '_> = Emoji("👤 ", "");
pub static DATABASE: Emoji<'_, '_> = Emoji("🗄️  ", "");

/// Horizontal rule sized to the terminal, capped at 80 columns
pub fn rule() -> String {
    let width = term_size::dimensions_stdout()
        .map(|(w, _)| w.min(80))
        .unwrap_or(70);
    "=".repeat(width)
}

/// Format a run status for display
pub fn format_status(status: RunStatus) -> String {
    match status {
        RunStatus::Idle => style("IDLE").dim().to_string(),
        RunStatus::Running => style("RUNNING").yellow().to_string(),
        RunStatus::Succeeded => style("SUCCEEDED").green().to_string(),
        RunStatus::Failed => style("FAILED").red().to_string(),
    }
}

/// Format a failure policy for display
pub fn format_policy(policy: FailurePolicy) -> String {
    match policy {
        FailurePolicy::Abort => style("abort").red().to_string(),
        FailurePolicy::WarnAndContinue => style("warn-and-continue").yellow().to_string(),
    }
}

/// One line describing a step, used by `list`
/// One-line description of a step, with secrets in its command masked
pub fn format_step_line(index: usize, total: usize, step: &Step, masker: &SecretMasker) -> String {
    format!(
        "{} {} {} {}",
        style(format!("[{}/{}]", index, total)).blue(),
        style(&step.name).bold(),
        style(format!("$ {}", masker.mask(&step.command.display()))).dim(),
        style(format!(
            "({}, {}s)",
            format_policy(step.on_failure),
            step.timeout_secs
        ))
        .dim()
    )
}

/// Indent captured output lines under a step
pub fn format_output(lines: &[String]) -> String {
    lines
        .iter()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs == 0 {
        format!("{}ms", duration.as_millis())
    } else if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
