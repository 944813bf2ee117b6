//! Console reporter for interactive runs
//!
//! Prints the pipeline banner, one `[N/M]` header per step, a spinner while
//! the step's process runs, then a success, warning or error marker with the
//! captured output. Everything it receives is already masked.

use crate::{
    cli::output::*,
    core::{connection::ConnectionInfo, PipelineRun},
    execution::reporter::{Reporter, RunSummary, StepAnnouncement, StepReport},
};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

/// Reporter that writes colored progress to stdout
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn print_header(&self, text: &str) {
        let rule = rule();
        println!("\n{}", style(&rule).blue());
        println!("{}", style(text).green().bold());
        println!("{}\n", style(&rule).blue());
    }

    fn start_spinner(&self, message: &str) {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
    }

    fn stop_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }

    fn print_stderr(&self, report: &StepReport) {
        if !report.stderr_excerpt.is_empty() {
            println!("{}", style(&report.stderr_excerpt).red());
        }
    }

    fn print_connection(&self, info: &ConnectionInfo) {
        println!("  {}Host: {}", HOST, info.host);
        if let Some(port) = info.port {
            println!("  {}Port: {}", PORT, port);
        }
        if let Some(user) = &info.user {
            println!("  {}User: {}", USER, user);
        }
        if let Some(database) = &info.database {
            println!("  {}Database: {}", DATABASE, database);
        }
    }
}

impl Reporter for ConsoleReporter {
    fn banner(&self, pipeline_name: &str, execution_id: Uuid, steps: usize, dry_run: bool) {
        self.print_header(&format!("{}{}", ROCKET, pipeline_name));
        let mode = if dry_run { " (dry run)" } else { "" };
        println!(
            "{}",
            style(format!(
                "run {} - {} step(s){}",
                &execution_id.to_string()[..8],
                steps,
                mode
            ))
            .dim()
        );
    }

    fn config_line(&self, line: &str) {
        println!("\n{}", style("Configuration:").yellow());
        println!("  {}\n", line);
    }

    fn step_started(&self, step: &StepAnnouncement) {
        println!(
            "{} {}",
            style(format!("[{}/{}]", step.index, step.total)).blue(),
            style(&step.title).bold()
        );
        if let Some(hint) = &step.hint {
            println!("{}", style(format!("({})", hint)).yellow());
        }
        println!("{}", style(format!("  $ {}", step.command)).dim());

        if step.dry_run {
            println!("{}\n", style("  skipped (dry run)").dim());
        } else {
            self.start_spinner(&step.title);
        }
    }

    fn step_succeeded(&self, report: &StepReport) {
        self.stop_spinner();
        if !report.stdout_tail.is_empty() {
            println!("{}", style(format_output(&report.stdout_tail)).dim());
        }
        println!(
            "{}{} {}\n",
            CHECK,
            style(&report.name).green(),
            style(format_duration(Duration::from_millis(report.duration_ms))).dim()
        );
    }

    fn step_warned(&self, report: &StepReport) {
        self.stop_spinner();
        println!(
            "{}{} failed with exit code {}, continuing",
            WARN,
            style(&report.name).yellow(),
            report.exit_code
        );
        self.print_stderr(report);
        if !report.missing_paths.is_empty() {
            println!("  missing: {}", report.missing_paths.join(", "));
        }
        if let Some(note) = &report.note {
            println!("{}", style(format!("Note: {}", note)).yellow());
        }
        println!();
    }

    fn step_failed(&self, report: &StepReport) {
        self.stop_spinner();
        if report.missing_paths.is_empty() {
            println!(
                "{}{} failed with exit code {}",
                CROSS,
                style(&report.name).red(),
                report.exit_code
            );
        } else {
            println!(
                "{}{} did not create: {}",
                CROSS,
                style(&report.name).red(),
                report.missing_paths.join(", ")
            );
        }
        if !report.stdout_tail.is_empty() {
            println!("{}", style(format_output(&report.stdout_tail)).dim());
        }
        self.print_stderr(report);
        println!();
    }

    fn step_error(&self, step_name: &str, reason: &str) {
        self.stop_spinner();
        println!("{}{}: {}\n", CROSS, style(step_name).red(), style(reason).red());
    }

    fn summary(&self, summary: &RunSummary) {
        let title = summary
            .title
            .clone()
            .unwrap_or_else(|| "Setup completed successfully!".to_string());
        self.print_header(&format!("{}{}", PARTY, title));

        println!("{}", style("Connection:").green());
        match &summary.connection {
            Some(info) => self.print_connection(info),
            None => println!("  {}", summary.connection_line),
        }
        println!();

        if summary.warnings > 0 {
            println!(
                "{}{}\n",
                WARN,
                style(format!("{} step(s) failed but were allowed to continue", summary.warnings))
                    .yellow()
            );
        }

        if !summary.next_steps.is_empty() {
            println!("{}", style("Next steps:").green());
            for (i, next) in summary.next_steps.iter().enumerate() {
                println!("  {}. {}", i + 1, next);
            }
            println!();
        }
    }

    fn finished(&self, run: &PipelineRun) {
        self.stop_spinner();
        let took = run
            .duration()
            .map(|d| format!(" in {}", format_duration(d)))
            .unwrap_or_default();

        match &run.failure {
            None => println!(
                "{}{} {}{}",
                CHECK,
                style(&run.pipeline_name).bold(),
                format_status(run.status),
                took
            ),
            Some(failure) if failure.step_name.is_empty() => {
                println!("{}{}", CROSS, style(&failure.reason).red())
            }
            Some(failure) => println!(
                "{}{} {} at step {}: {}",
                CROSS,
                style(&run.pipeline_name).bold(),
                format_status(run.status),
                style(&failure.step_name).bold(),
                style(&failure.reason).red()
            ),
        }
    }
}
