//! Step executor - runs individual steps as subprocesses

use crate::core::{
    pipeline::OutputLimits,
    step::{FailurePolicy, Step, StepCommand},
    state::{StepOutcome, StepResult},
};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Errors for a single step
#[derive(Debug, Error)]
pub enum StepError {
    #[error("step '{step}' timed out after {timeout_secs} seconds")]
    StepTimeout { step: String, timeout_secs: u64 },

    #[error("failed to start step '{step}': {source}")]
    SpawnError {
        step: String,
        #[source]
        source: std::io::Error,
    },

    #[error("step '{step}' exited with code {exit_code}")]
    StepFailed { step: String, exit_code: i32 },

    #[error("step '{step}' did not create: {}", .paths.join(", "))]
    MissingPaths { step: String, paths: Vec<String> },

    #[error("step '{step}' was interrupted")]
    Interrupted { step: String },
}

/// Raw result of running a command to completion
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, -1 when the process was killed by a signal
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

/// Trait for command execution - allows for different implementations
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run the step's command in `working_dir`, honouring its timeout
    async fn run(&self, step: &Step, working_dir: &Path) -> Result<CommandOutput, StepError>;
}

/// Runs commands as child processes
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    /// Shell used for `run:` command lines
    shell: String,
}

impl Default for ProcessRunner {
    fn default() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }
}

impl ProcessRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a different shell for `run:` command lines
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    fn build_command(&self, step: &Step) -> Result<Command, StepError> {
        let command = match &step.command {
            StepCommand::Shell(line) => {
                let mut command = Command::new(&self.shell);
                command.arg("-c").arg(line);
                command
            }
            StepCommand::Argv(args) => {
                let (program, rest) = args.split_first().ok_or_else(|| StepError::SpawnError {
                    step: step.name.clone(),
                    source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "empty argv"),
                })?;
                let mut command = Command::new(program);
                command.args(rest);
                command
            }
        };
        Ok(command)
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, step: &Step, working_dir: &Path) -> Result<CommandOutput, StepError> {
        let mut command = self.build_command(step)?;
        command
            .current_dir(working_dir)
            .envs(&step.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // The step leads its own process group so a timeout reaches
        // everything it started, not just the shell
        #[cfg(unix)]
        command.process_group(0);

        let started = Instant::now();
        let mut child = command.spawn().map_err(|source| StepError::SpawnError {
            step: step.name.clone(),
            source,
        })?;
        debug!("Spawned step '{}' (pid {:?})", step.name, child.id());

        let mut stdout = child.stdout.take();
        let mut stderr = child.stderr.take();
        let limit = Duration::from_secs(step.timeout_secs);

        let finished = async {
            let mut out = Vec::new();
            let mut err = Vec::new();
            let (status, _, _) = tokio::join!(
                child.wait(),
                drain(stdout.as_mut(), &mut out),
                drain(stderr.as_mut(), &mut err),
            );
            status.map(|status| (status, out, err))
        };

        // The child has its own process group, so Ctrl-C from the terminal
        // reaches only us and has to be forwarded
        let waited = tokio::select! {
            waited = timeout(limit, finished) => match waited {
                Ok(result) => Waited::Exited(result),
                Err(_) => Waited::TimedOut,
            },
            Ok(()) = tokio::signal::ctrl_c() => Waited::Interrupted,
        };

        let stop_reason = match waited {
            Waited::Exited(Ok((status, out, err))) => {
                return Ok(CommandOutput {
                    exit_code: status.code().unwrap_or(-1),
                    stdout: String::from_utf8_lossy(&out).into_owned(),
                    stderr: String::from_utf8_lossy(&err).into_owned(),
                    duration: started.elapsed(),
                })
            }
            Waited::Exited(Err(source)) => {
                return Err(StepError::SpawnError {
                    step: step.name.clone(),
                    source,
                })
            }
            Waited::TimedOut => StepError::StepTimeout {
                step: step.name.clone(),
                timeout_secs: step.timeout_secs,
            },
            Waited::Interrupted => StepError::Interrupted {
                step: step.name.clone(),
            },
        };

        if let Some(pid) = child.id() {
            kill_process_group(pid, &step.name);
        }
        // kill() also reaps the child, so nothing is left behind as a zombie
        if let Err(e) = child.kill().await {
            warn!("Failed to kill step '{}': {}", step.name, e);
        }
        Err(stop_reason)
    }
}

enum Waited {
    Exited(std::io::Result<(std::process::ExitStatus, Vec<u8>, Vec<u8>)>),
    TimedOut,
    Interrupted,
}

#[cfg(unix)]
fn kill_process_group(pid: u32, step_name: &str) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Ok(pgid) = i32::try_from(pid) else {
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        debug!("Failed to kill process group of step '{}': {}", step_name, e);
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: u32, _step_name: &str) {}

async fn drain<R: AsyncRead + Unpin>(pipe: Option<&mut R>, buf: &mut Vec<u8>) {
    if let Some(pipe) = pipe {
        if let Err(e) = pipe.read_to_end(buf).await {
            debug!("Error reading child output: {}", e);
        }
    }
}

/// Executes a single step and turns its output into a [`StepResult`]
pub struct StepExecutor<R> {
    runner: R,
}

impl<R: CommandRunner> StepExecutor<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Execute a step and return the result
    ///
    /// A non-zero exit is *not* an error here: it comes back as a
    /// [`StepResult`] whose outcome follows the step's failure policy. Only
    /// timeouts and spawn failures are returned as `Err`.
    pub async fn execute(
        &self,
        step: &Step,
        working_dir: &Path,
        limits: OutputLimits,
    ) -> Result<StepResult, StepError> {
        let output = self.runner.run(step, working_dir).await?;

        let missing_paths: Vec<String> = if output.exit_code == 0 {
            step.expect_paths
                .iter()
                .filter(|p| !working_dir.join(p).exists())
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        let succeeded = output.exit_code == 0 && missing_paths.is_empty();
        let outcome = match (succeeded, step.on_failure) {
            (true, _) => StepOutcome::Succeeded,
            (false, FailurePolicy::Abort) => StepOutcome::Failed,
            (false, FailurePolicy::WarnAndContinue) => StepOutcome::Warned,
        };

        debug!(
            "Step '{}' exited with {} in {:?} ({:?})",
            step.name, output.exit_code, output.duration, outcome
        );

        Ok(StepResult {
            step_name: step.name.clone(),
            exit_code: output.exit_code,
            stdout_tail: tail_lines(&output.stdout, limits.tail_lines),
            stderr_excerpt: excerpt(&output.stderr, limits.stderr_chars),
            duration_ms: output.duration.as_millis() as u64,
            missing_paths,
            outcome,
        })
    }
}

/// Last `max` non-empty lines of `output`
pub fn tail_lines(output: &str, max: usize) -> Vec<String> {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(max);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

/// First `max_chars` characters of `text`, trimmed
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}
