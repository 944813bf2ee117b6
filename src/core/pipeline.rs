//! Pipeline domain model

use crate::core::{
    config::{PipelineConfig, SummaryConfig, DEFAULT_STDERR_CHARS, DEFAULT_TAIL_LINES},
    env::DEFAULT_REQUIRED_KEY,
    step::{Step, StepDefaults},
};
use std::path::PathBuf;

/// A pipeline definition: an ordered list of steps plus run settings
#[derive(Debug, Clone)]
pub struct Pipeline {
    /// Pipeline name
    pub name: String,

    /// Steps in execution order
    pub steps: Vec<Step>,

    /// Directory every step runs in
    pub working_dir: PathBuf,

    /// Configuration file read before the first step
    pub env_file: PathBuf,

    /// Key the configuration file must define
    pub required_key: String,

    /// Configuration keys whose values are secrets
    pub secret_keys: Vec<String>,

    /// Display limits for captured output
    pub limits: OutputLimits,

    /// Printed after a successful run
    pub summary: SummaryConfig,
}

/// How much captured output is kept for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputLimits {
    /// Last K non-empty stdout lines
    pub tail_lines: usize,
    /// First N stderr characters
    pub stderr_chars: usize,
}

impl Default for OutputLimits {
    fn default() -> Self {
        Self {
            tail_lines: DEFAULT_TAIL_LINES,
            stderr_chars: DEFAULT_STDERR_CHARS,
        }
    }
}

impl Pipeline {
    /// Create a pipeline from configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        let base = StepDefaults::default();
        let defaults = StepDefaults {
            on_failure: config.default_on_failure.unwrap_or(base.on_failure),
            timeout_secs: config.default_timeout_secs.unwrap_or(base.timeout_secs),
        };

        let steps = config
            .steps
            .iter()
            .map(|step_config| Step::from_config(step_config, &defaults))
            .collect();

        Pipeline {
            name: config.name.clone(),
            steps,
            working_dir: config.resolved_working_dir(),
            env_file: config.resolved_env_file(),
            required_key: config
                .required_key
                .clone()
                .unwrap_or_else(|| DEFAULT_REQUIRED_KEY.to_string()),
            secret_keys: config.secret_keys.clone(),
            limits: OutputLimits {
                tail_lines: config.tail_lines.unwrap_or(DEFAULT_TAIL_LINES),
                stderr_chars: config.stderr_chars.unwrap_or(DEFAULT_STDERR_CHARS),
            },
            summary: config.summary.clone(),
        }
    }

    /// Build a pipeline directly from steps, running in `working_dir`
    pub fn new(name: impl Into<String>, working_dir: impl Into<PathBuf>, steps: Vec<Step>) -> Self {
        let working_dir = working_dir.into();
        Pipeline {
            name: name.into(),
            steps,
            env_file: working_dir.join(".env"),
            working_dir,
            required_key: DEFAULT_REQUIRED_KEY.to_string(),
            secret_keys: Vec::new(),
            limits: OutputLimits::default(),
            summary: SummaryConfig::default(),
        }
    }

    /// Get a step by name
    pub fn step(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Zero-based position of a step
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
