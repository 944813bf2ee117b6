//! provision - ordered provisioning pipeline runner

pub mod cli;
pub mod core;
pub mod execution;

// Re-export commonly used types
pub use core::{
    ConfigError, EnvironmentConfig, FailurePolicy, Pipeline, PipelineRun, RunStatus,
    SecretMasker, Step, StepCommand, StepOutcome, StepResult,
};
pub use execution::{
    CommandRunner, ExecutionEngine, ProcessRunner, Reporter, RunOptions, StepError,
    StepSelection,
};
