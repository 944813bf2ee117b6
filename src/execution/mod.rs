//! Pipeline execution engine

pub mod engine;
pub mod executor;
pub mod reporter;
pub mod selection;

pub use engine::{ExecutionEngine, RunOptions};
pub use executor::{CommandOutput, CommandRunner, ProcessRunner, StepError, StepExecutor};
pub use reporter::{Reporter, RunSummary, SilentReporter, StepAnnouncement, StepReport};
pub use selection::{SelectionError, StepSelection};
