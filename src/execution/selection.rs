//! Step selection - decides which steps of a pipeline a run executes

use crate::core::Pipeline;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SelectionError {
    #[error("unknown step '{name}' (available: {})", .available.join(", "))]
    UnknownStep { name: String, available: Vec<String> },
}

/// Which steps to run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StepSelection {
    /// Every step, in order
    #[default]
    All,
    /// A single named step
    Only(String),
    /// The named step and everything after it
    From(String),
}

impl StepSelection {
    /// Build a selection from the `--step` / `--from-step` flags
    pub fn from_flags(only: Option<String>, from: Option<String>) -> Self {
        match (only, from) {
            (Some(name), _) => StepSelection::Only(name),
            (None, Some(name)) => StepSelection::From(name),
            (None, None) => StepSelection::All,
        }
    }

    /// Indexes into `pipeline.steps`, in execution order
    pub fn resolve(&self, pipeline: &Pipeline) -> Result<Vec<usize>, SelectionError> {
        match self {
            StepSelection::All => Ok((0..pipeline.len()).collect()),
            StepSelection::Only(name) => Ok(vec![Self::position(pipeline, name)?]),
            StepSelection::From(name) => {
                let start = Self::position(pipeline, name)?;
                Ok((start..pipeline.len()).collect())
            }
        }
    }

    fn position(pipeline: &Pipeline, name: &str) -> Result<usize, SelectionError> {
        pipeline
            .position(name)
            .ok_or_else(|| SelectionError::UnknownStep {
                name: name.to_string(),
                available: pipeline.steps.iter().map(|s| s.name.clone()).collect(),
            })
    }
}
