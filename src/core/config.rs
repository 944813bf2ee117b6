//! Pipeline configuration from YAML

use crate::core::{step::FailurePolicy, Pipeline};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

/// Default number of stdout lines shown after a step
pub const DEFAULT_TAIL_LINES: usize = 5;

/// Default number of stderr characters shown after a failure
pub const DEFAULT_STDERR_CHARS: usize = 500;

/// Top-level pipeline configuration loaded from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name
    pub name: String,

    /// Pipeline version (optional)
    #[serde(default)]
    pub version: Option<String>,

    /// Directory the steps run in, relative to the pipeline file
    #[serde(default)]
    pub working_dir: Option<String>,

    /// Configuration file, relative to the working directory
    #[serde(default)]
    pub env_file: Option<String>,

    /// Key the configuration file must define
    #[serde(default)]
    pub required_key: Option<String>,

    /// Configuration keys whose values are masked on display
    #[serde(default)]
    pub secret_keys: Vec<String>,

    /// Default timeout for steps (in seconds)
    #[serde(default)]
    pub default_timeout_secs: Option<u64>,

    /// Default failure policy for steps
    #[serde(default)]
    pub default_on_failure: Option<FailurePolicy>,

    /// Stdout lines kept per step
    #[serde(default)]
    pub tail_lines: Option<usize>,

    /// Stderr characters kept per failed step
    #[serde(default)]
    pub stderr_chars: Option<usize>,

    /// Pipeline steps, in execution order
    pub steps: Vec<StepConfig>,

    /// What to print after a successful run
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Directory of the file this config was read from
    #[serde(skip)]
    source_dir: Option<PathBuf>,
}

/// Step configuration as defined in YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepConfig {
    /// Human-readable step name, unique within the pipeline
    pub name: String,

    /// Optional longer banner text
    #[serde(default)]
    pub description: Option<String>,

    /// Shell command line
    #[serde(default)]
    pub run: Option<String>,

    /// Program and arguments, executed without a shell
    #[serde(default)]
    pub argv: Option<Vec<String>>,

    /// Failure policy (overrides global)
    #[serde(default)]
    pub on_failure: Option<FailurePolicy>,

    /// Timeout for this step (overrides global)
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// Printed under the banner before the step runs
    #[serde(default)]
    pub hint: Option<String>,

    /// Printed when the step fails but the pipeline continues
    #[serde(default)]
    pub note: Option<String>,

    /// Whether to show the stdout tail (default true)
    #[serde(default)]
    pub show_output: Option<bool>,

    /// Paths that must exist once the step exits zero
    #[serde(default)]
    pub expect_paths: Vec<String>,

    /// Extra environment variables for the command
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// Final summary settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryConfig {
    /// Heading of the success block
    #[serde(default)]
    pub title: Option<String>,

    /// Whether to show the connection breakdown (default true)
    #[serde(default)]
    pub show_connection: Option<bool>,

    /// Suggested follow-up commands
    #[serde(default)]
    pub next_steps: Vec<String>,
}

impl PipelineConfig {
    /// Load pipeline configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read pipeline file {}", path.display()))?;
        let mut config = Self::from_yaml(&content)?;
        config.source_dir = Some(
            path.parent()
                .filter(|p| !p.as_os_str().is_empty())
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from(".")),
        );
        Ok(config)
    }

    /// Parse pipeline configuration from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: PipelineConfig = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the pipeline configuration
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            anyhow::bail!("Pipeline '{}' has no steps", self.name);
        }

        if self.default_timeout_secs == Some(0) {
            anyhow::bail!("default_timeout_secs must be positive");
        }

        let mut seen_names = HashSet::new();
        for step in &self.steps {
            if step.name.trim().is_empty() {
                anyhow::bail!("Step names must not be empty");
            }
            if !seen_names.insert(&step.name) {
                anyhow::bail!("Duplicate step name: {}", step.name);
            }

            match (&step.run, &step.argv) {
                (Some(_), Some(_)) => {
                    anyhow::bail!("Step '{}' sets both 'run' and 'argv'", step.name)
                }
                (None, None) => {
                    anyhow::bail!("Step '{}' needs either 'run' or 'argv'", step.name)
                }
                (Some(run), None) if run.trim().is_empty() => {
                    anyhow::bail!("Step '{}' has an empty command", step.name)
                }
                (None, Some(argv)) if argv.first().map_or(true, |p| p.is_empty()) => {
                    anyhow::bail!("Step '{}' has an empty argv", step.name)
                }
                _ => {}
            }

            if step.timeout_secs == Some(0) {
                anyhow::bail!("Step '{}' timeout_secs must be positive", step.name);
            }
        }

        Ok(())
    }

    /// Directory steps run in, resolved against the pipeline file location
    pub fn resolved_working_dir(&self) -> PathBuf {
        let base = self.source_dir.clone().unwrap_or_else(|| PathBuf::from("."));
        match &self.working_dir {
            Some(dir) if Path::new(dir).is_absolute() => PathBuf::from(dir),
            Some(dir) => base.join(dir),
            None => base,
        }
    }

    /// Configuration file path, resolved against the working directory
    pub fn resolved_env_file(&self) -> PathBuf {
        let env_file = self.env_file.as_deref().unwrap_or(".env");
        if Path::new(env_file).is_absolute() {
            PathBuf::from(env_file)
        } else {
            self.resolved_working_dir().join(env_file)
        }
    }

    /// Convert config to a Pipeline domain model
    pub fn to_pipeline(&self) -> Pipeline {
        Pipeline::from_config(self)
    }
}
