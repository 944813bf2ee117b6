//! CLI command definitions

use clap::Args;

/// Default pipeline definition file
pub const DEFAULT_PIPELINE_FILE: &str = "provision.yaml";

/// Environment variable holding extra comma-separated secrets
pub const SECRETS_ENV_VAR: &str = "PROVISION_SECRETS";

/// Run a pipeline
#[derive(Debug, Args, Clone)]
pub struct RunCommand {
    /// Path to pipeline YAML file
    #[arg(short, long, default_value = DEFAULT_PIPELINE_FILE)]
    pub file: String,

    /// Configuration file (overrides the pipeline's env_file)
    #[arg(long)]
    pub config: Option<String>,

    /// Print the steps that would run without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Run only this step
    #[arg(long, conflicts_with = "from_step")]
    pub step: Option<String>,

    /// Run from this step to the end (for resuming)
    #[arg(long)]
    pub from_step: Option<String>,

    /// Secret to mask in all output (repeatable)
    #[arg(long = "secret", value_name = "TOKEN")]
    pub secrets: Vec<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Validate a pipeline configuration
#[derive(Debug, Args, Clone)]
pub struct ValidateCommand {
    /// Path to pipeline YAML file
    #[arg(short, long, default_value = DEFAULT_PIPELINE_FILE)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Secret to mask in printed commands (repeatable)
    #[arg(long = "secret", value_name = "TOKEN")]
    pub secrets: Vec<String>,
}

/// List the steps of a pipeline
#[derive(Debug, Args, Clone)]
pub struct ListCommand {
    /// Path to pipeline YAML file
    #[arg(short, long, default_value = DEFAULT_PIPELINE_FILE)]
    pub file: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,

    /// Secret to mask in printed commands (repeatable)
    #[arg(long = "secret", value_name = "TOKEN")]
    pub secrets: Vec<String>,
}

/// Output format argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Colored progress for humans
    Text,
    /// One JSON object per line
    Json,
}

/// Split a comma-separated secret list, dropping blanks
pub fn parse_secret_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}
