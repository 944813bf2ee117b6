//! Step domain model

use crate::core::config::StepConfig;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// What to do when a step exits non-zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailurePolicy {
    /// Stop the pipeline immediately
    #[default]
    Abort,
    /// Record the failure, print a warning and move on
    WarnAndContinue,
}

/// How a step's command is expressed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepCommand {
    /// A command line handed to `sh -c`
    Shell(String),
    /// Program plus arguments, no shell involved
    Argv(Vec<String>),
}

impl StepCommand {
    /// Substitute `{{ KEY }}` placeholders from `variables`
    ///
    /// Unknown keys are left untouched so the external command sees them.
    pub fn render(&self, variables: &BTreeMap<String, String>) -> StepCommand {
        match self {
            StepCommand::Shell(line) => StepCommand::Shell(render_template(line, variables)),
            StepCommand::Argv(args) => StepCommand::Argv(
                args.iter()
                    .map(|arg| render_template(arg, variables))
                    .collect(),
            ),
        }
    }

    /// Single-line form for banners and logs
    pub fn display(&self) -> String {
        match self {
            StepCommand::Shell(line) => line.clone(),
            StepCommand::Argv(args) => args
                .iter()
                .map(|arg| {
                    if arg.is_empty() || arg.contains(char::is_whitespace) {
                        format!("'{}'", arg)
                    } else {
                        arg.clone()
                    }
                })
                .collect::<Vec<_>>()
                .join(" "),
        }
    }
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder regex is valid")
    })
}

/// Replace `{{ KEY }}` with the matching variable value
pub fn render_template(template: &str, variables: &BTreeMap<String, String>) -> String {
    placeholder_regex()
        .replace_all(template, |caps: &Captures| match variables.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// A single step in a pipeline
#[derive(Debug, Clone)]
pub struct Step {
    /// Human-readable name, unique within the pipeline
    pub name: String,

    /// Longer banner text (falls back to the name)
    pub description: Option<String>,

    /// The command to execute
    pub command: StepCommand,

    /// Failure handling rule
    pub on_failure: FailurePolicy,

    /// Wall-clock limit in seconds
    pub timeout_secs: u64,

    /// Line shown under the banner before the step runs
    pub hint: Option<String>,

    /// Annotation shown when the step fails but the pipeline continues
    pub note: Option<String>,

    /// Whether to display the stdout tail on success
    pub show_output: bool,

    /// Paths (relative to the working directory) that must exist afterwards
    pub expect_paths: Vec<String>,

    /// Extra environment variables for the child process
    pub env: BTreeMap<String, String>,
}

impl Step {
    /// Create a step from a step config
    pub fn from_config(config: &StepConfig, defaults: &StepDefaults) -> Self {
        let command = match (&config.run, &config.argv) {
            (_, Some(argv)) => StepCommand::Argv(argv.clone()),
            (Some(run), None) => StepCommand::Shell(run.clone()),
            // Rejected by PipelineConfig::validate
            (None, None) => StepCommand::Shell(String::new()),
        };

        Step {
            name: config.name.clone(),
            description: config.description.clone(),
            command,
            on_failure: config.on_failure.unwrap_or(defaults.on_failure),
            timeout_secs: config.timeout_secs.unwrap_or(defaults.timeout_secs),
            hint: config.hint.clone(),
            note: config.note.clone(),
            show_output: config.show_output.unwrap_or(true),
            expect_paths: config.expect_paths.clone(),
            env: config.env.clone(),
        }
    }

    /// Build a shell step with default settings
    pub fn shell(name: impl Into<String>, command: impl Into<String>) -> Self {
        let defaults = StepDefaults::default();
        Step {
            name: name.into(),
            description: None,
            command: StepCommand::Shell(command.into()),
            on_failure: defaults.on_failure,
            timeout_secs: defaults.timeout_secs,
            hint: None,
            note: None,
            show_output: true,
            expect_paths: Vec::new(),
            env: BTreeMap::new(),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.on_failure = policy;
        self
    }

    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_expect_paths(mut self, paths: Vec<String>) -> Self {
        self.expect_paths = paths;
        self
    }

    /// Text used in the step banner
    pub fn title(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.name)
    }

    /// Copy of this step with placeholders substituted from `variables`
    pub fn rendered(&self, variables: &BTreeMap<String, String>) -> Step {
        let mut step = self.clone();
        step.command = self.command.render(variables);
        step.env = self
            .env
            .iter()
            .map(|(k, v)| (k.clone(), render_template(v, variables)))
            .collect();
        step
    }
}

#[derive(Debug, Clone)]
pub struct StepDefaults {
    pub on_failure: FailurePolicy,
    pub timeout_secs: u64,
}

impl Default for StepDefaults {
    fn default() -> Self {
        Self {
            on_failure: FailurePolicy::Abort,
            timeout_secs: 300, // 5 minutes
        }
    }
}
