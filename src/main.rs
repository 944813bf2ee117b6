use anyhow::{Context, Result};
use provision::cli::commands::{
    parse_secret_list, ListCommand, OutputFormat, RunCommand, ValidateCommand, SECRETS_ENV_VAR,
};
use provision::cli::json_output::JsonReporter;
use provision::cli::output::*;
use provision::cli::terminal_output::ConsoleReporter;
use provision::cli::{Cli, Command};
use provision::core::config::PipelineConfig;
use provision::core::{EnvironmentConfig, Pipeline, SecretMasker};
use provision::execution::{
    ExecutionEngine, ProcessRunner, Reporter, RunOptions, StepSelection,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; stdout belongs to the reporter
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set logging subscriber")?;

    // Execute command
    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Validate(cmd) => validate_pipeline(cmd)?,
        Command::List(cmd) => list_steps(cmd)?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file)
        .context("Failed to load pipeline config")?;
    let pipeline = config.to_pipeline();

    let selection = StepSelection::from_flags(cmd.step.clone(), cmd.from_step.clone());
    selection.resolve(&pipeline)?;

    // Config-derived secrets are added by the engine once the env file is loaded
    let masker = masker_from_flags(&cmd.secrets);

    let env_path = cmd
        .config
        .as_ref()
        .map(PathBuf::from)
        .unwrap_or_else(|| pipeline.env_file.clone());
    debug!("Reading configuration from {}", env_path.display());

    let env = match EnvironmentConfig::load(&env_path, &pipeline.required_key) {
        Ok(env) => env,
        Err(e) => {
            let message = masker.mask(&e.to_string());
            match cmd.format {
                OutputFormat::Text => {
                    println!("{}{}", CROSS, style(&message).red());
                    println!(
                        "  Create {} with {}=<connection string> first.",
                        style(env_path.display()).bold(),
                        pipeline.required_key
                    );
                }
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "event": "config_error", "reason": message })
                ),
            }
            error!("{}", message);
            std::process::exit(1);
        }
    };

    let reporter: Arc<dyn Reporter> = match cmd.format {
        OutputFormat::Text => Arc::new(ConsoleReporter::new()),
        OutputFormat::Json => Arc::new(JsonReporter::stdout()),
    };

    let engine = ExecutionEngine::new(ProcessRunner::new(), reporter)
        .with_masker(masker)
        .with_options(RunOptions {
            dry_run: cmd.dry_run,
            selection,
        });

    let run = engine.execute(&pipeline, &env).await;

    if !run.success() {
        if let Some(failure) = &run.failure {
            error!("{}: {}", failure.step_name, failure.reason);
        }
        std::process::exit(run.exit_code());
    }

    Ok(())
}

fn validate_pipeline(cmd: &ValidateCommand) -> Result<()> {
    println!("{} Validating pipeline...", INFO);

    let result = PipelineConfig::from_file(&cmd.file);

    match result {
        Ok(config) => {
            let pipeline = config.to_pipeline();
            println!("{} Pipeline configuration is valid!", CHECK);
            println!("  Name: {}", style(&config.name).bold());
            println!("  Steps: {}", style(config.steps.len()).cyan());
            println!(
                "  Working directory: {}",
                style(pipeline.working_dir.display()).dim()
            );
            println!(
                "  Configuration file: {} (requires {})",
                style(pipeline.env_file.display()).dim(),
                style(&pipeline.required_key).cyan()
            );

            if cmd.json {
                let masker = masker_for_listing(&cmd.secrets, &pipeline);
                let json = serde_json::to_string_pretty(&config)?;
                println!("\n{}", masker.mask(&json));
            }
            Ok(())
        }
        Err(e) => {
            println!("{} Validation failed:", CROSS);
            println!("  {}", style(format!("{:#}", e)).red());
            std::process::exit(1);
        }
    }
}

fn list_steps(cmd: &ListCommand) -> Result<()> {
    let config = PipelineConfig::from_file(&cmd.file)
        .context("Failed to load pipeline config")?;
    let pipeline = config.to_pipeline();
    let masker = masker_for_listing(&cmd.secrets, &pipeline);

    if cmd.json {
        let steps: Vec<_> = pipeline
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| {
                serde_json::json!({
                    "index": i + 1,
                    "name": step.name,
                    "command": masker.mask(&step.command.display()),
                    "on_failure": step.on_failure,
                    "timeout_secs": step.timeout_secs,
                })
            })
            .collect();
        let data = serde_json::json!({ "pipeline": pipeline.name, "steps": steps });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Steps in {}:", INFO, style(&pipeline.name).bold());
    for (i, step) in pipeline.steps.iter().enumerate() {
        println!("  {}", format_step_line(i + 1, pipeline.len(), step, &masker));
    }

    Ok(())
}

/// Secrets given with `--secret` and through `PROVISION_SECRETS`
fn masker_from_flags(secrets: &[String]) -> SecretMasker {
    let mut masker = SecretMasker::from_secrets(secrets.iter().cloned());
    if let Ok(list) = std::env::var(SECRETS_ENV_VAR) {
        for secret in parse_secret_list(&list) {
            masker.add(secret);
        }
    }
    masker
}

/// Flag secrets plus those found in the pipeline's env file, when it loads
fn masker_for_listing(secrets: &[String], pipeline: &Pipeline) -> SecretMasker {
    let mut masker = masker_from_flags(secrets);
    match EnvironmentConfig::load(&pipeline.env_file, &pipeline.required_key) {
        Ok(env) => env.collect_secrets(&pipeline.secret_keys, &mut masker),
        Err(e) => debug!("Not masking env file secrets: {}", e),
    }
    masker
}
