//! idea-council - command-line entry point

use std::fs;
use std::sync::Arc;

use clap::Parser;
use parking_lot::RwLock;
use tracing::{debug, info};

use idea_council::backend::{BackendFactory, BackendKind};
use idea_council::cli::{Cli, Commands, ConfigSubcommand, EvaluateArgs, OutputFormat, PersonaSubcommand};
use idea_council::config::{self, AppConfig};
use idea_council::error::{Error, Result};
use idea_council::logging::{self, LogGuards};
use idea_council::orchestrator::Orchestrator;
use idea_council::persona::{PersonaEvaluator, PersonaRegistry};
use idea_council::report;
use idea_council::structured::StructuredCaller;
use idea_council::types::EvaluationInput;

fn main() {
    // .env is optional; real environment variables win
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprint!("{}", e.format_for_terminal());
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Config { subcommand } => handle_config_command(subcommand, config_path),
        Commands::Personas { subcommand } => {
            let config = AppConfig::load_unchecked_credentials(config_path)?;
            let _guards = init_logging(&config, cli.verbose, cli.quiet)?;
            handle_persona_command(subcommand, &config)
        }
        Commands::Evaluate(args) => {
            let mut config = AppConfig::load_unchecked_credentials(config_path)?;
            apply_evaluate_overrides(&mut config, &args)?;
            config.validate()?;

            let _guards = init_logging(&config, cli.verbose, cli.quiet)?;
            run_evaluate(config, args)
        }
    }
}

fn init_logging(config: &AppConfig, verbose: u8, quiet: bool) -> Result<LogGuards> {
    logging::init_logging(&config.logging, verbose, quiet)
}

/// CLI flags take precedence over file and environment settings
fn apply_evaluate_overrides(config: &mut AppConfig, args: &EvaluateArgs) -> Result<()> {
    if let Some(ref name) = args.backend {
        config.backend.kind = BackendKind::from_str(name).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unknown backend '{}', expected one of: hosted, local, mock",
                name
            ))
        })?;
    }
    if let Some(secs) = args.timeout {
        config.evaluation.deadline_secs = secs;
    }
    Ok(())
}

fn build_input(args: &EvaluateArgs) -> Result<EvaluationInput> {
    let mut input = EvaluationInput::new(&args.idea)?;

    if let Some(ref path) = args.context_file {
        let path = shellexpand::tilde(path).into_owned();
        let content = fs::read_to_string(&path).map_err(|e| Error::IoRead {
            path: path.clone().into(),
            source: e,
        })?;
        let document: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| Error::InvalidInput(format!("context file {}: {}", path, e)))?;
        input = input.with_context_document(document)?;
    }

    // Flags override blocks from the file
    for (block, text) in &args.contexts {
        input = input.with_description(*block, text.clone());
    }
    Ok(input)
}

/// Run one evaluation and print the report
fn run_evaluate(config: AppConfig, args: EvaluateArgs) -> Result<()> {
    let input = build_input(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(num_cpus::get().clamp(2, 8))
        .thread_name("idea-council")
        .build()
        .map_err(|e| Error::Internal(format!("Failed to create async runtime: {}", e)))?;

    let evaluation = runtime.block_on(async {
        let backend = BackendFactory::connect(&config.backend).await?;
        let caller = StructuredCaller::new(backend, config.retry.clone());
        let registry = Arc::new(RwLock::new(PersonaRegistry::open(config.persona_state_path())?));

        // Disabled personas sit out unless named with -p
        let selected = if args.personas.is_empty() {
            registry.read().enabled_set()
        } else {
            args.personas.clone()
        };

        let orchestrator = Orchestrator::new(PersonaEvaluator::new(caller), registry)
            .with_options(config.evaluation.orchestrator_options());

        info!(
            backend = %config.backend.kind,
            personas = ?selected,
            deadline_secs = config.evaluation.deadline_secs,
            "Evaluating idea"
        );
        orchestrator.evaluate(input, Some(selected.as_slice())).await
    })?;

    match args.format {
        OutputFormat::Text => print!("{}", report::render_text(&evaluation)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluation)?),
    }
    Ok(())
}

/// Handle persona subcommands
fn handle_persona_command(subcommand: PersonaSubcommand, config: &AppConfig) -> Result<()> {
    let mut registry = PersonaRegistry::open(config.persona_state_path())?;
    debug!(path = ?registry.state_path(), "Persona registry opened");

    match subcommand {
        PersonaSubcommand::List { json } => {
            let personas = registry.list();
            if json {
                println!("{}", serde_json::to_string_pretty(&personas)?);
            } else {
                println!("{:<18} {:<8} {:>8}  NAME", "ID", "ENABLED", "PRIORITY");
                for p in personas {
                    println!(
                        "{:<18} {:<8} {:>8}  {}",
                        p.id,
                        if p.enabled { "yes" } else { "no" },
                        p.priority,
                        p.name
                    );
                }
            }
        }
        PersonaSubcommand::Toggle { id } => {
            if !registry.is_known(&id) {
                return Err(Error::PersonaNotFound { id });
            }
            if !registry.toggle(&id) {
                return Err(Error::InvalidInput(format!(
                    "persona '{}' is the final advisor and cannot be disabled",
                    id
                )));
            }
            let enabled = registry.get(&id).map(|p| p.enabled).unwrap_or_default();
            println!("{} {}", id, if enabled { "enabled" } else { "disabled" });
        }
        PersonaSubcommand::Priority { id, value } => {
            if !registry.set_priority(&id, value) {
                return Err(Error::PersonaNotFound { id });
            }
            println!("{} priority set to {}", id, value);
        }
    }

    Ok(())
}

/// Handle configuration subcommands
fn handle_config_command(subcommand: ConfigSubcommand, config_path: Option<&str>) -> Result<()> {
    match subcommand {
        ConfigSubcommand::Show => {
            let cfg = AppConfig::load_unchecked_credentials(config_path)?;
            println!("{}", toml::to_string_pretty(&cfg.redacted())?);
        }
        ConfigSubcommand::Init { path, force } => {
            let written = config::init_config(path.as_deref(), force)?;
            println!("Configuration file created: {}", written.display());
        }
        ConfigSubcommand::Validate => {
            AppConfig::load(config_path)?;
            println!("Configuration is valid.");
        }
    }

    Ok(())
}
