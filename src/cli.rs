//! CLI argument parsing using clap v4

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::ContextBlock;

/// idea-council - multi-persona evaluation of product ideas
///
/// A council of expert personas scores the idea independently, their signals
/// are merged into bucket averages, and a final advisor makes the go/no-go call.
#[derive(Parser, Debug)]
#[command(name = "idea-council")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, env = "IDEA_COUNCIL_CONFIG", global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a product idea with the persona council
    Evaluate(EvaluateArgs),

    /// Persona management
    Personas {
        #[command(subcommand)]
        subcommand: PersonaSubcommand,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },
}

/// Output format for evaluation results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(clap::Args, Debug)]
pub struct EvaluateArgs {
    /// The product idea to evaluate
    pub idea: String,

    /// Context block as BLOCK=TEXT (market, technical, social, research,
    /// community, educational, ai, user_background); repeatable
    #[arg(long = "context", value_name = "BLOCK=TEXT", value_parser = parse_context_arg)]
    pub contexts: Vec<(ContextBlock, String)>,

    /// JSON file of context blocks keyed by block name
    #[arg(long, value_name = "PATH")]
    pub context_file: Option<String>,

    /// Persona id to include (repeatable; default: all enabled personas)
    #[arg(short, long = "persona", value_name = "ID")]
    pub personas: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Run deadline in seconds, overriding the configuration
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Backend to use (hosted, local, mock), overriding the configuration
    #[arg(long, env = "IDEA_COUNCIL_BACKEND")]
    pub backend: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum PersonaSubcommand {
    /// List personas in priority order
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Enable or disable a persona
    Toggle {
        /// Persona id
        id: String,
    },

    /// Set a persona's priority (lower sorts first)
    Priority {
        /// Persona id
        id: String,

        /// New priority value
        #[arg(allow_negative_numbers = true)]
        value: i32,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigSubcommand {
    /// Display the current configuration
    Show,

    /// Initialize a new configuration file
    Init {
        /// Path where to create the config file
        #[arg(short, long)]
        path: Option<String>,

        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Validate the configuration
    Validate,
}

/// Parse `BLOCK=TEXT`
fn parse_context_arg(s: &str) -> Result<(ContextBlock, String), String> {
    let (block, text) = s
        .split_once('=')
        .ok_or_else(|| format!("expected BLOCK=TEXT, got '{}'", s))?;
    let block: ContextBlock = block.parse()?;
    let text = text.trim();
    if text.is_empty() {
        return Err(format!("context '{}' has no text", block));
    }
    Ok((block, text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_evaluate_defaults() {
        let cli = Cli::parse_from(["idea-council", "evaluate", "An idea"]);
        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(args.idea, "An idea");
                assert!(args.contexts.is_empty());
                assert!(args.personas.is_empty());
                assert_eq!(args.format, OutputFormat::Text);
                assert!(args.timeout.is_none());
            }
            _ => panic!("Expected Evaluate command"),
        }
    }

    #[test]
    fn test_evaluate_with_options() {
        let cli = Cli::parse_from([
            "idea-council",
            "evaluate",
            "An idea",
            "--context",
            "market=Small businesses",
            "--context",
            "user-background=Two engineers",
            "-p",
            "sam_altman",
            "--persona",
            "elon_musk",
            "--format",
            "json",
            "--timeout",
            "60",
        ]);
        match cli.command {
            Commands::Evaluate(args) => {
                assert_eq!(
                    args.contexts,
                    vec![
                        (ContextBlock::Market, "Small businesses".to_string()),
                        (ContextBlock::UserBackground, "Two engineers".to_string()),
                    ]
                );
                assert_eq!(args.personas, vec!["sam_altman", "elon_musk"]);
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.timeout, Some(60));
            }
            _ => panic!("Expected Evaluate command"),
        }
    }

    #[test]
    fn test_bad_context_rejected() {
        assert!(Cli::try_parse_from(["idea-council", "evaluate", "x", "--context", "weather=sunny"]).is_err());
        assert!(Cli::try_parse_from(["idea-council", "evaluate", "x", "--context", "market"]).is_err());
        assert!(Cli::try_parse_from(["idea-council", "evaluate", "x", "--context", "market= "]).is_err());
    }

    #[test]
    fn test_personas_priority() {
        let cli = Cli::parse_from(["idea-council", "personas", "priority", "elon_musk", "3"]);
        match cli.command {
            Commands::Personas {
                subcommand: PersonaSubcommand::Priority { id, value },
            } => {
                assert_eq!(id, "elon_musk");
                assert_eq!(value, 3);
            }
            _ => panic!("Expected Personas Priority command"),
        }

        let cli = Cli::parse_from(["idea-council", "personas", "priority", "elon_musk", "-2"]);
        match cli.command {
            Commands::Personas {
                subcommand: PersonaSubcommand::Priority { value, .. },
            } => assert_eq!(value, -2),
            _ => panic!("Expected Personas Priority command"),
        }
    }

    #[test]
    fn test_verbose_and_quiet_flags() {
        let cli = Cli::parse_from(["idea-council", "-vv", "config", "show"]);
        assert_eq!(cli.verbose, 2);
        assert!(!cli.quiet);

        let cli = Cli::parse_from(["idea-council", "personas", "list", "--quiet"]);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_init() {
        let cli = Cli::parse_from(["idea-council", "config", "init", "--force"]);
        match cli.command {
            Commands::Config {
                subcommand: ConfigSubcommand::Init { path, force },
            } => {
                assert!(path.is_none());
                assert!(force);
            }
            _ => panic!("Expected Config Init command"),
        }
    }
}
