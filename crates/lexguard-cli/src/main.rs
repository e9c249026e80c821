//! Lexguard administration CLI
//!
//! Inspect and validate governance configuration and masking rules.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use lexguard_config::{ConfigLoader, LexguardConfig};
use lexguard_kernel::TriageThresholds;
use lexguard_masking::{MAX_PATTERN_LENGTH, validate_pattern};
use lexguard_types::ConfidenceScore;
use tracing::{Level, debug, info};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "lexguard")]
#[command(version, about = "Lexguard document governance administration", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Deployment directory holding lexguard.toml
    #[arg(short, long, global = true, default_value = ".")]
    project_dir: PathBuf,

    /// Ignore the per-user configuration file
    #[arg(long, global = true)]
    no_user_config: bool,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the effective configuration as TOML
    Config,

    /// Validate the effective configuration
    CheckConfig,

    /// Validate a masking rule pattern
    CheckRule {
        /// Keyword or regular expression
        #[arg(long)]
        pattern: String,

        /// Treat the pattern as a regular expression
        #[arg(long)]
        regex: bool,
    },

    /// Show the triage bucket for a confidence score
    Triage {
        /// AI confidence score (0-100)
        #[arg(long, allow_negative_numbers = true)]
        score: i64,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Config => {
            let config = load(&cli.project_dir, cli.no_user_config)?;
            print!("{}", config.to_toml_string().context("Failed to render configuration")?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::CheckConfig => match load(&cli.project_dir, cli.no_user_config) {
            Ok(config) => {
                println!("✓ Configuration is valid");
                println!(
                    "  Auto-publish: {} (threshold {})",
                    if config.settings.auto_publish_above_threshold { "on" } else { "off" },
                    config.settings.ai_confidence_threshold
                );
                println!(
                    "  Strict redaction: {}",
                    if config.settings.strict_redaction_mode { "on" } else { "off" }
                );
                println!(
                    "  Allowed IP ranges: {}",
                    if config.settings.allowed_ip_ranges.is_empty() {
                        "any".to_string()
                    } else {
                        config
                            .settings
                            .allowed_ip_ranges
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    }
                );
                Ok(ExitCode::SUCCESS)
            }
            Err(e) => {
                println!("✗ Configuration is invalid: {e:#}");
                Ok(ExitCode::FAILURE)
            }
        },
        Commands::CheckRule { pattern, regex } => {
            debug!(len = pattern.len(), max = MAX_PATTERN_LENGTH, regex, "validating pattern");
            match validate_pattern(&pattern, regex) {
                Ok(()) => {
                    let kind = if regex { "regex" } else { "keyword" };
                    println!("✓ Valid {kind} pattern");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    println!("✗ {e}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Triage { score } => {
            let config = load(&cli.project_dir, cli.no_user_config)?;
            let score = ConfidenceScore::try_from(score)
                .with_context(|| format!("Invalid confidence score {score}"))?;
            let thresholds = TriageThresholds::new(
                config.triage.low_confidence_below,
                config.triage.requires_attention_below,
            );
            let bucket = thresholds.classify(score);
            info!(%score, %bucket, "classified");
            println!("{bucket}");
            if config.settings.auto_publish_above_threshold
                && score.value() >= config.settings.ai_confidence_threshold
            {
                println!("(auto-published)");
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load(project_dir: &Path, no_user_config: bool) -> Result<LexguardConfig> {
    let mut loader = ConfigLoader::new().with_project_dir(project_dir);
    if no_user_config {
        loader = loader.without_user_config();
    }
    loader
        .load()
        .with_context(|| format!("Failed to load configuration from {}", project_dir.display()))
}
