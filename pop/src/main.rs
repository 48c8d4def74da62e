//! popcorn - idea-to-plan decomposition studio
//!
//! CLI entry point. Running `pop` launches the studio TUI; `pop logs` tails
//! the application log.

use std::fs;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use clap::Parser;
use eyre::{Context, Result};
use tracing::{debug, info};

use popcorn::cli::{Cli, Command};
use popcorn::config::{self, Config};
use popcorn::gateway::{GeminiGateway, PlanGateway};
use popcorn::prompts::{DecomposeContext, PromptLoader};
use popcorn::tui;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = config::log_dir();
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Level priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(str::to_uppercase).as_deref() {
        Some("TRACE") => tracing::Level::TRACE,
        Some("DEBUG") => tracing::Level::DEBUG,
        Some("INFO") | None => tracing::Level::INFO,
        Some("WARN") | Some("WARNING") => tracing::Level::WARN,
        Some("ERROR") => tracing::Level::ERROR,
        Some(other) => {
            eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", other);
            tracing::Level::INFO
        }
    };

    // Log to a file, never stdout: the TUI owns the terminal
    let log_file = fs::File::create(config::log_path()).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Peek the configured log level before the full config load
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(model = %config.gateway.model, "popcorn loaded config");

    match cli.command {
        Some(Command::Logs { follow, lines }) => cmd_logs(follow, lines),
        None => cmd_studio(&config).await,
    }
}

/// Launch the studio TUI
async fn cmd_studio(config: &Config) -> Result<()> {
    debug!("cmd_studio: called");

    // The API key is a fatal startup requirement; there is no degraded mode.
    let resolved = config.gateway.resolve().context(
        "Gateway API key not found. Set it in the configured env var or point api-key-file at a key file.",
    )?;

    let loader = PromptLoader::new(Config::prompts_dir());
    let instruction = loader
        .decompose_instruction(&DecomposeContext::default())
        .context("Failed to render the decomposition prompt")?;

    let gateway: Arc<dyn PlanGateway> =
        Arc::new(GeminiGateway::from_config(&resolved, instruction).context("Failed to create gateway")?);
    info!(model = %resolved.model, image_model = %resolved.image_model, "Gateway initialized");

    tui::run(gateway).await
}

/// Show application logs
fn cmd_logs(follow: bool, lines: usize) -> Result<()> {
    debug!(follow, lines, "cmd_logs: called");
    let log_path = config::log_path();

    if !log_path.exists() {
        println!("No log file found at: {}", log_path.display());
        println!("Run the studio at least once to create it.");
        return Ok(());
    }

    if follow {
        println!("Following log file: {} (Ctrl+C to stop)", log_path.display());
        println!();

        let mut child = std::process::Command::new("tail")
            .args(["-f", "-n", &lines.to_string()])
            .arg(&log_path)
            .spawn()
            .context("Failed to run tail -f")?;
        child.wait()?;
    } else {
        let file = fs::File::open(&log_path).context("Failed to open log file")?;
        let reader = BufReader::new(file);
        let all_lines: Vec<String> = reader.lines().map_while(Result::ok).collect();

        let start = all_lines.len().saturating_sub(lines);
        for line in &all_lines[start..] {
            println!("{}", line);
        }
    }

    Ok(())
}
