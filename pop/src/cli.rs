//! CLI definitions
//!
//! The binary is launcher-only: running `pop` with no subcommand starts the
//! studio TUI. The plan workflow itself has no command-line surface; the
//! plan lives in memory for the session only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// popcorn - idea-to-plan decomposition studio
#[derive(Parser)]
#[command(
    name = "pop",
    about = "Turn a free-text idea into an executable plan of AI, human, and tool tasks",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Show application logs
    Logs {
        /// Follow log output (like tail -f)
        #[arg(short, long)]
        follow: bool,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "50")]
        lines: usize,
    },
}
