//! CLI argument definitions
//!
//! All Clap derive structs for `eop-api` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

use crate::config::schema::DEFAULT_GAME_NAME;

// ============================================================================
// Root CLI
// ============================================================================

/// HTTP API for Elevation of Privilege threat-modeling sessions.
#[derive(Parser, Debug)]
#[command(name = "eop-api", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "EOP_COLOR")]
    pub color: ColorChoice,

    /// Log output format.
    #[arg(long, default_value = "human", global = true, env = "EOP_LOG_FORMAT")]
    pub log_format: LogFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the HTTP API.
    Serve(ServeArgs),

    /// Export a session's merged threat model from a file store.
    Export(ExportArgs),

    /// Display version information.
    Version(VersionArgs),
}

// ============================================================================
// Serve Command
// ============================================================================

/// Arguments for `serve`.
///
/// Flags override the corresponding configuration file values.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Path to YAML configuration file.
    #[arg(short, long, env = "EOP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Bind address, `[host]:port` or bare port.
    #[arg(long, env = "EOP_BIND")]
    pub bind: Option<String>,

    /// Base URL of the game server lobby.
    #[arg(long, env = "EOP_LOBBY_URL")]
    pub lobby_url: Option<String>,

    /// Game name used in lobby paths and store keys.
    #[arg(long)]
    pub game: Option<String>,

    /// Root directory of the file store.
    #[arg(long, conflicts_with = "memory")]
    pub data_dir: Option<PathBuf>,

    /// Keep documents in memory instead of on disk.
    #[arg(long)]
    pub memory: bool,

    /// Expose Prometheus metrics on `127.0.0.1:<port>`.
    #[arg(long, env = "EOP_METRICS_PORT")]
    pub metrics_port: Option<u16>,
}

// ============================================================================
// Export Command
// ============================================================================

/// Arguments for `export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Root directory of the file store.
    #[arg(long, env = "EOP_DATA_DIR")]
    pub data_dir: PathBuf,

    /// Session identifier.
    #[arg(short, long)]
    pub session: String,

    /// Game name used in store keys.
    #[arg(long, default_value = DEFAULT_GAME_NAME)]
    pub game: String,

    /// Directory to write the export into.
    #[arg(short, long, default_value = ".")]
    pub output: PathBuf,
}

// ============================================================================
// Version
// ============================================================================

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Human,
    /// One JSON object per event.
    Json,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================
