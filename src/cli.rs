//! CLI argument definitions using clap with subcommand architecture

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Configuration editor and chat relay for the Eridanus bot panel
#[derive(Parser, Debug)]
#[command(name = "eridanus-webui")]
#[command(about = "Edit plugin YAML configuration and run the chat relay")]
#[command(version)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (applies to all commands)
    #[arg(short, long, default_value = "text", value_enum, global = true)]
    pub format: OutputFormat,

    /// Show verbose output (debug logging)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to the panel config file
    #[arg(long, value_name = "PATH", global = true, env = "ERIDANUS_WEBUI_CONFIG")]
    pub config: Option<PathBuf>,

    /// Plugin run directory (overrides paths.run_dir)
    #[arg(long, value_name = "DIR", global = true)]
    pub run_dir: Option<PathBuf>,
}

// ============================================
// Main Commands Enum
// ============================================

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List editable configuration files
    #[command(visible_alias = "ls")]
    Files,

    /// Show a configuration file as {data, comments, order}
    Load(LoadArgs),

    /// Merge edited JSON values into a configuration file
    Save(SaveArgs),

    /// Run the chat relay server
    Relay(RelayArgs),

    /// Manage panel configuration
    Config(ConfigArgs),
}

// ============================================
// Document Target
// ============================================

/// Which configuration file to operate on
#[derive(Args, Debug, Clone)]
#[group(required = true, multiple = false)]
pub struct TargetArgs {
    /// Indexed name, e.g. "AI Chat.config"
    #[arg(value_name = "NAME")]
    pub name: Option<String>,

    /// YAML file path, bypassing the index
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

// ============================================
// Load Subcommand
// ============================================

/// Arguments for the load command
#[derive(Args, Debug)]
pub struct LoadArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}

// ============================================
// Save Subcommand
// ============================================

/// Arguments for the save command
#[derive(Args, Debug)]
pub struct SaveArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// JSON file with the edited values (reads stdin when omitted or "-")
    #[arg(short, long, value_name = "PATH")]
    pub input: Option<PathBuf>,

    /// Print the merged YAML instead of writing it
    #[arg(long)]
    pub dry_run: bool,
}

// ============================================
// Relay Subcommand
// ============================================

/// Arguments for the relay command
#[derive(Args, Debug)]
pub struct RelayArgs {
    /// Host to bind to (overrides relay.host)
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on (overrides relay.port)
    #[arg(short, long)]
    pub port: Option<u16>,
}

// ============================================
// Config Subcommand
// ============================================

/// Arguments for the config command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Config operation: show, get, set, reset, path
    #[command(subcommand)]
    pub operation: ConfigOperation,
}

/// Config subcommand operations
#[derive(Subcommand, Debug)]
pub enum ConfigOperation {
    /// Show current configuration
    Show,

    /// Get a configuration value
    Get {
        /// Configuration key (e.g., relay.port, logging.level)
        key: String,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., relay.port, relay.identity.group_id)
        key: String,
        /// Value to set
        value: String,
    },

    /// Reset configuration to defaults
    Reset,

    /// Print the config file location
    Path,
}

// ============================================
// Output Format
// ============================================

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text (default for terminal)
    #[default]
    #[value(alias = "pretty")]
    Text,
    /// JSON - standard JSON output for machine parsing
    Json,
}
