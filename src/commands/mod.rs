//! Command modules for the eridanus-webui CLI
//!
//! Each command module implements a single top-level command:
//! - `files` - List the indexed configuration files
//! - `load` - Show one file as `{data, comments, order}`
//! - `save` - Reconcile edited JSON into a file
//! - `relay` - Run the chat relay server
//! - `config` - Manage the panel configuration
//!
//! Handlers take their `Args` struct from `cli.rs` and a shared
//! `CommandContext`, and return the text to print.

pub mod config;
pub mod files;
pub mod load;
pub mod relay;
pub mod save;

pub use config::run_config;
pub use files::run_files;
pub use load::run_load;
pub use relay::run_relay;
pub use save::run_save;

use std::path::PathBuf;
use std::sync::Arc;

use crate::cli::{OutputFormat, TargetArgs};
use crate::config::PanelConfig;
use crate::error::{PanelError, Result};
use crate::file_index::FileIndex;
use crate::store::DocumentStore;

/// Shared context passed to all command handlers
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Output format (text or json)
    pub format: OutputFormat,
    /// Show verbose output
    pub verbose: bool,
    /// Loaded panel configuration
    pub config: PanelConfig,
    /// Where the configuration was read from
    pub config_path: PathBuf,
}

impl CommandContext {
    pub fn new(format: OutputFormat, verbose: bool, config: PanelConfig, config_path: PathBuf) -> Self {
        Self {
            format,
            verbose,
            config,
            config_path,
        }
    }

    pub fn run_dir(&self) -> &std::path::Path {
        &self.config.paths.run_dir
    }

    /// Store over a freshly built index of the run directory
    pub fn document_store(&self) -> DocumentStore {
        DocumentStore::new(Arc::new(FileIndex::build(self.run_dir())))
    }

    /// `json` pretty-printed, or `text` for the text format
    pub fn render(&self, json: &serde_json::Value, text: impl FnOnce() -> String) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let mut output = serde_json::to_string_pretty(json).map_err(|e| PanelError::ConfigError {
                    message: format!("JSON serialization failed: {}", e),
                })?;
                output.push('\n');
                Ok(output)
            }
            OutputFormat::Text => Ok(text()),
        }
    }
}

/// A document picked by name or by path
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    /// Indexed name, or the path as given
    pub label: String,
    pub path: PathBuf,
}

/// Resolve `--file` directly, or a name through the file index
pub fn resolve_target(target: &TargetArgs, ctx: &CommandContext) -> Result<ResolvedTarget> {
    if let Some(path) = &target.file {
        return Ok(ResolvedTarget {
            label: path.display().to_string(),
            path: path.clone(),
        });
    }
    let name = target.name.as_deref().unwrap_or_default();
    let store = ctx.document_store();
    let path = store.resolve(name)?.to_path_buf();
    Ok(ResolvedTarget {
        label: name.to_string(),
        path,
    })
}
