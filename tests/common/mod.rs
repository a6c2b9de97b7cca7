//! Common test utilities and fixtures for eridanus-webui integration tests
//!
//! `TestRun` builds a throwaway plugin run directory:
//!
//! ```text
//! <tmp>/run/<plugin>/__init__.py   plugin_description = "..."
//! <tmp>/run/<plugin>/<file>.yaml
//! <tmp>/config.toml                 (only when written by a test)
//! ```

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

/// Builder for a temporary plugin run directory
pub struct TestRun {
    dir: TempDir,
}

impl TestRun {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        fs::create_dir_all(dir.path().join("run")).expect("Failed to create run dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn run_dir(&self) -> PathBuf {
        self.dir.path().join("run")
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.toml")
    }

    /// Create a plugin directory with the given description
    pub fn add_plugin(&self, dir_name: &str, description: &str) -> &Self {
        self.add_file(
            &format!("{}/__init__.py", dir_name),
            &format!("plugin_description = \"{}\"\n", description),
        )
    }

    /// Write a file relative to the run directory
    pub fn add_file(&self, relative_path: &str, content: &str) -> &Self {
        let full_path = self.run_dir().join(relative_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent dirs");
        }
        fs::write(&full_path, content).expect("Failed to write file");
        self
    }

    pub fn read(&self, relative_path: &str) -> String {
        fs::read_to_string(self.run_dir().join(relative_path)).expect("Failed to read file")
    }

    /// Write a file outside the run directory (edited JSON, config)
    pub fn add_root_file(&self, name: &str, content: &str) -> PathBuf {
        let path = self.root().join(name);
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Run the CLI against this run directory and a private config file
    pub fn run_cli(&self, args: &[&str]) -> Output {
        let run_dir = self.run_dir();
        let config = self.config_path();
        Command::new(env!("CARGO_BIN_EXE_eridanus-webui"))
            .current_dir(self.root())
            .env_remove("RUST_LOG")
            .arg("--run-dir")
            .arg(&run_dir)
            .arg("--config")
            .arg(&config)
            .args(args)
            .output()
            .expect("Failed to run CLI")
    }

    /// Run CLI and expect success, return stdout
    pub fn run_cli_success(&self, args: &[&str]) -> String {
        let output = self.run_cli(args);
        assert!(
            output.status.success(),
            "CLI command {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}

/// Canonical sample plugin config used across tests
pub const AI_CHAT_CONFIG: &str = "\
# model settings
model: gpt # default model
temperature: 0.7
api_key: \"0000\"
admins:
  - 10001
proxy:
  enabled: false
  port: 7890
";
