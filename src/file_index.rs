//! Index of editable plugin configuration files
//!
//! Plugins live in directories directly under the run directory. A plugin
//! takes part in the panel only when its `__init__.py` declares a
//! module-level `plugin_description`; its YAML files are then exposed as
//! `"{plugin_description}.{file stem}"`.
//!
//! ```text
//! run/
//!   ai_chat/
//!     __init__.py        plugin_description = "AI Chat"
//!     config.yaml        -> "AI Chat.config"
//!     presets/role.yaml  -> "AI Chat.role"
//!   stray.yaml           (ignored, not inside a plugin)
//! ```
//!
//! The index is built once at startup and shared read-only.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Component, Path, PathBuf};

use ignore::WalkBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static DESCRIPTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?m)^plugin_description\s*(?::[^=\n]*)?=\s*[rRuU]?(?:"{3}|'{3}|"|')([^"'\n]+)["']"#)
        .expect("plugin_description pattern is valid")
});

/// One indexed file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
}

/// Display name → absolute path of every editable YAML file
#[derive(Debug, Clone, Default)]
pub struct FileIndex {
    run_dir: PathBuf,
    entries: BTreeMap<String, PathBuf>,
}

impl FileIndex {
    /// Walk `run_dir` and index every plugin YAML file.
    ///
    /// A missing run directory gives an empty index.
    pub fn build(run_dir: &Path) -> Self {
        let run_dir = fs::canonicalize(run_dir).unwrap_or_else(|_| run_dir.to_path_buf());
        let mut index = Self {
            run_dir: run_dir.clone(),
            entries: BTreeMap::new(),
        };
        if !run_dir.is_dir() {
            tracing::warn!(run_dir = %run_dir.display(), "run directory not found, file index is empty");
            return index;
        }

        let mut descriptions: HashMap<PathBuf, Option<String>> = HashMap::new();
        let walker = WalkBuilder::new(&run_dir)
            .standard_filters(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .build();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let Ok(relative) = path.strip_prefix(&run_dir) else {
                continue;
            };
            let parts: Vec<&str> = relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => part.to_str(),
                    _ => None,
                })
                .collect();
            if parts.len() < 2 {
                continue;
            }

            let plugin_dir = run_dir.join(parts[0]);
            let description = descriptions
                .entry(plugin_dir.clone())
                .or_insert_with(|| plugin_description(&plugin_dir));
            let Some(description) = description else {
                continue;
            };
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let name = format!("{}.{}", description, stem);
            if let Some(previous) = index.entries.insert(name.clone(), path.to_path_buf()) {
                tracing::warn!(
                    name = %name,
                    replaced = %previous.display(),
                    "duplicate configuration name, keeping later file"
                );
            }
        }

        tracing::info!(
            run_dir = %index.run_dir.display(),
            files = index.entries.len(),
            "built configuration file index"
        );
        index
    }

    /// Index from explicit entries
    pub fn from_entries(run_dir: impl Into<PathBuf>, entries: impl IntoIterator<Item = (String, PathBuf)>) -> Self {
        Self {
            run_dir: run_dir.into(),
            entries: entries.into_iter().collect(),
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn resolve(&self, name: &str) -> Option<&Path> {
        self.entries.get(name).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries sorted by name
    pub fn entries(&self) -> Vec<FileEntry> {
        self.entries
            .iter()
            .map(|(name, path)| FileEntry {
                name: name.clone(),
                path: path.clone(),
            })
            .collect()
    }
}

/// `plugin_description` declared in `<plugin_dir>/__init__.py`, if any
pub fn plugin_description(plugin_dir: &Path) -> Option<String> {
    let source = fs::read_to_string(plugin_dir.join("__init__.py")).ok()?;
    let description = DESCRIPTION_RE.captures(&source)?.get(1)?.as_str().trim();
    if description.is_empty() {
        None
    } else {
        Some(description.to_string())
    }
}
