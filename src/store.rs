//! Load/save surface used by the configuration editor
//!
//! `load_document` serves `{data, comments, order}` for one file.
//! `save_document` takes the edited values back, reconciles them into the
//! file currently on disk and persists the result. The stored file is
//! authoritative for comments, key order and shape; the edit only supplies
//! values. Nothing is cached between calls.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value as Json;

use crate::document::json::from_json;
use crate::document::{ConfigDocument, DocumentSnapshot};
use crate::error::{PanelError, Result};
use crate::file_index::{FileEntry, FileIndex};
use crate::reconcile::{reconcile, ReconcileReport};

/// Read `path` and project it for the editor
pub fn load_document(path: &Path) -> Result<DocumentSnapshot> {
    ensure_exists(path)?;
    let doc = ConfigDocument::load(path)?;
    tracing::debug!(path = %path.display(), "loaded document");
    Ok(doc.snapshot())
}

/// Merge `incoming` into the document stored at `path` and write it back.
///
/// A stored file that does not parse is never overwritten.
pub fn save_document(path: &Path, incoming: &Json) -> Result<ReconcileReport> {
    let (merged, report) = merge_document(path, incoming)?;
    merged.save(path)?;
    tracing::info!(
        path = %path.display(),
        updated = report.updated,
        conflicts = report.conflicts.len(),
        "saved document"
    );
    Ok(report)
}

/// The document `save_document` would write, without writing it
pub fn merge_document(path: &Path, incoming: &Json) -> Result<(ConfigDocument, ReconcileReport)> {
    ensure_exists(path)?;
    let mut stored = ConfigDocument::load(path)?;
    let edited = from_json(incoming);
    let report = reconcile(&edited, &mut stored.root);
    Ok((stored, report))
}

fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(PanelError::FileNotFound {
            path: path.display().to_string(),
        })
    }
}

/// Name-addressed access to the indexed configuration files
#[derive(Debug, Clone)]
pub struct DocumentStore {
    index: Arc<FileIndex>,
}

impl DocumentStore {
    pub fn new(index: Arc<FileIndex>) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &FileIndex {
        &self.index
    }

    /// Every editable file, sorted by name
    pub fn files(&self) -> Vec<FileEntry> {
        self.index.entries()
    }

    pub fn load(&self, name: &str) -> Result<DocumentSnapshot> {
        load_document(self.resolve(name)?)
    }

    pub fn save(&self, name: &str, incoming: &Json) -> Result<ReconcileReport> {
        save_document(self.resolve(name)?, incoming)
    }

    /// Path behind an indexed name
    pub fn resolve(&self, name: &str) -> Result<&Path> {
        self.index.resolve(name).ok_or_else(|| PanelError::UnknownFile {
            name: name.to_string(),
        })
    }
}
