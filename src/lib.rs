//! Eridanus web panel core
//!
//! Two independent pieces sit behind the panel's HTTP layer:
//!
//! - **Configuration reconciliation**: plugin YAML files are loaded into a
//!   comment-preserving [`document::ConfigDocument`], served to the browser
//!   as `{data, comments, order}`, and on save the edited values are merged
//!   back into the file on disk by [`reconcile::reconcile`], keeping the
//!   stored file's comments, key order and declared types.
//! - **Chat relay**: a WebSocket hub ([`relay::RelayHub`]) that turns the
//!   browser's virtual chat client messages into OneBot v11 style group
//!   events and broadcasts them to the backend plugin clients.
//!
//! # Example
//!
//! ```
//! use eridanus_webui::document::{json::from_json, ConfigDocument};
//! use eridanus_webui::reconcile::reconcile;
//!
//! let mut stored = ConfigDocument::parse("port: 5007 # web ui\n").unwrap();
//! let edited = from_json(&serde_json::json!({"port": 6000}));
//! reconcile(&edited, &mut stored.root);
//! assert_eq!(stored.to_yaml_string(), "port: 6000 # web ui\n");
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod file_index;
pub mod fs_utils;
pub mod reconcile;
pub mod relay;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::PanelConfig;
pub use document::{ConfigDocument, DocumentSnapshot, Node, Value};
pub use error::{PanelError, RelayError, Result};
pub use file_index::{FileEntry, FileIndex};
pub use reconcile::{reconcile, ReconcileReport, Resolution, TypeConflict};
pub use relay::{EnvelopeTranslator, RelayHub, RelayIdentity, Translation};
pub use session::{Session, SessionStore};
pub use store::{load_document, save_document, DocumentStore};
