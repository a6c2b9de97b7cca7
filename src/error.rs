//! Error types and exit codes for eridanus-webui

use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

/// Main error type for configuration and store operations
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid file name: {name}")]
    UnknownFile { name: String },

    #[error("Cannot read {path}: {message}")]
    Unreadable { path: PathBuf, message: String },

    #[error("Failed to parse document: {message}")]
    ParseFailure { message: String },

    #[error("Failed to write {path}: {message}")]
    WriteFailure { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Relay error: {message}")]
    RelayFailure { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PanelError {
    /// Convert error to the process exit code:
    /// - 0: Success
    /// - 1: File not found / IO error
    /// - 2: Unknown file name
    /// - 3: Parse failure
    /// - 4: Write failure
    /// - 5: Configuration error
    /// - 6: Relay failure
    pub fn exit_code(&self) -> ExitCode {
        match self {
            Self::FileNotFound { .. } => ExitCode::from(1),
            Self::Unreadable { .. } => ExitCode::from(1),
            Self::UnknownFile { .. } => ExitCode::from(2),
            Self::ParseFailure { .. } => ExitCode::from(3),
            Self::WriteFailure { .. } => ExitCode::from(4),
            Self::ConfigError { .. } => ExitCode::from(5),
            Self::RelayFailure { .. } => ExitCode::from(6),
            Self::Io(_) => ExitCode::from(1),
        }
    }

    /// Short machine-readable code, used in structured error payloads
    pub fn code(&self) -> &'static str {
        match self {
            Self::FileNotFound { .. } => "file_not_found",
            Self::UnknownFile { .. } => "invalid_file_name",
            Self::Unreadable { .. } => "unreadable",
            Self::ParseFailure { .. } => "parse_failure",
            Self::WriteFailure { .. } => "write_failure",
            Self::ConfigError { .. } => "config_error",
            Self::RelayFailure { .. } => "relay_failure",
            Self::Io(_) => "io_error",
        }
    }

    /// Structured error payload returned to callers of the store surface
    pub fn to_payload(&self) -> serde_json::Value {
        serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        })
    }
}

/// Result type alias for eridanus-webui operations
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors that end a single relay connection
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Invalid frame: {message}")]
    InvalidFrame { message: String },

    #[error("Binary frame is not UTF-8")]
    NonUtf8Frame,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RelayError> for PanelError {
    fn from(err: RelayError) -> Self {
        PanelError::RelayFailure {
            message: err.to_string(),
        }
    }
}
