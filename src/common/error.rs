//! Error types for the harness
//!
//! Configuration and session errors are fatal for the run; diagnostic and
//! report errors are isolated per item by their callers.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the harness
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("No {0} environment variable found. Bailing out.")]
    MissingEnv(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    // === Session Errors ===
    #[error("Failed to acquire browser session at {target}: {reason}")]
    SessionAcquisition { target: String, reason: String },

    #[error("Browser session is closed")]
    SessionClosed,

    #[error("Driver binary '{0}' not found on PATH")]
    DriverNotFound(String),

    #[error("Driver command failed: {0}")]
    DriverCommand(String),

    // === Selector Errors ===
    #[error("Failed to load selectors from '{path}': {reason}")]
    SelectorLoad { path: String, reason: String },

    // === Engine Errors ===
    #[error("Test-execution engine error: {0}")]
    Engine(String),

    // === Diagnostic Errors ===
    #[error("Diagnostic capture failed: {0}")]
    DiagnosticCapture(String),

    // === Report Errors ===
    #[error("Report augmentation failed for '{path}': {reason}")]
    ReportAugmentation { path: String, reason: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a session acquisition error with target context
    pub fn session_acquisition(target: &str, reason: impl ToString) -> Self {
        Self::SessionAcquisition {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a selector load error
    pub fn selector_load(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::SelectorLoad {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create a report augmentation error
    pub fn report_augmentation(path: &std::path::Path, reason: impl ToString) -> Self {
        Self::ReportAugmentation {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<fantoccini::error::CmdError> for Error {
    fn from(e: fantoccini::error::CmdError) -> Self {
        Self::DriverCommand(e.to_string())
    }
}
