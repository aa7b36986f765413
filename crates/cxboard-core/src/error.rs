//! Error types for cxboard-core
//!
//! Provides the error hierarchy with thiserror plus a load report for graceful degradation
//! when a record file carries malformed entries.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for cxboard operations
#[derive(Error, Debug)]
pub enum CoreError {
    // ===================
    // Period Errors
    // ===================
    #[error("Invalid date '{input}': {reason}")]
    InvalidDate { input: String, reason: String },

    #[error("Invalid period '{input}' (expected day, week or month)")]
    InvalidGranularity { input: String },

    // ===================
    // Record Errors
    // ===================
    #[error("Unknown intent: {input}")]
    UnknownIntent { input: String },

    #[error("Invalid call duration '{input}' (expected M:SS)")]
    InvalidDuration { input: String },

    #[error("Invalid call timestamp '{input}' (expected YYYY-MM-DD HH:MM)")]
    InvalidTimestamp { input: String },

    #[error("Invalid time of day '{input}' (expected HH:MM)")]
    InvalidTimeOfDay { input: String },

    #[error("Duplicate call record id: {id}")]
    DuplicateRecordId { id: String },

    // ===================
    // Storage Errors
    // ===================
    #[error("Key-value storage unavailable for '{key}': {reason}")]
    StorageUnavailable { key: String, reason: String },

    // ===================
    // IO Errors
    // ===================
    #[error("Failed to read file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ===================
    // Parse Errors
    // ===================
    #[error("Failed to parse JSON in {path}: {message}")]
    JsonParse {
        path: PathBuf,
        message: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to parse TOML in {path}")]
    TomlParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    // ===================
    // Config Errors
    // ===================
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

impl CoreError {
    pub(crate) fn invalid_date(input: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidDate {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn storage(key: impl Into<String>, reason: impl ToString) -> Self {
        CoreError::StorageUnavailable {
            key: key.into(),
            reason: reason.to_string(),
        }
    }
}

/// A skipped entry in a record file
#[derive(Debug, Clone)]
pub struct LoadError {
    pub source: String,
    pub message: String,
    /// Actionable suggestion for user (optional)
    pub suggestion: Option<String>,
}

impl LoadError {
    pub fn warning(source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            message: message.into(),
            suggestion: None,
        }
    }

    /// Create user-friendly warning from a skipped record with a context-aware suggestion
    pub fn from_core_error(source: impl Into<String>, error: &CoreError) -> Self {
        let suggestion = match error {
            CoreError::InvalidTimestamp { .. } => {
                Some("Use 'YYYY-MM-DD HH:MM' with a space between date and time".to_string())
            }
            CoreError::InvalidDuration { .. } => {
                Some("Write durations as minutes and seconds, e.g. '2:34'".to_string())
            }
            CoreError::UnknownIntent { .. } => {
                Some("Run 'cxboard report --json' to list the known intents".to_string())
            }
            CoreError::DuplicateRecordId { .. } => {
                Some("Give every call record a unique 'id'".to_string())
            }
            _ => None,
        };

        Self {
            source: source.into(),
            message: error.to_string(),
            suggestion,
        }
    }
}

/// Report of problems encountered while loading call records
///
/// Malformed entries are skipped and recorded here instead of failing the whole load.
/// A file that is not a JSON array fails the load with [`CoreError::JsonParse`].
#[derive(Debug, Default)]
pub struct LoadReport {
    pub errors: Vec<LoadError>,
    pub records_loaded: usize,
    pub records_skipped: usize,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, error: LoadError) {
        self.errors.push(error);
    }

    /// Returns true if any entry was skipped
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
