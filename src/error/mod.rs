//! Error types and handling for `jira_snapshot`.
//!
//! # Design
//!
//! - Uses `thiserror` for derive-based error types
//! - Supports `anyhow` integration via [`SnapshotError::Other`]
//! - Transport and auth failures from the tracker are surfaced unmodified
//! - Provides structured JSON output for scripted callers

mod structured;

pub use structured::{ErrorCode, StructuredError};

use thiserror::Error;

/// Primary error type for `jira_snapshot` operations.
#[derive(Error, Debug)]
pub enum SnapshotError {
    // === Tracker Errors ===
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("Tracker request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The tracker rejected our credentials.
    #[error("Tracker authentication failed ({status}) for {url}")]
    Auth { status: u16, url: String },

    /// The tracker returned a non-2xx status code.
    #[error("Tracker API error ({status}) for {url}: {body}")]
    Api {
        status: u16,
        url: String,
        body: String,
    },

    // === Extraction Errors ===
    /// A field the tracker guarantees on every issue was absent.
    #[error("Issue {key} is missing required field '{field}'")]
    MissingField { key: String, field: String },

    /// A configured date column held a value that is not a date.
    #[error("Column '{column}' holds a value that is not a date: {value}")]
    InvalidDate { column: String, value: String },

    // === Configuration Errors ===
    /// Configuration file error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Field validation failed.
    #[error("Validation failed: {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Multiple validation errors occurred.
    #[error("Validation errors: {errors:?}")]
    ValidationErrors { errors: Vec<ValidationError> },

    // === I/O Errors ===
    /// File system I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parsing error.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Wrapped anyhow error.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A single field validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// The field that failed validation.
    pub field: String,
    /// The reason for the validation failure.
    pub message: String,
}

impl ValidationError {
    /// Create a new validation error.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

impl SnapshotError {
    /// Can the user fix this without code changes?
    #[must_use]
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Auth { .. }
                | Self::Config(_)
                | Self::Validation { .. }
                | Self::ValidationErrors { .. }
        )
    }

    /// Human-friendly suggestion for fixing this error.
    #[must_use]
    pub const fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::Auth { .. } => {
                Some("Check jira.user and the API token (JIRA_API_TOKEN or jira.api-token)")
            }
            Self::Transport(_) => Some("Check jira.server and your network connection"),
            Self::ValidationErrors { .. } | Self::Validation { .. } => {
                Some("Fix the listed settings in jsnap.yaml or the JSNAP_* environment")
            }
            Self::InvalidDate { .. } => {
                Some("Remove the column from jira.date-columns or fix the tracker field")
            }
            _ => None,
        }
    }

    /// Create a validation error for a specific field.
    #[must_use]
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create from multiple validation errors.
    #[must_use]
    pub fn from_validation_errors(errors: Vec<ValidationError>) -> Self {
        if errors.len() == 1 {
            let err = &errors[0];
            Self::Validation {
                field: err.field.clone(),
                reason: err.message.clone(),
            }
        } else {
            Self::ValidationErrors { errors }
        }
    }

    /// Build the error for a required field absent from an issue.
    #[must_use]
    pub fn missing_field(key: impl Into<String>, field: impl Into<String>) -> Self {
        Self::MissingField {
            key: key.into(),
            field: field.into(),
        }
    }
}

/// Result type using `SnapshotError`.
pub type Result<T> = std::result::Result<T, SnapshotError>;
