//! Structured error output for scripted callers.
//!
//! Provides machine-parseable error information with:
//! - Error codes for categorization
//! - Hints for self-correction
//! - Retryability flags
//! - Context for debugging

use crate::error::SnapshotError;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Machine-readable error codes.
///
/// These codes are stable and can be used for programmatic error handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // === Tracker Errors (exit code 2) ===
    /// Network or TLS failure talking to the tracker
    TransportError,
    /// Credentials rejected
    AuthFailed,
    /// Tracker returned an error status
    ApiError,

    // === Extraction Errors (exit code 3) ===
    /// Required issue field absent
    RequiredField,
    /// Date column held a non-date value
    InvalidDate,

    // === Validation Errors (exit code 4) ===
    /// Field validation failed
    ValidationFailed,

    // === Config Errors (exit code 7) ===
    /// Configuration error
    ConfigError,
    /// Config parse error
    ConfigParseError,

    // === I/O Errors (exit code 8) ===
    /// File I/O error
    IoError,
    /// JSON serialization error
    JsonError,

    // === Internal Errors (exit code 1) ===
    /// Unexpected internal error
    InternalError,
}

impl ErrorCode {
    /// Get the string representation for JSON output.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TransportError => "TRANSPORT_ERROR",
            Self::AuthFailed => "AUTH_FAILED",
            Self::ApiError => "API_ERROR",
            Self::RequiredField => "REQUIRED_FIELD",
            Self::InvalidDate => "INVALID_DATE",
            Self::ValidationFailed => "VALIDATION_FAILED",
            Self::ConfigError => "CONFIG_ERROR",
            Self::ConfigParseError => "CONFIG_PARSE_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether this error is potentially retryable.
    ///
    /// The core never retries; this flag is for the orchestration layer.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError | Self::ApiError)
    }

    /// Get the exit code for this error category.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::TransportError | Self::AuthFailed | Self::ApiError => 2,
            Self::RequiredField | Self::InvalidDate => 3,
            Self::ValidationFailed => 4,
            Self::ConfigError | Self::ConfigParseError => 7,
            Self::IoError | Self::JsonError => 8,
            Self::InternalError => 1,
        }
    }
}

/// Structured error for machine-parseable output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Machine-readable error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Optional hint for fixing the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Whether the operation can be retried
    pub retryable: bool,
    /// Additional context data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl StructuredError {
    /// Create a new structured error from a `SnapshotError`.
    #[must_use]
    pub fn from_error(err: &SnapshotError) -> Self {
        let (code, context) = Self::extract_code_and_context(err);

        Self {
            code,
            message: err.to_string(),
            hint: err.suggestion().map(str::to_string),
            retryable: code.is_retryable(),
            context,
        }
    }

    /// Format as the JSON envelope written to stderr.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "error": {
                "code": self.code.as_str(),
                "message": self.message,
                "hint": self.hint,
                "retryable": self.retryable,
                "context": self.context,
            }
        })
    }

    /// Format for human-readable output.
    #[must_use]
    pub fn to_human(&self, color: bool) -> String {
        let mut output = String::new();

        if color {
            output.push_str("\x1b[31mError:\x1b[0m ");
        } else {
            output.push_str("Error: ");
        }

        output.push_str(&self.message);

        if let Some(hint) = &self.hint {
            output.push('\n');
            if color {
                output.push_str("\x1b[33mHint:\x1b[0m ");
            } else {
                output.push_str("Hint: ");
            }
            output.push_str(hint);
        }

        output
    }

    fn extract_code_and_context(err: &SnapshotError) -> (ErrorCode, Option<Value>) {
        match err {
            SnapshotError::Transport(source) => (
                ErrorCode::TransportError,
                source.url().map(|url| json!({"url": url.as_str()})),
            ),
            SnapshotError::Auth { status, url } => (
                ErrorCode::AuthFailed,
                Some(json!({"status": status, "url": url})),
            ),
            SnapshotError::Api { status, url, .. } => (
                ErrorCode::ApiError,
                Some(json!({"status": status, "url": url})),
            ),
            SnapshotError::MissingField { key, field } => (
                ErrorCode::RequiredField,
                Some(json!({"key": key, "field": field})),
            ),
            SnapshotError::InvalidDate { column, value } => (
                ErrorCode::InvalidDate,
                Some(json!({"column": column, "value": value})),
            ),
            SnapshotError::Validation { field, reason } => (
                ErrorCode::ValidationFailed,
                Some(json!({"field": field, "reason": reason})),
            ),
            SnapshotError::ValidationErrors { errors } => (
                ErrorCode::ValidationFailed,
                Some(json!({
                    "errors": errors.iter()
                        .map(|e| json!({"field": e.field, "message": e.message}))
                        .collect::<Vec<_>>()
                })),
            ),
            SnapshotError::Config(_) => (ErrorCode::ConfigError, None),
            SnapshotError::Yaml(_) => (ErrorCode::ConfigParseError, None),
            SnapshotError::Io(_) => (ErrorCode::IoError, None),
            SnapshotError::Json(_) => (ErrorCode::JsonError, None),
            SnapshotError::Other(_) => (ErrorCode::InternalError, None),
        }
    }
}
