//! Error types for the RPC protocol.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error codes returned in RPC error responses.
///
/// These codes are stable and used for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Malformed JSON, missing required fields, or invalid field values.
    InvalidRequest,
    /// Protocol version is outside the supported range.
    UnsupportedProtocol,
    /// Unknown operation requested.
    UnknownOperation,
    /// A settings layer is not valid JSON-with-comments.
    SyntaxError,
    /// Well-formed input that violates a settings invariant.
    ValidationError,
    /// The caller's last-seen version is stale; re-read and retry.
    Conflict,
    /// The subject does not exist.
    NotFound,
    /// The settings store could not be reached.
    StoreUnavailable,
}

impl ErrorCode {
    /// Returns the string representation of the error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "INVALID_REQUEST",
            Self::UnsupportedProtocol => "UNSUPPORTED_PROTOCOL",
            Self::UnknownOperation => "UNKNOWN_OPERATION",
            Self::SyntaxError => "SYNTAX_ERROR",
            Self::ValidationError => "VALIDATION_ERROR",
            Self::Conflict => "CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
        }
    }

    /// HTTP status an API layer should answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidRequest | Self::UnsupportedProtocol | Self::UnknownOperation => 400,
            Self::SyntaxError => 400,
            Self::ValidationError => 422,
            Self::Conflict => 409,
            Self::NotFound => 404,
            Self::StoreUnavailable => 503,
        }
    }

    /// Whether the same request may succeed if retried.
    ///
    /// A conflict is only retryable after re-reading the current version.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Conflict | Self::StoreUnavailable)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// RPC error response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcError {
    /// Error code from the registry.
    pub code: ErrorCode,
    /// Human-readable, single-line error message.
    pub message: String,
    /// Optional machine-readable details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl RpcError {
    /// Create a new RPC error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Create a new RPC error with additional data.
    pub fn with_data(code: ErrorCode, message: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Create an INVALID_REQUEST error.
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Create an UNSUPPORTED_PROTOCOL error.
    pub fn unsupported_protocol(version: i32, min: i32, max: i32) -> Self {
        Self::with_data(
            ErrorCode::UnsupportedProtocol,
            format!("protocol_version {} is outside supported range [{}, {}]", version, min, max),
            serde_json::json!({
                "requested": version,
                "min": min,
                "max": max
            }),
        )
    }

    /// Create an UNKNOWN_OPERATION error.
    pub fn unknown_operation(op: &str) -> Self {
        Self::with_data(
            ErrorCode::UnknownOperation,
            format!("unknown operation: {}", op),
            serde_json::json!({ "op": op }),
        )
    }

    /// Create a CONFLICT error carrying both versions.
    pub fn conflict(subject: &str, expected: u64, actual: u64) -> Self {
        Self::with_data(
            ErrorCode::Conflict,
            format!(
                "settings for {} changed: last seen version {}, current version {}",
                subject, expected, actual
            ),
            serde_json::json!({
                "subject": subject,
                "last_version": expected,
                "current_version": actual
            }),
        )
    }

    /// Create a SYNTAX_ERROR error with the offending position.
    pub fn syntax_error(message: impl Into<String>, line: usize, column: usize) -> Self {
        Self::with_data(
            ErrorCode::SyntaxError,
            message,
            serde_json::json!({ "line": line, "column": column }),
        )
    }

    /// Create a NOT_FOUND error.
    pub fn not_found(subject: &str) -> Self {
        Self::with_data(
            ErrorCode::NotFound,
            format!("subject '{}' not found", subject),
            serde_json::json!({ "subject": subject }),
        )
    }
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl std::error::Error for RpcError {}
