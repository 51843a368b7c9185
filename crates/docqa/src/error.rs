//! Error types for the question answering service

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for docqa operations
pub type Result<T> = std::result::Result<T, Error>;

/// Service errors
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed caller input (short question, top_k out of range, bad extension)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Persisted index and metadata are unreadable or disagree
    #[error("Corrupt index state: {0}")]
    CorruptState(String),

    /// Vector dimension differs from the configured index dimension
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Caller exceeded the per-identity request budget
    #[error("Rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// File parsing error
    #[error("Failed to parse file '{filename}': {message}")]
    FileParse { filename: String, message: String },

    /// Requested resource does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Embedding error
    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a corrupt state error
    pub fn corrupt_state(message: impl Into<String>) -> Self {
        Self::CorruptState(message.into())
    }

    /// Create a file parse error
    pub fn file_parse(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FileParse {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding error
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::Embedding(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the caller caused this error (never worth retrying as-is)
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            Error::Validation(_) | Error::UnsupportedFileType(_) | Error::RateLimitExceeded { .. }
        )
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Error::Internal(format!("Task join error: {}", err))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match &self {
            Error::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            Error::CorruptState(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "corrupt_state", msg.clone())
            }
            Error::DimensionMismatch { .. } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "dimension_mismatch",
                self.to_string(),
            ),
            Error::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limit_exceeded",
                "Rate limit exceeded".to_string(),
            ),
            Error::Config(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "config_error", msg.clone()),
            Error::UnsupportedFileType(msg) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", msg),
            ),
            Error::FileParse { filename, message } => (
                StatusCode::BAD_REQUEST,
                "parse_error",
                format!("Failed to parse '{}': {}", filename, message),
            ),
            Error::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Error::Embedding(msg) => (StatusCode::BAD_GATEWAY, "embedding_error", msg.clone()),
            Error::Io(err) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error", err.to_string()),
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => (StatusCode::BAD_GATEWAY, "http_error", err.to_string()),
            Error::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg.clone())
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        let mut response = (status, body).into_response();
        if let Error::RateLimitExceeded { retry_after_secs } = self {
            if let Ok(value) = HeaderValue::from_str(&retry_after_secs.to_string()) {
                response.headers_mut().insert(header::RETRY_AFTER, value);
            }
        }
        response
    }
}
