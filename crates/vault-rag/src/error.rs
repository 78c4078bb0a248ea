//! Error types for the question-answering pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unreadable or corrupt PDF
    #[error("Failed to parse '{source_name}': {message}")]
    Parse { source_name: String, message: String },

    /// Internal mismatch between chunks, vectors or dimensions
    #[error("Validation error: {0}")]
    Validation(String),

    /// Embedding or generation backend unreachable or failing
    #[error("Service error: {0}")]
    Service(String),

    /// Malformed request from the caller
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a parse error for a named source
    pub fn parse(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a service error
    pub fn service(message: impl Into<String>) -> Self {
        Self::Service(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether retrying the same request may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Service(_))
    }

    /// Short machine-readable kind, used in reports and error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Config(_) => "config_error",
            Error::Parse { .. } => "parse_error",
            Error::Validation(_) => "validation_error",
            Error::Service(_) => "service_error",
            Error::InvalidInput(_) => "invalid_input",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Internal(_) => "internal_error",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::Parse { .. } | Error::InvalidInput(_) | Error::Json(_) => {
                StatusCode::BAD_REQUEST
            }
            Error::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::Service(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Config(_) | Error::Io(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Service(format!("request timed out: {}", err))
        } else {
            Error::Service(err.to_string())
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::warn!("{}", self);
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
                "retryable": self.is_retryable(),
            }
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::parse("a.pdf", "bad").into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Error::validation("3 chunks, 2 vectors").into_response().status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            Error::service("down").into_response().status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_only_service_errors_are_retryable() {
        assert!(Error::service("timeout").is_retryable());
        assert!(!Error::parse("a.pdf", "bad").is_retryable());
        assert!(!Error::validation("mismatch").is_retryable());
    }

    #[test]
    fn test_parse_error_names_source() {
        let err = Error::parse("report.pdf", "not a PDF file");
        assert_eq!(err.to_string(), "Failed to parse 'report.pdf': not a PDF file");
        assert_eq!(err.kind(), "parse_error");
    }
}
