//! Error types and HTTP response conversion

use http::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::repository::{RepositoryError, RepositoryErrorKind};

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the crate
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(Box<figment::Error>),

    /// Structured repository error with operation context
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// The global tracing subscriber could not be installed
    #[error("Tracing error: {0}")]
    Tracing(String),
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Error::Config(Box::new(err))
    }
}

impl Error {
    /// HTTP status code for this error
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Error::Repository(e) => match e.kind {
                RepositoryErrorKind::UnknownColumn | RepositoryErrorKind::UnknownRelation => {
                    StatusCode::BAD_REQUEST
                }
                RepositoryErrorKind::Unsupported => StatusCode::NOT_IMPLEMENTED,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Config(_) | Error::Tracing(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing response body for this error
    #[must_use]
    pub fn to_response(&self) -> ErrorResponse {
        let status = self.status();
        match self {
            Error::Config(e) => ErrorResponse::with_code(status, "CONFIG_ERROR", e.to_string()),
            Error::Repository(e) => {
                let code = format!("REPOSITORY_{}", e.kind.to_string().to_uppercase());
                // Configuration mistakes and backend failures stay server-side
                let message = match e.kind {
                    RepositoryErrorKind::UnknownColumn
                    | RepositoryErrorKind::UnknownRelation
                    | RepositoryErrorKind::Unsupported => e.message.clone(),
                    _ => "Internal server error".to_string(),
                };
                ErrorResponse::with_code(status, code, message)
            }
            Error::Tracing(e) => ErrorResponse::with_code(status, "TRACING_ERROR", e.clone()),
        }
    }
}

/// Error response body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// Optional error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// HTTP status code
    pub status: u16,
}

impl ErrorResponse {
    /// Create a new error response
    pub fn new(status: StatusCode, error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
            status: status.as_u16(),
        }
    }

    /// Create error response with a code
    pub fn with_code(
        status: StatusCode,
        code: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            error: error.into(),
            code: Some(code.into()),
            status: status.as_u16(),
        }
    }
}

#[cfg(feature = "http")]
impl axum::response::IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        if let Error::Repository(ref e) = self {
            tracing::error!(
                operation = %e.operation,
                kind = %e.kind,
                entity = ?e.entity_type,
                fatal = e.is_fatal(),
                "Repository error: {}", e.message
            );
        }

        let status = self.status();
        (status, axum::Json(self.to_response())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::RepositoryOperation;

    #[test]
    fn test_error_response() {
        let err = ErrorResponse::new(StatusCode::NOT_FOUND, "User not found");
        assert_eq!(err.status, 404);
        assert_eq!(err.error, "User not found");
        assert!(err.code.is_none());
    }

    #[test]
    fn test_unknown_column_is_bad_request() {
        let err: Error = RepositoryError::unknown_column(RepositoryOperation::Get, "users", "x").into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        let body = err.to_response();
        assert_eq!(body.code.as_deref(), Some("REPOSITORY_UNKNOWN_COLUMN"));
        assert_eq!(body.error, "Unknown column `x`");
    }

    #[test]
    fn test_configuration_error_is_hidden() {
        let err: Error = RepositoryError::missing_allow_list("UserFilter").into();
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = err.to_response();
        assert_eq!(body.code.as_deref(), Some("REPOSITORY_CONFIGURATION"));
        assert_eq!(body.error, "Internal server error");
    }

    #[test]
    fn test_repository_display_passes_through() {
        let inner = RepositoryError::unknown_relation("posts", "author");
        let err = Error::from(inner.clone());
        assert_eq!(err.to_string(), inner.to_string());
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_into_response_status() {
        use axum::response::IntoResponse;

        let err: Error = RepositoryError::unsupported(RepositoryOperation::Get, "raw").into();
        assert_eq!(err.into_response().status(), StatusCode::NOT_IMPLEMENTED);
    }
}
