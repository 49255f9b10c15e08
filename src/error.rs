use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Failure taxonomy for entitlement and delivery requests
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("Caller is not authenticated")]
    Unauthenticated,

    #[error("No progress recorded for caller")]
    NoProgress,

    #[error("Invalid object reference: {0}")]
    InvalidReference(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl VaultError {
    /// Convert error to HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            VaultError::Unauthenticated | VaultError::NoProgress => StatusCode::UNAUTHORIZED,
            VaultError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            VaultError::NotFound(_) => StatusCode::NOT_FOUND,
            VaultError::BackendUnavailable(_) | VaultError::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for VaultError {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            VaultError::InvalidReference("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            VaultError::NotFound("videos/a.mp4".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            VaultError::BackendUnavailable("timeout".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            VaultError::Configuration("missing secret".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
