use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// The upstream did not recognize the session credential
    #[error("Not authenticated")]
    Unauthenticated,

    /// Invalid request data, or a request the signed-in user cannot make
    #[error("{message}")]
    BadRequest { message: String },

    /// The upstream rejected an organization update
    #[error("Update failed: {}", status.as_u16())]
    UpdateFailed { status: StatusCode },

    /// Generic internal service error; the operation name is fixed by the caller
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            // The upstream's verdict is kept for client errors; its own failures surface as a bad gateway
            Error::UpdateFailed { status } if status.is_client_error() => *status,
            Error::UpdateFailed { .. } => StatusCode::BAD_GATEWAY,
            Error::Internal { .. } | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::BadRequest { message } => message.clone(),
            Error::Unauthenticated | Error::UpdateFailed { .. } | Error::Internal { .. } => self.to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Internal { .. } | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Unauthenticated => {
                tracing::info!("Authentication error: {}", self);
            }
            Error::UpdateFailed { .. } => {
                tracing::warn!("Upstream rejected update: {}", self);
            }
            Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();
        (status, Json(json!({ "error": self.user_message() }))).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_failed_keeps_client_errors() {
        let err = Error::UpdateFailed {
            status: StatusCode::FORBIDDEN,
        };
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(err.user_message(), "Update failed: 403");

        let err = Error::UpdateFailed {
            status: StatusCode::SERVICE_UNAVAILABLE,
        };
        assert_eq!(err.status_code(), StatusCode::BAD_GATEWAY);
        assert_eq!(err.user_message(), "Update failed: 503");
    }

    #[test]
    fn test_other_errors_do_not_leak_details() {
        let err = Error::Other(anyhow::anyhow!("connection refused at 10.0.0.3:8080"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Internal server error");

        let err = Error::Internal {
            operation: "update organization".to_string(),
        };
        assert_eq!(err.user_message(), "Failed to update organization");
    }

    #[tokio::test]
    async fn test_into_response_emits_error_body() {
        let response = Error::Unauthenticated.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value, json!({"error": "Not authenticated"}));
    }
}
