//! Unified error types for the gateway
//!
//! Handlers return [`AppResult`]; "nothing found" is never an error and is
//! expressed with empty collections or failure envelopes instead.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mediaserver_api::Error as BackendError;
use serde::Serialize;
use tracing::{debug, error};

use crate::models::ApiResponse;

/// Application-wide error type
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or invalid bearer token
    #[error("Authentication failed")]
    Unauthorized,

    /// Query string or body that does not match the endpoint's shape
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A collaborator call failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::InvalidInput(rejection.body_text())
    }
}

/// Error response body for JSON responses
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message, details) = match self {
            AppError::InvalidInput(message) => {
                debug!("Rejected request: {}", message);
                return (StatusCode::BAD_REQUEST, Json(ApiResponse::<()>::fail(message)))
                    .into_response();
            }
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "Authentication required", None),
            AppError::Backend(e @ (BackendError::Filter(_) | BackendError::UnknownServer(_))) => {
                (StatusCode::BAD_REQUEST, "Invalid request", Some(e.to_string()))
            }
            AppError::Backend(e) => {
                error!("Backend error: {}", e);
                (StatusCode::BAD_GATEWAY, "Upstream service error", None)
            }
        };

        let body = Json(ErrorResponse {
            error: error_message.to_string(),
            details,
        });

        (status, body).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use mediaserver_api::{ItemFilter, MediaServerType};

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::Unauthorized.into_response().status(),
            StatusCode::UNAUTHORIZED
        );

        let filter_error = ItemFilter::new("movies").plex_params().unwrap_err();
        assert_eq!(
            AppError::from(BackendError::from(filter_error))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(BackendError::UnknownServer(MediaServerType::Emby.to_string()))
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::from(BackendError::ServerError("500 - boom".to_string()))
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            AppError::InvalidInput("missing field `server`".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
    }
}
