use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::GridError;

/// API error types that can be returned from handlers
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Device operation failed: {0}")]
    DeviceOperation(String),

    #[error("Internal server error: {0}")]
    InternalError(String),
}

/// Error response that gets serialized to JSON
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::DeviceOperation(_) => StatusCode::BAD_GATEWAY,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_type(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NotFound",
            ApiError::ValidationError(_) => "ValidationError",
            ApiError::Conflict(_) => "InvalidState",
            ApiError::DeviceOperation(_) => "DeviceOperationError",
            ApiError::InternalError(_) => "InternalServerError",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match &self {
            ApiError::InternalError(_) => {
                tracing::error!(error = %self, "API error occurred");
                "An internal error occurred".to_string()
            }
            ApiError::DeviceOperation(_) => {
                tracing::warn!(error = %self, "device operation failed");
                self.to_string()
            }
            _ => {
                tracing::debug!(error = %self, "Client error");
                self.to_string()
            }
        };

        let body = ErrorResponse {
            error: self.error_type().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<GridError> for ApiError {
    fn from(error: GridError) -> Self {
        match error {
            GridError::Validation(msg) => ApiError::ValidationError(msg),
            e @ GridError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            GridError::InvalidState(msg) => ApiError::Conflict(msg),
            GridError::DeviceOperation(msg) => ApiError::DeviceOperation(msg),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        ApiError::InternalError(error.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CaseId;

    #[test]
    fn test_grid_errors_map_to_status_codes() {
        let cases = [
            (GridError::validation("bad"), StatusCode::BAD_REQUEST),
            (GridError::not_found("Case", CaseId::new("c1")), StatusCode::NOT_FOUND),
            (GridError::invalid_state("not planned"), StatusCode::CONFLICT),
            (GridError::DeviceOperation("timeout".into()), StatusCode::BAD_GATEWAY),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError::from(err).status_code(), status);
        }
    }

    #[test]
    fn test_not_found_keeps_entity_and_id() {
        let err = ApiError::from(GridError::not_found("Device", "D-9"));
        assert_eq!(err.to_string(), "Resource not found: Device not found: D-9");
        assert_eq!(err.error_type(), "NotFound");
    }

    #[test]
    fn test_internal_errors_are_masked() {
        let response = ApiError::InternalError("lock poisoned".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
