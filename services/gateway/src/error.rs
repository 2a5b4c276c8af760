use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::{Value, json};
use thiserror::Error;
use types::errors::{ExchangeError, ValidationError};

use crate::dispatcher::exchange_error_body;

/// Central error type for the Gateway application
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Exchange(err.into())
    }
}

/// `{"error": code, "message": message}`
pub fn error_body(code: &str, message: &str) -> Value {
    json!({
        "error": code,
        "message": message
    })
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, error_body("UNAUTHORIZED", &msg)),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, error_body("NOT_FOUND", &msg)),
            AppError::Exchange(err) => (
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                exchange_error_body(&err),
            ),
            AppError::InternalError(err) => {
                tracing::error!(error = %err, "Unhandled gateway error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    error_body("INTERNAL_ERROR", "Internal server error"),
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let response = AppError::from(ValidationError::Malformed("pair".into())).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_contention_is_server_error() {
        let response = AppError::from(ExchangeError::Contention("order".into())).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
