use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::optimisation::OptimisationError;
use crate::what_if::WhatIfError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {}", .0.join(" "))]
    Validation(Vec<String>),

    #[error("Configuration error: {}", .0.join(" "))]
    Configuration(Vec<String>),

    #[error("Data integrity error: {0}")]
    Integrity(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<WhatIfError> for AppError {
    fn from(error: WhatIfError) -> Self {
        match error {
            WhatIfError::Validation(errors) => AppError::Validation(errors),
            WhatIfError::Integrity(message) => AppError::Integrity(message),
        }
    }
}

impl From<OptimisationError> for AppError {
    fn from(error: OptimisationError) -> Self {
        match error {
            OptimisationError::Validation(errors) => AppError::Validation(errors),
            OptimisationError::Configuration(errors) => AppError::Configuration(errors),
            OptimisationError::Evaluation(inner) => inner.into(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, errors) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, Vec::new()),
            AppError::Validation(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "VALIDATION_ERROR",
                "Request payload failed validation".to_string(),
                errors,
            ),
            AppError::Configuration(errors) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "CONFIGURATION_ERROR",
                "Optimisation configuration is invalid".to_string(),
                errors,
            ),
            AppError::Integrity(msg) => {
                tracing::error!("Data integrity error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTEGRITY_ERROR",
                    msg,
                    Vec::new(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                    Vec::new(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
                "errors": errors
            }
        }));

        (status, body).into_response()
    }
}
