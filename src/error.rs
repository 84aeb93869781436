// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application error types with consistent API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::db::StoreError;

/// Application error type that converts to HTTP responses.
///
/// Trip lifecycle operations return these as values so callers can present
/// a message without unwinding.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("No active trip")]
    NoActiveTrip,

    #[error("Invalid trip transition: {0}")]
    InvalidTransition(String),

    #[error("Location unavailable: {0}")]
    LocationUnavailable(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::PersistenceFailure(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error, details) = match &self {
            AppError::Validation(msg) => {
                (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone()))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            AppError::NoActiveTrip => (StatusCode::CONFLICT, "no_active_trip", None),
            AppError::InvalidTransition(msg) => (
                StatusCode::CONFLICT,
                "invalid_transition",
                Some(msg.clone()),
            ),
            AppError::LocationUnavailable(msg) => (
                StatusCode::SERVICE_UNAVAILABLE,
                "location_unavailable",
                Some(msg.clone()),
            ),
            AppError::PersistenceFailure(msg) => {
                tracing::error!(error = %msg, "Persistence failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "persistence_failure",
                    None,
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for services and handlers
pub type Result<T> = std::result::Result<T, AppError>;
