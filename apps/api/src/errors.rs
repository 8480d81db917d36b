use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Application deadline has passed")]
    DeadlinePassed,

    #[error("Resume URL is required")]
    ResumeRequired,

    #[error("Ineligible: {0}")]
    Ineligible(String),

    #[error("Already applied to this job")]
    Duplicate,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Store call timed out")]
    StoreTimeout,

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Stable machine-readable code carried in every error body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthenticated(_) => "ERR_UNAUTHENTICATED",
            AppError::Forbidden(_) => "ERR_UNAUTHORIZED",
            AppError::NotFound(_) => "ERR_NOT_FOUND",
            AppError::Validation(_) => "ERR_VALIDATION",
            AppError::DeadlinePassed => "ERR_DEADLINE",
            AppError::ResumeRequired => "ERR_RESUME_REQUIRED",
            AppError::Ineligible(_) => "ERR_INELIGIBLE",
            AppError::Duplicate => "ERR_DUPLICATE",
            AppError::Conflict(_) => "ERR_CONFLICT",
            AppError::StoreTimeout => "ERR_STORE_TIMEOUT",
            AppError::Database(_) => "ERR_DATABASE",
            AppError::Internal(_) => "ERR_INTERNAL",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::DeadlinePassed
            | AppError::ResumeRequired
            | AppError::Ineligible(_) => StatusCode::BAD_REQUEST,
            AppError::Duplicate | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::StoreTimeout => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Unique-key violations reaching this conversion are not the
/// (user, job) pair; the submission path maps that one to `Duplicate` itself.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Duplicate { constraint } => {
                AppError::Conflict(format!("Record violates unique constraint {constraint}"))
            }
            StoreError::Timeout(_) => AppError::StoreTimeout,
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Unauthenticated(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Ineligible(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::DeadlinePassed | AppError::ResumeRequired | AppError::Duplicate => {
                self.to_string()
            }
            AppError::StoreTimeout => {
                tracing::error!("Store call exceeded its deadline");
                "The data store did not respond in time".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "A database error occurred".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (self.status(), body).into_response()
    }
}
