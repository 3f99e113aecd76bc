use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::ingest::IngestError;
use crate::llm_client::LlmError;
use crate::models::application::InvalidStatus;
use crate::profile::types::DocumentError;
use crate::profile::ProfileError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM returned an unexpected format: {0}")]
    AiFormat(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::UnprocessableEntity(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "UNPROCESSABLE_ENTITY",
                msg.clone(),
            ),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "STORAGE_ERROR",
                    "A storage error occurred".to_string(),
                )
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_ERROR",
                    "An AI processing error occurred".to_string(),
                )
            }
            AppError::AiFormat(msg) => {
                tracing::error!("Unexpected LLM output: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "LLM_FORMAT_ERROR",
                    "AI returned an unexpected format".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}

impl From<ProfileError> for AppError {
    fn from(err: ProfileError) -> Self {
        match err {
            ProfileError::NotFound(user_id) => {
                AppError::NotFound(format!("No profile for user {user_id}"))
            }
            ProfileError::Store(e) => AppError::Store(e),
        }
    }
}

impl From<LlmError> for AppError {
    fn from(err: LlmError) -> Self {
        AppError::Llm(err.to_string())
    }
}

impl From<DocumentError> for AppError {
    fn from(err: DocumentError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<InvalidStatus> for AppError {
    fn from(err: InvalidStatus) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<IngestError> for AppError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::UnsupportedType(_) | IngestError::EmptyDocument => {
                AppError::Validation(err.to_string())
            }
            IngestError::Extraction(msg) => {
                tracing::warn!("Document text extraction failed: {msg}");
                AppError::UnprocessableEntity("Could not read the uploaded document".to_string())
            }
            IngestError::Unparseable => {
                AppError::UnprocessableEntity("Could not parse resume data".to_string())
            }
            IngestError::Llm(e) => e.into(),
            IngestError::Profile(e) => e.into(),
            IngestError::Store(e) => AppError::Store(e),
        }
    }
}
