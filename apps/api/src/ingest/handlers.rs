use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::ingest::{IngestOutcome, Upload};
use crate::models::document::{DocumentRow, DocumentSummary};
use crate::profile::handlers::UserIdQuery;
use crate::state::AppState;

/// Uploads above this size are rejected before they reach the handler.
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
pub struct IngestTextRequest {
    pub user_id: Uuid,
    pub text: String,
    #[serde(default)]
    pub file_name: Option<String>,
}

/// POST /api/v1/ingest/text
pub async fn handle_ingest_text(
    State(state): State<AppState>,
    Json(req): Json<IngestTextRequest>,
) -> Result<Json<IngestOutcome>, AppError> {
    let file_name = req.file_name.as_deref().unwrap_or("pasted-text.txt");
    let outcome = state
        .ingest
        .ingest_text(req.user_id, file_name, &req.text, None)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/ingest/file
///
/// Multipart fields: `user_id` (text) and `file`.
pub async fn handle_ingest_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<IngestOutcome>, AppError> {
    let mut user_id: Option<Uuid> = None;
    let mut upload: Option<Upload> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("user_id") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable user_id: {e}")))?;
                let parsed = Uuid::parse_str(text.trim())
                    .map_err(|_| AppError::Validation("user_id must be a UUID".to_string()))?;
                user_id = Some(parsed);
            }
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Unreadable file: {e}")))?;
                upload = Some(Upload {
                    file_name,
                    content_type,
                    bytes,
                });
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| AppError::Validation("user_id is required".to_string()))?;
    let upload = upload.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;
    let outcome = state.ingest.ingest_upload(user_id, upload).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/documents
pub async fn handle_list_documents(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<Vec<DocumentSummary>>, AppError> {
    let documents = state.documents.list_documents(params.user_id).await?;
    Ok(Json(documents))
}

/// GET /api/v1/documents/:id
pub async fn handle_get_document(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<DocumentRow>, AppError> {
    let document = state
        .documents
        .get_document(params.user_id, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {document_id} not found")))?;
    Ok(Json(document))
}
