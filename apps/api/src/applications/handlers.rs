use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::applications::NewApplication;
use crate::errors::AppError;
use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ApplicationsQuery {
    pub user_id: Uuid,
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Serialize)]
pub struct ApplicationsResponse {
    pub applications: Vec<ApplicationRow>,
}

/// GET /api/v1/applications
pub async fn handle_list_applications(
    State(state): State<AppState>,
    Query(params): Query<ApplicationsQuery>,
) -> Result<Json<ApplicationsResponse>, AppError> {
    let status = params
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<ApplicationStatus>)
        .transpose()?;
    let applications = state
        .applications
        .list_applications(params.user_id, status)
        .await?;
    Ok(Json(ApplicationsResponse { applications }))
}

/// POST /api/v1/applications
pub async fn handle_create_application(
    State(state): State<AppState>,
    Json(req): Json<NewApplication>,
) -> Result<Json<ApplicationRow>, AppError> {
    if let Some(document_id) = req.document_id {
        state
            .documents
            .get_document(req.user_id, document_id)
            .await?
            .ok_or_else(|| {
                AppError::Validation(format!("Resume version {document_id} not found"))
            })?;
    }

    let id = state.profiles.ids().next_id();
    let row = req
        .into_row(id, Utc::now())
        .map_err(AppError::Validation)?;
    state.applications.create_application(&row).await?;
    info!(
        "Tracked application {} for user {} ({} at {})",
        row.id, row.user_id, row.job_title, row.company
    );
    Ok(Json(row))
}

#[derive(Deserialize)]
pub struct UpdateStatusRequest {
    pub user_id: Uuid,
    pub status: String,
}

/// PUT /api/v1/applications/:id/status
pub async fn handle_update_status(
    State(state): State<AppState>,
    Path(application_id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<ApplicationRow>, AppError> {
    let status: ApplicationStatus = req.status.parse()?;
    let updated = state
        .applications
        .update_application_status(req.user_id, application_id, status)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Application {application_id} not found")))?;
    Ok(Json(updated))
}
