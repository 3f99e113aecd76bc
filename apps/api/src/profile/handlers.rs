use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::prompts::TRUTHFULNESS_INSTRUCTION;
use crate::models::document::DocumentRow;
use crate::profile::prompts::{
    COACH_FOCUS_GENERAL, COACH_FOCUS_JOB, COACH_PROMPT, COACH_SYSTEM, TAILOR_PROMPT,
    TAILOR_SYSTEM,
};
use crate::profile::suggestions::{apply_all, parse_suggestions, ResumeSuggestion, SuggestionEdit};
use crate::profile::types::{AssembledProfile, AssembledProfilePayload, ProfileDocument};
use crate::profile::ProfileError;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UserIdQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileSource {
    /// Assembled from the relational store.
    Profile,
    /// Derived from the latest ingested document; nothing synced yet.
    Document,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub source: ProfileSource,
    pub profile: AssembledProfile,
    /// Document row recorded for this save, when the request saved.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<Uuid>,
}

impl ProfileResponse {
    fn stored(profile: AssembledProfile) -> Json<Self> {
        Json(Self {
            source: ProfileSource::Profile,
            profile,
            version_id: None,
        })
    }

    fn saved(profile: AssembledProfile, version_id: Uuid) -> Json<Self> {
        Json(Self {
            source: ProfileSource::Profile,
            profile,
            version_id: Some(version_id),
        })
    }
}

/// File name given to versions recorded by editor saves.
pub const SAVED_VERSION_NAME: &str = "profile-version.json";

/// Validates an incoming document and converts it to write intent.
fn document_payload(document: ProfileDocument) -> Result<AssembledProfilePayload, AppError> {
    document
        .into_payload()
        .ok_or_else(|| AppError::UnprocessableEntity("Could not parse resume data".to_string()))
}

/// Syncs `payload` and records the result as an `assembled` document version.
async fn save_version(
    state: &AppState,
    user_id: Uuid,
    payload: &AssembledProfilePayload,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = state.profiles.sync(user_id, payload).await?;
    let version = DocumentRow {
        id: state.profiles.ids().next_id(),
        user_id,
        file_name: SAVED_VERSION_NAME.to_string(),
        raw_text: String::new(),
        parsed_data: ProfileDocument::assembled_value(&profile.to_payload())?,
        storage_key: None,
        created_at: Utc::now(),
    };
    state.documents.save_document(&version).await?;
    info!("Recorded profile version {} for user {user_id}", version.id);
    Ok(ProfileResponse::saved(profile, version.id))
}

/// GET /api/v1/profile
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let user_id = params.user_id;
    match state.profiles.assemble(user_id).await {
        Ok(profile) => Ok(ProfileResponse::stored(profile)),
        Err(ProfileError::NotFound(_)) => {
            let document = state
                .documents
                .latest_document(user_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("No profile for user {user_id}")))?;
            let profile = ProfileDocument::from_value(document.parsed_data)
                .ok()
                .and_then(|doc| doc.into_assembled(state.profiles.ids()))
                .ok_or_else(|| {
                    AppError::UnprocessableEntity("Could not parse resume data".to_string())
                })?;
            Ok(Json(ProfileResponse {
                source: ProfileSource::Document,
                profile,
                version_id: None,
            }))
        }
        Err(e) => Err(e.into()),
    }
}

#[derive(Deserialize)]
pub struct SyncRequest {
    pub user_id: Uuid,
    pub profile: Value,
}

/// PUT /api/v1/profile
///
/// Editor saves must carry `schema_version`; every save is also kept as a version.
pub async fn handle_sync_profile(
    State(state): State<AppState>,
    Json(req): Json<SyncRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let payload = document_payload(ProfileDocument::from_tagged_value(req.profile)?)?;
    save_version(&state, req.user_id, &payload).await
}

/// POST /api/v1/documents/:id/restore
///
/// Syncs a stored version back into the profile and records the restore as a new version.
pub async fn handle_restore_version(
    State(state): State<AppState>,
    Path(document_id): Path<Uuid>,
    Query(params): Query<UserIdQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let document = state
        .documents
        .get_document(params.user_id, document_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Document {document_id} not found")))?;
    let payload = document_payload(ProfileDocument::from_value(document.parsed_data)?)?;
    info!("Restoring document {document_id} for user {}", params.user_id);
    save_version(&state, params.user_id, &payload).await
}

#[derive(Deserialize)]
pub struct MergeRequest {
    pub user_id: Uuid,
    pub document: Value,
}

/// POST /api/v1/profile/merge
pub async fn handle_merge_profile(
    State(state): State<AppState>,
    Json(req): Json<MergeRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let payload = document_payload(ProfileDocument::from_value(req.document)?)?;
    let profile = state.profiles.merge(req.user_id, &payload).await?;
    Ok(ProfileResponse::stored(profile))
}

#[derive(Deserialize)]
pub struct SuggestionsRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub job_description: Option<String>,
}

#[derive(Serialize)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<ResumeSuggestion>,
}

/// POST /api/v1/profile/suggestions
pub async fn handle_suggestions(
    State(state): State<AppState>,
    Json(req): Json<SuggestionsRequest>,
) -> Result<Json<SuggestionsResponse>, AppError> {
    let profile = state.profiles.assemble(req.user_id).await?;
    let resume_json = serde_json::to_string_pretty(&profile.to_payload())
        .map_err(|e| AppError::AiFormat(e.to_string()))?;

    let job = req
        .job_description
        .as_deref()
        .map(str::trim)
        .filter(|j| !j.is_empty());
    let (job_section, focus_rule) = match job {
        Some(job) => (
            format!("JOB DESCRIPTION (use for keyword and role alignment):\n{job}"),
            COACH_FOCUS_JOB,
        ),
        None => (String::new(), COACH_FOCUS_GENERAL),
    };
    let prompt = COACH_PROMPT
        .replace("{truthfulness_instruction}", TRUTHFULNESS_INSTRUCTION)
        .replace("{focus_rule}", focus_rule)
        .replace("{job_section}", &job_section)
        .replace("{resume_json}", &resume_json);

    let content = state.llm.call_text(&prompt, COACH_SYSTEM).await?;
    let suggestions = parse_suggestions(&content);
    info!(
        "Generated {} resume suggestions for user {}",
        suggestions.len(),
        req.user_id
    );
    Ok(Json(SuggestionsResponse { suggestions }))
}

#[derive(Deserialize)]
pub struct ApplySuggestionsRequest {
    pub user_id: Uuid,
    pub suggestions: Vec<SuggestionEdit>,
}

/// POST /api/v1/profile/suggestions/apply
pub async fn handle_apply_suggestions(
    State(state): State<AppState>,
    Json(req): Json<ApplySuggestionsRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let current = state.profiles.assemble(req.user_id).await?;
    let edited = apply_all(&current, &req.suggestions, state.profiles.ids());
    save_version(&state, req.user_id, &edited.to_payload()).await
}

#[derive(Deserialize)]
pub struct TailorRequest {
    pub user_id: Uuid,
    pub job_description: String,
}

#[derive(Serialize)]
pub struct TailorResponse {
    pub tailored_resume: AssembledProfile,
    pub cover_letter: String,
}

/// POST /api/v1/profile/tailor
///
/// The tailored resume is returned for review and never persisted.
pub async fn handle_tailor(
    State(state): State<AppState>,
    Json(req): Json<TailorRequest>,
) -> Result<Json<TailorResponse>, AppError> {
    let job_description = req.job_description.trim();
    if job_description.is_empty() {
        return Err(AppError::Validation(
            "job_description must not be empty".to_string(),
        ));
    }

    let profile = state.profiles.assemble(req.user_id).await?;
    let resume_json = serde_json::to_string_pretty(&profile.to_payload())
        .map_err(|e| AppError::AiFormat(e.to_string()))?;
    let prompt = TAILOR_PROMPT
        .replace("{truthfulness_instruction}", TRUTHFULNESS_INSTRUCTION)
        .replace("{job_description}", job_description)
        .replace("{resume_json}", &resume_json);

    let reply: Value = state.llm.call_json(&prompt, TAILOR_SYSTEM).await?;
    let (tailored_resume, cover_letter) = decode_tailoring(reply, state.profiles.ids())?;
    Ok(Json(TailorResponse {
        tailored_resume,
        cover_letter,
    }))
}

/// Reads `{tailoredResume, coverLetter}`. The resume is decoded as an
/// assembled payload; ids the model dropped are filled in.
fn decode_tailoring(
    mut reply: Value,
    ids: &dyn crate::ids::IdGenerator,
) -> Result<(AssembledProfile, String), AppError> {
    let resume = reply
        .get_mut("tailoredResume")
        .map(Value::take)
        .filter(Value::is_object)
        .ok_or_else(|| AppError::AiFormat("missing tailoredResume".to_string()))?;
    let cover_letter = reply
        .get("coverLetter")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| AppError::AiFormat("missing coverLetter".to_string()))?
        .to_string();
    let payload: AssembledProfilePayload =
        serde_json::from_value(resume).map_err(|e| AppError::AiFormat(e.to_string()))?;
    Ok((payload.into_assembled(ids), cover_letter))
}
