pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post, put},
    Router,
};

use crate::applications::handlers as applications;
use crate::ingest::handlers as ingest;
use crate::profile::handlers as profile;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Profile
        .route(
            "/api/v1/profile",
            get(profile::handle_get_profile).put(profile::handle_sync_profile),
        )
        .route("/api/v1/profile/merge", post(profile::handle_merge_profile))
        .route(
            "/api/v1/profile/suggestions",
            post(profile::handle_suggestions),
        )
        .route(
            "/api/v1/profile/suggestions/apply",
            post(profile::handle_apply_suggestions),
        )
        .route("/api/v1/profile/tailor", post(profile::handle_tailor))
        // Ingest and document versions
        .route("/api/v1/ingest/text", post(ingest::handle_ingest_text))
        .route(
            "/api/v1/ingest/file",
            post(ingest::handle_ingest_file)
                .layer(DefaultBodyLimit::max(ingest::MAX_UPLOAD_BYTES)),
        )
        .route("/api/v1/documents", get(ingest::handle_list_documents))
        .route("/api/v1/documents/:id", get(ingest::handle_get_document))
        .route(
            "/api/v1/documents/:id/restore",
            post(profile::handle_restore_version),
        )
        // Application tracking
        .route(
            "/api/v1/applications",
            get(applications::handle_list_applications)
                .post(applications::handle_create_application),
        )
        .route(
            "/api/v1/applications/:id/status",
            put(applications::handle_update_status),
        )
        .with_state(state)
}
