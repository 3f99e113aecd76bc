use std::sync::Arc;

use crate::ingest::IngestPipeline;
use crate::llm_client::LlmClient;
use crate::profile::ProfileGateway;
use crate::store::{ApplicationStore, DocumentStore};

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub profiles: ProfileGateway,
    pub documents: Arc<dyn DocumentStore>,
    pub applications: Arc<dyn ApplicationStore>,
    pub ingest: IngestPipeline,
    pub llm: LlmClient,
}
