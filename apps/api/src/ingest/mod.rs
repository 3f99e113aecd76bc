//! Document ingest: pasted text or an uploaded file is turned into resume data,
//! kept as a document version, and merged into the user's profile.

pub mod archive;
pub mod extract;
pub mod handlers;
pub mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ingest::archive::{upload_key, UploadArchive};
use crate::ingest::extract::{extract_text, truncate_chars, DocumentKind, MAX_EXTRACTED_CHARS};
use crate::ingest::prompts::{EXTRACT_PROMPT, EXTRACT_SYSTEM};
use crate::llm_client::{LlmClient, LlmError};
use crate::models::document::DocumentRow;
use crate::profile::types::{AssembledProfile, ProfileDocument};
use crate::profile::{ProfileError, ProfileGateway};
use crate::store::{DocumentStore, StoreError};

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Unsupported document type: {0}")]
    UnsupportedType(String),

    #[error("Document contains no text")]
    EmptyDocument,

    #[error("Text extraction failed: {0}")]
    Extraction(String),

    #[error("Could not parse resume data")]
    Unparseable,

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

// ────────────────────────────────────────────────────────────────────────────
// Extraction backend
// ────────────────────────────────────────────────────────────────────────────

/// Turns resume text into untrusted JSON in the legacy flat shape.
#[async_trait]
pub trait ResumeExtractor: Send + Sync {
    async fn extract(&self, text: &str) -> Result<Value, LlmError>;
}

pub struct LlmResumeExtractor {
    llm: LlmClient,
}

impl LlmResumeExtractor {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ResumeExtractor for LlmResumeExtractor {
    async fn extract(&self, text: &str) -> Result<Value, LlmError> {
        let prompt = EXTRACT_PROMPT.replace("{raw_text}", text);
        match self.llm.call_json::<Value>(&prompt, EXTRACT_SYSTEM).await {
            Ok(value) => Ok(value),
            // An unusable reply counts as "nothing extracted", not as an outage.
            Err(e @ (LlmError::Parse(_) | LlmError::EmptyContent)) => {
                warn!("Extraction reply was not JSON: {e}");
                Ok(Value::Object(Map::new()))
            }
            Err(e) => Err(e),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pipeline
// ────────────────────────────────────────────────────────────────────────────

pub struct Upload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

#[derive(Debug, Serialize)]
pub struct IngestOutcome {
    pub document_id: Uuid,
    pub file_name: String,
    pub storage_key: Option<String>,
    pub profile: AssembledProfile,
}

#[derive(Clone)]
pub struct IngestPipeline {
    extractor: Arc<dyn ResumeExtractor>,
    archive: Arc<dyn UploadArchive>,
    documents: Arc<dyn DocumentStore>,
    profiles: ProfileGateway,
}

impl IngestPipeline {
    pub fn new(
        extractor: Arc<dyn ResumeExtractor>,
        archive: Arc<dyn UploadArchive>,
        documents: Arc<dyn DocumentStore>,
        profiles: ProfileGateway,
    ) -> Self {
        Self {
            extractor,
            archive,
            documents,
            profiles,
        }
    }

    pub async fn ingest_upload(
        &self,
        user_id: Uuid,
        upload: Upload,
    ) -> Result<IngestOutcome, IngestError> {
        let kind = DocumentKind::detect(upload.content_type.as_deref(), &upload.file_name)
            .ok_or_else(|| {
                IngestError::UnsupportedType(
                    upload
                        .content_type
                        .clone()
                        .unwrap_or_else(|| upload.file_name.clone()),
                )
            })?;
        let raw_text = extract_text(kind, upload.bytes.clone()).await?;

        let key = upload_key(user_id, self.profiles.ids().next_id(), &upload.file_name);
        let content_type = upload
            .content_type
            .as_deref()
            .unwrap_or(kind.content_type());
        let storage_key = match self.archive.put(&key, upload.bytes, content_type).await {
            Ok(()) => Some(key),
            Err(e) => {
                warn!("Archiving upload for user {user_id} failed, continuing: {e:#}");
                None
            }
        };

        self.ingest_text(user_id, &upload.file_name, &raw_text, storage_key)
            .await
    }

    /// Extracts, records the document version, then merges it into the profile.
    /// Nothing is recorded when the text yields no usable resume data.
    pub async fn ingest_text(
        &self,
        user_id: Uuid,
        file_name: &str,
        raw_text: &str,
        storage_key: Option<String>,
    ) -> Result<IngestOutcome, IngestError> {
        if raw_text.trim().is_empty() {
            return Err(IngestError::EmptyDocument);
        }
        let text = truncate_chars(raw_text, MAX_EXTRACTED_CHARS);
        let parsed = ProfileDocument::stamp_legacy(self.extractor.extract(text).await?);
        let payload = ProfileDocument::from_value(parsed.clone())
            .ok()
            .and_then(ProfileDocument::into_payload)
            .ok_or(IngestError::Unparseable)?;

        let document = DocumentRow {
            id: self.profiles.ids().next_id(),
            user_id,
            file_name: file_name.to_string(),
            raw_text: text.to_string(),
            parsed_data: parsed,
            storage_key: storage_key.clone(),
            created_at: Utc::now(),
        };
        self.documents.save_document(&document).await?;
        info!(
            "Stored document {} ({}) for user {user_id}",
            document.id, document.file_name
        );

        let profile = self.profiles.merge(user_id, &payload).await?;
        Ok(IngestOutcome {
            document_id: document.id,
            file_name: document.file_name,
            storage_key,
            profile,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::store::memory::MemoryStore;
    use serde_json::json;
    use std::sync::Mutex;

    const USER: Uuid = Uuid::from_u128(0xCAFE);

    /// Returns a canned extraction and remembers the text it was given.
    pub(crate) struct CannedExtractor {
        pub reply: Value,
        pub seen: Mutex<Vec<String>>,
    }

    impl CannedExtractor {
        pub(crate) fn new(reply: Value) -> Self {
            Self {
                reply,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ResumeExtractor for CannedExtractor {
        async fn extract(&self, text: &str) -> Result<Value, LlmError> {
            self.seen.lock().unwrap().push(text.to_string());
            Ok(self.reply.clone())
        }
    }

    /// Keeps archived keys in memory, or fails every put.
    #[derive(Default)]
    pub(crate) struct MemoryArchive {
        pub fail: bool,
        pub keys: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl UploadArchive for MemoryArchive {
        async fn put(&self, key: &str, _bytes: Bytes, _content_type: &str) -> anyhow::Result<()> {
            if self.fail {
                anyhow::bail!("bucket missing");
            }
            self.keys.lock().unwrap().push(key.to_string());
            Ok(())
        }
    }

    fn john_doe() -> Value {
        json!({
            "identity": {"name": "John Doe", "email": "john@x.com"},
            "experience": [{"title": "Engineer", "company": "Acme", "dates": "2020-2022"}]
        })
    }

    fn pipeline(
        extractor: CannedExtractor,
        archive: MemoryArchive,
    ) -> (IngestPipeline, Arc<MemoryStore>, Arc<MemoryArchive>) {
        let store = Arc::new(MemoryStore::new());
        let archive = Arc::new(archive);
        let profiles = ProfileGateway::new(store.clone(), Arc::new(SequentialIds::default()));
        let pipeline = IngestPipeline::new(Arc::new(extractor), archive.clone(), store.clone(), profiles);
        (pipeline, store, archive)
    }

    #[tokio::test]
    async fn test_pasted_text_merges_into_profile() {
        let (pipeline, store, _) = pipeline(CannedExtractor::new(john_doe()), MemoryArchive::default());
        let outcome = pipeline
            .ingest_text(USER, "pasted.txt", "John Doe, john@x.com, Engineer at Acme 2020-2022", None)
            .await
            .unwrap();

        assert_eq!(outcome.profile.identity.name, "John Doe");
        assert_eq!(outcome.profile.experience.len(), 1);
        assert!(outcome.profile.experience[0].bullets.is_empty());

        let document = store.latest_document(USER).await.unwrap().unwrap();
        assert_eq!(document.id, outcome.document_id);
        assert_eq!(document.parsed_data["schema_version"], "legacy");
    }

    #[tokio::test]
    async fn test_unparseable_extraction_records_nothing() {
        let (pipeline, store, _) = pipeline(CannedExtractor::new(json!({})), MemoryArchive::default());
        let err = pipeline
            .ingest_text(USER, "pasted.txt", "lorem ipsum", None)
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::Unparseable));
        assert!(store.list_documents(USER).await.unwrap().is_empty());
        assert!(store.snapshot(USER).is_none());
    }

    #[tokio::test]
    async fn test_blank_text_rejected_before_extraction() {
        let extractor = CannedExtractor::new(john_doe());
        let (pipeline, _, _) = pipeline(extractor, MemoryArchive::default());
        let err = pipeline.ingest_text(USER, "x", "  \n ", None).await.unwrap_err();
        assert!(matches!(err, IngestError::EmptyDocument));
    }

    #[tokio::test]
    async fn test_long_text_truncated() {
        let store = Arc::new(MemoryStore::new());
        let extractor = Arc::new(CannedExtractor::new(john_doe()));
        let profiles = ProfileGateway::new(store.clone(), Arc::new(SequentialIds::default()));
        let pipeline = IngestPipeline::new(
            extractor.clone(),
            Arc::new(MemoryArchive::default()),
            store.clone(),
            profiles,
        );
        let long = "a".repeat(MAX_EXTRACTED_CHARS + 10);
        pipeline.ingest_text(USER, "big.txt", &long, None).await.unwrap();
        assert_eq!(extractor.seen.lock().unwrap()[0].len(), MAX_EXTRACTED_CHARS);
    }

    #[tokio::test]
    async fn test_upload_is_archived() {
        let (pipeline, _, archive) = pipeline(CannedExtractor::new(john_doe()), MemoryArchive::default());
        let outcome = pipeline
            .ingest_upload(
                USER,
                Upload {
                    file_name: "cv.txt".into(),
                    content_type: Some("text/plain".into()),
                    bytes: Bytes::from_static(b"John Doe"),
                },
            )
            .await
            .unwrap();
        let keys = archive.keys.lock().unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys[0].starts_with(&format!("uploads/{USER}/")));
        assert!(keys[0].ends_with("-cv.txt"));
        assert_eq!(outcome.storage_key.as_deref(), Some(keys[0].as_str()));
    }

    #[tokio::test]
    async fn test_archive_failure_does_not_fail_ingest() {
        let archive = MemoryArchive { fail: true, ..MemoryArchive::default() };
        let (pipeline, _, _) = pipeline(CannedExtractor::new(john_doe()), archive);
        let outcome = pipeline
            .ingest_upload(
                USER,
                Upload {
                    file_name: "cv.md".into(),
                    content_type: None,
                    bytes: Bytes::from_static(b"# John Doe"),
                },
            )
            .await
            .unwrap();
        assert!(outcome.storage_key.is_none());
        assert_eq!(outcome.profile.identity.name, "John Doe");
    }

    #[tokio::test]
    async fn test_unsupported_upload_rejected() {
        let (pipeline, _, _) = pipeline(CannedExtractor::new(john_doe()), MemoryArchive::default());
        let err = pipeline
            .ingest_upload(
                USER,
                Upload {
                    file_name: "photo.png".into(),
                    content_type: Some("image/png".into()),
                    bytes: Bytes::from_static(b"\x89PNG"),
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnsupportedType(t) if t == "image/png"));
    }
}
