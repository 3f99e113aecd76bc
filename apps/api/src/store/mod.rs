//! Persistence seam for profiles, document versions and applications.
//!
//! The gateway plans every write as a [`ChangeSet`] and hands it to a
//! [`ProfileStore`], which must apply it atomically. `AppState` carries the
//! stores as `Arc<dyn ...>` so tests can swap in [`memory::MemoryStore`].

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::models::document::{DocumentRow, DocumentSummary};
use crate::models::profile::{
    AchievementRow, BulletRow, EducationRow, ExperienceRow, LanguageRow, ProfileRow, SkillRow,
};
use crate::profile::types::{AdditionalSection, Identity};

#[cfg(test)]
pub mod memory;
pub mod postgres;
pub mod schema;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),
}

// ────────────────────────────────────────────────────────────────────────────
// Change sets
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Experience,
    Bullet,
    Education,
    Achievement,
    Skill,
    Language,
}

impl Collection {
    pub fn table(self) -> &'static str {
        match self {
            Collection::Experience => "experience",
            Collection::Bullet => "bullets",
            Collection::Education => "education",
            Collection::Achievement => "achievements",
            Collection::Skill => "skills",
            Collection::Language => "languages",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Row {
    Experience(ExperienceRow),
    Bullet(BulletRow),
    Education(EducationRow),
    Achievement(AchievementRow),
    Skill(SkillRow),
    Language(LanguageRow),
}

impl Row {
    pub fn collection(&self) -> Collection {
        match self {
            Row::Experience(_) => Collection::Experience,
            Row::Bullet(_) => Collection::Bullet,
            Row::Education(_) => Collection::Education,
            Row::Achievement(_) => Collection::Achievement,
            Row::Skill(_) => Collection::Skill,
            Row::Language(_) => Collection::Language,
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Row::Experience(r) => r.id,
            Row::Bullet(r) => r.id,
            Row::Education(r) => r.id,
            Row::Achievement(r) => r.id,
            Row::Skill(r) => r.id,
            Row::Language(r) => r.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowOp {
    Insert(Row),
    Update(Row),
    Delete { collection: Collection, id: Uuid },
}

/// New state of the root profile row. Always written first.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileUpsert {
    pub identity: Identity,
    pub summary: String,
    pub additional: Vec<AdditionalSection>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    pub profile: ProfileUpsert,
    pub ops: Vec<RowOp>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub inserts: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl ChangeSet {
    pub fn counts(&self) -> ChangeCounts {
        self.ops
            .iter()
            .fold(ChangeCounts::default(), |mut counts, op| {
                match op {
                    RowOp::Insert(_) => counts.inserts += 1,
                    RowOp::Update(_) => counts.updates += 1,
                    RowOp::Delete { .. } => counts.deletes += 1,
                }
                counts
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Store traits
// ────────────────────────────────────────────────────────────────────────────

/// Everything persisted for one user, read as one consistent snapshot.
#[derive(Debug, Clone)]
pub struct StoredProfile {
    pub profile: ProfileRow,
    pub experience: Vec<ExperienceRow>,
    /// Bullets of every experience row above.
    pub bullets: Vec<BulletRow>,
    pub education: Vec<EducationRow>,
    pub achievements: Vec<AchievementRow>,
    pub skills: Vec<SkillRow>,
    pub languages: Vec<LanguageRow>,
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// `Ok(None)` when the user has no profile row yet.
    async fn load(&self, user_id: Uuid) -> Result<Option<StoredProfile>, StoreError>;

    /// Upserts the profile row, then runs `changes.ops` in order. All or nothing.
    async fn apply(&self, user_id: Uuid, changes: &ChangeSet) -> Result<(), StoreError>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn save_document(&self, document: &DocumentRow) -> Result<(), StoreError>;

    /// Newest first.
    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentSummary>, StoreError>;

    async fn get_document(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<DocumentRow>, StoreError>;

    async fn latest_document(&self, user_id: Uuid) -> Result<Option<DocumentRow>, StoreError>;
}

#[async_trait]
pub trait ApplicationStore: Send + Sync {
    async fn create_application(&self, application: &ApplicationRow) -> Result<(), StoreError>;

    /// Newest first, optionally narrowed to one status.
    async fn list_applications(
        &self,
        user_id: Uuid,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationRow>, StoreError>;

    /// `Ok(None)` when the application does not exist or belongs to someone else.
    async fn update_application_status(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<ApplicationRow>, StoreError>;
}
