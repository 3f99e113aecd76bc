//! In-process store for tests. `apply` works on a copy of the user's rows and
//! swaps it in only when every operation succeeded.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use crate::models::application::{ApplicationRow, ApplicationStatus};
use crate::models::document::{DocumentRow, DocumentSummary};
use crate::models::profile::ProfileRow;
use crate::store::{
    ApplicationStore, ChangeSet, Collection, DocumentStore, ProfileStore, Row, RowOp, StoreError,
    StoredProfile,
};

#[derive(Default)]
pub struct MemoryStore {
    profiles: Mutex<HashMap<Uuid, StoredProfile>>,
    documents: Mutex<Vec<DocumentRow>>,
    applications: Mutex<Vec<ApplicationRow>>,
    fail_writes: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces a user's rows verbatim, bypassing reconciliation.
    pub fn seed(&self, stored: StoredProfile) {
        lock(&self.profiles).insert(stored.profile.user_id, stored);
    }

    pub fn snapshot(&self, user_id: Uuid) -> Option<StoredProfile> {
        lock(&self.profiles).get(&user_id).cloned()
    }

    /// While set, every `apply` fails after doing its work on the copy.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn load(&self, user_id: Uuid) -> Result<Option<StoredProfile>, StoreError> {
        Ok(self.snapshot(user_id))
    }

    async fn apply(&self, user_id: Uuid, changes: &ChangeSet) -> Result<(), StoreError> {
        let mut profiles = lock(&self.profiles);
        let profile = ProfileRow {
            user_id,
            identity: serde_json::to_value(&changes.profile.identity).unwrap_or(Value::Null),
            summary: changes.profile.summary.clone(),
            additional: serde_json::to_value(&changes.profile.additional).unwrap_or(Value::Null),
            updated_at: changes.profile.updated_at,
        };
        let mut next = match profiles.get(&user_id) {
            Some(current) => StoredProfile {
                profile,
                ..current.clone()
            },
            None => StoredProfile {
                profile,
                experience: vec![],
                bullets: vec![],
                education: vec![],
                achievements: vec![],
                skills: vec![],
                languages: vec![],
            },
        };

        for op in &changes.ops {
            apply_op(&mut next, op)?;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Conflict("injected write failure".to_string()));
        }

        profiles.insert(user_id, next);
        Ok(())
    }
}

fn apply_op(state: &mut StoredProfile, op: &RowOp) -> Result<(), StoreError> {
    match op {
        RowOp::Insert(row) => {
            if let Row::Bullet(b) = row {
                if !state.experience.iter().any(|e| e.id == b.experience_id) {
                    return Err(StoreError::Conflict(format!(
                        "bullet {} has no parent experience {}",
                        b.id, b.experience_id
                    )));
                }
            }
            match row.clone() {
                Row::Experience(r) => state.experience.push(r),
                Row::Bullet(r) => state.bullets.push(r),
                Row::Education(r) => state.education.push(r),
                Row::Achievement(r) => state.achievements.push(r),
                Row::Skill(r) => state.skills.push(r),
                Row::Language(r) => state.languages.push(r),
            }
            Ok(())
        }
        RowOp::Update(row) => {
            let replaced = match row.clone() {
                Row::Experience(r) => replace(&mut state.experience, r, |a, b| a.id == b.id),
                Row::Bullet(r) => replace(&mut state.bullets, r, |a, b| {
                    a.id == b.id && a.experience_id == b.experience_id
                }),
                Row::Education(r) => replace(&mut state.education, r, |a, b| a.id == b.id),
                Row::Achievement(r) => replace(&mut state.achievements, r, |a, b| a.id == b.id),
                Row::Skill(r) => replace(&mut state.skills, r, |a, b| a.id == b.id),
                Row::Language(r) => replace(&mut state.languages, r, |a, b| a.id == b.id),
            };
            if replaced {
                Ok(())
            } else {
                Err(StoreError::Conflict(format!(
                    "update of {} row {} matched nothing",
                    row.collection().table(),
                    row.id()
                )))
            }
        }
        RowOp::Delete { collection, id } => {
            match collection {
                Collection::Experience => state.experience.retain(|r| r.id != *id),
                Collection::Bullet => state.bullets.retain(|r| r.id != *id),
                Collection::Education => state.education.retain(|r| r.id != *id),
                Collection::Achievement => state.achievements.retain(|r| r.id != *id),
                Collection::Skill => state.skills.retain(|r| r.id != *id),
                Collection::Language => state.languages.retain(|r| r.id != *id),
            }
            Ok(())
        }
    }
}

fn replace<T>(rows: &mut [T], new: T, same: impl Fn(&T, &T) -> bool) -> bool {
    match rows.iter_mut().find(|r| same(r, &new)) {
        Some(slot) => {
            *slot = new;
            true
        }
        None => false,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn save_document(&self, document: &DocumentRow) -> Result<(), StoreError> {
        lock(&self.documents).push(document.clone());
        Ok(())
    }

    async fn list_documents(&self, user_id: Uuid) -> Result<Vec<DocumentSummary>, StoreError> {
        let documents = lock(&self.documents);
        let mut listed: Vec<_> = documents
            .iter()
            .filter(|d| d.user_id == user_id)
            .map(|d| DocumentSummary {
                id: d.id,
                file_name: d.file_name.clone(),
                created_at: d.created_at,
            })
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(listed)
    }

    async fn get_document(
        &self,
        user_id: Uuid,
        document_id: Uuid,
    ) -> Result<Option<DocumentRow>, StoreError> {
        Ok(lock(&self.documents)
            .iter()
            .find(|d| d.user_id == user_id && d.id == document_id)
            .cloned())
    }

    async fn latest_document(&self, user_id: Uuid) -> Result<Option<DocumentRow>, StoreError> {
        Ok(lock(&self.documents)
            .iter()
            .filter(|d| d.user_id == user_id)
            .max_by_key(|d| d.created_at)
            .cloned())
    }
}

#[async_trait]
impl ApplicationStore for MemoryStore {
    async fn create_application(&self, application: &ApplicationRow) -> Result<(), StoreError> {
        let mut applications = lock(&self.applications);
        if applications.iter().any(|a| a.id == application.id) {
            return Err(StoreError::Conflict(format!(
                "application {} already exists",
                application.id
            )));
        }
        applications.push(application.clone());
        Ok(())
    }

    async fn list_applications(
        &self,
        user_id: Uuid,
        status: Option<ApplicationStatus>,
    ) -> Result<Vec<ApplicationRow>, StoreError> {
        let mut listed: Vec<_> = lock(&self.applications)
            .iter()
            .filter(|a| a.user_id == user_id && status.map_or(true, |s| a.status == s))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.applied_at.cmp(&a.applied_at));
        Ok(listed)
    }

    async fn update_application_status(
        &self,
        user_id: Uuid,
        application_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<Option<ApplicationRow>, StoreError> {
        Ok(lock(&self.applications)
            .iter_mut()
            .find(|a| a.user_id == user_id && a.id == application_id)
            .map(|a| {
                a.status = status;
                a.clone()
            }))
    }
}
