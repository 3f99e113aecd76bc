use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::ids::IdGenerator;
use crate::profile::merge::plan_merge;
use crate::profile::sync::plan_sync;
use crate::profile::types::{
    Achievement, AdditionalSection, AdditionalSectionPayload, AssembledProfile,
    AssembledProfilePayload, Bullet, Education, Experience, Identity, Language, Skill,
};
use crate::profile::ProfileError;
use crate::store::{ProfileStore, StoredProfile};

/// Reads and reconciles a user's profile against the relational store.
///
/// Every write is planned against a snapshot and applied as one atomic change
/// set, then the authoritative state is read back.
#[derive(Clone)]
pub struct ProfileGateway {
    store: Arc<dyn ProfileStore>,
    ids: Arc<dyn IdGenerator>,
}

impl ProfileGateway {
    pub fn new(store: Arc<dyn ProfileStore>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { store, ids }
    }

    pub fn ids(&self) -> &dyn IdGenerator {
        self.ids.as_ref()
    }

    pub async fn assemble(&self, user_id: Uuid) -> Result<AssembledProfile, ProfileError> {
        let stored = self
            .store
            .load(user_id)
            .await?
            .ok_or(ProfileError::NotFound(user_id))?;
        Ok(assemble_stored(&stored))
    }

    /// Replace: afterwards the store holds exactly what `payload` describes.
    pub async fn sync(
        &self,
        user_id: Uuid,
        payload: &AssembledProfilePayload,
    ) -> Result<AssembledProfile, ProfileError> {
        let current = self.store.load(user_id).await?;
        let changes = plan_sync(user_id, current.as_ref(), payload, self.ids(), Utc::now());
        let counts = changes.counts();
        self.store.apply(user_id, &changes).await?;

        info!(
            "Synced profile for user {user_id}: {} inserts, {} updates, {} deletes",
            counts.inserts, counts.updates, counts.deletes
        );
        self.assemble(user_id).await
    }

    /// Additive: appends what is new, never deletes.
    pub async fn merge(
        &self,
        user_id: Uuid,
        payload: &AssembledProfilePayload,
    ) -> Result<AssembledProfile, ProfileError> {
        let current = self.store.load(user_id).await?.map(|s| assemble_stored(&s));
        let changes = plan_merge(user_id, current.as_ref(), payload, self.ids(), Utc::now());
        let counts = changes.counts();
        self.store.apply(user_id, &changes).await?;

        info!(
            "Merged document into profile for user {user_id}: {} rows appended",
            counts.inserts
        );
        self.assemble(user_id).await
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Assembly
// ────────────────────────────────────────────────────────────────────────────

/// Builds the read view from a snapshot. Collections are ordered by
/// `sort_order`, ties broken by id so repeated reads are identical.
pub fn assemble_stored(stored: &StoredProfile) -> AssembledProfile {
    let mut bullets_by_parent: HashMap<Uuid, Vec<Bullet>> = HashMap::new();
    for row in &stored.bullets {
        bullets_by_parent
            .entry(row.experience_id)
            .or_default()
            .push(Bullet {
                id: row.id,
                text: row.text.clone(),
                sort_order: row.sort_order,
            });
    }

    let mut experience: Vec<Experience> = stored
        .experience
        .iter()
        .map(|row| {
            let mut bullets = bullets_by_parent.remove(&row.id).unwrap_or_default();
            bullets.sort_by_key(|b| (b.sort_order, b.id));
            Experience {
                id: row.id,
                title: row.title.clone(),
                company: row.company.clone(),
                dates: row.dates.clone(),
                sort_order: row.sort_order,
                bullets,
            }
        })
        .collect();
    experience.sort_by_key(|e| (e.sort_order, e.id));
    if !bullets_by_parent.is_empty() {
        debug!(
            "Ignoring bullets of {} unknown experience rows",
            bullets_by_parent.len()
        );
    }

    let mut education: Vec<Education> = stored
        .education
        .iter()
        .map(|row| Education {
            id: row.id,
            institution: row.institution.clone(),
            degree: row.degree.clone(),
            field_of_study: row.field_of_study.clone(),
            dates: row.dates.clone(),
            sort_order: row.sort_order,
        })
        .collect();
    education.sort_by_key(|e| (e.sort_order, e.id));

    let mut achievements: Vec<Achievement> = stored
        .achievements
        .iter()
        .map(|row| Achievement {
            id: row.id,
            title: row.title.clone(),
            issuer: row.issuer.clone(),
            date: row.date.clone(),
            sort_order: row.sort_order,
        })
        .collect();
    achievements.sort_by_key(|a| (a.sort_order, a.id));

    let mut skills: Vec<Skill> = stored
        .skills
        .iter()
        .map(|row| Skill {
            id: row.id,
            name: row.name.clone(),
            sort_order: row.sort_order,
        })
        .collect();
    skills.sort_by_key(|s| (s.sort_order, s.id));

    let mut languages: Vec<Language> = stored
        .languages
        .iter()
        .map(|row| Language {
            id: row.id,
            language: row.language.clone(),
            level: row.level.clone(),
            sort_order: row.sort_order,
        })
        .collect();
    languages.sort_by_key(|l| (l.sort_order, l.id));

    AssembledProfile {
        identity: serde_json::from_value::<Identity>(stored.profile.identity.clone())
            .unwrap_or_default(),
        summary: stored.profile.summary.clone(),
        experience,
        education,
        achievements,
        skills,
        languages,
        additional: decode_additional(&stored.profile.additional),
    }
}

/// Reads the `additional` JSON column. Anything but an array is empty; a
/// section without an id gets the positional id `section-<i>`.
pub fn decode_additional(value: &Value) -> Vec<AdditionalSection> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let section: AdditionalSectionPayload =
                serde_json::from_value(item.clone()).unwrap_or_default();
            AdditionalSection {
                id: section.id.unwrap_or_else(|| format!("section-{i}")),
                title: section.title,
                content: section.content,
            }
        })
        .collect()
}
