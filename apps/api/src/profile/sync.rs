//! Replace-semantics reconciliation.
//!
//! `plan_sync` diffs a payload against the stored snapshot and produces the
//! [`ChangeSet`] that makes the store hold exactly what the payload describes:
//! matched ids update in place, unknown or missing ids insert, and stored ids
//! the payload does not confirm are deleted.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ids::IdGenerator;
use crate::models::profile::{
    AchievementRow, BulletRow, EducationRow, ExperienceRow, LanguageRow, SkillRow,
};
use crate::profile::types::{position, AdditionalSection, AssembledProfilePayload};
use crate::store::{ChangeSet, Collection, ProfileUpsert, Row, RowOp, StoredProfile};

/// Ids stored for one collection and which of them the payload has confirmed.
/// The first payload entry to name a stored id claims it.
struct Claims {
    known: HashSet<Uuid>,
    claimed: HashSet<Uuid>,
}

impl Claims {
    fn new(known: impl IntoIterator<Item = Uuid>) -> Self {
        Self {
            known: known.into_iter().collect(),
            claimed: HashSet::new(),
        }
    }

    /// `Some(id)` when `id` is stored and still unclaimed.
    fn claim(&mut self, id: Option<Uuid>) -> Option<Uuid> {
        let id = id?;
        (self.known.contains(&id) && self.claimed.insert(id)).then_some(id)
    }

    fn is_claimed(&self, id: &Uuid) -> bool {
        self.claimed.contains(id)
    }
}

/// Upsert when `existing` is set, insert with a fresh id otherwise.
fn upsert(existing: Option<Uuid>, ids: &dyn IdGenerator, build: impl FnOnce(Uuid) -> Row) -> RowOp {
    match existing {
        Some(id) => RowOp::Update(build(id)),
        None => RowOp::Insert(build(ids.next_id())),
    }
}

/// Diff of one flat child collection.
#[allow(clippy::too_many_arguments)]
fn diff_collection<P, R>(
    ops: &mut Vec<RowOp>,
    collection: Collection,
    stored: &[R],
    stored_id: impl Fn(&R) -> Uuid,
    items: &[P],
    item_id: impl Fn(&P) -> Option<Uuid>,
    build: impl Fn(Uuid, i32, &P) -> Row,
    ids: &dyn IdGenerator,
) {
    let mut claims = Claims::new(stored.iter().map(&stored_id));
    for (i, item) in items.iter().enumerate() {
        let existing = claims.claim(item_id(item));
        ops.push(upsert(existing, ids, |id| build(id, position(i), item)));
    }
    ops.extend(
        stored
            .iter()
            .map(&stored_id)
            .filter(|id| !claims.is_claimed(id))
            .map(|id| RowOp::Delete { collection, id }),
    );
}

pub fn plan_sync(
    user_id: Uuid,
    current: Option<&StoredProfile>,
    payload: &AssembledProfilePayload,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
) -> ChangeSet {
    let additional = payload
        .additional
        .iter()
        .map(|s| AdditionalSection {
            id: s.id.clone().unwrap_or_else(|| ids.next_id().to_string()),
            title: s.title.clone(),
            content: s.content.clone(),
        })
        .collect();
    let profile = ProfileUpsert {
        identity: payload.identity.clone(),
        summary: payload.summary.clone(),
        additional,
        updated_at: now,
    };

    let empty = StoredProfileView::default();
    let stored = current.map(StoredProfileView::from).unwrap_or(empty);
    let mut ops = Vec::new();

    plan_experience(&mut ops, user_id, &stored, payload, ids);

    diff_collection(
        &mut ops,
        Collection::Education,
        stored.education,
        |r| r.id,
        &payload.education,
        |p| p.id,
        |id, sort_order, p| {
            Row::Education(EducationRow {
                id,
                user_id,
                institution: p.institution.clone(),
                degree: p.degree.clone(),
                field_of_study: p.field_of_study.clone(),
                dates: p.dates.clone(),
                sort_order,
            })
        },
        ids,
    );
    diff_collection(
        &mut ops,
        Collection::Achievement,
        stored.achievements,
        |r| r.id,
        &payload.achievements,
        |p| p.id,
        |id, sort_order, p| {
            Row::Achievement(AchievementRow {
                id,
                user_id,
                title: p.title.clone(),
                issuer: p.issuer.clone(),
                date: p.date.clone(),
                sort_order,
            })
        },
        ids,
    );
    diff_collection(
        &mut ops,
        Collection::Skill,
        stored.skills,
        |r| r.id,
        &payload.skills,
        |p| p.id,
        |id, sort_order, p| {
            Row::Skill(SkillRow {
                id,
                user_id,
                name: p.name.clone(),
                sort_order,
            })
        },
        ids,
    );
    diff_collection(
        &mut ops,
        Collection::Language,
        stored.languages,
        |r| r.id,
        &payload.languages,
        |p| p.id,
        |id, sort_order, p| {
            Row::Language(LanguageRow {
                id,
                user_id,
                language: p.language.clone(),
                level: p.level.clone(),
                sort_order,
            })
        },
        ids,
    );

    ChangeSet { profile, ops }
}

/// Two-level diff: experience rows, then the bullets of each confirmed row.
/// A dropped experience loses its bullets first.
fn plan_experience(
    ops: &mut Vec<RowOp>,
    user_id: Uuid,
    stored: &StoredProfileView<'_>,
    payload: &AssembledProfilePayload,
    ids: &dyn IdGenerator,
) {
    let mut bullets_by_parent: HashMap<Uuid, Vec<&BulletRow>> = HashMap::new();
    for bullet in stored.bullets {
        bullets_by_parent
            .entry(bullet.experience_id)
            .or_default()
            .push(bullet);
    }

    let mut experience_claims = Claims::new(stored.experience.iter().map(|e| e.id));
    for (i, exp) in payload.experience.iter().enumerate() {
        let existing = experience_claims.claim(exp.id);
        let op = upsert(existing, ids, |id| {
            Row::Experience(ExperienceRow {
                id,
                user_id,
                company: exp.company.clone(),
                title: exp.title.clone(),
                dates: exp.dates.clone(),
                sort_order: position(i),
            })
        });
        let experience_id = match &op {
            RowOp::Insert(row) | RowOp::Update(row) => row.id(),
            RowOp::Delete { id, .. } => *id,
        };
        ops.push(op);

        // A new row has no stored bullets, so every bullet inserts.
        let siblings = existing
            .and_then(|id| bullets_by_parent.get(&id))
            .map(Vec::as_slice)
            .unwrap_or_default();
        let mut bullet_claims = Claims::new(siblings.iter().map(|b| b.id));
        for (j, bullet) in exp.bullets.iter().enumerate() {
            let existing = bullet_claims.claim(bullet.id);
            ops.push(upsert(existing, ids, |id| {
                Row::Bullet(BulletRow {
                    id,
                    experience_id,
                    text: bullet.text.clone(),
                    sort_order: position(j),
                })
            }));
        }
        ops.extend(
            siblings
                .iter()
                .filter(|b| !bullet_claims.is_claimed(&b.id))
                .map(|b| RowOp::Delete {
                    collection: Collection::Bullet,
                    id: b.id,
                }),
        );
    }

    for dropped in stored
        .experience
        .iter()
        .filter(|e| !experience_claims.is_claimed(&e.id))
    {
        if let Some(orphans) = bullets_by_parent.get(&dropped.id) {
            ops.extend(orphans.iter().map(|b| RowOp::Delete {
                collection: Collection::Bullet,
                id: b.id,
            }));
        }
        ops.push(RowOp::Delete {
            collection: Collection::Experience,
            id: dropped.id,
        });
    }
}

/// Borrowed child collections of a snapshot; empty when the user has no row.
#[derive(Default)]
struct StoredProfileView<'a> {
    experience: &'a [ExperienceRow],
    bullets: &'a [BulletRow],
    education: &'a [EducationRow],
    achievements: &'a [AchievementRow],
    skills: &'a [SkillRow],
    languages: &'a [LanguageRow],
}

impl<'a> From<&'a StoredProfile> for StoredProfileView<'a> {
    fn from(stored: &'a StoredProfile) -> Self {
        Self {
            experience: &stored.experience,
            bullets: &stored.bullets,
            education: &stored.education,
            achievements: &stored.achievements,
            skills: &stored.skills,
            languages: &stored.languages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::models::profile::ProfileRow;
    use crate::profile::types::{BulletPayload, ExperiencePayload, SkillPayload};
    use serde_json::json;

    const USER: Uuid = Uuid::from_u128(0xABCD);

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn stored() -> StoredProfile {
        StoredProfile {
            profile: ProfileRow {
                user_id: USER,
                identity: json!({"name": "Old"}),
                summary: String::new(),
                additional: json!([]),
                updated_at: Utc::now(),
            },
            experience: vec![
                ExperienceRow {
                    id: id(10),
                    user_id: USER,
                    company: "Acme".into(),
                    title: "Eng".into(),
                    dates: "2020".into(),
                    sort_order: 0,
                },
                ExperienceRow {
                    id: id(20),
                    user_id: USER,
                    company: "Initech".into(),
                    title: "Intern".into(),
                    dates: "2018".into(),
                    sort_order: 1,
                },
            ],
            bullets: vec![
                BulletRow { id: id(11), experience_id: id(10), text: "a".into(), sort_order: 0 },
                BulletRow { id: id(12), experience_id: id(10), text: "b".into(), sort_order: 1 },
                BulletRow { id: id(21), experience_id: id(20), text: "c".into(), sort_order: 0 },
            ],
            education: vec![],
            achievements: vec![],
            skills: vec![
                SkillRow { id: id(31), user_id: USER, name: "Rust".into(), sort_order: 0 },
                SkillRow { id: id(32), user_id: USER, name: "Go".into(), sort_order: 1 },
                SkillRow { id: id(33), user_id: USER, name: "SQL".into(), sort_order: 2 },
            ],
            languages: vec![],
        }
    }

    fn skill(id: Option<Uuid>, name: &str) -> SkillPayload {
        SkillPayload { id, name: name.into(), sort_order: None }
    }

    fn deletes(changes: &ChangeSet, collection: Collection) -> Vec<Uuid> {
        changes
            .ops
            .iter()
            .filter_map(|op| match op {
                RowOp::Delete { collection: c, id } if *c == collection => Some(*id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_empty_store_inserts_everything() {
        let payload = AssembledProfilePayload {
            experience: vec![ExperiencePayload {
                title: "Eng".into(),
                bullets: vec![BulletPayload::from("Shipped".to_string())],
                ..ExperiencePayload::default()
            }],
            skills: vec![skill(None, "Rust")],
            ..AssembledProfilePayload::default()
        };
        let changes = plan_sync(USER, None, &payload, &SequentialIds::default(), Utc::now());
        let counts = changes.counts();
        assert_eq!((counts.inserts, counts.updates, counts.deletes), (3, 0, 0));

        // Parent insert precedes its bullets.
        let RowOp::Insert(Row::Experience(exp)) = &changes.ops[0] else {
            panic!("expected experience insert first");
        };
        let RowOp::Insert(Row::Bullet(bullet)) = &changes.ops[1] else {
            panic!("expected bullet insert second");
        };
        assert_eq!(bullet.experience_id, exp.id);
    }

    #[test]
    fn test_omitted_skill_is_deleted() {
        let payload = AssembledProfilePayload {
            skills: vec![skill(Some(id(33)), "SQL"), skill(Some(id(31)), "Rust")],
            experience: vec![],
            ..AssembledProfilePayload::default()
        };
        let changes = plan_sync(USER, Some(&stored()), &payload, &SequentialIds::default(), Utc::now());
        assert_eq!(deletes(&changes, Collection::Skill), vec![id(32)]);

        let updated: Vec<_> = changes
            .ops
            .iter()
            .filter_map(|op| match op {
                RowOp::Update(Row::Skill(s)) => Some((s.id, s.sort_order)),
                _ => None,
            })
            .collect();
        assert_eq!(updated, vec![(id(33), 0), (id(31), 1)]);
    }

    #[test]
    fn test_dropped_experience_deletes_bullets_first() {
        let payload = AssembledProfilePayload {
            experience: vec![ExperiencePayload {
                id: Some(id(10)),
                title: "Eng".into(),
                bullets: vec![BulletPayload { id: Some(id(12)), text: "b2".into(), sort_order: None }],
                ..ExperiencePayload::default()
            }],
            ..AssembledProfilePayload::default()
        };
        let changes = plan_sync(USER, Some(&stored()), &payload, &SequentialIds::default(), Utc::now());

        assert_eq!(deletes(&changes, Collection::Bullet), vec![id(11), id(21)]);
        assert_eq!(deletes(&changes, Collection::Experience), vec![id(20)]);
        let bullet_pos = changes
            .ops
            .iter()
            .position(|op| *op == RowOp::Delete { collection: Collection::Bullet, id: id(21) });
        let parent_pos = changes
            .ops
            .iter()
            .position(|op| *op == RowOp::Delete { collection: Collection::Experience, id: id(20) });
        assert!(bullet_pos < parent_pos);
        assert!(changes.ops.contains(&RowOp::Update(Row::Bullet(BulletRow {
            id: id(12),
            experience_id: id(10),
            text: "b2".into(),
            sort_order: 0,
        }))));
    }

    #[test]
    fn test_bullet_moved_to_other_experience_is_reinserted() {
        let payload = AssembledProfilePayload {
            experience: vec![
                ExperiencePayload { id: Some(id(10)), ..ExperiencePayload::default() },
                ExperiencePayload {
                    id: Some(id(20)),
                    bullets: vec![BulletPayload { id: Some(id(11)), text: "moved".into(), sort_order: None }],
                    ..ExperiencePayload::default()
                },
            ],
            ..AssembledProfilePayload::default()
        };
        let ids = SequentialIds::starting_at(100);
        let changes = plan_sync(USER, Some(&stored()), &payload, &ids, Utc::now());

        assert!(changes.ops.contains(&RowOp::Insert(Row::Bullet(BulletRow {
            id: id(101),
            experience_id: id(20),
            text: "moved".into(),
            sort_order: 0,
        }))));
        assert!(deletes(&changes, Collection::Bullet).contains(&id(11)));
    }

    #[test]
    fn test_duplicate_payload_id_claimed_once() {
        let payload = AssembledProfilePayload {
            skills: vec![skill(Some(id(31)), "Rust"), skill(Some(id(31)), "Rust again")],
            ..AssembledProfilePayload::default()
        };
        let ids = SequentialIds::starting_at(100);
        let changes = plan_sync(USER, Some(&stored()), &payload, &ids, Utc::now());
        assert!(changes.ops.contains(&RowOp::Update(Row::Skill(SkillRow {
            id: id(31),
            user_id: USER,
            name: "Rust".into(),
            sort_order: 0,
        }))));
        assert!(changes.ops.contains(&RowOp::Insert(Row::Skill(SkillRow {
            id: id(101),
            user_id: USER,
            name: "Rust again".into(),
            sort_order: 1,
        }))));
    }

    #[test]
    fn test_additional_sections_get_ids() {
        let payload: AssembledProfilePayload = serde_json::from_value(json!({
            "additional": [{"id": "section-0", "title": "Kept"}, {"title": "New", "content": ["x"]}]
        }))
        .unwrap();
        let changes = plan_sync(USER, None, &payload, &SequentialIds::default(), Utc::now());
        assert_eq!(changes.profile.additional[0].id, "section-0");
        assert_eq!(changes.profile.additional[1].id, id(1).to_string());
        assert!(changes.ops.is_empty());
    }
}
