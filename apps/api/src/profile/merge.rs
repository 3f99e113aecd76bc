//! Additive reconciliation, used when a freshly parsed document lands on an
//! existing profile. Nothing is ever deleted or updated; new rows are appended
//! after the current maximum `sort_order` of their collection.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::ids::IdGenerator;
use crate::models::profile::{
    AchievementRow, BulletRow, EducationRow, ExperienceRow, LanguageRow, SkillRow,
};
use crate::profile::types::{position, AdditionalSection, AssembledProfile, AssembledProfilePayload};
use crate::store::{ChangeSet, ProfileUpsert, Row, RowOp};

fn dedupe_key(value: &str) -> String {
    value.trim().to_lowercase()
}

/// First `sort_order` for appended rows: one past the current maximum.
fn next_order(orders: impl Iterator<Item = i32>) -> i32 {
    orders.max().map_or(0, |max| max.saturating_add(1))
}

fn appended(start: i32, index: usize) -> i32 {
    start.saturating_add(position(index))
}

pub fn plan_merge(
    user_id: Uuid,
    current: Option<&AssembledProfile>,
    payload: &AssembledProfilePayload,
    ids: &dyn IdGenerator,
    now: DateTime<Utc>,
) -> ChangeSet {
    let empty = AssembledProfile::default();
    let current = current.unwrap_or(&empty);
    let mut ops = Vec::new();

    // Identity and summary are last-write-wins.
    let mut additional = current.additional.clone();
    let mut titles: HashSet<String> = additional.iter().map(|s| dedupe_key(&s.title)).collect();
    let mut section_ids: HashSet<String> = additional.iter().map(|s| s.id.clone()).collect();
    for section in &payload.additional {
        let key = dedupe_key(&section.title);
        if key.is_empty() || !titles.insert(key) {
            continue;
        }
        // An incoming id already owned by another section is replaced.
        let id = section
            .id
            .clone()
            .filter(|id| !section_ids.contains(id))
            .unwrap_or_else(|| ids.next_id().to_string());
        section_ids.insert(id.clone());
        additional.push(AdditionalSection {
            id,
            title: section.title.trim().to_string(),
            content: section.content.clone(),
        });
    }

    // Experience always appends; the same employer twice is legitimate.
    let start = next_order(current.experience.iter().map(|e| e.sort_order));
    for (i, exp) in payload.experience.iter().enumerate() {
        let experience_id = ids.next_id();
        ops.push(RowOp::Insert(Row::Experience(ExperienceRow {
            id: experience_id,
            user_id,
            company: exp.company.clone(),
            title: exp.title.clone(),
            dates: exp.dates.clone(),
            sort_order: appended(start, i),
        })));
        for (j, bullet) in exp.bullets.iter().enumerate() {
            ops.push(RowOp::Insert(Row::Bullet(BulletRow {
                id: ids.next_id(),
                experience_id,
                text: bullet.text.clone(),
                sort_order: position(j),
            })));
        }
    }

    let mut names: HashSet<String> = current.skills.iter().map(|s| dedupe_key(&s.name)).collect();
    let new_skills: Vec<_> = payload
        .skills
        .iter()
        .filter(|s| {
            let key = dedupe_key(&s.name);
            !key.is_empty() && names.insert(key)
        })
        .collect();
    let start = next_order(current.skills.iter().map(|s| s.sort_order));
    for (i, skill) in new_skills.into_iter().enumerate() {
        ops.push(RowOp::Insert(Row::Skill(SkillRow {
            id: ids.next_id(),
            user_id,
            name: skill.name.trim().to_string(),
            sort_order: appended(start, i),
        })));
    }

    // Education and achievements are not deduplicated.
    let start = next_order(current.education.iter().map(|e| e.sort_order));
    let new_education = payload
        .education
        .iter()
        .filter(|e| !e.institution.trim().is_empty());
    for (i, edu) in new_education.enumerate() {
        ops.push(RowOp::Insert(Row::Education(EducationRow {
            id: ids.next_id(),
            user_id,
            institution: edu.institution.trim().to_string(),
            degree: edu.degree.clone(),
            field_of_study: edu.field_of_study.clone(),
            dates: edu.dates.clone(),
            sort_order: appended(start, i),
        })));
    }

    let start = next_order(current.achievements.iter().map(|a| a.sort_order));
    let new_achievements = payload
        .achievements
        .iter()
        .filter(|a| !a.title.trim().is_empty());
    for (i, ach) in new_achievements.enumerate() {
        ops.push(RowOp::Insert(Row::Achievement(AchievementRow {
            id: ids.next_id(),
            user_id,
            title: ach.title.trim().to_string(),
            issuer: ach.issuer.clone(),
            date: ach.date.clone(),
            sort_order: appended(start, i),
        })));
    }

    let language_key = |language: &str, level: &str| {
        format!("{}:{}", dedupe_key(language), dedupe_key(level))
    };
    let mut spoken: HashSet<String> = current
        .languages
        .iter()
        .map(|l| language_key(&l.language, &l.level))
        .collect();
    let new_languages: Vec<_> = payload
        .languages
        .iter()
        .filter(|l| {
            !l.language.trim().is_empty() && spoken.insert(language_key(&l.language, &l.level))
        })
        .collect();
    let start = next_order(current.languages.iter().map(|l| l.sort_order));
    for (i, lang) in new_languages.into_iter().enumerate() {
        ops.push(RowOp::Insert(Row::Language(LanguageRow {
            id: ids.next_id(),
            user_id,
            language: lang.language.trim().to_string(),
            level: lang.level.trim().to_string(),
            sort_order: appended(start, i),
        })));
    }

    ChangeSet {
        profile: ProfileUpsert {
            identity: payload.identity.clone(),
            summary: payload.summary.clone(),
            additional,
            updated_at: now,
        },
        ops,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use crate::profile::types::Skill;
    use serde_json::json;

    const USER: Uuid = Uuid::from_u128(0xBEEF);

    fn payload(value: serde_json::Value) -> AssembledProfilePayload {
        serde_json::from_value(value).unwrap()
    }

    fn inserted_skills(changes: &ChangeSet) -> Vec<(String, i32)> {
        changes
            .ops
            .iter()
            .filter_map(|op| match op {
                RowOp::Insert(Row::Skill(s)) => Some((s.name.clone(), s.sort_order)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_skill_dedupe_is_case_insensitive() {
        let current = AssembledProfile {
            skills: vec![Skill { id: Uuid::from_u128(1), name: "Python".into(), sort_order: 0 }],
            ..AssembledProfile::default()
        };
        let incoming = payload(json!({"skills": ["python", " Go ", "", "go"]}));
        let changes = plan_merge(USER, Some(&current), &incoming, &SequentialIds::starting_at(10), Utc::now());
        assert_eq!(inserted_skills(&changes), vec![("Go".to_string(), 1)]);
    }

    #[test]
    fn test_merge_only_inserts() {
        let current = payload(json!({
            "experience": [{"title": "Eng", "bullets": ["a"]}],
            "skills": ["Rust"]
        }))
        .into_assembled(&SequentialIds::default());
        let incoming = payload(json!({
            "experience": [{"title": "Eng", "company": "Acme", "bullets": ["a", "b"]}],
            "education": [{"institution": "MIT"}, {"institution": "  "}],
            "achievements": [{"title": ""}, {"title": "Award"}]
        }));
        let changes = plan_merge(USER, Some(&current), &incoming, &SequentialIds::starting_at(50), Utc::now());
        let counts = changes.counts();
        assert_eq!((counts.inserts, counts.updates, counts.deletes), (5, 0, 0));

        let exp = changes.ops.iter().find_map(|op| match op {
            RowOp::Insert(Row::Experience(e)) => Some(e.clone()),
            _ => None,
        });
        assert_eq!(exp.map(|e| e.sort_order), Some(1));
    }

    #[test]
    fn test_languages_dedupe_on_language_and_level() {
        let current = payload(json!({"languages": [{"language": "French", "level": "Fluent"}]}))
            .into_assembled(&SequentialIds::default());
        let incoming = payload(json!({"languages": [
            {"language": "french", "level": "fluent"},
            {"language": "French", "level": "Basic"},
            {"language": " ", "level": "Native"}
        ]}));
        let changes = plan_merge(USER, Some(&current), &incoming, &SequentialIds::starting_at(10), Utc::now());
        let added: Vec<_> = changes
            .ops
            .iter()
            .filter_map(|op| match op {
                RowOp::Insert(Row::Language(l)) => Some((l.level.clone(), l.sort_order)),
                _ => None,
            })
            .collect();
        assert_eq!(added, vec![("Basic".to_string(), 1)]);
    }

    #[test]
    fn test_additional_appended_by_title() {
        let current = payload(json!({"additional": [{"id": "section-0", "title": "Volunteering", "content": ["a"]}]}))
            .into_assembled(&SequentialIds::default());
        let incoming = payload(json!({
            "identity": {"name": "New Name"},
            "additional": [
                {"title": "volunteering ", "content": ["b"]},
                {"title": "Publications", "content": ["c"]}
            ]
        }));
        let changes = plan_merge(USER, Some(&current), &incoming, &SequentialIds::starting_at(10), Utc::now());
        let titles: Vec<_> = changes.profile.additional.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["Volunteering", "Publications"]);
        assert_eq!(changes.profile.additional[0].content, vec!["a".to_string()]);
        assert_eq!(changes.profile.identity.name, "New Name");
    }

    #[test]
    fn test_additional_id_owned_by_stored_section_is_replaced() {
        let current = payload(json!({"additional": [{"id": "s1", "title": "Volunteering"}]}))
            .into_assembled(&SequentialIds::default());
        let incoming = payload(json!({"additional": [
            {"id": "s1", "title": "Publications"},
            {"id": "s2", "title": "Talks"},
            {"id": "s2", "title": "Patents"}
        ]}));
        let changes = plan_merge(USER, Some(&current), &incoming, &SequentialIds::starting_at(10), Utc::now());
        let sections: Vec<_> = changes
            .profile
            .additional
            .iter()
            .map(|s| (s.id.as_str(), s.title.as_str()))
            .collect();
        let fresh_a = Uuid::from_u128(11).to_string();
        let fresh_b = Uuid::from_u128(12).to_string();
        assert_eq!(
            sections,
            vec![
                ("s1", "Volunteering"),
                (fresh_a.as_str(), "Publications"),
                ("s2", "Talks"),
                (fresh_b.as_str(), "Patents"),
            ]
        );
    }

    #[test]
    fn test_first_merge_starts_at_zero() {
        let incoming = payload(json!({
            "identity": {"name": "John Doe"},
            "experience": [{"title": "Engineer", "company": "Acme", "dates": "2020-2022"}]
        }));
        let changes = plan_merge(USER, None, &incoming, &SequentialIds::default(), Utc::now());
        assert_eq!(
            changes.ops,
            vec![RowOp::Insert(Row::Experience(ExperienceRow {
                id: Uuid::from_u128(1),
                user_id: USER,
                company: "Acme".into(),
                title: "Engineer".into(),
                dates: "2020-2022".into(),
                sort_order: 0,
            }))]
        );
    }
}
