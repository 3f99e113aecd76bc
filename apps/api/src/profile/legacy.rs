//! Legacy adapter: the flat "parsed resume" shape (primitive string arrays for
//! bullets and skills) into the assembled shape.
//!
//! Soft failure: a document without an `identity` object is not resume data
//! and yields `None`. Every other missing or mistyped field defaults to empty.

use serde::Deserialize;
use serde_json::Value;

use crate::ids::IdGenerator;
use crate::profile::lenient;
use crate::profile::types::{
    position, AchievementPayload, AdditionalSectionPayload, AssembledProfile,
    AssembledProfilePayload, BulletPayload, EducationPayload, ExperiencePayload, Identity,
    LanguagePayload, SkillPayload,
};

#[derive(Debug, Default, Deserialize)]
struct LegacyExperience {
    #[serde(default, deserialize_with = "lenient::string")]
    title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    company: String,
    #[serde(default, deserialize_with = "lenient::string")]
    dates: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    bullets: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LegacyProfile {
    #[serde(default, deserialize_with = "lenient::string")]
    summary: String,
    #[serde(default, deserialize_with = "lenient::list")]
    experience: Vec<LegacyExperience>,
    #[serde(default, deserialize_with = "lenient::list")]
    education: Vec<EducationPayload>,
    #[serde(default, deserialize_with = "lenient::list")]
    achievements: Vec<AchievementPayload>,
    #[serde(default, deserialize_with = "lenient::strings")]
    skills: Vec<String>,
    #[serde(default, deserialize_with = "lenient::list")]
    languages: Vec<LanguagePayload>,
    #[serde(default, deserialize_with = "lenient::list")]
    additional: Vec<AdditionalSectionPayload>,
}

/// Legacy document to write intent. Ids are left out; the gateway assigns them.
pub fn legacy_to_payload(legacy: &Value) -> Option<AssembledProfilePayload> {
    let identity = legacy.get("identity").filter(|v| v.is_object())?;
    let identity: Identity = serde_json::from_value(identity.clone()).unwrap_or_default();
    let parsed: LegacyProfile = serde_json::from_value(legacy.clone()).unwrap_or_default();

    let experience = parsed
        .experience
        .into_iter()
        .enumerate()
        .map(|(i, exp)| ExperiencePayload {
            id: None,
            title: exp.title,
            company: exp.company,
            dates: exp.dates,
            sort_order: Some(position(i)),
            bullets: exp
                .bullets
                .into_iter()
                .enumerate()
                .map(|(j, text)| BulletPayload {
                    id: None,
                    text,
                    sort_order: Some(position(j)),
                })
                .collect(),
        })
        .collect();
    let education = parsed
        .education
        .into_iter()
        .enumerate()
        .map(|(i, e)| EducationPayload {
            id: None,
            sort_order: Some(position(i)),
            ..e
        })
        .collect();
    let achievements = parsed
        .achievements
        .into_iter()
        .enumerate()
        .map(|(i, a)| AchievementPayload {
            id: None,
            sort_order: Some(position(i)),
            ..a
        })
        .collect();
    let skills = parsed
        .skills
        .into_iter()
        .enumerate()
        .map(|(i, name)| SkillPayload {
            id: None,
            name,
            sort_order: Some(position(i)),
        })
        .collect();
    let languages = parsed
        .languages
        .into_iter()
        .enumerate()
        .map(|(i, l)| LanguagePayload {
            id: None,
            sort_order: Some(position(i)),
            ..l
        })
        .collect();
    let additional = parsed
        .additional
        .into_iter()
        .map(|s| AdditionalSectionPayload { id: None, ..s })
        .collect();

    Some(AssembledProfilePayload {
        identity,
        summary: parsed.summary,
        experience,
        education,
        achievements,
        skills,
        languages,
        additional,
    })
}

/// Legacy document to a read view with freshly generated ids. Used as the
/// fallback view before a profile has been saved.
pub fn legacy_to_assembled(legacy: &Value, ids: &dyn IdGenerator) -> Option<AssembledProfile> {
    legacy_to_payload(legacy).map(|payload| payload.into_assembled(ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::SequentialIds;
    use serde_json::json;
    use uuid::Uuid;

    #[test]
    fn test_null_is_not_resume_data() {
        assert!(legacy_to_assembled(&Value::Null, &SequentialIds::default()).is_none());
    }

    #[test]
    fn test_missing_identity_is_not_resume_data() {
        assert!(legacy_to_assembled(&json!({}), &SequentialIds::default()).is_none());
        assert!(legacy_to_payload(&json!({"summary": "x", "skills": ["Go"]})).is_none());
        assert!(legacy_to_payload(&json!({"identity": "John"})).is_none());
    }

    #[test]
    fn test_identity_only_is_fully_populated() {
        let profile =
            legacy_to_assembled(&json!({"identity": {"name": "A"}}), &SequentialIds::default())
                .unwrap();
        assert_eq!(profile.identity.name, "A");
        assert_eq!(profile.identity.email, "");
        assert!(profile.identity.links.is_empty());
        assert_eq!(profile.summary, "");
        assert!(profile.experience.is_empty());
        assert!(profile.education.is_empty());
        assert!(profile.achievements.is_empty());
        assert!(profile.skills.is_empty());
        assert!(profile.languages.is_empty());
        assert!(profile.additional.is_empty());
    }

    #[test]
    fn test_strings_become_positioned_rows() {
        let legacy = json!({
            "identity": {"name": "Jane", "links": ["https://github.com/jane", {"label": "Site", "url": "https://jane.dev"}]},
            "summary": "Backend engineer",
            "experience": [
                {"title": "SWE", "company": "Acme", "dates": "2020-2022", "bullets": ["Built X", "Led Y"]},
                {"title": "Intern", "company": "Initech"}
            ],
            "skills": ["Rust", "SQL"],
            "languages": [{"language": "French", "level": "Fluent"}],
            "additional": [{"title": "Volunteer", "content": ["Food bank"]}]
        });
        let profile = legacy_to_assembled(&legacy, &SequentialIds::default()).unwrap();

        assert_eq!(profile.identity.links.len(), 2);
        assert_eq!(profile.identity.links[0].label, "");
        assert_eq!(profile.identity.links[1].label, "Site");

        assert_eq!(profile.experience.len(), 2);
        let first = &profile.experience[0];
        assert_eq!(first.sort_order, 0);
        assert_eq!(first.bullets[1].text, "Led Y");
        assert_eq!(first.bullets[1].sort_order, 1);
        assert!(profile.experience[1].bullets.is_empty());
        assert_eq!(profile.experience[1].dates, "");

        assert_eq!(profile.skills[1].name, "SQL");
        assert_eq!(profile.skills[1].sort_order, 1);
        assert_eq!(profile.languages[0].level, "Fluent");
        assert_eq!(profile.additional[0].content, vec!["Food bank"]);
    }

    #[test]
    fn test_assembled_ids_are_unique() {
        let legacy = json!({
            "identity": {},
            "experience": [{"bullets": ["a", "b"]}],
            "skills": ["x"],
            "additional": [{"title": "t"}]
        });
        let profile = legacy_to_assembled(&legacy, &SequentialIds::default()).unwrap();
        let mut seen = vec![
            profile.experience[0].id,
            profile.experience[0].bullets[0].id,
            profile.experience[0].bullets[1].id,
            profile.skills[0].id,
        ];
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), 4);
        assert!(!profile.additional[0].id.is_empty());
    }

    #[test]
    fn test_payload_omits_ids() {
        let payload = legacy_to_payload(&json!({
            "identity": {"name": "A"},
            "experience": [{"title": "Eng", "bullets": ["one"]}],
            "education": [{"id": Uuid::from_u128(9).to_string(), "institution": "MIT"}],
            "skills": ["Go"]
        }))
        .unwrap();
        assert_eq!(payload.experience[0].id, None);
        assert_eq!(payload.experience[0].bullets[0].id, None);
        assert_eq!(payload.education[0].id, None);
        assert_eq!(payload.education[0].institution, "MIT");
        assert_eq!(payload.skills[0].id, None);
    }

    #[test]
    fn test_mistyped_fields_default_instead_of_failing() {
        let payload = legacy_to_payload(&json!({
            "identity": {"name": 5, "email": null, "links": "not-a-list"},
            "summary": ["not", "a", "string"],
            "experience": "nope",
            "skills": [1, "Go", null],
            "education": ["MIT", {"institution": "CMU", "dates": 2019}]
        }))
        .unwrap();
        assert_eq!(payload.identity.name, "5");
        assert_eq!(payload.identity.email, "");
        assert!(payload.identity.links.is_empty());
        assert_eq!(payload.summary, "");
        assert!(payload.experience.is_empty());
        assert_eq!(payload.skills.len(), 1);
        assert_eq!(payload.education.len(), 1);
        assert_eq!(payload.education[0].dates, "2019");
    }
}
