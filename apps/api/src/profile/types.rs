//! Profile data model.
//!
//! Two representations share field names:
//! - [`AssembledProfile`]: the authoritative read view. Every id is set, every
//!   collection is present, and `sort_order` follows list position.
//! - [`AssembledProfilePayload`]: write intent. Ids and `sort_order` are optional.
//!   Every field is decoded leniently (see [`crate::profile::lenient`]).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::ids::IdGenerator;
use crate::profile::legacy::{legacy_to_assembled, legacy_to_payload};
use crate::profile::lenient;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileLink {
    #[serde(default, deserialize_with = "lenient::string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub url: String,
}

/// Contact block. Never null on a profile; the default is all-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub email: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub phone: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub location: String,
    #[serde(default, deserialize_with = "lenient::links")]
    pub links: Vec<ProfileLink>,
}

// ────────────────────────────────────────────────────────────────────────────
// Read view
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    pub id: Uuid,
    pub text: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub id: Uuid,
    pub title: String,
    pub company: String,
    /// Free text ("2020 – Present"); never parsed.
    pub dates: String,
    pub sort_order: i32,
    pub bullets: Vec<Bullet>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Education {
    pub id: Uuid,
    pub institution: String,
    pub degree: String,
    pub field_of_study: String,
    pub dates: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub id: Uuid,
    pub title: String,
    pub issuer: String,
    pub date: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    pub sort_order: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    pub id: Uuid,
    pub language: String,
    pub level: String,
    pub sort_order: i32,
}

/// Free-form titled section. Lives in the profile's `additional` JSON column,
/// so its id is a string (older rows carry synthetic `section-N` ids).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalSection {
    pub id: String,
    pub title: String,
    pub content: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledProfile {
    pub identity: Identity,
    pub summary: String,
    pub experience: Vec<Experience>,
    pub education: Vec<Education>,
    pub achievements: Vec<Achievement>,
    pub skills: Vec<Skill>,
    pub languages: Vec<Language>,
    pub additional: Vec<AdditionalSection>,
}

// ────────────────────────────────────────────────────────────────────────────
// Write intent
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulletPayload {
    #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient::order", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl From<String> for BulletPayload {
    fn from(text: String) -> Self {
        Self {
            text,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExperiencePayload {
    #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub company: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub dates: String,
    #[serde(default, deserialize_with = "lenient::order", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
    #[serde(default, deserialize_with = "lenient::list_or_text")]
    pub bullets: Vec<BulletPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EducationPayload {
    #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub institution: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub degree: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub field_of_study: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub dates: String,
    #[serde(default, deserialize_with = "lenient::order", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AchievementPayload {
    #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub issuer: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub date: String,
    #[serde(default, deserialize_with = "lenient::order", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillPayload {
    #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::order", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

impl From<String> for SkillPayload {
    fn from(name: String) -> Self {
        Self {
            name,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguagePayload {
    #[serde(default, deserialize_with = "lenient::id", skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub language: String,
    #[serde(default, deserialize_with = "lenient::string")]
    pub level: String,
    #[serde(default, deserialize_with = "lenient::order", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalSectionPayload {
    #[serde(default, deserialize_with = "lenient::section_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::strings")]
    pub content: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssembledProfilePayload {
    #[serde(default, deserialize_with = "lenient::object")]
    pub identity: Identity,
    #[serde(default, deserialize_with = "lenient::string")]
    pub summary: String,
    #[serde(default, deserialize_with = "lenient::list")]
    pub experience: Vec<ExperiencePayload>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub education: Vec<EducationPayload>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub achievements: Vec<AchievementPayload>,
    #[serde(default, deserialize_with = "lenient::list_or_text")]
    pub skills: Vec<SkillPayload>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub languages: Vec<LanguagePayload>,
    #[serde(default, deserialize_with = "lenient::list")]
    pub additional: Vec<AdditionalSectionPayload>,
}

/// List index as a `sort_order` value.
pub(crate) fn position(index: usize) -> i32 {
    i32::try_from(index).unwrap_or(i32::MAX)
}

impl AssembledProfilePayload {
    /// Fills missing ids from `ids` and renumbers every collection by position.
    /// Ids already present are kept as-is.
    pub fn into_assembled(self, ids: &dyn IdGenerator) -> AssembledProfile {
        let fresh = |id: Option<Uuid>| id.unwrap_or_else(|| ids.next_id());

        let experience = self
            .experience
            .into_iter()
            .enumerate()
            .map(|(i, exp)| Experience {
                id: fresh(exp.id),
                title: exp.title,
                company: exp.company,
                dates: exp.dates,
                sort_order: position(i),
                bullets: exp
                    .bullets
                    .into_iter()
                    .enumerate()
                    .map(|(j, b)| Bullet {
                        id: fresh(b.id),
                        text: b.text,
                        sort_order: position(j),
                    })
                    .collect(),
            })
            .collect();
        let education = self
            .education
            .into_iter()
            .enumerate()
            .map(|(i, e)| Education {
                id: fresh(e.id),
                institution: e.institution,
                degree: e.degree,
                field_of_study: e.field_of_study,
                dates: e.dates,
                sort_order: position(i),
            })
            .collect();
        let achievements = self
            .achievements
            .into_iter()
            .enumerate()
            .map(|(i, a)| Achievement {
                id: fresh(a.id),
                title: a.title,
                issuer: a.issuer,
                date: a.date,
                sort_order: position(i),
            })
            .collect();
        let skills = self
            .skills
            .into_iter()
            .enumerate()
            .map(|(i, s)| Skill {
                id: fresh(s.id),
                name: s.name,
                sort_order: position(i),
            })
            .collect();
        let languages = self
            .languages
            .into_iter()
            .enumerate()
            .map(|(i, l)| Language {
                id: fresh(l.id),
                language: l.language,
                level: l.level,
                sort_order: position(i),
            })
            .collect();
        let additional = self
            .additional
            .into_iter()
            .map(|s| AdditionalSection {
                id: s.id.unwrap_or_else(|| ids.next_id().to_string()),
                title: s.title,
                content: s.content,
            })
            .collect();

        AssembledProfile {
            identity: self.identity,
            summary: self.summary,
            experience,
            education,
            achievements,
            skills,
            languages,
            additional,
        }
    }
}

impl AssembledProfile {
    /// Write intent that reuses every id of this profile, so a sync of the
    /// result updates rows in place.
    pub fn to_payload(&self) -> AssembledProfilePayload {
        AssembledProfilePayload {
            identity: self.identity.clone(),
            summary: self.summary.clone(),
            experience: self
                .experience
                .iter()
                .map(|e| ExperiencePayload {
                    id: Some(e.id),
                    title: e.title.clone(),
                    company: e.company.clone(),
                    dates: e.dates.clone(),
                    sort_order: Some(e.sort_order),
                    bullets: e
                        .bullets
                        .iter()
                        .map(|b| BulletPayload {
                            id: Some(b.id),
                            text: b.text.clone(),
                            sort_order: Some(b.sort_order),
                        })
                        .collect(),
                })
                .collect(),
            education: self
                .education
                .iter()
                .map(|e| EducationPayload {
                    id: Some(e.id),
                    institution: e.institution.clone(),
                    degree: e.degree.clone(),
                    field_of_study: e.field_of_study.clone(),
                    dates: e.dates.clone(),
                    sort_order: Some(e.sort_order),
                })
                .collect(),
            achievements: self
                .achievements
                .iter()
                .map(|a| AchievementPayload {
                    id: Some(a.id),
                    title: a.title.clone(),
                    issuer: a.issuer.clone(),
                    date: a.date.clone(),
                    sort_order: Some(a.sort_order),
                })
                .collect(),
            skills: self
                .skills
                .iter()
                .map(|s| SkillPayload {
                    id: Some(s.id),
                    name: s.name.clone(),
                    sort_order: Some(s.sort_order),
                })
                .collect(),
            languages: self
                .languages
                .iter()
                .map(|l| LanguagePayload {
                    id: Some(l.id),
                    language: l.language.clone(),
                    level: l.level.clone(),
                    sort_order: Some(l.sort_order),
                })
                .collect(),
            additional: self
                .additional
                .iter()
                .map(|s| AdditionalSectionPayload {
                    id: Some(s.id.clone()),
                    title: s.title.clone(),
                    content: s.content.clone(),
                })
                .collect(),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Wire discriminator
// ────────────────────────────────────────────────────────────────────────────

pub const SCHEMA_VERSION_KEY: &str = "schema_version";
pub const LEGACY_SCHEMA: &str = "legacy";
pub const ASSEMBLED_SCHEMA: &str = "assembled";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DocumentError {
    #[error("profile document must be a JSON object")]
    NotAnObject,

    #[error("schema_version is required")]
    Untagged,

    #[error("unknown schema_version {0}")]
    UnknownSchema(String),

    #[error("invalid assembled profile: {0}")]
    Invalid(String),
}

/// A profile document as it arrives from extraction or the editor.
///
/// The shape is chosen by the `schema_version` field, never by inspecting
/// nested arrays. Untagged documents are legacy: the extraction prompt only
/// ever produces the flat shape.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileDocument {
    /// Flat shape, kept as raw JSON for the legacy adapter.
    Legacy(Value),
    Assembled(AssembledProfilePayload),
}

impl ProfileDocument {
    pub fn from_value(mut value: Value) -> Result<Self, DocumentError> {
        let tag = value
            .as_object_mut()
            .ok_or(DocumentError::NotAnObject)?
            .remove(SCHEMA_VERSION_KEY);

        match tag {
            None => Ok(Self::Legacy(value)),
            Some(Value::String(tag)) if tag == LEGACY_SCHEMA => Ok(Self::Legacy(value)),
            Some(Value::String(tag)) if tag == ASSEMBLED_SCHEMA => serde_json::from_value(value)
                .map(Self::Assembled)
                .map_err(|e| DocumentError::Invalid(e.to_string())),
            Some(other) => Err(DocumentError::UnknownSchema(other.to_string())),
        }
    }

    /// Like [`Self::from_value`], but an untagged document is an error.
    /// Editor saves carry ids that a legacy decode would drop.
    pub fn from_tagged_value(value: Value) -> Result<Self, DocumentError> {
        let tagged = value
            .as_object()
            .ok_or(DocumentError::NotAnObject)?
            .contains_key(SCHEMA_VERSION_KEY);
        if !tagged {
            return Err(DocumentError::Untagged);
        }
        Self::from_value(value)
    }

    /// Serializes a payload as an `assembled` document.
    pub fn assembled_value(payload: &AssembledProfilePayload) -> Result<Value, DocumentError> {
        let mut value =
            serde_json::to_value(payload).map_err(|e| DocumentError::Invalid(e.to_string()))?;
        let obj = value.as_object_mut().ok_or(DocumentError::NotAnObject)?;
        obj.insert(
            SCHEMA_VERSION_KEY.to_string(),
            Value::String(ASSEMBLED_SCHEMA.to_string()),
        );
        Ok(value)
    }

    /// `None` when a legacy document carries no identity block.
    pub fn into_payload(self) -> Option<AssembledProfilePayload> {
        match self {
            Self::Legacy(value) => legacy_to_payload(&value),
            Self::Assembled(payload) => Some(payload),
        }
    }

    pub fn into_assembled(self, ids: &dyn IdGenerator) -> Option<AssembledProfile> {
        match self {
            Self::Legacy(value) => legacy_to_assembled(&value, ids),
            Self::Assembled(payload) => Some(payload.into_assembled(ids)),
        }
    }

    /// Tags raw extraction output as legacy. Non-objects are left alone.
    pub fn stamp_legacy(mut value: Value) -> Value {
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                SCHEMA_VERSION_KEY.to_string(),
                Value::String(LEGACY_SCHEMA.to_string()),
            );
        }
        value
    }
}

impl<'de> Deserialize<'de> for ProfileDocument {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(value).map_err(serde::de::Error::custom)
    }
}
