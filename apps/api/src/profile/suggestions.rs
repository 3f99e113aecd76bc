//! Resume-coach suggestions: discrete edits addressed by a small path vocabulary.
//!
//! Applying a suggestion is pure. It works on a copy, and an unknown path or an
//! out-of-range experience index leaves the copy unchanged, so one bad entry in
//! a batch never blocks the rest.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::ids::IdGenerator;
use crate::profile::types::{position, AssembledProfile, Bullet, ProfileLink, Skill};

/// Experience entries past this index are never suggested.
pub const MAX_SUGGESTED_EXPERIENCE: usize = 20;
const DEFAULT_REASON: &str = "Improve impact and clarity";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeSuggestion {
    pub id: String,
    pub path: String,
    pub current_value: String,
    pub suggested_value: String,
    pub reason: String,
}

/// The part of a suggestion needed to apply it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionEdit {
    pub path: String,
    #[serde(default)]
    pub suggested_value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExperienceField {
    Title,
    Company,
    Dates,
    Bullets,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionPath {
    IdentityName,
    IdentityEmail,
    IdentityLocation,
    /// Newline-separated URLs.
    IdentityLinks,
    Summary,
    /// Comma-separated names.
    Skills,
    /// Bullets are newline-separated.
    Experience { index: usize, field: ExperienceField },
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unsupported suggestion path: {0}")]
pub struct UnsupportedPath(pub String);

impl FromStr for SuggestionPath {
    type Err = UnsupportedPath;

    fn from_str(path: &str) -> Result<Self, Self::Err> {
        let unsupported = || UnsupportedPath(path.to_string());
        match path {
            "identity.name" => return Ok(Self::IdentityName),
            "identity.email" => return Ok(Self::IdentityEmail),
            "identity.location" => return Ok(Self::IdentityLocation),
            "identity.links" => return Ok(Self::IdentityLinks),
            "summary" => return Ok(Self::Summary),
            "skills" => return Ok(Self::Skills),
            _ => {}
        }

        let rest = path.strip_prefix("experience.").ok_or_else(unsupported)?;
        let (index, field) = rest.split_once('.').ok_or_else(unsupported)?;
        let canonical = index == "0" || !index.starts_with('0');
        if index.is_empty() || !canonical || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(unsupported());
        }
        let index = index.parse().map_err(|_| unsupported())?;
        let field = match field {
            "title" => ExperienceField::Title,
            "company" => ExperienceField::Company,
            "dates" => ExperienceField::Dates,
            "bullets" => ExperienceField::Bullets,
            _ => return Err(unsupported()),
        };
        Ok(Self::Experience { index, field })
    }
}

fn non_empty_parts(value: &str, separator: char) -> impl Iterator<Item = &str> {
    value.split(separator).map(str::trim).filter(|s| !s.is_empty())
}

/// Applies one suggestion to a copy of `profile`.
pub fn apply_suggestion(
    profile: &AssembledProfile,
    path: &str,
    suggested_value: &str,
    ids: &dyn IdGenerator,
) -> AssembledProfile {
    let mut next = profile.clone();
    let Ok(path) = path.trim().parse::<SuggestionPath>() else {
        return next;
    };

    match path {
        SuggestionPath::IdentityName => next.identity.name = suggested_value.to_string(),
        SuggestionPath::IdentityEmail => next.identity.email = suggested_value.to_string(),
        SuggestionPath::IdentityLocation => next.identity.location = suggested_value.to_string(),
        SuggestionPath::IdentityLinks => {
            next.identity.links = non_empty_parts(suggested_value, '\n')
                .map(|url| ProfileLink {
                    label: String::new(),
                    url: url.to_string(),
                })
                .collect();
        }
        SuggestionPath::Summary => next.summary = suggested_value.to_string(),
        SuggestionPath::Skills => {
            // Ids are kept by position; positions past the old list get fresh ids.
            next.skills = non_empty_parts(suggested_value, ',')
                .enumerate()
                .map(|(i, name)| Skill {
                    id: profile.skills.get(i).map_or_else(|| ids.next_id(), |s| s.id),
                    name: name.to_string(),
                    sort_order: position(i),
                })
                .collect();
        }
        SuggestionPath::Experience { index, field } => {
            let Some(exp) = next.experience.get_mut(index) else {
                return next;
            };
            match field {
                ExperienceField::Title => exp.title = suggested_value.to_string(),
                ExperienceField::Company => exp.company = suggested_value.to_string(),
                ExperienceField::Dates => exp.dates = suggested_value.to_string(),
                ExperienceField::Bullets => {
                    let old = std::mem::take(&mut exp.bullets);
                    exp.bullets = non_empty_parts(suggested_value, '\n')
                        .enumerate()
                        .map(|(i, text)| Bullet {
                            id: old.get(i).map_or_else(|| ids.next_id(), |b| b.id),
                            text: text.to_string(),
                            sort_order: position(i),
                        })
                        .collect();
                }
            }
        }
    }
    next
}

pub fn apply_all(
    profile: &AssembledProfile,
    edits: &[SuggestionEdit],
    ids: &dyn IdGenerator,
) -> AssembledProfile {
    edits.iter().fold(profile.clone(), |acc, edit| {
        apply_suggestion(&acc, &edit.path, &edit.suggested_value, ids)
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Parsing model output
// ────────────────────────────────────────────────────────────────────────────

/// Paths the coach may suggest: everything [`SuggestionPath`] accepts, with
/// experience indexes capped.
fn is_suggestable(path: &str) -> bool {
    match path.parse::<SuggestionPath>() {
        Ok(SuggestionPath::Experience { index, .. }) => index < MAX_SUGGESTED_EXPERIENCE,
        Ok(_) => true,
        Err(_) => false,
    }
}

fn text_of(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// Reads `[...]` or `{"suggestions": [...]}`. Entries with unsupported paths
/// are dropped; malformed JSON yields nothing.
pub fn parse_suggestions(content: &str) -> Vec<ResumeSuggestion> {
    let Ok(parsed) = serde_json::from_str::<Value>(content) else {
        return Vec::new();
    };
    let list = match parsed {
        Value::Array(list) => list,
        Value::Object(mut obj) => match obj.remove("suggestions") {
            Some(Value::Array(list)) => list,
            _ => return Vec::new(),
        },
        _ => return Vec::new(),
    };

    list.iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let path = item
                .get("path")
                .or_else(|| item.get("fieldPath"))
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|p| is_suggestable(p))?;
            Some(ResumeSuggestion {
                id: format!("s-{i}-{path}"),
                path: path.to_string(),
                current_value: text_of(item.get("currentValue")),
                suggested_value: text_of(item.get("suggestedValue")),
                reason: item
                    .get("reason")
                    .and_then(Value::as_str)
                    .unwrap_or(DEFAULT_REASON)
                    .to_string(),
            })
        })
        .collect()
}
