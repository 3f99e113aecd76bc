//! Deserializers for untrusted JSON (model output, editor bodies, stored JSON columns).
//!
//! Policy: none of these fail. A value of the wrong type becomes the field's
//! empty default, a list keeps only the elements it can read, and an id that is
//! not a UUID becomes `None` (the reconciler then inserts with a fresh id).

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use uuid::Uuid;

use crate::profile::types::ProfileLink;

pub fn string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(coerce_string(&Value::deserialize(deserializer)?))
}

pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Uuid>, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_str()
        .and_then(|s| Uuid::parse_str(s.trim()).ok()))
}

/// Section ids are free-form strings; empty ones count as missing.
pub fn section_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

pub fn order<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i32>, D::Error> {
    Ok(Value::deserialize(deserializer)?
        .as_i64()
        .and_then(|n| i32::try_from(n).ok()))
}

pub fn strings<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    Ok(coerce_strings(&Value::deserialize(deserializer)?))
}

/// Keeps the elements of an array that are objects readable as `T`.
pub fn list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Like [`list`], but a bare string element is also accepted (`"Python"` for a skill).
pub fn list_or_text<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + From<String>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(T::from(s)),
                Value::Object(_) => serde_json::from_value(item).ok(),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

/// Reads an object as `T`, falling back to `T::default()`.
pub fn object<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(value).unwrap_or_default())
}

pub fn links<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<ProfileLink>, D::Error> {
    Ok(normalize_links(&Value::deserialize(deserializer)?))
}

pub fn coerce_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => String::new(),
    }
}

/// Strings pass through; `{ "text": .. }` / `{ "name": .. }` objects contribute their text.
pub fn coerce_strings(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text_of).collect(),
        _ => Vec::new(),
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Object(obj) => ["text", "name"]
            .iter()
            .find_map(|key| obj.get(*key).and_then(Value::as_str))
            .map(str::to_owned),
        _ => None,
    }
}

/// Bare strings become `{ label: "", url }`; objects keep whichever of
/// `label`/`url` they carry and get `""` for the rest.
pub fn normalize_links(value: &Value) -> Vec<ProfileLink> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .map(|item| match item {
            Value::Object(obj) => ProfileLink {
                label: obj.get("label").and_then(Value::as_str).unwrap_or_default().to_string(),
                url: obj.get("url").and_then(Value::as_str).unwrap_or_default().to_string(),
            },
            Value::String(url) => ProfileLink {
                label: String::new(),
                url: url.clone(),
            },
            _ => ProfileLink::default(),
        })
        .collect()
}
