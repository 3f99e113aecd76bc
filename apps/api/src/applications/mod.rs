//! Application tracking: which jobs a user applied to, with which resume
//! version, and how far each one got.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::models::application::{ApplicationRow, ApplicationStatus};

/// Body of `POST /api/v1/applications`.
#[derive(Debug, Deserialize)]
pub struct NewApplication {
    pub user_id: Uuid,
    pub job_title: String,
    pub company: String,
    #[serde(default)]
    pub job_url: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub document_id: Option<Uuid>,
    #[serde(default)]
    pub cover_letter: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl NewApplication {
    /// Every new application starts as `applied`. Errors name the missing field.
    pub fn into_row(self, id: Uuid, now: DateTime<Utc>) -> Result<ApplicationRow, String> {
        let job_title = self.job_title.trim().to_string();
        if job_title.is_empty() {
            return Err("job_title must not be empty".to_string());
        }
        let company = self.company.trim().to_string();
        if company.is_empty() {
            return Err("company must not be empty".to_string());
        }

        Ok(ApplicationRow {
            id,
            user_id: self.user_id,
            job_title,
            company,
            job_url: non_blank(self.job_url),
            location: non_blank(self.location),
            status: ApplicationStatus::Applied,
            document_id: self.document_id,
            cover_letter: self.cover_letter.filter(|c| !c.trim().is_empty()),
            notes: non_blank(self.notes),
            applied_at: now,
        })
    }
}
