use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

/// One ingested document: the extracted text plus the untrusted model output.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub raw_text: String,
    pub parsed_data: Value,
    pub storage_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Version listing entry (no payload).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DocumentSummary {
    pub id: Uuid,
    pub file_name: String,
    pub created_at: DateTime<Utc>,
}
