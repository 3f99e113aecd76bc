//! Text extraction from uploaded files.

use bytes::Bytes;
use tracing::debug;

use crate::ingest::IngestError;

/// Longest text sent to the extraction prompt, in characters.
pub const MAX_EXTRACTED_CHARS: usize = 120_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Pdf,
    /// Plain text or markdown, read as UTF-8.
    Text,
}

impl DocumentKind {
    /// Detects from the declared content type, then from the file extension.
    pub fn detect(content_type: Option<&str>, file_name: &str) -> Option<Self> {
        let mime = content_type
            .map(|c| c.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
            .unwrap_or_default();
        match mime.as_str() {
            "application/pdf" => return Some(Self::Pdf),
            "text/plain" | "text/markdown" | "text/x-markdown" => return Some(Self::Text),
            _ => {}
        }

        let extension = file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase())?;
        match extension.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" | "md" | "markdown" => Some(Self::Text),
            _ => None,
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Text => "text/plain; charset=utf-8",
        }
    }
}

pub async fn extract_text(kind: DocumentKind, bytes: Bytes) -> Result<String, IngestError> {
    let text = match kind {
        DocumentKind::Text => String::from_utf8_lossy(&bytes).into_owned(),
        DocumentKind::Pdf => {
            // pdf-extract is CPU-bound; keep it off the async executor.
            tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem(&bytes))
                .await
                .map_err(|e| IngestError::Extraction(format!("PDF extraction task failed: {e}")))?
                .map_err(|e| IngestError::Extraction(format!("Could not read PDF: {e}")))?
        }
    };
    debug!("Extracted {} characters from {:?} upload", text.len(), kind);
    Ok(text)
}

/// At most `max` characters of `text`, cut on a char boundary.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}

/// Replaces everything but ASCII letters, digits, `.` and `-` with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if sanitized.is_empty() {
        "upload".to_string()
    } else {
        sanitized
    }
}
