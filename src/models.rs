use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::db::ImageEntryStore;
use crate::recognition::FaceIndex;
use crate::storage::ObjectStore;

/// Marker inserted into keys of query images that are deleted after indexing
pub const TRANSIENT_KEY_MARKER: &str = "-rekognition";

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub objects: Arc<dyn ObjectStore>,
    pub faces: Arc<dyn FaceIndex>,
    pub entries: Arc<dyn ImageEntryStore>,
}

/// A photo held in memory for the length of one batch
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: bytes::Bytes,
}

impl UploadFile {
    /// Falls back to a type guessed from the file name when none was supplied.
    pub fn new(name: impl Into<String>, mime_type: Option<String>, bytes: impl Into<bytes::Bytes>) -> Self {
        let name = name.into();
        let mime_type = mime_type
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| mime_guess::from_path(&name).first_or_octet_stream().to_string());
        Self {
            name,
            mime_type,
            bytes: bytes.into(),
        }
    }

    /// Text after the last `.`; the whole name when there is none
    pub fn extension(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }
}

/// Object-store key of an uploaded photo: a random id plus the original extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectKey(String);

impl ObjectKey {
    pub fn generate(file: &UploadFile) -> Self {
        Self(format!("{}.{}", uuid::Uuid::new_v4(), file.extension()))
    }

    /// Key for a query image that only lives long enough to be indexed
    pub fn transient(file: &UploadFile) -> Self {
        Self(format!(
            "{}{}.{}",
            uuid::Uuid::new_v4(),
            TRANSIENT_KEY_MARKER,
            file.extension()
        ))
    }

    pub fn is_transient(&self) -> bool {
        self.0.contains(TRANSIENT_KEY_MARKER)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ObjectKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One face detected and stored by the recognition service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaceRecord {
    pub face_id: String,
    pub external_image_id: Option<String>,
}

/// Persisted link between a face and the photo it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ImageEntry {
    pub id: uuid::Uuid,
    pub image_id: String,
    pub key: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchMatch {
    pub face_id: String,
    pub similarity: f32,
    pub matched_key: Option<String>,
    pub image_url: Option<String>,
}

/// Matches found for one query photo
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub key: ObjectKey,
    pub matches: Vec<SearchMatch>,
}

/// Outcome of an upload batch. Failed files show up in `errors`; siblings still finish.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReport {
    pub entries: Vec<ImageEntry>,
    pub errors: Vec<String>,
}

impl UploadReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_message(&self) -> Option<String> {
        join_errors(&self.errors)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchReport {
    pub results: Vec<SearchResult>,
    pub errors: Vec<String>,
}

impl SearchReport {
    /// All per-file errors as one newline-separated display string
    pub fn error_message(&self) -> Option<String> {
        join_errors(&self.errors)
    }
}

fn join_errors(errors: &[String]) -> Option<String> {
    if errors.is_empty() {
        None
    } else {
        Some(errors.join("\n"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub database: String,
}
