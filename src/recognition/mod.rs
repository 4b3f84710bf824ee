//! Face recognition service
//!
//! `FaceIndex` is the seam the pipelines talk to. `RekognitionFaceIndex`
//! backs it with AWS Rekognition; tests substitute an in-memory index.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::FaceRecord;

pub mod rekognition;

pub use rekognition::RekognitionFaceIndex;

/// Minimum similarity, in percent, for a search hit
pub const FACE_MATCH_THRESHOLD: f32 = 70.0;

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("{operation} failed: {message}")]
    Service {
        operation: &'static str,
        message: String,
    },

    #[error("{operation} returned a face without an id")]
    MissingFaceId { operation: &'static str },
}

/// A face stored in a collection, as returned by a similarity search
#[derive(Debug, Clone, PartialEq)]
pub struct FaceHit {
    pub face_id: String,
    pub external_image_id: Option<String>,
    pub similarity: f32,
}

#[async_trait]
pub trait FaceIndex: Send + Sync {
    /// Detect faces in `bucket/key` and add them to `collection_id`, tagged with `external_image_id`.
    async fn index_faces(
        &self,
        collection_id: &str,
        bucket: &str,
        key: &str,
        external_image_id: &str,
    ) -> Result<Vec<FaceRecord>, RecognitionError>;

    /// Faces in the collection similar to `face_id`; the query face itself is never returned.
    async fn search_faces(
        &self,
        collection_id: &str,
        face_id: &str,
        threshold: f32,
    ) -> Result<Vec<FaceHit>, RecognitionError>;

    async fn list_faces(&self, collection_id: &str) -> Result<Vec<FaceRecord>, RecognitionError>;

    /// Returns the ids actually removed.
    async fn delete_faces(
        &self,
        collection_id: &str,
        face_ids: &[String],
    ) -> Result<Vec<String>, RecognitionError>;

    async fn create_collection(&self, collection_id: &str) -> Result<(), RecognitionError>;

    async fn delete_collection(&self, collection_id: &str) -> Result<(), RecognitionError>;

    async fn list_collections(&self) -> Result<Vec<String>, RecognitionError>;
}

/// Delete `face_ids`, or every face in the collection when none are given.
///
/// Returns an empty list without calling the service when there is nothing to delete.
pub async fn purge_faces(
    index: &dyn FaceIndex,
    collection_id: &str,
    face_ids: Option<Vec<String>>,
) -> Result<Vec<String>, RecognitionError> {
    let face_ids = match face_ids {
        Some(ids) => ids,
        None => index
            .list_faces(collection_id)
            .await?
            .into_iter()
            .map(|face| face.face_id)
            .collect(),
    };

    if face_ids.is_empty() {
        return Ok(Vec::new());
    }

    tracing::info!(collection_id, count = face_ids.len(), "Deleting faces");
    index.delete_faces(collection_id, &face_ids).await
}
