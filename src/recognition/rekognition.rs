use async_trait::async_trait;
use aws_sdk_rekognition::error::DisplayErrorContext;
use aws_sdk_rekognition::types::{Face, Image, S3Object};
use aws_sdk_rekognition::Client;
use tracing::debug;

use super::{FaceHit, FaceIndex, RecognitionError};
use crate::config::AwsConfig;
use crate::models::FaceRecord;

pub struct RekognitionFaceIndex {
    client: Client,
}

impl RekognitionFaceIndex {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Client for the configured region. Static keys win over the default provider chain.
    pub async fn from_config(config: &AwsConfig) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.region.clone()));

        if let (Some(id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            loader = loader.credentials_provider(aws_sdk_rekognition::config::Credentials::new(
                id.clone(),
                secret.clone(),
                None,
                None,
                "facefind",
            ));
        }

        let sdk_config = loader.load().await;
        Self::new(Client::new(&sdk_config))
    }
}

fn service_error<E>(operation: &'static str) -> impl FnOnce(E) -> RecognitionError
where
    E: std::error::Error,
{
    move |e| RecognitionError::Service {
        operation,
        message: DisplayErrorContext(e).to_string(),
    }
}

fn to_record(face: &Face, operation: &'static str) -> Result<FaceRecord, RecognitionError> {
    Ok(FaceRecord {
        face_id: face
            .face_id()
            .ok_or(RecognitionError::MissingFaceId { operation })?
            .to_string(),
        external_image_id: face.external_image_id().map(str::to_string),
    })
}

#[async_trait]
impl FaceIndex for RekognitionFaceIndex {
    async fn index_faces(
        &self,
        collection_id: &str,
        bucket: &str,
        key: &str,
        external_image_id: &str,
    ) -> Result<Vec<FaceRecord>, RecognitionError> {
        let image = Image::builder()
            .s3_object(S3Object::builder().bucket(bucket).name(key).build())
            .build();

        let output = self
            .client
            .index_faces()
            .collection_id(collection_id)
            .image(image)
            .external_image_id(external_image_id)
            .send()
            .await
            .map_err(service_error("IndexFaces"))?;

        let records = output
            .face_records()
            .iter()
            .filter_map(|record| record.face())
            .map(|face| to_record(face, "IndexFaces"))
            .collect::<Result<Vec<_>, _>>()?;

        debug!(key, faces = records.len(), "Faces indexed");
        Ok(records)
    }

    async fn search_faces(
        &self,
        collection_id: &str,
        face_id: &str,
        threshold: f32,
    ) -> Result<Vec<FaceHit>, RecognitionError> {
        let output = self
            .client
            .search_faces()
            .collection_id(collection_id)
            .face_id(face_id)
            .face_match_threshold(threshold)
            .send()
            .await
            .map_err(service_error("SearchFaces"))?;

        output
            .face_matches()
            .iter()
            .filter_map(|m| m.face().map(|face| (face, m.similarity().unwrap_or_default())))
            .map(|(face, similarity)| {
                let record = to_record(face, "SearchFaces")?;
                Ok(FaceHit {
                    face_id: record.face_id,
                    external_image_id: record.external_image_id,
                    similarity,
                })
            })
            .collect()
    }

    async fn list_faces(&self, collection_id: &str) -> Result<Vec<FaceRecord>, RecognitionError> {
        let mut faces = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_faces()
                .collection_id(collection_id)
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(service_error("ListFaces"))?;

            for face in output.faces() {
                faces.push(to_record(face, "ListFaces")?);
            }

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(faces)
    }

    async fn delete_faces(
        &self,
        collection_id: &str,
        face_ids: &[String],
    ) -> Result<Vec<String>, RecognitionError> {
        let output = self
            .client
            .delete_faces()
            .collection_id(collection_id)
            .set_face_ids(Some(face_ids.to_vec()))
            .send()
            .await
            .map_err(service_error("DeleteFaces"))?;

        Ok(output.deleted_faces().to_vec())
    }

    async fn create_collection(&self, collection_id: &str) -> Result<(), RecognitionError> {
        let output = self
            .client
            .create_collection()
            .collection_id(collection_id)
            .send()
            .await
            .map_err(service_error("CreateCollection"))?;

        debug!(collection_id, arn = ?output.collection_arn(), "Collection created");
        Ok(())
    }

    async fn delete_collection(&self, collection_id: &str) -> Result<(), RecognitionError> {
        self.client
            .delete_collection()
            .collection_id(collection_id)
            .send()
            .await
            .map_err(service_error("DeleteCollection"))?;
        Ok(())
    }

    async fn list_collections(&self) -> Result<Vec<String>, RecognitionError> {
        let mut collections = Vec::new();
        let mut next_token: Option<String> = None;

        loop {
            let output = self
                .client
                .list_collections()
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(service_error("ListCollections"))?;

            collections.extend(output.collection_ids().iter().cloned());

            match output.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        Ok(collections)
    }
}
