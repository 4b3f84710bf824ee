//! Client for the facefind HTTP API
//!
//! The CLI runs upload batches locally and records `{imageId, key}` rows
//! through `POST /api/image-entry`, so it needs no database credentials.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::json;
use tracing::debug;

use crate::db::{DbError, ImageEntryStore};
use crate::models::ImageEntry;
use crate::signing::UploadSignature;
use crate::types::ApiResponse;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Server error: {0}")]
    ServerError(String),
}

#[derive(Clone)]
pub struct ApiClient {
    base_url: String,
    http: reqwest::Client,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http: reqwest::Client::new(),
        }
    }

    async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, ClientError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "API request");

        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        // Error envelopes come back with a 5xx status, so parse before checking it.
        let envelope: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))?;

        envelope.into_result().map_err(ClientError::ServerError)
    }

    pub async fn get_upload_signature(
        &self,
        bucket_name: &str,
        prefix: &str,
    ) -> Result<UploadSignature, ClientError> {
        self.post(
            "/api/get-upload-signature",
            &json!({ "bucketName": bucket_name, "prefix": prefix }),
        )
        .await
    }

    /// Ask the API to sign an upload policy for `bucket` before a batch
    /// starts. A server that cannot sign cannot take the batch either.
    pub async fn check_upload_access(&self, bucket: &str) -> Result<(), ClientError> {
        let signature = self.get_upload_signature(bucket, "").await?;
        debug!(bucket, access_key = %signature.aws_access_key_id, "Upload signature granted");
        Ok(())
    }

    pub async fn save_image_entry(&self, image_id: &str, key: &str) -> Result<ImageEntry, ClientError> {
        self.post("/api/image-entry", &json!({ "imageId": image_id, "key": key }))
            .await
    }
}

#[async_trait]
impl ImageEntryStore for ApiClient {
    async fn insert(&self, image_id: &str, key: &str) -> Result<ImageEntry, DbError> {
        self.save_image_entry(image_id, key)
            .await
            .map_err(|e| DbError::Api(e.to_string()))
    }

    async fn is_healthy(&self) -> bool {
        self.http
            .get(format!("{}/api/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }
}
