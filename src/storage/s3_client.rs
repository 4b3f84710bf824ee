use async_trait::async_trait;
use s3::creds::Credentials;
use s3::region::Region;
use s3::Bucket;
use tracing::debug;

use super::{ObjectStore, StorageError};
use crate::config::AwsConfig;

pub struct S3ObjectStore {
    bucket: Bucket,
}

impl S3ObjectStore {
    pub fn new(config: &AwsConfig) -> Result<Self, StorageError> {
        let region = match &config.s3_endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Config(format!("invalid region {}: {}", config.region, e)))?,
        };

        let credentials = match (&config.access_key_id, &config.secret_access_key) {
            (Some(id), Some(secret)) => Credentials::new(Some(id.as_str()), Some(secret.as_str()), None, None, None),
            _ => Credentials::default(),
        }
        .map_err(|e| StorageError::Config(e.to_string()))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        if config.s3_endpoint.is_some() {
            bucket.set_path_style();
        }
        bucket.add_header("x-amz-acl", "public-read");

        Ok(Self { bucket })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, data, content_type)
            .await
            .map_err(|e| StorageError::Upload {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::Upload {
                key: key.to_string(),
                message: format!("unexpected status {}", status),
            });
        }

        debug!(key, bytes = data.len(), "Object uploaded");
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> Result<(), StorageError> {
        let response = self
            .bucket
            .delete_object(key)
            .await
            .map_err(|e| StorageError::Delete {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::Delete {
                key: key.to_string(),
                message: format!("unexpected status {}", status),
            });
        }

        debug!(key, "Object deleted");
        Ok(())
    }

    fn bucket(&self) -> &str {
        &self.bucket.name
    }
}
