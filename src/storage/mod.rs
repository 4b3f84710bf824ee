// Object storage for uploaded photos (S3-compatible)

use async_trait::async_trait;
use thiserror::Error;

pub mod s3_client;

pub use s3_client::S3ObjectStore;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage configuration error: {0}")]
    Config(String),

    #[error("Upload of {key} failed: {message}")]
    Upload { key: String, message: String },

    #[error("Delete of {key} failed: {message}")]
    Delete { key: String, message: String },
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` under `key`, publicly readable.
    async fn put_object(&self, key: &str, data: &[u8], content_type: &str) -> Result<(), StorageError>;

    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// Bucket that object references handed to the recognition service point at
    fn bucket(&self) -> &str;
}
