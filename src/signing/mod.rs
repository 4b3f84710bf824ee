//! Browser upload policies for direct-to-S3 POST uploads
//!
//! A policy document restricts what the browser may upload and where:
//! - target bucket and a key prefix
//! - public-read ACL
//! - `image/*` content types only
//! - at most 10MB per object
//! - valid for 12 hours from generation
//!
//! The base64-encoded policy is signed with HMAC-SHA1 using the AWS secret
//! key, following the legacy (SigV2) browser POST form.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha1::Sha1;
use thiserror::Error;

use crate::config::MAX_IMAGE_BYTES;

type HmacSha1 = Hmac<Sha1>;

/// Hours a policy stays valid
pub const POLICY_TTL_HOURS: i64 = 12;

#[derive(Error, Debug)]
pub enum SigningError {
    #[error("AWS credentials not configured")]
    MissingCredentials,

    #[error("Policy serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Signed policy handed to the uploader. Field names follow the S3 POST form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadSignature {
    #[serde(rename = "AWSAccessKeyID")]
    pub aws_access_key_id: String,
    #[serde(rename = "PolicyDocument")]
    pub policy_document: String,
    #[serde(rename = "PolicyDocumentSignature")]
    pub policy_document_signature: String,
}

pub struct PolicySigner {
    access_key_id: String,
    secret_access_key: String,
}

impl PolicySigner {
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
        }
    }

    /// Signer for the configured credentials, if both halves are present.
    pub fn from_config(aws: &crate::config::AwsConfig) -> Result<Self, SigningError> {
        match (&aws.access_key_id, &aws.secret_access_key) {
            (Some(id), Some(secret)) if !secret.is_empty() => Ok(Self::new(id, secret)),
            _ => Err(SigningError::MissingCredentials),
        }
    }

    /// Sign a policy for `bucket`/`prefix` that expires 12 hours after `now`.
    pub fn sign(
        &self,
        bucket: &str,
        prefix: &str,
        now: DateTime<Utc>,
    ) -> Result<UploadSignature, SigningError> {
        let policy = policy_document(bucket, prefix, now);
        let encoded = STANDARD.encode(serde_json::to_vec(&policy)?);
        let signature = sign_policy(&encoded, &self.secret_access_key);

        Ok(UploadSignature {
            aws_access_key_id: self.access_key_id.clone(),
            policy_document: encoded,
            policy_document_signature: signature,
        })
    }
}

/// The unsigned policy. Fields serialize in declaration order, so the
/// encoded bytes always start with `expiration`.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyDocument {
    pub expiration: String,
    pub conditions: Vec<serde_json::Value>,
}

pub fn policy_document(bucket: &str, prefix: &str, now: DateTime<Utc>) -> PolicyDocument {
    let expiration = now + Duration::hours(POLICY_TTL_HOURS);

    PolicyDocument {
        expiration: expiration.to_rfc3339_opts(SecondsFormat::Millis, true),
        conditions: vec![
            json!({ "bucket": bucket }),
            json!({ "acl": "public-read" }),
            json!({ "success_action_status": "201" }),
            json!(["starts-with", "$Content-Type", "image/"]),
            json!(["starts-with", "$Filename", ""]),
            json!(["starts-with", "$name", ""]),
            json!(["starts-with", "$key", prefix]),
            json!(["content-length-range", 0, MAX_IMAGE_BYTES]),
            json!(["starts-with", "$chunk", ""]),
            json!(["starts-with", "$chunks", ""]),
        ],
    }
}

/// Base64 HMAC-SHA1 of the encoded policy
pub fn sign_policy(encoded_policy: &str, secret: &str) -> String {
    let mut mac = HmacSha1::new_from_slice(secret.as_bytes())
        .expect("HMAC can take key of any size");
    mac.update(encoded_policy.as_bytes());
    STANDARD.encode(mac.finalize().into_bytes())
}
