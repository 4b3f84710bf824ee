use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;

/// Upload policies and both photo pipelines cap single images at 10MB.
pub const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub aws: AwsConfig,
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub cors_allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Only `serve` needs a database; CLI commands persist through the API.
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Clone, Deserialize)]
pub struct AwsConfig {
    pub bucket: String,
    pub region: String,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub s3_endpoint: Option<String>,
    pub collection_id: String,
}

// Keep the secret out of `Configuration loaded` log lines.
impl std::fmt::Debug for AwsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsConfig")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| "***"))
            .field("s3_endpoint", &self.s3_endpoint)
            .field("collection_id", &self.collection_id)
            .finish()
    }
}

impl AwsConfig {
    /// Public URL of an object uploaded with the public-read ACL.
    pub fn public_url(&self, key: &str) -> String {
        match &self.s3_endpoint {
            Some(endpoint) => format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key),
            None => format!(
                "https://{}.s3.{}.amazonaws.com/{}",
                self.bucket, self.region, key
            ),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    pub api_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .with_context(|| format!("{} must be set", key))
        };

        Ok(Self {
            server: ServerConfig {
                port: var_or("PORT", "3000").parse().context("PORT must be a number")?,
                host: var_or("HOST", "0.0.0.0"),
                cors_allowed_origins: var_or("ALLOWED_ORIGINS", "http://localhost:3000")
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect(),
                max_body_bytes: var_or("MAX_BODY_BYTES", "104857600")
                    .parse()
                    .context("MAX_BODY_BYTES must be a number")?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|v| !v.is_empty()),
                max_connections: var_or("DB_MAX_CONNECTIONS", "10")
                    .parse()
                    .context("DB_MAX_CONNECTIONS must be a number")?,
                min_connections: var_or("DB_MIN_CONNECTIONS", "1")
                    .parse()
                    .context("DB_MIN_CONNECTIONS must be a number")?,
            },
            aws: AwsConfig {
                bucket: required("AWS_BUCKET_NAME")?,
                region: var_or("AWS_REGION", "us-east-1"),
                access_key_id: lookup("AWS_ACCESS_KEY_ID"),
                secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
                s3_endpoint: lookup("S3_ENDPOINT"),
                collection_id: required("REKOGNITION_COLLECTION_ID")?,
            },
            client: ClientConfig {
                api_base_url: var_or("API_BASE_URL", "http://localhost:3000"),
            },
        })
    }
}
