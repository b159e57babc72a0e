//! S3-compatible object store client.

use std::path::Path;
use std::time::Duration;

use aws_config::BehaviorVersion;
use aws_credential_types::Credentials;
use aws_sdk_s3::config::{Builder, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use tracing::{debug, info};

use crate::error::{StorageError, StorageResult};

/// Default bucket for processed videos.
pub const DEFAULT_BUCKET: &str = "sitesense-processed";

/// Configuration for the object store client.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// S3 API endpoint URL (MinIO or any S3-compatible store)
    pub endpoint_url: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// Bucket name
    pub bucket_name: String,
    /// Region (MinIO accepts any value)
    pub region: String,
    /// Base URL for public object links; defaults to the endpoint
    pub public_base_url: Option<String>,
}

impl StoreConfig {
    /// Create config from environment variables.
    pub fn from_env() -> StorageResult<Self> {
        Ok(Self {
            endpoint_url: std::env::var("STORE_ENDPOINT_URL")
                .map_err(|_| StorageError::config_error("STORE_ENDPOINT_URL not set"))?,
            access_key_id: std::env::var("STORE_ACCESS_KEY_ID")
                .map_err(|_| StorageError::config_error("STORE_ACCESS_KEY_ID not set"))?,
            secret_access_key: std::env::var("STORE_SECRET_ACCESS_KEY")
                .map_err(|_| StorageError::config_error("STORE_SECRET_ACCESS_KEY not set"))?,
            bucket_name: std::env::var("STORE_BUCKET_NAME")
                .unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
            region: std::env::var("STORE_REGION").unwrap_or_else(|_| "us-east-1".to_string()),
            public_base_url: std::env::var("STORE_PUBLIC_BASE_URL").ok(),
        })
    }
}

/// Object store client for processed videos.
#[derive(Clone)]
pub struct ObjectStoreClient {
    client: Client,
    bucket: String,
    public_base_url: String,
}

impl ObjectStoreClient {
    /// Create a new client from configuration.
    pub async fn new(config: StoreConfig) -> StorageResult<Self> {
        let credentials = Credentials::new(
            &config.access_key_id,
            &config.secret_access_key,
            None,
            None,
            "sitesense",
        );

        let sdk_config = Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(&config.endpoint_url)
            .region(Region::new(config.region))
            .credentials_provider(credentials)
            .force_path_style(true)
            .build();

        let client = Client::from_conf(sdk_config);
        let public_base_url = config
            .public_base_url
            .unwrap_or(config.endpoint_url)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            bucket: config.bucket_name,
            public_base_url,
        })
    }

    /// Create from environment variables.
    pub async fn from_env() -> StorageResult<Self> {
        let config = StoreConfig::from_env()?;
        Self::new(config).await
    }

    /// Bucket this client writes to.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload a file.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: &str,
    ) -> StorageResult<()> {
        let path = path.as_ref();
        debug!("Uploading {} to {}", path.display(), key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(body)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| StorageError::upload_failed(e.to_string()))?;

        info!("Uploaded {} to {}", path.display(), key);
        Ok(())
    }

    /// Check whether an object exists.
    pub async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("NotFound") || msg.contains("404") {
                    Ok(false)
                } else {
                    Err(StorageError::DownloadFailed(msg))
                }
            }
        }
    }

    /// Delete an object.
    pub async fn delete_object(&self, key: &str) -> StorageResult<()> {
        debug!("Deleting {}", key);

        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| StorageError::delete_failed(e.to_string()))?;

        Ok(())
    }

    /// Generate a presigned GET URL.
    pub async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presign_config = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presign_config)
            .await
            .map_err(|e| StorageError::PresignFailed(e.to_string()))?;

        Ok(presigned.uri().to_string())
    }

    /// Unsigned public URL for an object, path-style.
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}/{}", self.public_base_url, self.bucket, key)
    }

    /// Verify the bucket is reachable.
    pub async fn check_connectivity(&self) -> StorageResult<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| StorageError::ConnectivityFailed(e.to_string()))?;

        Ok(())
    }
}
