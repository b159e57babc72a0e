//! Higher-level storage operations for the processing pipeline.

use std::path::Path;

use tracing::info;

use crate::client::ObjectStoreClient;
use crate::error::StorageResult;

/// Where a processed video ended up.
#[derive(Debug, Clone)]
pub struct ProcessedUpload {
    /// Object key within the bucket
    pub key: String,
    /// Public URL of the object
    pub url: String,
}

/// Upload a processed video and return its location.
///
/// The key is the artifact's file name, so retries with the same artifact
/// overwrite rather than accumulate.
pub async fn upload_processed_video(
    client: &ObjectStoreClient,
    path: impl AsRef<Path>,
) -> StorageResult<ProcessedUpload> {
    let path = path.as_ref();
    let key = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "processed.mp4".to_string());

    client.upload_file(path, &key, "video/mp4").await?;

    let url = client.public_url(&key);
    info!(key, url, "Processed video stored");

    Ok(ProcessedUpload { key, url })
}
