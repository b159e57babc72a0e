//! Video processing handlers.
//!
//! Both endpoints accept the same multipart upload (`file` + `object_types`)
//! and run the pipeline; they differ only in where the artifact goes. The
//! upload sink stores it in the object store and returns its URL, the
//! streaming sink sends the MP4 straight back as a download.

use std::time::Instant;

use axum::extract::{Multipart, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::info;

use sitesense_models::ObjectLabels;
use sitesense_storage::upload_processed_video;

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Upload extensions accepted for processing.
const ALLOWED_EXTENSIONS: &[&str] = &["mp4", "mov", "avi"];

/// Parsed multipart upload.
struct UploadedVideo {
    bytes: Vec<u8>,
    extension: String,
    labels: ObjectLabels,
}

/// Response for the store-and-return-URL endpoint.
#[derive(Serialize)]
pub struct ProcessVideoResponse {
    pub status: String,
    pub processed_url: String,
    pub object_types: ObjectLabels,
    pub message: String,
    pub encoding_info: EncodingInfo,
}

#[derive(Serialize)]
pub struct EncodingInfo {
    pub strategy: String,
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub size_bytes: u64,
}

/// `POST /api/process-video` - process an upload and store the result.
pub async fn process_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Json<ProcessVideoResponse>> {
    let upload = read_upload(multipart).await?;
    let labels = upload.labels.clone();

    let started = Instant::now();
    let artifact = state
        .pipeline
        .process(&upload.bytes, &upload.extension, upload.labels)
        .await?;
    metrics::record_video_processed(artifact.strategy, started.elapsed().as_secs_f64());

    let upload_started = Instant::now();
    let stored = upload_processed_video(&state.storage, artifact.path()).await?;
    metrics::record_upload_duration(upload_started.elapsed().as_secs_f64());

    info!(
        key = stored.key,
        strategy = artifact.strategy,
        bytes = artifact.bytes,
        "Video processed and stored"
    );

    Ok(Json(ProcessVideoResponse {
        status: "success".to_string(),
        processed_url: stored.url,
        object_types: labels,
        message: format!("Video processed with {} encoder", artifact.strategy),
        encoding_info: EncodingInfo {
            strategy: artifact.strategy.to_string(),
            width: artifact.source.width,
            height: artifact.source.height,
            fps: artifact.source.fps,
            size_bytes: artifact.bytes,
        },
    }))
}

/// `POST /api/detect/video` - process an upload and stream the MP4 back.
pub async fn detect_video(
    State(state): State<AppState>,
    multipart: Multipart,
) -> ApiResult<Response> {
    let upload = read_upload(multipart).await?;

    let started = Instant::now();
    let artifact = state
        .pipeline
        .process(&upload.bytes, &upload.extension, upload.labels)
        .await?;
    metrics::record_video_processed(artifact.strategy, started.elapsed().as_secs_f64());

    // Buffer the body so the scratch dir can be dropped before responding.
    let body = artifact.read_bytes().await?;

    info!(
        strategy = artifact.strategy,
        bytes = artifact.bytes,
        "Video processed, streaming back"
    );

    Ok((
        [
            (header::CONTENT_TYPE, "video/mp4".to_string()),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"result.mp4\"".to_string(),
            ),
        ],
        body,
    )
        .into_response())
}

/// Read the multipart upload into memory, validating as we go.
async fn read_upload(mut multipart: Multipart) -> ApiResult<UploadedVideo> {
    let mut bytes: Option<Vec<u8>> = None;
    let mut extension: Option<String> = None;
    let mut labels = ObjectLabels::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::invalid_upload(format!("malformed multipart body: {}", e)))?
    {
        match field.name() {
            Some("file") => {
                let filename = field
                    .file_name()
                    .ok_or_else(|| ApiError::invalid_upload("file field has no filename"))?
                    .to_string();
                extension = Some(validate_extension(&filename)?);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::invalid_upload(format!("upload read failed: {}", e)))?;
                bytes = Some(data.to_vec());
            }
            Some("object_types") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::bad_request(format!("object_types read failed: {}", e)))?;
                labels = ObjectLabels::parse_json(&text)
                    .map_err(|e| ApiError::bad_request(format!("invalid object_types: {}", e)))?;
            }
            _ => {}
        }
    }

    let bytes = bytes.ok_or_else(|| ApiError::invalid_upload("missing file field"))?;
    if bytes.is_empty() {
        return Err(ApiError::invalid_upload("uploaded file is empty"));
    }
    let extension = extension.ok_or_else(|| ApiError::invalid_upload("missing file field"))?;

    Ok(UploadedVideo {
        bytes,
        extension,
        labels,
    })
}

/// Extract and validate the upload's file extension.
fn validate_extension(filename: &str) -> ApiResult<String> {
    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::invalid_upload("filename has no extension"))?;

    if !ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(ApiError::invalid_upload(format!(
            "extension .{} not allowed (expected one of: {})",
            extension,
            ALLOWED_EXTENSIONS.join(", ")
        )));
    }

    Ok(extension)
}
