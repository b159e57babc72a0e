//! API error types.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use sitesense_media::MediaError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Processing failed: {0}")]
    Media(#[from] MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] sitesense_storage::StorageError),
}

impl ApiError {
    pub fn invalid_upload(msg: impl Into<String>) -> Self {
        Self::InvalidUpload(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidUpload(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            // Invalid video content is the caller's fault, everything else
            // in the pipeline is ours.
            ApiError::Media(e) if e.is_input_error() => StatusCode::BAD_REQUEST,
            ApiError::Media(_) | ApiError::Internal(_) | ApiError::Storage(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Don't expose internal error details in production
        let detail = if status == StatusCode::INTERNAL_SERVER_ERROR
            && std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse { detail };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unreadable_source_is_client_error() {
        let err = ApiError::from(MediaError::unreadable("bad container"));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn encoding_exhaustion_is_server_error() {
        let err = ApiError::from(MediaError::EncodingFailed("all failed".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn invalid_upload_is_client_error() {
        let err = ApiError::invalid_upload("extension not allowed");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
