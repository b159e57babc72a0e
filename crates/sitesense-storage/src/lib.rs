//! S3-compatible object store client for processed videos.
//!
//! This crate provides:
//! - File and byte upload to a MinIO or S3 bucket
//! - Public and presigned URL generation
//! - Object deletion and existence checks
//! - Connectivity probing for readiness checks

pub mod client;
pub mod error;
pub mod operations;

pub use client::{ObjectStoreClient, StoreConfig, DEFAULT_BUCKET};
pub use error::{StorageError, StorageResult};
pub use operations::{upload_processed_video, ProcessedUpload};
