//! Shared data models for the SiteSense backend.
//!
//! This crate provides Serde-serializable types for:
//! - Frame geometry and encoder-compatible dimension normalization
//! - Object detection labels driving visual effects
//! - Encoding configuration and safety limits
//! - The per-run encode request descriptor

pub mod encoding;
pub mod geometry;
pub mod labels;
pub mod request;

// Re-export common types
pub use encoding::EncodingConfig;
pub use geometry::{normalize_dimensions, Dimensions, GeometryError};
pub use labels::{ObjectLabels, LABEL_ANIMAL, LABEL_CAR, LABEL_PERSON};
pub use request::{EncodeRequest, SafetyLimits};
