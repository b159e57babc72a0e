//! Detected-object labels.
//!
//! Labels come from an upstream detector and are treated as opaque strings.
//! Only the three labels below map to visual effects; anything else passes
//! through without changing the output.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Label that triggers the person tint effect.
pub const LABEL_PERSON: &str = "person";
/// Label that triggers the car border effect.
pub const LABEL_CAR: &str = "car";
/// Label that triggers the animal tint effect.
pub const LABEL_ANIMAL: &str = "animal";

/// A set of detected-object labels for one processing request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectLabels(BTreeSet<String>);

impl ObjectLabels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse labels from the `object_types` form field (a JSON string array).
    /// An empty field yields an empty set.
    pub fn parse_json(raw: &str) -> Result<Self, serde_json::Error> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        let labels: Vec<String> = serde_json::from_str(raw)?;
        Ok(Self(labels.into_iter().collect()))
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn insert(&mut self, label: impl Into<String>) {
        self.0.insert(label.into());
    }
}

impl<S: Into<String>> FromIterator<S> for ObjectLabels {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}
