//! FFmpeg filter-graph construction for the external transcoder path.

use sitesense_models::{Dimensions, ObjectLabels, LABEL_ANIMAL, LABEL_CAR, LABEL_PERSON};

/// Drawtext watermark stamped on every transcoded output.
const WATERMARK_FILTER: &str =
    "drawtext=text='PROCESSED':x=30:y=30:fontsize=24:fontcolor=white:alpha=0.8";

/// Per-label filter fragments, applied in table order so the chain is
/// deterministic regardless of how the caller ordered the labels.
const LABEL_FILTERS: &[(&str, &str)] = &[
    (LABEL_PERSON, "colorbalance=bs=0.1"),
    (LABEL_CAR, "eq=contrast=1.1"),
    (LABEL_ANIMAL, "colorbalance=gs=0.1"),
];

/// Build the full `-vf` filter chain for one transcode.
///
/// Always starts with a scale to the normalized dimensions and ends with the
/// watermark; label effects sit in between.
pub fn build_filter_chain(dimensions: Dimensions, labels: &ObjectLabels) -> String {
    let mut parts = Vec::with_capacity(2 + LABEL_FILTERS.len());
    parts.push(format!(
        "scale={}:{}",
        dimensions.width, dimensions.height
    ));

    for (label, filter) in LABEL_FILTERS {
        if labels.contains(label) {
            parts.push((*filter).to_string());
        }
    }

    parts.push(WATERMARK_FILTER.to_string());
    parts.join(",")
}
