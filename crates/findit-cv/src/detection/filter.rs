//! Per-frame candidate filtering

use crate::objects::ObjectCollection;
use findit_core::{DetectedObject, DetectionFrame};

/// Drop weak and unnamed detections, keep the strongest candidates.
///
/// Objects with `confidence <= confidence_floor` are removed, as are objects
/// whose raw label is blank or the model's "unknown" placeholder (compared
/// case-insensitively; the synonym table is not consulted, so raw labels
/// never map onto "unknown"). The rest are sorted by descending confidence
/// and capped at `max_results`.
pub fn filter_frame(
    frame: &DetectionFrame,
    confidence_floor: f64,
    max_results: usize,
) -> Vec<DetectedObject> {
    frame
        .objects
        .iter()
        .cloned()
        .collect::<ObjectCollection>()
        .filter_above(confidence_floor)
        .without_unknown()
        .sort_by_confidence()
        .truncate(max_results)
        .into_vec()
}

/// Frame filter bound to one floor and result cap
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameFilter {
    pub confidence_floor: f64,
    pub max_results: usize,
}

impl FrameFilter {
    pub fn new(confidence_floor: f64, max_results: usize) -> Self {
        Self {
            confidence_floor,
            max_results,
        }
    }

    pub fn apply(&self, frame: &DetectionFrame) -> Vec<DetectedObject> {
        filter_frame(frame, self.confidence_floor, self.max_results)
    }
}
