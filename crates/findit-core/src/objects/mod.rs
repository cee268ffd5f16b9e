//! Per-frame detection records

pub mod detected;

pub use detected::{BoundingBox, DetectedObject, DetectionFrame};
