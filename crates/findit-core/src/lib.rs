//! Findit core data model
//!
//! Detection records produced by the external model and the synonym table
//! that maps game-level targets onto raw model vocabulary.

pub mod error;
pub mod objects;
pub mod synonyms;
pub mod target;

pub use error::SynonymError;
pub use objects::{BoundingBox, DetectedObject, DetectionFrame};
pub use synonyms::{MatchKind, SynonymTable};
pub use target::TargetSpec;

/// Label the detection model emits when it cannot classify a region.
pub const UNKNOWN_LABEL: &str = "unknown";
