//! Findit detection confirmation engine
//!
//! Turns noisy per-frame object detections into a debounced "target found"
//! signal and keeps blocking mini-game tasks from getting stuck.

pub mod camera;
pub mod detection;
pub mod diagnostics;
pub mod guard;
pub mod objects;
pub mod session;

// Re-export commonly used types
pub use camera::StillCamera;
pub use detection::{
    DetectionSource, DetectionStatus, FinderConfig, FrameFilter, ScriptedDetector, SourceVariant,
    StabilityTracker,
};
pub use diagnostics::{SessionAccumulator, SessionSummary};
pub use guard::{GuardEvent, IntervalTimer, TaskId, TaskOutcome, TaskTimeoutGuard};
pub use objects::{ObjectCollection, ObjectStats};
pub use session::{PlaySession, SessionEvent};

// Error handling
pub type Result<T> = anyhow::Result<T>;

/// Seams to the external collaborators
pub mod traits {
    use super::*;
    use findit_core::DetectedObject;
    use image::RgbImage;

    /// Black-box object detection model.
    ///
    /// `detect` returns an empty vector when nothing is found. An `Err` means
    /// the model itself is unavailable and is treated as a hard failure.
    pub trait ObjectDetector {
        fn name(&self) -> &str;

        /// Load or initialize the model.
        fn warm_up(&mut self) -> Result<()> {
            Ok(())
        }

        fn detect(&mut self, frame: &RgbImage) -> Result<Vec<DetectedObject>>;
    }

    /// Live video stream handed over by the permission provider.
    pub trait CameraFeed {
        fn capture(&mut self) -> Result<RgbImage>;

        /// Stop the stream. Called exactly once on teardown.
        fn release(&mut self);
    }
}
