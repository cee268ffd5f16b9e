//! Detection pipeline: filtering, debouncing, and the model source

pub mod config;
pub mod filter;
pub mod source;
pub mod tracker;

pub use config::{
    ConfigError, DiagnosticsConfig, FinderConfig, SamplingConfig, StabilityConfig, TimeoutConfig,
};
pub use filter::{filter_frame, FrameFilter};
pub use source::{DetectionSource, ScriptedDetector, SourceVariant};
pub use tracker::{DetectionHistory, DetectionStatus, StabilityTracker};
