//! Detection source selected once at startup
//!
//! The primary model is warmed up first; if that fails the fallback model is
//! used for the rest of the session. Whichever variant is chosen is exposed
//! for diagnostics. A model that fails at inference time is marked
//! unavailable and every later frame is reported empty until `recover`
//! succeeds, so a broken model is not hammered once per frame.

use crate::traits::ObjectDetector;
use crate::Result;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use findit_core::{DetectedObject, DetectionFrame};
use image::RgbImage;
use log::{info, warn};
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SourceVariant {
    Primary,
    Fallback,
}

pub struct DetectionSource {
    variant: SourceVariant,
    detector: Box<dyn ObjectDetector>,
    available: bool,
}

impl DetectionSource {
    /// Pick the detection backend for this session.
    ///
    /// Never fails: when no model can be loaded the source is returned in
    /// the unavailable state and yields empty frames.
    pub fn select(
        mut primary: Box<dyn ObjectDetector>,
        fallback: Option<Box<dyn ObjectDetector>>,
    ) -> Self {
        let primary_err = match primary.warm_up() {
            Ok(()) => {
                info!("detection source: using primary model '{}'", primary.name());
                return Self {
                    variant: SourceVariant::Primary,
                    detector: primary,
                    available: true,
                };
            }
            Err(err) => err,
        };

        warn!(
            "primary model '{}' failed to load: {:#}",
            primary.name(),
            primary_err
        );

        let Some(mut fallback) = fallback else {
            return Self {
                variant: SourceVariant::Primary,
                detector: primary,
                available: false,
            };
        };

        let available = match fallback.warm_up() {
            Ok(()) => {
                info!("detection source: using fallback model '{}'", fallback.name());
                true
            }
            Err(err) => {
                warn!(
                    "fallback model '{}' failed to load: {:#}; frames will be empty",
                    fallback.name(),
                    err
                );
                false
            }
        };

        Self {
            variant: SourceVariant::Fallback,
            detector: fallback,
            available,
        }
    }

    pub fn variant(&self) -> SourceVariant {
        self.variant
    }

    pub fn detector_name(&self) -> &str {
        self.detector.name()
    }

    pub fn is_available(&self) -> bool {
        self.available
    }

    /// Run the model on one frame. Model failures degrade to an empty frame.
    pub fn detect_frame(&mut self, image: &RgbImage, observed_at: DateTime<Utc>) -> DetectionFrame {
        if !self.available {
            return DetectionFrame::empty(observed_at);
        }

        match self.detector.detect(image) {
            Ok(objects) => DetectionFrame::new(objects, observed_at),
            Err(err) => {
                warn!(
                    "model '{}' unavailable, treating frames as empty: {:#}",
                    self.detector.name(),
                    err
                );
                self.available = false;
                DetectionFrame::empty(observed_at)
            }
        }
    }

    /// Retry loading the chosen model after a failure.
    pub fn recover(&mut self) -> bool {
        if self.available {
            return true;
        }
        match self.detector.warm_up() {
            Ok(()) => {
                info!("model '{}' recovered", self.detector.name());
                self.available = true;
            }
            Err(err) => warn!("model '{}' still unavailable: {:#}", self.detector.name(), err),
        }
        self.available
    }
}

impl std::fmt::Debug for DetectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectionSource")
            .field("variant", &self.variant)
            .field("detector", &self.detector.name())
            .field("available", &self.available)
            .finish()
    }
}

/// Detector that replays a fixed list of per-frame detections.
///
/// Once the script is exhausted every call returns an empty list.
#[derive(Debug, Clone, Default)]
pub struct ScriptedDetector {
    name: String,
    frames: VecDeque<Vec<DetectedObject>>,
    fail_warm_up: bool,
    fail_after: Option<usize>,
    calls: usize,
}

impl ScriptedDetector {
    pub fn new(name: impl Into<String>, frames: Vec<Vec<DetectedObject>>) -> Self {
        Self {
            name: name.into(),
            frames: frames.into(),
            ..Default::default()
        }
    }

    /// Detector whose model never loads
    pub fn unloadable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fail_warm_up: true,
            ..Default::default()
        }
    }

    /// Fail with a model error from the `calls`-th detect call on
    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    /// Number of `detect` invocations so far
    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl ObjectDetector for ScriptedDetector {
    fn name(&self) -> &str {
        &self.name
    }

    fn warm_up(&mut self) -> Result<()> {
        if self.fail_warm_up {
            return Err(anyhow!("model '{}' could not be loaded", self.name));
        }
        Ok(())
    }

    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<DetectedObject>> {
        self.calls += 1;
        if self.fail_after.is_some_and(|limit| self.calls > limit) {
            return Err(anyhow!("model '{}' stopped responding", self.name));
        }
        Ok(self.frames.pop_front().unwrap_or_default())
    }
}
