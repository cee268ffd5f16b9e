use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UNKNOWN_LABEL;

/// Axis-aligned box in the coordinate space of the sampled frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> f32 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Center point as (x, y)
    pub fn center(&self) -> (f32, f32) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Intersection over union with another box
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let x1 = self.x.max(other.x);
        let y1 = self.y.max(other.y);
        let x2 = (self.x + self.width).min(other.x + other.width);
        let y2 = (self.y + self.height).min(other.y + other.height);

        if x2 <= x1 || y2 <= y1 {
            return 0.0;
        }

        let intersection = (x2 - x1) * (y2 - y1);
        let union = self.area() + other.area() - intersection;
        if union <= 0.0 {
            return 0.0;
        }

        intersection / union
    }
}

/// One raw observation emitted by the detection model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub bounding_box: BoundingBox,
}

impl DetectedObject {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
            bounding_box: BoundingBox::default(),
        }
    }

    pub fn with_box(mut self, bounding_box: BoundingBox) -> Self {
        self.bounding_box = bounding_box;
        self
    }

    /// True when the model could not name the object: the raw label is blank
    /// or equals "unknown" ignoring case and surrounding whitespace.
    pub fn is_unknown(&self) -> bool {
        let label = self.label.trim();
        label.is_empty() || label.eq_ignore_ascii_case(UNKNOWN_LABEL)
    }
}

/// Everything the model reported for a single sampled video frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub objects: Vec<DetectedObject>,
    pub observed_at: DateTime<Utc>,
}

impl DetectionFrame {
    pub fn new(objects: Vec<DetectedObject>, observed_at: DateTime<Utc>) -> Self {
        Self {
            objects,
            observed_at,
        }
    }

    /// Frame with no detections, used when the model is unavailable.
    pub fn empty(observed_at: DateTime<Utc>) -> Self {
        Self::new(Vec::new(), observed_at)
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}
