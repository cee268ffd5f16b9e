//! Randomized stand-in for the detection model

use anyhow::Result;
use findit_core::{BoundingBox, DetectedObject};
use findit_cv::traits::ObjectDetector;
use image::RgbImage;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DISTRACTORS: &[&str] = &["person", "chair", "bowl", "book", "bottle", "unknown"];

/// Emits the target label with jittery confidence plus random distractors,
/// roughly what a live model does on a webcam feed.
pub struct SimulatedDetector {
    rng: StdRng,
    target_label: String,
    visibility: f64,
}

impl SimulatedDetector {
    pub fn new(target_label: &str, visibility: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            target_label: target_label.to_string(),
            visibility: visibility.clamp(0.0, 1.0),
        }
    }

    fn random_box(&mut self, width: u32, height: u32) -> BoundingBox {
        let w = self.rng.gen_range(0.1..0.4) * width as f32;
        let h = self.rng.gen_range(0.1..0.4) * height as f32;
        BoundingBox::new(
            self.rng.gen_range(0.0..(width as f32 - w).max(1.0)),
            self.rng.gen_range(0.0..(height as f32 - h).max(1.0)),
            w,
            h,
        )
    }
}

impl ObjectDetector for SimulatedDetector {
    fn name(&self) -> &str {
        "simulated"
    }

    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<DetectedObject>> {
        let (width, height) = frame.dimensions();
        let mut objects = Vec::new();

        if self.rng.gen_bool(self.visibility) {
            let confidence = self.rng.gen_range(0.40..0.95);
            let bbox = self.random_box(width, height);
            objects.push(DetectedObject::new(self.target_label.clone(), confidence).with_box(bbox));
        }

        for _ in 0..self.rng.gen_range(0..3) {
            let label = DISTRACTORS[self.rng.gen_range(0..DISTRACTORS.len())];
            let confidence = self.rng.gen_range(0.10..0.75);
            let bbox = self.random_box(width, height);
            objects.push(DetectedObject::new(label, confidence).with_box(bbox));
        }

        Ok(objects)
    }
}
