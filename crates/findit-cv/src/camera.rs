//! Camera feeds

use crate::traits::CameraFeed;
use crate::Result;
use anyhow::{anyhow, Context};
use image::RgbImage;
use std::path::Path;

/// Feed that serves the same still image on every capture.
///
/// Stands in for a live stream where the detector does not look at pixels
/// (scripted or simulated detectors).
#[derive(Debug, Clone)]
pub struct StillCamera {
    image: RgbImage,
    released: bool,
}

impl StillCamera {
    pub fn new(image: RgbImage) -> Self {
        Self {
            image,
            released: false,
        }
    }

    /// Blank frame of the given size
    pub fn blank(width: u32, height: u32) -> Self {
        Self::new(RgbImage::new(width, height))
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let image = image::open(&path)
            .with_context(|| format!("Failed to open image: {:?}", path.as_ref()))?
            .to_rgb8();
        Ok(Self::new(image))
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl CameraFeed for StillCamera {
    fn capture(&mut self) -> Result<RgbImage> {
        if self.released {
            return Err(anyhow!("camera stream already released"));
        }
        Ok(self.image.clone())
    }

    fn release(&mut self) {
        self.released = true;
    }
}
