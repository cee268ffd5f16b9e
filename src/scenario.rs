//! Scripted play scenarios loaded from JSON

use anyhow::{Context, Result};
use findit_core::DetectedObject;
use findit_cv::ScriptedDetector;
use serde::Deserialize;
use std::path::Path;

/// A recorded or hand-written run: the target and what the model saw on
/// each sampled frame.
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub target: String,
    #[serde(default)]
    pub frames: Vec<Vec<DetectedObject>>,
}

impl Scenario {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {:?}", path))?;
        let scenario: Scenario = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse scenario: {:?}", path))?;
        Ok(scenario)
    }

    pub fn detector(&self) -> ScriptedDetector {
        ScriptedDetector::new("scenario", self.frames.clone())
    }
}
