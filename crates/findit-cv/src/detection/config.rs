//! Detection configuration

use crate::Result;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Main engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinderConfig {
    pub stability: StabilityConfig,
    pub diagnostics: DiagnosticsConfig,
    pub timeout: TimeoutConfig,
    pub sampling: SamplingConfig,
}

/// Debounce parameters for the stability tracker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Objects at or below this confidence never count
    pub confidence_floor: f64,
    /// Qualifying frames needed inside the window to confirm
    pub required_count: usize,
    pub window_ms: u64,
    /// Candidates considered per frame
    pub max_results: usize,
}

/// Diagnostic accumulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiagnosticsConfig {
    /// Looser floor for collecting false-positive candidates
    pub confidence_floor: f64,
    pub top_false_positives: usize,
}

/// Task timeout guard parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub deadline_ms: u64,
    /// How long the release notice stays visible
    pub notice_ms: u64,
}

/// Play session cadence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    /// Camera capture + model inference period
    pub sample_interval_ms: u64,
    /// Period at which the latest frame is evaluated against the target
    pub detection_tick_ms: u64,
    /// Evaluated frames kept for diagnostics
    pub history_capacity: usize,
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be within [0, 1), got {value}")]
    FloorOutOfRange { field: &'static str, value: f64 },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} must be at most {max} ms, got {value}")]
    TooLong {
        field: &'static str,
        value: u64,
        max: u64,
    },
}

/// Upper bound for every millisecond setting (about 24 days).
pub const MAX_DURATION_MS: u64 = i32::MAX as u64;

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.55,
            required_count: 3,
            window_ms: 2000,
            max_results: 10,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            confidence_floor: 0.25,
            top_false_positives: 3,
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            deadline_ms: 30_000,
            notice_ms: 3_000,
        }
    }
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 300,
            detection_tick_ms: 100,
            history_capacity: 500,
        }
    }
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            stability: StabilityConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            timeout: TimeoutConfig::default(),
            sampling: SamplingConfig::default(),
        }
    }
}

fn check_floor(field: &'static str, value: f64) -> std::result::Result<(), ConfigError> {
    if (0.0..1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::FloorOutOfRange { field, value })
    }
}

fn check_duration(field: &'static str, value: u64) -> std::result::Result<(), ConfigError> {
    check_nonzero(field, value)?;
    if value > MAX_DURATION_MS {
        return Err(ConfigError::TooLong {
            field,
            value,
            max: MAX_DURATION_MS,
        });
    }
    Ok(())
}

fn check_nonzero(field: &'static str, value: u64) -> std::result::Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::Zero { field })
    } else {
        Ok(())
    }
}

impl FinderConfig {
    /// Load from a JSON file; missing sections fall back to defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        let config: FinderConfig = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse config: {:?}", path))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        check_floor("stability.confidence_floor", self.stability.confidence_floor)?;
        check_floor("diagnostics.confidence_floor", self.diagnostics.confidence_floor)?;
        check_nonzero("stability.required_count", self.stability.required_count as u64)?;
        check_duration("stability.window_ms", self.stability.window_ms)?;
        check_nonzero("stability.max_results", self.stability.max_results as u64)?;
        check_duration("timeout.deadline_ms", self.timeout.deadline_ms)?;
        check_duration("timeout.notice_ms", self.timeout.notice_ms)?;
        check_duration("sampling.sample_interval_ms", self.sampling.sample_interval_ms)?;
        check_duration("sampling.detection_tick_ms", self.sampling.detection_tick_ms)?;
        Ok(())
    }

    /// Faster cadence for quick demos and tests
    pub fn responsive() -> Self {
        Self {
            sampling: SamplingConfig {
                sample_interval_ms: 100,
                detection_tick_ms: 50,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
