//! Session accumulator: hit rate and false-positive candidates
//!
//! Replays evaluated (frame, target) pairs and reports how often the target
//! was visible at match confidence, how confident those matches were, and
//! which other labels kept showing up. Frequent false positives are the
//! input for pruning or extending the synonym table.

use crate::detection::{filter_frame, DiagnosticsConfig, StabilityConfig};
use crate::objects::{ObjectCollection, ObjectStats};
use crate::Result;
use anyhow::Context;
use findit_core::{DetectionFrame, TargetSpec};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Raw label that appeared at qualifying confidence without matching
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FalsePositive {
    pub label: String,
    /// Frames in which the label appeared
    pub frames: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSummary {
    pub total_evaluations: usize,
    pub successful_matches: usize,
    pub hit_rate: f64,
    /// Mean confidence of the best match in matching frames
    pub mean_match_confidence: Option<f64>,
    pub false_positives: Vec<FalsePositive>,
    /// Every detection above the diagnostic floor
    pub detections: ObjectStats,
}

/// Per-record contribution to the summary
#[derive(Debug, Default)]
struct Tally {
    evaluations: usize,
    matches: usize,
    confidence_sum: f64,
    false_positives: BTreeMap<String, usize>,
    detections: ObjectCollection,
}

impl Tally {
    fn merge(mut self, other: Tally) -> Tally {
        self.evaluations += other.evaluations;
        self.matches += other.matches;
        self.confidence_sum += other.confidence_sum;
        for (label, count) in other.false_positives {
            *self.false_positives.entry(label).or_insert(0) += count;
        }
        self.detections.extend(other.detections);
        self
    }
}

#[derive(Debug, Clone)]
pub struct SessionAccumulator {
    match_floor: f64,
    max_results: usize,
    config: DiagnosticsConfig,
}

impl SessionAccumulator {
    pub fn new(stability: &StabilityConfig, config: DiagnosticsConfig) -> Self {
        Self {
            match_floor: stability.confidence_floor,
            max_results: stability.max_results,
            config,
        }
    }

    fn tally(&self, frame: &DetectionFrame, target: &TargetSpec) -> Tally {
        let mut tally = Tally {
            evaluations: 1,
            ..Default::default()
        };

        let candidates = filter_frame(frame, self.match_floor, self.max_results);
        if let Some((best, _)) = target.best_match(&candidates) {
            tally.matches = 1;
            tally.confidence_sum = best.confidence;
        }

        // Looser floor, no cap: every plausible distractor counts.
        let loose = filter_frame(frame, self.config.confidence_floor, usize::MAX);
        let mut seen = BTreeSet::new();
        for object in &loose {
            if target.match_kind(&object.label).is_none() {
                seen.insert(object.label.trim().to_lowercase());
            }
        }
        for label in seen {
            tally.false_positives.insert(label, 1);
        }
        tally.detections = ObjectCollection::from_vec(loose);

        tally
    }

    /// Summarize past evaluations. Pure; no effect on live state.
    pub fn summarize(&self, records: &[(DetectionFrame, TargetSpec)]) -> SessionSummary {
        #[cfg(feature = "parallel")]
        let tally = {
            use rayon::prelude::*;
            records
                .par_iter()
                .map(|(frame, target)| self.tally(frame, target))
                .reduce(Tally::default, Tally::merge)
        };

        #[cfg(not(feature = "parallel"))]
        let tally = records
            .iter()
            .map(|(frame, target)| self.tally(frame, target))
            .fold(Tally::default(), Tally::merge);

        self.finish(tally)
    }

    fn finish(&self, tally: Tally) -> SessionSummary {
        let mut false_positives: Vec<FalsePositive> = tally
            .false_positives
            .into_iter()
            .map(|(label, frames)| FalsePositive { label, frames })
            .collect();
        // Stable sort keeps alphabetical order among equal counts.
        false_positives.sort_by(|a, b| b.frames.cmp(&a.frames));
        false_positives.truncate(self.config.top_false_positives);

        let hit_rate = if tally.evaluations == 0 {
            0.0
        } else {
            tally.matches as f64 / tally.evaluations as f64
        };

        SessionSummary {
            total_evaluations: tally.evaluations,
            successful_matches: tally.matches,
            hit_rate,
            mean_match_confidence: (tally.matches > 0)
                .then(|| tally.confidence_sum / tally.matches as f64),
            false_positives,
            detections: tally.detections.stats(),
        }
    }
}

impl SessionSummary {
    /// Export the summary as pretty JSON
    pub fn export_json(&self, output_path: &Path) -> Result<()> {
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize session summary")?;

        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write JSON to: {:?}", output_path))?;

        Ok(())
    }
}
