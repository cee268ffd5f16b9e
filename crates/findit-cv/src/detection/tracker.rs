//! Stability tracker: debounces per-frame matches into a confirmation
//!
//! ```text
//! Empty -> Accumulating (1..required-1) -> Confirmed -> Empty
//! ```
//!
//! A target is confirmed once `required_count` qualifying frames fall inside
//! `window_ms` of each other. Stale observations are evicted before a new
//! one is accepted, so a gap longer than the window restarts accumulation.
//! Confirmation stays latched until the history is cleared or every
//! observation has aged out of the window.

use super::config::StabilityConfig;
use super::filter::FrameFilter;
use chrono::{DateTime, Utc};
use findit_core::{DetectedObject, DetectionFrame, MatchKind, TargetSpec};
use log::{debug, info};
use serde::Serialize;
use std::collections::{HashMap, VecDeque};

/// Timestamps of qualifying observations for one semantic target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionHistory {
    observations: VecDeque<DateTime<Utc>>,
    required_count: usize,
    window_ms: u64,
    confirmed: bool,
}

impl DetectionHistory {
    fn new(required_count: usize, window_ms: u64) -> Self {
        Self {
            observations: VecDeque::with_capacity(required_count),
            required_count,
            window_ms,
            confirmed: false,
        }
    }

    /// Drop observations older than the window relative to `now`.
    fn evict(&mut self, now: DateTime<Utc>) {
        let window_ms = i64::try_from(self.window_ms).unwrap_or(i64::MAX);
        while let Some(oldest) = self.observations.front() {
            if (now - *oldest).num_milliseconds() > window_ms {
                self.observations.pop_front();
            } else {
                break;
            }
        }
        if self.observations.is_empty() {
            self.confirmed = false;
        }
    }

    /// Accept one qualifying observation. Returns the confirmed flag.
    fn record(&mut self, observed_at: DateTime<Utc>) -> bool {
        // Observations stay time-ordered even if the caller's clock steps back.
        let now = match self.observations.back() {
            Some(last) if *last > observed_at => *last,
            _ => observed_at,
        };

        self.evict(now);
        self.observations.push_back(now);

        if self.observations.len() >= self.required_count {
            self.confirmed = true;
        }
        while self.observations.len() > self.required_count {
            self.observations.pop_front();
        }

        self.confirmed
    }

    /// Observation count; reported as at least `required_count` once confirmed.
    pub fn progress(&self) -> usize {
        if self.confirmed {
            self.observations.len().max(self.required_count)
        } else {
            self.observations.len()
        }
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn observations(&self) -> impl Iterator<Item = &DateTime<Utc>> {
        self.observations.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Read-only snapshot for UI feedback
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionStatus {
    /// True only while mid-accumulation
    pub is_active: bool,
    pub progress: usize,
    /// Raw label of the best matching object in the frame, if any
    pub resolved_label: Option<String>,
    pub best_match: Option<DetectedObject>,
    pub match_kind: Option<MatchKind>,
}

/// Owns every target's detection history for one play session.
#[derive(Debug, Clone)]
pub struct StabilityTracker {
    config: StabilityConfig,
    filter: FrameFilter,
    histories: HashMap<String, DetectionHistory>,
}

impl StabilityTracker {
    pub fn new(config: StabilityConfig) -> Self {
        let filter = FrameFilter::new(config.confidence_floor, config.max_results);
        Self {
            config,
            filter,
            histories: HashMap::new(),
        }
    }

    pub fn config(&self) -> &StabilityConfig {
        &self.config
    }

    /// Evaluate one frame against `target`. Returns true once confirmed.
    ///
    /// Several matching objects in one frame count as a single observation.
    pub fn evaluate(&mut self, frame: &DetectionFrame, target: &TargetSpec) -> bool {
        let candidates = self.filter.apply(frame);
        let matched = candidates
            .iter()
            .any(|object| target.match_kind(&object.label).is_some());

        if !matched {
            if let Some(history) = self.histories.get_mut(target.semantic()) {
                history.evict(frame.observed_at);
                if history.is_empty() {
                    self.histories.remove(target.semantic());
                }
            }
            return false;
        }

        let required_count = self.config.required_count;
        let window_ms = self.config.window_ms;
        let history = self
            .histories
            .entry(target.semantic().to_string())
            .or_insert_with(|| DetectionHistory::new(required_count, window_ms));

        let was_confirmed = history.is_confirmed();
        let confirmed = history.record(frame.observed_at);

        if confirmed && !was_confirmed {
            info!(
                "target '{}' confirmed after {} observations",
                target.semantic(),
                history.progress()
            );
        } else if !confirmed {
            debug!(
                "target '{}' progress {}/{}",
                target.semantic(),
                history.progress(),
                required_count
            );
        }

        confirmed
    }

    /// Current observation count for `target` (0 without history)
    pub fn progress(&self, target: &TargetSpec) -> usize {
        self.histories
            .get(target.semantic())
            .map(DetectionHistory::progress)
            .unwrap_or(0)
    }

    pub fn is_confirmed(&self, target: &TargetSpec) -> bool {
        self.histories
            .get(target.semantic())
            .is_some_and(DetectionHistory::is_confirmed)
    }

    /// Progress plus the best matching object in `frame`, without mutating history.
    pub fn status(&self, frame: &DetectionFrame, target: &TargetSpec) -> DetectionStatus {
        let progress = self.progress(target);
        let candidates = self.filter.apply(frame);
        let best = target.best_match(&candidates);

        DetectionStatus {
            is_active: progress > 0 && progress < self.config.required_count,
            progress,
            resolved_label: best.map(|(object, _)| object.label.clone()),
            best_match: best.map(|(object, _)| object.clone()),
            match_kind: best.map(|(_, kind)| kind),
        }
    }

    pub fn history(&self, target: &TargetSpec) -> Option<&DetectionHistory> {
        self.histories.get(target.semantic())
    }

    pub fn clear(&mut self, target: &TargetSpec) {
        self.histories.remove(target.semantic());
    }

    pub fn clear_all(&mut self) {
        self.histories.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use findit_core::SynonymTable;

    fn cup() -> TargetSpec {
        TargetSpec::new("cup", &SynonymTable::default()).unwrap()
    }

    fn frame_at(base: DateTime<Utc>, offset_ms: i64, objects: &[(&str, f64)]) -> DetectionFrame {
        DetectionFrame::new(
            objects
                .iter()
                .map(|(label, confidence)| DetectedObject::new(*label, *confidence))
                .collect(),
            base + Duration::milliseconds(offset_ms),
        )
    }

    #[test]
    fn test_three_frames_confirm() {
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        let target = cup();
        let t0 = Utc::now();

        let f1 = frame_at(t0, 0, &[("cup", 0.60)]);
        assert!(!tracker.evaluate(&f1, &target));
        assert_eq!(tracker.progress(&target), 1);

        let f2 = frame_at(t0, 300, &[("cup", 0.60)]);
        assert!(!tracker.evaluate(&f2, &target));
        assert_eq!(tracker.progress(&target), 2);
        assert!(tracker.status(&f2, &target).is_active);

        let f3 = frame_at(t0, 600, &[("cup", 0.60)]);
        assert!(tracker.evaluate(&f3, &target));
        assert_eq!(tracker.progress(&target), 3);

        let status = tracker.status(&f3, &target);
        assert!(!status.is_active);
        assert_eq!(status.resolved_label.as_deref(), Some("cup"));
    }

    #[test]
    fn test_multiple_labels_single_observation() {
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        let target = cup();
        let frame = frame_at(Utc::now(), 0, &[("cup", 0.9), ("mug", 0.8), ("wine glass", 0.7)]);

        assert!(!tracker.evaluate(&frame, &target));
        assert_eq!(tracker.progress(&target), 1);
    }

    #[test]
    fn test_confirmation_is_idempotent_and_clamped() {
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        let target = cup();
        let t0 = Utc::now();

        for i in 0..3 {
            tracker.evaluate(&frame_at(t0, i * 100, &[("mug", 0.7)]), &target);
        }
        for i in 3..10 {
            assert!(tracker.evaluate(&frame_at(t0, i * 100, &[("mug", 0.7)]), &target));
        }
        assert_eq!(tracker.progress(&target), 3);
        assert_eq!(tracker.history(&target).unwrap().observations().count(), 3);

        // A frame without the target reports false but keeps the latch.
        assert!(!tracker.evaluate(&frame_at(t0, 1000, &[]), &target));
        assert!(tracker.is_confirmed(&target));
    }

    #[test]
    fn test_confirmation_decays_after_window() {
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        let target = cup();
        let t0 = Utc::now();

        for i in 0..3 {
            tracker.evaluate(&frame_at(t0, i * 100, &[("cup", 0.7)]), &target);
        }
        assert!(tracker.is_confirmed(&target));

        assert!(!tracker.evaluate(&frame_at(t0, 5000, &[]), &target));
        assert_eq!(tracker.progress(&target), 0);

        assert!(!tracker.evaluate(&frame_at(t0, 5100, &[("cup", 0.7)]), &target));
        assert_eq!(tracker.progress(&target), 1);
    }

    #[test]
    fn test_gap_just_under_window_extends_cycle() {
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        let target = cup();
        let t0 = Utc::now();

        tracker.evaluate(&frame_at(t0, 0, &[("cup", 0.7)]), &target);
        tracker.evaluate(&frame_at(t0, 1999, &[("cup", 0.7)]), &target);
        assert_eq!(tracker.progress(&target), 2);

        // Exactly at the window edge the first observation is still kept.
        assert!(tracker.evaluate(&frame_at(t0, 2000, &[("cup", 0.7)]), &target));
    }

    #[test]
    fn test_gap_over_window_restarts() {
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        let target = cup();
        let t0 = Utc::now();

        tracker.evaluate(&frame_at(t0, 0, &[("cup", 0.7)]), &target);
        tracker.evaluate(&frame_at(t0, 100, &[("cup", 0.7)]), &target);
        assert!(!tracker.evaluate(&frame_at(t0, 2500, &[("cup", 0.7)]), &target));
        assert_eq!(tracker.progress(&target), 1);
    }

    #[test]
    fn test_partial_match_counts_and_exact_preferred_for_display() {
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        let target = cup();
        let frame = frame_at(Utc::now(), 0, &[("teacup", 0.95), ("cup", 0.6)]);

        assert!(!tracker.evaluate(&frame, &target));
        let status = tracker.status(&frame, &target);
        assert_eq!(status.resolved_label.as_deref(), Some("cup"));
        assert_eq!(status.match_kind, Some(MatchKind::Exact));
    }

    #[test]
    fn test_status_without_match() {
        let tracker = StabilityTracker::new(StabilityConfig::default());
        let status = tracker.status(&frame_at(Utc::now(), 0, &[("person", 0.9)]), &cup());

        assert!(!status.is_active);
        assert_eq!(status.progress, 0);
        assert!(status.resolved_label.is_none());
    }

    #[test]
    fn test_clear_single_target() {
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        let table = SynonymTable::default();
        let cup = cup();
        let book = TargetSpec::new("book", &table).unwrap();
        let frame = frame_at(Utc::now(), 0, &[("cup", 0.9), ("book", 0.9)]);

        tracker.evaluate(&frame, &cup);
        tracker.evaluate(&frame, &book);
        tracker.clear(&cup);

        assert_eq!(tracker.progress(&cup), 0);
        assert_eq!(tracker.progress(&book), 1);
    }

    #[test]
    fn test_clock_step_back_keeps_order() {
        let mut tracker = StabilityTracker::new(StabilityConfig::default());
        let target = cup();
        let t0 = Utc::now();

        tracker.evaluate(&frame_at(t0, 500, &[("cup", 0.9)]), &target);
        tracker.evaluate(&frame_at(t0, 100, &[("cup", 0.9)]), &target);

        let times: Vec<_> = tracker.history(&target).unwrap().observations().collect();
        assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_unbounded_window_still_confirms() {
        let config = StabilityConfig {
            window_ms: u64::MAX,
            ..Default::default()
        };
        let mut tracker = StabilityTracker::new(config);
        let target = cup();
        let t0 = Utc::now();

        let results: Vec<_> = (0..3)
            .map(|i| {
                let matched = tracker.evaluate(&frame_at(t0, i * 100, &[("cup", 0.9)]), &target);
                (matched, tracker.progress(&target))
            })
            .collect();
        assert_eq!(results, vec![(false, 1), (false, 2), (true, 3)]);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_confirms_at_or_below_floor(
                steps in proptest::collection::vec((0i64..1500, 0.0f64..=0.55), 1..40)
            ) {
                let mut tracker = StabilityTracker::new(StabilityConfig::default());
                let target = cup();
                let mut at = Utc::now();

                for (gap, confidence) in steps {
                    at += Duration::milliseconds(gap);
                    let frame = DetectionFrame::new(vec![DetectedObject::new("cup", confidence)], at);
                    prop_assert!(!tracker.evaluate(&frame, &target));
                    prop_assert_eq!(tracker.progress(&target), 0);
                }
            }

            #[test]
            fn history_stays_within_window(
                steps in proptest::collection::vec((0i64..3000, any::<bool>()), 1..60)
            ) {
                let config = StabilityConfig::default();
                let window = config.window_ms as i64;
                let mut tracker = StabilityTracker::new(config);
                let target = cup();
                let mut at = Utc::now();

                for (gap, visible) in steps {
                    at += Duration::milliseconds(gap);
                    let objects = if visible { vec![DetectedObject::new("mug", 0.8)] } else { vec![] };
                    tracker.evaluate(&DetectionFrame::new(objects, at), &target);

                    if let Some(history) = tracker.history(&target) {
                        let times: Vec<_> = history.observations().copied().collect();
                        prop_assert!(times.len() <= 3);
                        prop_assert!(times.windows(2).all(|pair| pair[0] <= pair[1]));
                        if let (Some(first), Some(last)) = (times.first(), times.last()) {
                            prop_assert!((*last - *first).num_milliseconds() <= window);
                        }
                    }
                }
            }
        }
    }
}
