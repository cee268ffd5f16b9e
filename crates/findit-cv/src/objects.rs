//! Batch operations over detected objects

use findit_core::DetectedObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Collection of detected objects with batch operations
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectCollection {
    objects: Vec<DetectedObject>,
}

impl ObjectCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_vec(objects: Vec<DetectedObject>) -> Self {
        Self { objects }
    }

    pub fn push(&mut self, object: DetectedObject) {
        self.objects.push(object);
    }

    pub fn extend(&mut self, other: ObjectCollection) {
        self.objects.extend(other.objects);
    }

    pub fn as_slice(&self) -> &[DetectedObject] {
        &self.objects
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Sort by confidence (descending). NaN confidences sort last.
    pub fn sort_by_confidence(mut self) -> Self {
        self.objects.sort_by(|a, b| {
            let a = if a.confidence.is_nan() { f64::NEG_INFINITY } else { a.confidence };
            let b = if b.confidence.is_nan() { f64::NEG_INFINITY } else { b.confidence };
            b.total_cmp(&a)
        });
        self
    }

    /// Keep objects strictly above the confidence floor
    pub fn filter_above(mut self, floor: f64) -> Self {
        self.objects.retain(|object| object.confidence > floor);
        self
    }

    /// Keep objects whose label equals `label`, ignoring case
    pub fn filter_by_label(mut self, label: &str) -> Self {
        self.objects
            .retain(|object| object.label.trim().eq_ignore_ascii_case(label.trim()));
        self
    }

    /// Drop objects the model could not name
    pub fn without_unknown(mut self) -> Self {
        self.objects.retain(|object| !object.is_unknown());
        self
    }

    pub fn truncate(mut self, max: usize) -> Self {
        self.objects.truncate(max);
        self
    }

    pub fn stats(&self) -> ObjectStats {
        let mut label_counts: BTreeMap<String, usize> = BTreeMap::new();
        let mut total_confidence = 0.0;
        let mut max_confidence: f64 = 0.0;
        let mut min_confidence = f64::INFINITY;

        for object in &self.objects {
            *label_counts
                .entry(object.label.trim().to_lowercase())
                .or_insert(0) += 1;
            total_confidence += object.confidence;
            max_confidence = max_confidence.max(object.confidence);
            min_confidence = min_confidence.min(object.confidence);
        }

        let avg_confidence = if self.objects.is_empty() {
            0.0
        } else {
            total_confidence / self.objects.len() as f64
        };

        ObjectStats {
            total_objects: self.objects.len(),
            label_counts,
            avg_confidence,
            max_confidence,
            min_confidence: if min_confidence == f64::INFINITY { 0.0 } else { min_confidence },
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DetectedObject> {
        self.objects.iter()
    }

    pub fn into_vec(self) -> Vec<DetectedObject> {
        self.objects
    }
}

impl IntoIterator for ObjectCollection {
    type Item = DetectedObject;
    type IntoIter = std::vec::IntoIter<DetectedObject>;

    fn into_iter(self) -> Self::IntoIter {
        self.objects.into_iter()
    }
}

impl FromIterator<DetectedObject> for ObjectCollection {
    fn from_iter<T: IntoIterator<Item = DetectedObject>>(iter: T) -> Self {
        Self::from_vec(iter.into_iter().collect())
    }
}

/// Statistics about a collection of detected objects
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectStats {
    pub total_objects: usize,
    pub label_counts: BTreeMap<String, usize>,
    pub avg_confidence: f64,
    pub max_confidence: f64,
    pub min_confidence: f64,
}
