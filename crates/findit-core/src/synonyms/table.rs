use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::SynonymError;

/// How a raw label matched a resolved label set.
///
/// Ordered so that `Exact > Partial`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    /// Substring containment in either direction, ignoring case
    Partial,
    /// Case-insensitive equality
    Exact,
}

/// Mapping from semantic targets to the raw labels the model may emit.
///
/// Only mappings that proved reliable belong here. A synonym that causes
/// false positives is removed from the table rather than filtered later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymTable {
    entries: BTreeMap<String, BTreeSet<String>>,
}

fn normalize(label: &str) -> String {
    label.trim().to_lowercase()
}

impl SynonymTable {
    /// Table with no mappings; every target resolves to itself.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Resolve a semantic label to the set of acceptable raw labels.
    ///
    /// Labels missing from the table resolve to themselves.
    pub fn resolve(&self, semantic: &str) -> BTreeSet<String> {
        let key = normalize(semantic);
        match self.entries.get(&key) {
            Some(raws) if !raws.is_empty() => raws.clone(),
            _ => BTreeSet::from([key]),
        }
    }

    /// Semantic targets whose resolved set contains `raw`.
    pub fn reverse(&self, raw: &str) -> Vec<String> {
        let raw = normalize(raw);
        self.entries
            .iter()
            .filter(|(_, raws)| raws.contains(&raw))
            .map(|(semantic, _)| semantic.clone())
            .collect()
    }

    /// Add a raw label to a semantic target, creating the target if needed.
    pub fn insert_synonym(&mut self, semantic: &str, raw: &str) -> Result<(), SynonymError> {
        let key = normalize(semantic);
        let raw = normalize(raw);
        if key.is_empty() || raw.is_empty() {
            return Err(SynonymError::EmptyLabel);
        }
        self.entries.entry(key).or_default().insert(raw);
        Ok(())
    }

    /// Drop one raw label from a target. Returns whether it was present.
    pub fn remove_synonym(&mut self, semantic: &str, raw: &str) -> bool {
        let key = normalize(semantic);
        let Some(raws) = self.entries.get_mut(&key) else {
            return false;
        };
        let removed = raws.remove(&normalize(raw));
        if raws.is_empty() {
            self.entries.remove(&key);
        }
        removed
    }

    /// Drop a whole target so it falls back to literal matching.
    pub fn remove_target(&mut self, semantic: &str) -> bool {
        self.entries.remove(&normalize(semantic)).is_some()
    }

    pub fn contains_target(&self, semantic: &str) -> bool {
        self.entries.contains_key(&normalize(semantic))
    }

    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best match of `raw` against a resolved label set.
    pub fn match_label(raw: &str, resolved: &BTreeSet<String>) -> Option<MatchKind> {
        let raw = normalize(raw);
        if raw.is_empty() {
            return None;
        }
        if resolved.iter().any(|label| *label == raw) {
            return Some(MatchKind::Exact);
        }
        resolved
            .iter()
            .filter(|label| !label.is_empty())
            .any(|label| label.contains(raw.as_str()) || raw.contains(label.as_str()))
            .then_some(MatchKind::Partial)
    }
}

impl Default for SynonymTable {
    /// Built-in mapping tuned against the model's vocabulary.
    ///
    /// "bowl" is deliberately absent from "cup".
    fn default() -> Self {
        let defaults: &[(&str, &[&str])] = &[
            ("cup", &["cup", "mug", "wine glass"]),
            ("bottle", &["bottle", "water bottle"]),
            ("phone", &["cell phone", "phone", "mobile phone"]),
            ("book", &["book", "notebook"]),
            ("remote", &["remote", "remote control"]),
            ("keyboard", &["keyboard"]),
            ("mouse", &["mouse", "computer mouse"]),
            ("scissors", &["scissors"]),
            ("spoon", &["spoon"]),
            ("toothbrush", &["toothbrush"]),
            ("clock", &["clock", "watch"]),
            ("laptop", &["laptop"]),
        ];

        let entries = defaults
            .iter()
            .map(|(semantic, raws)| {
                (
                    semantic.to_string(),
                    raws.iter().map(|raw| raw.to_string()).collect(),
                )
            })
            .collect();

        Self { entries }
    }
}
