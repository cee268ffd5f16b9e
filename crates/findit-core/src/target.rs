use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::SynonymError;
use crate::objects::DetectedObject;
use crate::synonyms::{MatchKind, SynonymTable};

/// A game task's target: the semantic label and every raw label that
/// counts as finding it. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    semantic: String,
    labels: BTreeSet<String>,
}

impl TargetSpec {
    pub fn new(semantic: &str, table: &SynonymTable) -> Result<Self, SynonymError> {
        let semantic = semantic.trim().to_lowercase();
        if semantic.is_empty() {
            return Err(SynonymError::EmptyLabel);
        }
        let labels = table.resolve(&semantic);
        Ok(Self { semantic, labels })
    }

    /// Semantic label; keys the tracker's history.
    pub fn semantic(&self) -> &str {
        &self.semantic
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    pub fn match_kind(&self, raw: &str) -> Option<MatchKind> {
        SynonymTable::match_label(raw, &self.labels)
    }

    /// Best matching object among `objects`: exact matches beat partial
    /// ones, then higher confidence wins.
    pub fn best_match<'a>(&self, objects: &'a [DetectedObject]) -> Option<(&'a DetectedObject, MatchKind)> {
        objects
            .iter()
            .filter_map(|object| self.match_kind(&object.label).map(|kind| (object, kind)))
            .max_by(|(a, ka), (b, kb)| {
                ka.cmp(kb)
                    .then_with(|| a.confidence.total_cmp(&b.confidence))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_target_rejected() {
        assert!(TargetSpec::new("  ", &SynonymTable::default()).is_err());
    }

    #[test]
    fn test_best_match_prefers_exact() -> Result<(), SynonymError> {
        let target = TargetSpec::new("cup", &SynonymTable::default())?;
        let objects = vec![
            DetectedObject::new("teacup", 0.95),
            DetectedObject::new("mug", 0.70),
            DetectedObject::new("person", 0.99),
        ];

        let (best, kind) = target.best_match(&objects).unwrap();
        assert_eq!(best.label, "mug");
        assert_eq!(kind, MatchKind::Exact);
        Ok(())
    }
}
