//! Semantic target to raw model label mapping

pub mod data;
pub mod table;

pub use table::{MatchKind, SynonymTable};
