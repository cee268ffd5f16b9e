use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or editing a synonym table.
#[derive(Error, Debug)]
pub enum SynonymError {
    #[error("failed to read synonym table {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid line {line} in synonym table: '{content}' (expected semantic\\-raw1,raw2)")]
    InvalidLine { line: usize, content: String },

    #[error("semantic label must not be empty")]
    EmptyLabel,
}
