//! Offline tuning diagnostics

pub mod accumulator;

pub use accumulator::{FalsePositive, SessionAccumulator, SessionSummary};
