//! Timers: the task timeout guard and the session's periodic triggers

use chrono::{DateTime, Duration, Utc};

pub mod interval;
pub mod timeout;

pub use interval::IntervalTimer;
pub use timeout::{
    GuardError, GuardEvent, Notice, TaskId, TaskOutcome, TaskRecord, TaskTimeoutGuard,
    TimeoutState,
};

/// `at` plus `ms` milliseconds, saturating at the latest representable time.
pub(crate) fn after_ms(at: DateTime<Utc>, ms: u64) -> DateTime<Utc> {
    i64::try_from(ms)
        .ok()
        .and_then(Duration::try_milliseconds)
        .and_then(|delta| at.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
