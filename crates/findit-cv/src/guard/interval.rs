use super::after_ms;
use chrono::{DateTime, Utc};

/// Fixed-period trigger polled by the session loop.
///
/// No internal thread; `poll` reports whether a period elapsed since the
/// last firing. Missed periods are coalesced into one firing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTimer {
    period_ms: u64,
    next_due: Option<DateTime<Utc>>,
}

impl IntervalTimer {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            next_due: None,
        }
    }

    /// Arm the timer; the first firing is due immediately.
    pub fn start(&mut self, now: DateTime<Utc>) {
        if self.next_due.is_none() {
            self.next_due = Some(now);
        }
    }

    pub fn stop(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn period_ms(&self) -> u64 {
        self.period_ms
    }

    pub fn poll(&mut self, now: DateTime<Utc>) -> bool {
        match self.next_due {
            Some(due) if now >= due => {
                self.next_due = Some(after_ms(now, self.period_ms));
                true
            }
            _ => false,
        }
    }
}
