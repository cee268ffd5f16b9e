//! Task Timeout Guard - forward-progress watchdog for blocking tasks
//!
//! A blocking mini-game task waits for an external event (the stability
//! tracker confirming the target, or the player dismissing the task). The
//! guard arms one deadline per task instance when it becomes active.
//!
//! ## Outcomes
//!
//! - **Completed in time**: `cancel` disarms the deadline, nothing visible.
//! - **Deadline elapsed**: the task is released, its record is stamped with a
//!   dismissal time, and a notice is shown for `notice_ms`.
//!
//! The guard never looks at detection state, so a stuck detector cannot
//! keep it from firing. Like the rest of the session it is tick-driven: the
//! caller passes `now` and reacts to the returned events.

use super::after_ms;
use crate::detection::TimeoutConfig;
use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Identifies one task instance. Never reused within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TaskId(u64);

impl TaskId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskOutcome {
    /// Target confirmed by the stability tracker
    Confirmed,
    /// Player dismissed the task
    Dismissed,
    /// Released by the guard
    TimedOut,
}

/// Live deadline for one active task
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeoutState {
    pub started_at: DateTime<Utc>,
    pub deadline_ms: u64,
    pub released: bool,
}

impl TimeoutState {
    pub fn deadline(&self) -> DateTime<Utc> {
        after_ms(self.started_at, self.deadline_ms)
    }
}

/// Bookkeeping for a task instance, kept after its timer is gone
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskRecord {
    pub task: TaskId,
    pub label: String,
    pub started_at: DateTime<Utc>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub outcome: Option<TaskOutcome>,
}

/// Transient message shown after a forced release
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub task: TaskId,
    pub message: String,
    pub shown_at: DateTime<Utc>,
    pub clears_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum GuardEvent {
    Released {
        task: TaskId,
        dismissed_at: DateTime<Utc>,
    },
    NoticeCleared {
        task: TaskId,
    },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GuardError {
    #[error("{0} was already armed")]
    AlreadyArmed(TaskId),
}

#[derive(Debug, Clone)]
pub struct TaskTimeoutGuard {
    config: TimeoutConfig,
    timers: BTreeMap<TaskId, TimeoutState>,
    records: BTreeMap<TaskId, TaskRecord>,
    armed_once: BTreeSet<TaskId>,
    notice: Option<Notice>,
}

impl TaskTimeoutGuard {
    pub fn new(config: TimeoutConfig) -> Self {
        Self {
            config,
            timers: BTreeMap::new(),
            records: BTreeMap::new(),
            armed_once: BTreeSet::new(),
            notice: None,
        }
    }

    /// Arm the deadline for a task instance that just became active.
    pub fn arm(&mut self, task: TaskId, label: &str, now: DateTime<Utc>) -> Result<(), GuardError> {
        if !self.armed_once.insert(task) {
            return Err(GuardError::AlreadyArmed(task));
        }

        self.timers.insert(
            task,
            TimeoutState {
                started_at: now,
                deadline_ms: self.config.deadline_ms,
                released: false,
            },
        );
        self.records.insert(
            task,
            TaskRecord {
                task,
                label: label.to_string(),
                started_at: now,
                dismissed_at: None,
                outcome: None,
            },
        );

        debug!("{} armed for {} ms", task, self.config.deadline_ms);
        Ok(())
    }

    /// Disarm after normal completion. Returns false when no timer was live.
    pub fn cancel(&mut self, task: TaskId, outcome: TaskOutcome, now: DateTime<Utc>) -> bool {
        if self.timers.remove(&task).is_none() {
            return false;
        }
        if let Some(record) = self.records.get_mut(&task) {
            record.outcome = Some(outcome);
            if outcome == TaskOutcome::Dismissed {
                record.dismissed_at = Some(now);
            }
        }
        debug!("{} completed before deadline ({:?})", task, outcome);
        true
    }

    /// Advance the guard to `now`, firing elapsed deadlines.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<GuardEvent> {
        let mut events = Vec::new();

        if let Some(notice) = self.notice.take_if(|notice| now >= notice.clears_at) {
            debug!("notice for {} cleared", notice.task);
            events.push(GuardEvent::NoticeCleared { task: notice.task });
        }

        let mut expired = Vec::new();
        for (task, state) in self.timers.iter_mut() {
            if !state.released && now >= state.deadline() {
                state.released = true;
                expired.push(*task);
            }
        }
        self.timers.retain(|_, state| !state.released);

        for task in expired {
            self.release(task, now);
            events.push(GuardEvent::Released {
                task,
                dismissed_at: now,
            });
        }

        events
    }

    fn release(&mut self, task: TaskId, now: DateTime<Utc>) {
        let label = match self.records.get_mut(&task) {
            Some(record) => {
                record.dismissed_at = Some(now);
                record.outcome = Some(TaskOutcome::TimedOut);
                record.label.clone()
            }
            None => String::new(),
        };

        info!("{} released after {} ms timeout", task, self.config.deadline_ms);

        self.notice = Some(Notice {
            task,
            message: format!("Time's up for '{}', moving on", label),
            shown_at: now,
            clears_at: after_ms(now, self.config.notice_ms),
        });
    }

    /// True once the guard released `task`
    pub fn is_expired(&self, task: TaskId) -> bool {
        self.records
            .get(&task)
            .is_some_and(|record| record.outcome == Some(TaskOutcome::TimedOut))
    }

    pub fn is_armed(&self, task: TaskId) -> bool {
        self.timers.contains_key(&task)
    }

    pub fn state(&self, task: TaskId) -> Option<&TimeoutState> {
        self.timers.get(&task)
    }

    pub fn record(&self, task: TaskId) -> Option<&TaskRecord> {
        self.records.get(&task)
    }

    pub fn records(&self) -> impl Iterator<Item = &TaskRecord> {
        self.records.values()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    /// Deadlines plus the pending notice-clear timer
    pub fn live_timers(&self) -> usize {
        self.timers.len() + usize::from(self.notice.is_some())
    }

    /// Drop every timer without firing; used on teardown.
    pub fn disarm_all(&mut self) {
        if self.live_timers() > 0 {
            debug!("disarming {} guard timers", self.live_timers());
        }
        self.timers.clear();
        self.notice = None;
    }
}
