//! Play session: one mini-game run from camera start to teardown
//!
//! The session owns every stateful piece (tracker history, guard timers,
//! detection source, camera) and is driven by `tick(now)` from the host's
//! loop. Two interval timers pace the work: the sampler captures a frame and
//! runs the model, the detection tick evaluates the latest frame against the
//! active target. The timeout guard is advanced first on every tick and does
//! not depend on what the tracker reports.

use crate::detection::{DetectionSource, DetectionStatus, FinderConfig, StabilityTracker};
use crate::diagnostics::{SessionAccumulator, SessionSummary};
use crate::guard::{GuardEvent, IntervalTimer, Notice, TaskId, TaskOutcome, TaskTimeoutGuard};
use crate::traits::CameraFeed;
use crate::Result;
use anyhow::bail;
use chrono::{DateTime, Utc};
use findit_core::{DetectionFrame, SynonymTable, TargetSpec};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    /// The latest frame was evaluated for the active task
    Progress { task: TaskId, status: DetectionStatus },
    /// Target found; the task is complete
    Confirmed { task: TaskId, label: String },
    /// The guard released a task that ran out of time
    TaskReleased {
        task: TaskId,
        dismissed_at: DateTime<Utc>,
    },
    NoticeCleared { task: TaskId },
}

#[derive(Debug, Clone)]
struct ActiveTask {
    id: TaskId,
    target: TargetSpec,
}

pub struct PlaySession {
    config: FinderConfig,
    table: SynonymTable,
    tracker: StabilityTracker,
    guard: TaskTimeoutGuard,
    source: DetectionSource,
    camera: Option<Box<dyn CameraFeed>>,
    sampler: IntervalTimer,
    detection_tick: IntervalTimer,
    latest_frame: Option<DetectionFrame>,
    active: Option<ActiveTask>,
    next_task: u64,
    evaluations: VecDeque<(DetectionFrame, TargetSpec)>,
    torn_down: bool,
}

impl PlaySession {
    pub fn new(
        config: FinderConfig,
        table: SynonymTable,
        source: DetectionSource,
        camera: Box<dyn CameraFeed>,
    ) -> Result<Self> {
        config.validate()?;

        info!(
            "play session started with {:?} detection source '{}'",
            source.variant(),
            source.detector_name()
        );

        Ok(Self {
            tracker: StabilityTracker::new(config.stability.clone()),
            guard: TaskTimeoutGuard::new(config.timeout.clone()),
            sampler: IntervalTimer::new(config.sampling.sample_interval_ms),
            detection_tick: IntervalTimer::new(config.sampling.detection_tick_ms),
            evaluations: VecDeque::with_capacity(config.sampling.history_capacity),
            config,
            table,
            source,
            camera: Some(camera),
            latest_frame: None,
            active: None,
            next_task: 1,
            torn_down: false,
        })
    }

    /// Begin a blocking "find the object" task and arm its timeout.
    pub fn start_task(&mut self, semantic: &str, now: DateTime<Utc>) -> Result<TaskId> {
        if self.torn_down {
            bail!("play session already torn down");
        }
        if let Some(active) = &self.active {
            bail!("{} is still active", active.id);
        }

        let target = TargetSpec::new(semantic, &self.table)?;
        let id = TaskId::new(self.next_task);
        self.next_task += 1;

        self.guard.arm(id, target.semantic(), now)?;
        self.tracker.clear(&target);
        self.latest_frame = None;
        self.sampler.start(now);
        self.detection_tick.start(now);

        info!(
            "{} started: find '{}' ({:?})",
            id,
            target.semantic(),
            target.labels()
        );
        self.active = Some(ActiveTask { id, target });
        Ok(id)
    }

    /// Advance timers to `now` and report what happened.
    pub fn tick(&mut self, now: DateTime<Utc>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        if self.torn_down {
            return events;
        }

        for event in self.guard.tick(now) {
            match event {
                GuardEvent::Released { task, dismissed_at } => {
                    if self.active.as_ref().is_some_and(|active| active.id == task) {
                        self.finish_task();
                    }
                    events.push(SessionEvent::TaskReleased { task, dismissed_at });
                }
                GuardEvent::NoticeCleared { task } => {
                    events.push(SessionEvent::NoticeCleared { task });
                }
            }
        }

        if self.sampler.poll(now) {
            self.sample(now);
        }

        if self.detection_tick.poll(now) {
            if let Some(event) = self.evaluate_latest(now) {
                events.push(event);
            }
        }

        events
    }

    fn sample(&mut self, now: DateTime<Utc>) {
        let Some(camera) = self.camera.as_mut() else {
            return;
        };
        match camera.capture() {
            Ok(image) => {
                self.latest_frame = Some(self.source.detect_frame(&image, now));
            }
            Err(err) => warn!("camera capture failed: {:#}", err),
        }
    }

    fn evaluate_latest(&mut self, now: DateTime<Utc>) -> Option<SessionEvent> {
        let active = self.active.clone()?;
        let frame = self.latest_frame.take()?;

        let matched = self.tracker.evaluate(&frame, &active.target);
        let status = self.tracker.status(&frame, &active.target);
        self.log_evaluation(frame, active.target.clone());

        if !matched {
            return Some(SessionEvent::Progress {
                task: active.id,
                status,
            });
        }

        self.guard.cancel(active.id, TaskOutcome::Confirmed, now);
        self.finish_task();

        let label = status
            .resolved_label
            .unwrap_or_else(|| active.target.semantic().to_string());
        info!("{} confirmed: saw '{}'", active.id, label);
        Some(SessionEvent::Confirmed {
            task: active.id,
            label,
        })
    }

    fn log_evaluation(&mut self, frame: DetectionFrame, target: TargetSpec) {
        if self.config.sampling.history_capacity == 0 {
            return;
        }
        if self.evaluations.len() == self.config.sampling.history_capacity {
            self.evaluations.pop_front();
        }
        self.evaluations.push_back((frame, target));
    }

    fn finish_task(&mut self) {
        if let Some(active) = self.active.take() {
            self.tracker.clear(&active.target);
        }
        self.sampler.stop();
        self.detection_tick.stop();
        self.latest_frame = None;
    }

    /// Player closed the task before it completed.
    pub fn dismiss_task(&mut self, now: DateTime<Utc>) -> Option<TaskId> {
        let id = self.active.as_ref()?.id;
        self.guard.cancel(id, TaskOutcome::Dismissed, now);
        self.finish_task();
        debug!("{} dismissed", id);
        Some(id)
    }

    /// Stop every timer and release the camera. Safe to call twice.
    pub fn teardown(&mut self) {
        if self.torn_down {
            return;
        }

        self.sampler.stop();
        self.detection_tick.stop();
        self.guard.disarm_all();
        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }
        self.tracker.clear_all();
        self.active = None;
        self.latest_frame = None;
        self.torn_down = true;

        info!("play session torn down");
    }

    /// Sampling, detection tick, guard deadlines and notice timers still armed
    pub fn live_timers(&self) -> usize {
        usize::from(self.sampler.is_armed())
            + usize::from(self.detection_tick.is_armed())
            + self.guard.live_timers()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    pub fn camera_released(&self) -> bool {
        self.camera.is_none()
    }

    pub fn active_task(&self) -> Option<TaskId> {
        self.active.as_ref().map(|active| active.id)
    }

    pub fn active_target(&self) -> Option<&TargetSpec> {
        self.active.as_ref().map(|active| &active.target)
    }

    /// Progress of the active task (0 when idle)
    pub fn progress(&self) -> usize {
        self.active
            .as_ref()
            .map(|active| self.tracker.progress(&active.target))
            .unwrap_or(0)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.guard.notice()
    }

    pub fn guard(&self) -> &TaskTimeoutGuard {
        &self.guard
    }

    pub fn source(&self) -> &DetectionSource {
        &self.source
    }

    /// Retry a model that failed during this session
    pub fn recover_model(&mut self) -> bool {
        self.source.recover()
    }

    pub fn evaluations(&self) -> impl Iterator<Item = &(DetectionFrame, TargetSpec)> {
        self.evaluations.iter()
    }

    /// Diagnostic summary over the evaluations kept so far
    pub fn summary(&self) -> SessionSummary {
        let records: Vec<_> = self.evaluations.iter().cloned().collect();
        SessionAccumulator::new(&self.config.stability, self.config.diagnostics.clone())
            .summarize(&records)
    }
}

impl Drop for PlaySession {
    fn drop(&mut self) {
        self.teardown();
    }
}
