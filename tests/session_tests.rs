// tests/session_tests.rs
use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use findit_core::{DetectedObject, SynonymTable};
use findit_cv::detection::{FinderConfig, SourceVariant};
use findit_cv::traits::{CameraFeed, ObjectDetector};
use findit_cv::{DetectionSource, PlaySession, ScriptedDetector, SessionEvent};
use image::RgbImage;
use std::cell::Cell;
use std::rc::Rc;

/// Camera that reports its release through a shared flag
struct WatchedCamera {
    released: Rc<Cell<bool>>,
}

impl CameraFeed for WatchedCamera {
    fn capture(&mut self) -> Result<RgbImage> {
        Ok(RgbImage::new(2, 2))
    }

    fn release(&mut self) {
        self.released.set(true);
    }
}

/// Sees the target every frame, always just under the floor
struct AlmostDetector;

impl ObjectDetector for AlmostDetector {
    fn name(&self) -> &str {
        "almost"
    }

    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<DetectedObject>> {
        Ok(vec![DetectedObject::new("cup", 0.54)])
    }
}

fn session_with(detector: Box<dyn ObjectDetector>) -> (PlaySession, Rc<Cell<bool>>) {
    let released = Rc::new(Cell::new(false));
    let camera = WatchedCamera {
        released: Rc::clone(&released),
    };
    let session = PlaySession::new(
        FinderConfig::default(),
        SynonymTable::default(),
        DetectionSource::select(detector, None),
        Box::new(camera),
    )
    .unwrap();
    (session, released)
}

/// Tick every 100 ms up to `until_ms`, collecting events with their offset
fn run(session: &mut PlaySession, t0: DateTime<Utc>, until_ms: i64) -> Vec<(i64, SessionEvent)> {
    let mut events = Vec::new();
    let mut at = 0;
    while at <= until_ms {
        for event in session.tick(t0 + Duration::milliseconds(at)) {
            events.push((at, event));
        }
        at += 100;
    }
    events
}

#[test]
fn test_timeout_fires_regardless_of_tracker() {
    let (mut session, _) = session_with(Box::new(AlmostDetector));
    let t0 = Utc::now();
    let task = session.start_task("cup", t0).unwrap();

    let events = run(&mut session, t0, 34_000);
    let released: Vec<i64> = events
        .iter()
        .filter(|(_, e)| matches!(e, SessionEvent::TaskReleased { .. }))
        .map(|(at, _)| *at)
        .collect();
    assert_eq!(released, vec![30_000]);

    let cleared: Vec<i64> = events
        .iter()
        .filter(|(_, e)| matches!(e, SessionEvent::NoticeCleared { .. }))
        .map(|(at, _)| *at)
        .collect();
    assert_eq!(cleared, vec![33_000]);

    assert!(session.guard().is_expired(task));
    let record = session.guard().record(task).unwrap();
    assert_eq!(record.dismissed_at, Some(t0 + Duration::milliseconds(30_000)));
    assert!(session.active_task().is_none());
    assert_eq!(session.live_timers(), 0);
}

#[test]
fn test_timeout_fires_while_accumulating() {
    // Target seen twice, then the model goes quiet: tracker stays mid-cycle.
    let detector = ScriptedDetector::new(
        "scripted",
        vec![
            vec![DetectedObject::new("cup", 0.9)],
            vec![DetectedObject::new("cup", 0.9)],
        ],
    );
    let (mut session, _) = session_with(Box::new(detector));
    let t0 = Utc::now();
    let task = session.start_task("cup", t0).unwrap();

    run(&mut session, t0, 1_000);
    assert_eq!(session.progress(), 2);

    let events = run(&mut session, t0 + Duration::milliseconds(1_100), 29_000);
    assert!(events
        .iter()
        .any(|(_, e)| *e == SessionEvent::TaskReleased {
            task,
            dismissed_at: t0 + Duration::milliseconds(30_000),
        }));
}

#[test]
fn test_teardown_disarms_everything() {
    let (mut session, released) = session_with(Box::new(AlmostDetector));
    let t0 = Utc::now();
    session.start_task("cup", t0).unwrap();
    run(&mut session, t0, 500);
    assert!(session.live_timers() > 0);

    session.teardown();
    assert_eq!(session.live_timers(), 0);
    assert!(released.get());
    assert!(run(&mut session, t0 + Duration::seconds(1), 40_000).is_empty());
}

#[test]
fn test_teardown_during_notice() {
    let (mut session, released) = session_with(Box::new(AlmostDetector));
    let t0 = Utc::now();
    session.start_task("cup", t0).unwrap();
    run(&mut session, t0, 30_500);
    assert!(session.notice().is_some());
    assert_eq!(session.live_timers(), 1);

    session.teardown();
    assert_eq!(session.live_timers(), 0);
    assert!(released.get());
}

#[test]
fn test_drop_releases_camera() {
    let (mut session, released) = session_with(Box::new(AlmostDetector));
    session.start_task("cup", Utc::now()).unwrap();

    drop(session);
    assert!(released.get());
}

#[test]
fn test_unavailable_model_never_matches() {
    let detector = ScriptedDetector::new("broken", vec![vec![DetectedObject::new("cup", 0.9)]; 20])
        .failing_after(0);
    let (mut session, _) = session_with(Box::new(detector));
    let t0 = Utc::now();
    session.start_task("cup", t0).unwrap();

    let events = run(&mut session, t0, 5_000);
    assert!(!events
        .iter()
        .any(|(_, e)| matches!(e, SessionEvent::Confirmed { .. })));
    assert!(!session.source().is_available());
    assert_eq!(session.progress(), 0);
}

#[test]
fn test_fallback_source_drives_session() {
    let frames = vec![vec![DetectedObject::new("wine glass", 0.8)]; 3];
    let source = DetectionSource::select(
        Box::new(ScriptedDetector::unloadable("primary")),
        Some(Box::new(ScriptedDetector::new("fallback", frames))),
    );
    assert_eq!(source.variant(), SourceVariant::Fallback);

    let mut session = PlaySession::new(
        FinderConfig::default(),
        SynonymTable::default(),
        source,
        Box::new(findit_cv::StillCamera::blank(2, 2)),
    )
    .unwrap();
    let t0 = Utc::now();
    let task = session.start_task("cup", t0).unwrap();

    let events = run(&mut session, t0, 2_000);
    assert!(events.iter().any(|(_, e)| *e
        == SessionEvent::Confirmed {
            task,
            label: "wine glass".to_string(),
        }));
}

#[test]
fn test_new_task_gets_fresh_timer() {
    let (mut session, _) = session_with(Box::new(AlmostDetector));
    let t0 = Utc::now();
    let first = session.start_task("cup", t0).unwrap();
    run(&mut session, t0, 30_000);

    let t1 = t0 + Duration::milliseconds(31_000);
    let second = session.start_task("cup", t1).unwrap();
    assert_ne!(first, second);
    assert!(session.guard().is_armed(second));
    assert!(!session.guard().is_expired(second));
}

#[test]
fn test_summary_export() -> Result<()> {
    let frames = vec![
        vec![DetectedObject::new("cup", 0.7), DetectedObject::new("bowl", 0.6)],
        vec![DetectedObject::new("bowl", 0.6)],
        vec![DetectedObject::new("cup", 0.7)],
        vec![DetectedObject::new("cup", 0.7)],
    ];
    let (mut session, _) = session_with(Box::new(ScriptedDetector::new("scripted", frames)));
    let t0 = Utc::now();
    session.start_task("cup", t0).unwrap();
    run(&mut session, t0, 1_500);

    let summary = session.summary();
    assert_eq!(summary.total_evaluations, 4);
    assert_eq!(summary.successful_matches, 3);
    assert_eq!(summary.false_positives[0].label, "bowl");

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("summary.json");
    summary.export_json(&path)?;
    assert!(path.exists());
    Ok(())
}
