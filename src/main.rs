use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Parser;
use findit_core::SynonymTable;
use findit_cv::detection::FinderConfig;
use findit_cv::traits::ObjectDetector;
use findit_cv::{DetectionSource, PlaySession, SessionEvent, StillCamera};
use std::path::PathBuf;

mod scenario;
mod simulated;

use scenario::Scenario;
use simulated::SimulatedDetector;

#[derive(Parser, Debug)]
#[command(author, version, about = "Replay a find-the-object round through the confirmation engine")]
struct Args {
    /// JSON scenario with the target and per-frame detections.
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Target to find when running the simulated detector.
    #[arg(long, default_value = "cup")]
    target: String,
    /// Probability that the simulated model sees the target in a frame.
    #[arg(long, default_value_t = 0.7)]
    visibility: f64,
    /// Deterministic seed for the simulated detector.
    #[arg(long)]
    seed: Option<u64>,
    /// Engine configuration (JSON). Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Synonym table file (`semantic\-raw1,raw2` lines).
    #[arg(long)]
    synonyms: Option<PathBuf>,
    /// Write the diagnostic summary as JSON to this path.
    #[arg(long)]
    summary_out: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => FinderConfig::from_json_file(path)?,
        None => FinderConfig::default(),
    };
    let table = match &args.synonyms {
        Some(path) => SynonymTable::load(path)?,
        None => SynonymTable::default(),
    };

    let (target, detector): (String, Box<dyn ObjectDetector>) = match &args.scenario {
        Some(path) => {
            let scenario = Scenario::load(path)?;
            log::info!("Loaded scenario {:?} ({} frames)", path, scenario.frames.len());
            (
                scenario.target.clone(),
                Box::new(scenario.detector()) as Box<dyn ObjectDetector>,
            )
        }
        None => (
            args.target.clone(),
            Box::new(SimulatedDetector::new(&args.target, args.visibility, args.seed))
                as Box<dyn ObjectDetector>,
        ),
    };

    let source = DetectionSource::select(detector, None);
    let tick_ms = config.sampling.detection_tick_ms;
    let run_ms = config.timeout.deadline_ms + config.timeout.notice_ms + tick_ms;
    let mut session = PlaySession::new(config, table, source, Box::new(StillCamera::blank(640, 480)))?;

    // Virtual clock: the round is replayed as fast as possible.
    let start = Utc::now();
    let task = session.start_task(&target, start)?;

    let mut elapsed = 0;
    while elapsed <= run_ms {
        let now = start + Duration::milliseconds(elapsed as i64);
        for event in session.tick(now) {
            match event {
                SessionEvent::Progress { status, .. } if status.is_active => {
                    log::debug!("{}: progress {}", task, status.progress);
                }
                SessionEvent::Progress { .. } => {}
                SessionEvent::Confirmed { label, .. } => {
                    println!("Found '{}' after {} ms (saw '{}')", target, elapsed, label);
                }
                SessionEvent::TaskReleased { .. } => {
                    if let Some(notice) = session.notice() {
                        println!("{}", notice.message);
                    }
                }
                SessionEvent::NoticeCleared { .. } => {}
            }
        }
        if session.active_task().is_none() && session.live_timers() == 0 {
            break;
        }
        elapsed += tick_ms;
    }

    let summary = session.summary();
    println!("Session summary:");
    println!("  - Evaluations: {}", summary.total_evaluations);
    println!("  - Hit rate: {:.2}", summary.hit_rate);
    if let Some(confidence) = summary.mean_match_confidence {
        println!("  - Mean match confidence: {:.3}", confidence);
    }
    for fp in &summary.false_positives {
        println!("  - False positive candidate: {} ({} frames)", fp.label, fp.frames);
    }

    if let Some(path) = &args.summary_out {
        summary.export_json(path)?;
        println!("Summary saved: {:?}", path);
    }

    session.teardown();
    Ok(())
}
