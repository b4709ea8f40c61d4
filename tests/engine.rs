//! End-to-end tests of the watch loop state machine against a scripted
//! frame source.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use tokio::time::{Duration, Instant};

use slidecap::{
    events, CaptureSettings, DirectorySink, EngineConfig, EngineController, EngineEvent, Frame,
    FrameSource, InProcessSignal, Mode, NullNotifier, PersistenceSink,
};

/// Plays back a fixed script of capture results, then cycles through
/// `repeat` forever. An empty repeat list means the source is gone once the
/// script runs out.
struct ScriptedSource {
    script: VecDeque<Option<Frame>>,
    repeat: Vec<Option<Frame>>,
    repeat_idx: usize,
    captures: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn new(script: Vec<Option<Frame>>, repeat: Vec<Option<Frame>>) -> (Self, Arc<AtomicUsize>) {
        let captures = Arc::new(AtomicUsize::new(0));
        (
            Self {
                script: script.into(),
                repeat,
                repeat_idx: 0,
                captures: Arc::clone(&captures),
            },
            captures,
        )
    }
}

impl FrameSource for ScriptedSource {
    fn capture(&mut self) -> Option<Frame> {
        self.captures.fetch_add(1, Ordering::SeqCst);
        if let Some(step) = self.script.pop_front() {
            return step;
        }
        if self.repeat.is_empty() {
            return None;
        }
        let step = self.repeat[self.repeat_idx % self.repeat.len()].clone();
        self.repeat_idx += 1;
        step
    }
}

fn solid(value: u8) -> Frame {
    Frame::from_rgba(RgbaImage::from_pixel(10, 10, image::Rgba([value, value, value, 255])))
}

fn config(mode: Mode, timeout_secs: u64) -> EngineConfig {
    EngineConfig {
        mode,
        sensitivity_percent: 5.0,
        confirm_timeout: Duration::from_secs(timeout_secs),
    }
}

fn is_screenshot_name(name: &str) -> bool {
    let Some(rest) = name.strip_prefix("screenshot_") else {
        return false;
    };
    let Some(stamp) = rest.strip_suffix(".png") else {
        return false;
    };
    let bytes = stamp.as_bytes();
    bytes.len() == 15
        && bytes[..8].iter().all(u8::is_ascii_digit)
        && bytes[8] == b'_'
        && bytes[9..].iter().all(u8::is_ascii_digit)
}

fn saved_files(dir: &tempfile::TempDir) -> Vec<String> {
    std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().into_string().unwrap())
        .collect()
}

struct Harness {
    controller: EngineController,
    signal: Arc<InProcessSignal>,
    rx: slidecap::EventReceiver,
    dir: tempfile::TempDir,
}

fn start_engine(source: ScriptedSource, config: EngineConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let signal = Arc::new(InProcessSignal::new());
    let (tx, rx) = events::channel();

    let mut controller = EngineController::new();
    controller
        .start(
            source,
            Arc::new(DirectorySink::new(dir.path())),
            Arc::new(NullNotifier),
            Arc::clone(&signal) as Arc<dyn slidecap::SignalChannel>,
            config,
            tx,
        )
        .unwrap();

    Harness {
        controller,
        signal,
        rx,
        dir,
    }
}

#[tokio::test(start_paused = true)]
async fn manual_mode_parks_the_settled_frame_for_confirmation() {
    let (source, _) = ScriptedSource::new(vec![Some(solid(0))], vec![Some(solid(255))]);
    let mut h = start_engine(source, config(Mode::Manual, 5));

    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Watching);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::ChangeDetected);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::AwaitingConfirmation);
    assert!(saved_files(&h.dir).is_empty());

    h.signal.fire();
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Saved(1));

    let files = saved_files(&h.dir);
    assert_eq!(files.len(), 1);
    assert!(is_screenshot_name(&files[0]), "unexpected name {}", files[0]);
    assert_eq!(h.controller.saved_count(), 1);

    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn confirmation_timeout_discards_the_capture() {
    let (source, _) = ScriptedSource::new(vec![Some(solid(0))], vec![Some(solid(255))]);
    let mut h = start_engine(source, config(Mode::Manual, 1));

    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Watching);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::ChangeDetected);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::AwaitingConfirmation);

    // Nothing confirms; after ~1s the slot empties and watching resumes.
    loop {
        let event = h.rx.recv().await.unwrap();
        if event == EngineEvent::ConfirmationTimedOut {
            break;
        }
    }
    assert!(saved_files(&h.dir).is_empty());
    assert_eq!(h.controller.saved_count(), 0);

    // A late press lands on the empty slot and does nothing.
    h.signal.fire();
    assert!(saved_files(&h.dir).is_empty());

    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn auto_mode_saves_exactly_once_per_change() {
    let (source, _) = ScriptedSource::new(vec![Some(solid(0))], vec![Some(solid(255))]);
    let mut h = start_engine(source, config(Mode::Auto, 5));

    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Watching);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::ChangeDetected);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Saved(1));

    // The settled frame became the baseline, so the unchanged view must not
    // trigger again.
    tokio::time::sleep(Duration::from_secs(5)).await;
    let files = saved_files(&h.dir);
    assert_eq!(files.len(), 1);
    assert!(is_screenshot_name(&files[0]));
    assert_eq!(h.controller.saved_count(), 1);

    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unchanged_frames_never_transition_state() {
    let (source, captures) = ScriptedSource::new(vec![Some(solid(40))], vec![Some(solid(40))]);
    let mut h = start_engine(source, config(Mode::Manual, 5));

    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Watching);
    tokio::time::sleep(Duration::from_secs(10)).await;

    assert!(captures.load(Ordering::SeqCst) > 10);
    assert!(h.rx.try_recv().is_err(), "no further events while idle");
    assert!(saved_files(&h.dir).is_empty());

    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn lost_source_stops_the_engine_once() {
    let (source, captures) =
        ScriptedSource::new(vec![Some(solid(0)), Some(solid(0))], vec![]);
    let mut h = start_engine(source, config(Mode::Manual, 5));

    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Watching);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::SourceLost);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Stopped);

    // The worker exited; no further capture calls may happen.
    let calls_at_stop = captures.load(Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert_eq!(captures.load(Ordering::SeqCst), calls_at_stop);
    assert!(h.rx.try_recv().is_err());

    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn resolution_change_is_treated_as_source_loss() {
    let resized = Frame::from_rgba(RgbaImage::from_pixel(12, 12, image::Rgba([0, 0, 0, 255])));
    let (source, _) = ScriptedSource::new(vec![Some(solid(0))], vec![Some(resized)]);
    let mut h = start_engine(source, config(Mode::Auto, 5));

    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Watching);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::SourceLost);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Stopped);

    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn never_settling_view_dispatches_the_last_sample_after_the_deadline() {
    // Alternating frames keep the stability wait from ever seeing two calm
    // samples in a row.
    let (source, _) = ScriptedSource::new(
        vec![Some(solid(0))],
        vec![Some(solid(255)), Some(solid(128))],
    );
    let mut h = start_engine(source, config(Mode::Auto, 5));

    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Watching);
    let change_at = Instant::now();
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::ChangeDetected);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Saved(1));
    assert!(change_at.elapsed() >= Duration::from_secs(4));

    assert_eq!(saved_files(&h.dir).len(), 1);
    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn changes_are_coalesced_while_a_capture_is_pending() {
    // After the first change parks a pending capture, keep feeding new
    // content; no second pending slot may appear until the first resolves.
    let (source, _) = ScriptedSource::new(
        vec![
            Some(solid(0)),   // initial
            Some(solid(255)), // trigger
            Some(solid(255)), // stability sample 1
            Some(solid(255)), // stability sample 2 -> settled, parked
        ],
        vec![Some(solid(60))], // keeps differing from the parked baseline
    );
    let mut h = start_engine(source, config(Mode::Manual, 8));

    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Watching);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::ChangeDetected);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::AwaitingConfirmation);

    // Let several watch ticks observe the new content while pending.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert!(h.rx.try_recv().is_err(), "coalesced ticks emit nothing");

    h.signal.fire();
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Saved(1));
    assert_eq!(saved_files(&h.dir).len(), 1);

    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn save_failure_reports_and_keeps_watching() {
    let (source, _) = ScriptedSource::new(vec![Some(solid(0))], vec![Some(solid(255))]);
    let signal = Arc::new(InProcessSignal::new());
    let (tx, mut rx) = events::channel();

    let mut controller = EngineController::new();
    controller
        .start(
            source,
            Arc::new(DirectorySink::new("/nonexistent/slidecap-itest")),
            Arc::new(NullNotifier),
            signal as Arc<dyn slidecap::SignalChannel>,
            config(Mode::Auto, 5),
            tx,
        )
        .unwrap();

    assert_eq!(rx.recv().await.unwrap(), EngineEvent::Watching);
    assert_eq!(rx.recv().await.unwrap(), EngineEvent::ChangeDetected);
    assert!(matches!(
        rx.recv().await.unwrap(),
        EngineEvent::SaveFailed(_)
    ));

    assert!(controller.is_running());
    assert_eq!(controller.saved_count(), 0);
    controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn construction_fails_without_an_initial_frame() {
    let (source, _) = ScriptedSource::new(vec![None], vec![]);
    let signal = Arc::new(InProcessSignal::new());
    let (tx, _rx) = events::channel();
    let dir = tempfile::tempdir().unwrap();

    let mut controller = EngineController::new();
    let result = controller.start(
        source,
        Arc::new(DirectorySink::new(dir.path())) as Arc<dyn PersistenceSink>,
        Arc::new(NullNotifier),
        signal as Arc<dyn slidecap::SignalChannel>,
        config(Mode::Manual, 5),
        tx,
    );
    assert!(matches!(result, Err(slidecap::EngineError::NoInitialFrame)));
    assert!(!controller.is_running());
}

#[tokio::test(start_paused = true)]
async fn stop_is_idempotent_and_discards_pending_work() {
    let (source, _) = ScriptedSource::new(vec![Some(solid(0))], vec![Some(solid(255))]);
    let mut h = start_engine(source, config(Mode::Manual, 10));

    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::Watching);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::ChangeDetected);
    assert_eq!(h.rx.recv().await.unwrap(), EngineEvent::AwaitingConfirmation);

    h.controller.stop().await.unwrap();
    h.controller.stop().await.unwrap();

    // The pending capture was discarded, not persisted, and the trigger was
    // unregistered: a press after stop does nothing.
    h.signal.fire();
    assert!(saved_files(&h.dir).is_empty());

    let mut saw_stopped = false;
    while let Ok(event) = h.rx.try_recv() {
        assert_ne!(event, EngineEvent::Saved(1));
        saw_stopped |= event == EngineEvent::Stopped;
    }
    assert!(saw_stopped);
}

#[tokio::test(start_paused = true)]
async fn start_twice_is_rejected() {
    let (source, _) = ScriptedSource::new(vec![Some(solid(0))], vec![Some(solid(0))]);
    let mut h = start_engine(source, config(Mode::Manual, 5));

    let (second, _) = ScriptedSource::new(vec![Some(solid(0))], vec![Some(solid(0))]);
    let (tx, _rx) = events::channel();
    let result = h.controller.start(
        second,
        Arc::new(DirectorySink::new(h.dir.path())),
        Arc::new(NullNotifier),
        Arc::new(InProcessSignal::new()) as Arc<dyn slidecap::SignalChannel>,
        config(Mode::Manual, 5),
        tx,
    );
    assert!(matches!(result, Err(slidecap::EngineError::AlreadyRunning)));

    h.controller.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn engine_config_derives_from_settings() {
    let mut settings = CaptureSettings::default();
    settings.auto_mode = true;
    settings.sensitivity_percent = 2.0;
    settings.confirm_timeout_secs = 3;

    let config = EngineConfig::from(&settings);
    assert_eq!(config.mode, Mode::Auto);
    assert_eq!(config.sensitivity_percent, 2.0);
    assert_eq!(config.confirm_timeout, Duration::from_secs(3));
}
