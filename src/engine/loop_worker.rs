use tokio::time::{Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::diff::{absdiff_sum, Thresholds};
use crate::events::{EngineEvent, EventSender};
use crate::frame::{Frame, FrameSource};

use super::confirm::ConfirmationGate;
use super::{EngineState, Mode};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

// Import the logging macros (exported at the crate root)
use crate::{log_info, log_warn};

/// Cadence of the idle watch loop.
const IDLE_POLL: Duration = Duration::from_millis(500);
/// Cadence while waiting for a detected change to settle.
const STABILITY_POLL: Duration = Duration::from_millis(100);
/// Upper bound on a single stabilization wait; past this the last sampled
/// frame is taken as good enough (availability over precision).
const STABILITY_DEADLINE: Duration = Duration::from_secs(4);
/// Consecutive below-threshold samples required to call the view settled.
const REQUIRED_STABLE_SAMPLES: u32 = 2;

enum StableWait {
    /// The view settled, or the deadline elapsed and the last sampled frame
    /// stands in for a settled one.
    Settled(Frame),
    Lost,
    Cancelled,
}

/// The capture trigger: polls the source, compares each frame against the
/// running baseline, and on a large enough delta waits for the view to
/// settle before dispatching the capture.
///
/// Runs until the cancel token fires or the source is lost. Never blocks on
/// human input; manual-mode confirmation resolves through the gate on other
/// execution contexts while this loop keeps polling.
pub(crate) async fn watch_loop<S: FrameSource>(
    mut source: S,
    baseline: Frame,
    thresholds: Thresholds,
    mode: Mode,
    confirm_timeout: Duration,
    gate: ConfirmationGate,
    events: EventSender,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(IDLE_POLL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut baseline = baseline;
    let mut state = EngineState::Watching;
    let _ = events.send(EngineEvent::Watching);
    log_info!(
        "watch loop started ({mode:?}, trigger {:.0}, stable {:.0})",
        thresholds.trigger,
        thresholds.stable
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = cancel_token.cancelled() => {
                state = EngineState::Stopped;
                break;
            }
        }

        if state == EngineState::AwaitingConfirmation && !gate.has_pending() {
            state = EngineState::Watching;
            let _ = events.send(EngineEvent::Watching);
        }

        let Some(frame) = source.capture() else {
            handle_source_loss(&gate, &events, "target surface gone");
            state = EngineState::Stopped;
            break;
        };

        let delta = match absdiff_sum(baseline.gray(), frame.gray()) {
            Ok(sum) => sum as f64,
            Err(err) => {
                // A resize invalidates the frozen thresholds; treat it like
                // a lost source.
                handle_source_loss(&gate, &events, &err.to_string());
                state = EngineState::Stopped;
                break;
            }
        };

        if delta <= thresholds.trigger {
            baseline = frame;
            continue;
        }

        if gate.has_pending() {
            // A capture is already in flight; coalesce further changes until
            // it resolves.
            continue;
        }

        log_info!("change detected (delta {delta:.0}), waiting for the view to settle");
        let _ = events.send(EngineEvent::ChangeDetected);
        state = EngineState::Stabilizing;

        let outcome = wait_for_stable(&mut source, frame, thresholds.stable, &cancel_token).await;
        debug_assert_eq!(state, EngineState::Stabilizing);
        match outcome {
            StableWait::Lost => {
                handle_source_loss(&gate, &events, "target surface gone mid-stabilization");
                state = EngineState::Stopped;
                break;
            }
            StableWait::Cancelled => {
                state = EngineState::Stopped;
                break;
            }
            StableWait::Settled(settled) => {
                // Replace the baseline before dispatching so the next tick
                // compares against the settled content and cannot re-trigger
                // on the same transition.
                baseline = settled.clone();
                match mode {
                    Mode::Auto => {
                        gate.save_now(settled);
                        state = EngineState::Watching;
                    }
                    Mode::Manual => {
                        gate.begin_wait(settled, confirm_timeout);
                        let _ = events.send(EngineEvent::AwaitingConfirmation);
                        state = EngineState::AwaitingConfirmation;
                    }
                }
            }
        }
    }

    debug_assert_eq!(state, EngineState::Stopped);
    gate.shutdown();
    let _ = events.send(EngineEvent::Stopped);
    log_info!("watch loop shut down");
}

fn handle_source_loss(gate: &ConfirmationGate, events: &EventSender, reason: &str) {
    log_warn!("source lost: {reason}");
    gate.shutdown();
    let _ = events.send(EngineEvent::SourceLost);
}

/// Samples the source every [`STABILITY_POLL`] until the content stops
/// changing, within [`STABILITY_DEADLINE`]. On deadline the last captured
/// frame is reported as settled anyway rather than discarding the capture.
async fn wait_for_stable<S: FrameSource>(
    source: &mut S,
    trigger_frame: Frame,
    stable_threshold: f64,
    cancel_token: &CancellationToken,
) -> StableWait {
    let deadline = Instant::now() + STABILITY_DEADLINE;
    let mut stable_count = 0u32;
    let mut last = trigger_frame;

    while Instant::now() < deadline {
        tokio::select! {
            _ = tokio::time::sleep(STABILITY_POLL) => {}
            _ = cancel_token.cancelled() => return StableWait::Cancelled,
        }

        let Some(frame) = source.capture() else {
            return StableWait::Lost;
        };
        let Ok(delta) = absdiff_sum(last.gray(), frame.gray()) else {
            return StableWait::Lost;
        };

        if (delta as f64) < stable_threshold {
            stable_count += 1;
            if stable_count >= REQUIRED_STABLE_SAMPLES {
                log_info!("view settled");
                return StableWait::Settled(frame);
            }
        } else {
            stable_count = 0;
        }
        last = frame;
    }

    log_warn!("stabilization deadline elapsed; using the last sampled frame");
    StableWait::Settled(last)
}
