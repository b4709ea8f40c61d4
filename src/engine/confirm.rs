use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, Mutex,
};

use chrono::{DateTime, Local, Utc};
use log::{error, info};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::events::{EngineEvent, EventSender};
use crate::frame::Frame;
use crate::notify::{CueKind, Notifier};
use crate::persist::{suggested_filename, PersistenceSink};
use crate::signal::SignalChannel;

/// A settled frame held in memory awaiting human confirmation.
struct PendingCapture {
    frame: Frame,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Slot {
    pending: Option<PendingCapture>,
    /// Cancels the one-shot timeout task; created and destroyed together
    /// with `pending`.
    timer: Option<CancellationToken>,
}

struct GateInner {
    slot: Mutex<Slot>,
    signal: Arc<dyn SignalChannel>,
    notifier: Arc<dyn Notifier>,
    sink: Arc<dyn PersistenceSink>,
    events: EventSender,
    saved_count: AtomicU64,
}

/// Manages the manual-mode hand-off between the trigger and the human.
///
/// The pending slot and the registered confirmation trigger are the only
/// state shared across execution contexts (poll worker, signal callback,
/// timeout task); a single mutex serializes them so concurrent
/// confirm/cancel/timeout races resolve to exactly one winner and the losers
/// observe an empty slot.
#[derive(Clone)]
pub struct ConfirmationGate {
    inner: Arc<GateInner>,
}

impl ConfirmationGate {
    pub fn new(
        signal: Arc<dyn SignalChannel>,
        notifier: Arc<dyn Notifier>,
        sink: Arc<dyn PersistenceSink>,
        events: EventSender,
    ) -> Self {
        Self {
            inner: Arc::new(GateInner {
                slot: Mutex::new(Slot::default()),
                signal,
                notifier,
                sink,
                events,
                saved_count: AtomicU64::new(0),
            }),
        }
    }

    /// Stores `frame` as the single pending capture, plays the prompt cue,
    /// registers the confirmation trigger, and arms a one-shot timer that
    /// discards the capture if nothing confirms it within `timeout`.
    ///
    /// Must run inside a tokio runtime (the timer is a spawned task).
    pub fn begin_wait(&self, frame: Frame, timeout: Duration) {
        let timer = CancellationToken::new();
        {
            let mut slot = self.inner.slot.lock().unwrap();
            // Replacing a live slot should not happen (changes are coalesced
            // while a capture is in flight), but cut the old timer loose if
            // it does.
            if let Some(stale) = slot.timer.take() {
                stale.cancel();
            }
            slot.pending = Some(PendingCapture {
                frame,
                created_at: Utc::now(),
            });
            slot.timer = Some(timer.clone());
        }

        self.inner.notifier.play(CueKind::CapturePending);

        let gate = self.clone();
        self.inner.signal.register(Arc::new(move || gate.confirm()));

        let gate = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(timeout) => gate.cancel(),
                _ = timer.cancelled() => {}
            }
        });
    }

    /// Takes the pending capture, if one is still there, and persists it.
    /// A no-op when the slot is already empty (lost the race with a
    /// cancellation).
    pub fn confirm(&self) {
        let taken = {
            let mut slot = self.inner.slot.lock().unwrap();
            if let Some(timer) = slot.timer.take() {
                timer.cancel();
            }
            slot.pending.take()
        };
        self.inner.signal.unregister();

        if let Some(pending) = taken {
            self.save_now(pending.frame);
        }
    }

    /// Discards the pending capture without saving. A no-op if it was
    /// already resolved.
    pub fn cancel(&self) {
        let discarded = {
            let mut slot = self.inner.slot.lock().unwrap();
            if let Some(timer) = slot.timer.take() {
                timer.cancel();
            }
            slot.pending.take()
        };

        if let Some(pending) = discarded {
            self.inner.signal.unregister();
            info!(
                "confirmation window elapsed; discarding capture from {}",
                pending.created_at.format("%H:%M:%S")
            );
            let _ = self.inner.events.send(EngineEvent::ConfirmationTimedOut);
        }
    }

    /// Engine stop: discard any pending capture, cancel its timer, and drop
    /// the trigger registration. Idempotent and safe to call concurrently
    /// with a confirmation resolving.
    pub fn shutdown(&self) {
        {
            let mut slot = self.inner.slot.lock().unwrap();
            if let Some(timer) = slot.timer.take() {
                timer.cancel();
            }
            slot.pending = None;
        }
        self.inner.signal.unregister();
    }

    pub fn has_pending(&self) -> bool {
        self.inner.slot.lock().unwrap().pending.is_some()
    }

    pub fn saved_count(&self) -> u64 {
        self.inner.saved_count.load(Ordering::SeqCst)
    }

    /// Encodes and writes `frame` right away; used by the confirmation path
    /// and by auto mode (which never parks a frame in the slot). A write
    /// failure is reported and dropped; the watch loop is unaffected.
    pub(crate) fn save_now(&self, frame: Frame) {
        let name = suggested_filename(Local::now());
        match self.inner.sink.write(&frame, &name) {
            Ok(path) => {
                let count = self.inner.saved_count.fetch_add(1, Ordering::SeqCst) + 1;
                info!("saved capture #{count} to {}", path.display());
                let _ = self.inner.events.send(EngineEvent::Saved(count));
                self.inner.notifier.play(CueKind::Saved);
            }
            Err(err) => {
                error!("failed to save capture: {err}");
                let _ = self
                    .inner
                    .events
                    .send(EngineEvent::SaveFailed(err.to_string()));
            }
        }
    }
}
