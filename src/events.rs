use std::fmt;

use serde::Serialize;
use tokio::sync::mpsc;

/// Push notifications from the engine to whoever is observing it.
///
/// Delivered over an unbounded channel so the engine never blocks on a slow
/// observer; no acknowledgment is expected. `Display` renders the
/// human-readable status line a host UI would show.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind", content = "detail")]
pub enum EngineEvent {
    Watching,
    ChangeDetected,
    AwaitingConfirmation,
    /// A capture was written; carries the monotonically increasing saved
    /// count.
    Saved(u64),
    SaveFailed(String),
    /// The confirmation window elapsed and the pending capture was discarded.
    ConfirmationTimedOut,
    SourceLost,
    Stopped,
}

impl fmt::Display for EngineEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineEvent::Watching => write!(f, "watching"),
            EngineEvent::ChangeDetected => write!(f, "change detected"),
            EngineEvent::AwaitingConfirmation => {
                write!(f, "change detected, awaiting confirmation")
            }
            EngineEvent::Saved(count) => write!(f, "saved {count}"),
            EngineEvent::SaveFailed(reason) => write!(f, "save failed: {reason}"),
            EngineEvent::ConfirmationTimedOut => {
                write!(f, "confirmation timed out, capture discarded")
            }
            EngineEvent::SourceLost => write!(f, "source lost, watching stopped"),
            EngineEvent::Stopped => write!(f, "stopped"),
        }
    }
}

pub type EventSender = mpsc::UnboundedSender<EngineEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
