//! Watches a live window for discrete content changes (a slide advancing, a
//! page turning) and saves a still image of each new, settled view, either
//! immediately or after a human confirms via a registered trigger.

pub mod capture;
pub mod diff;
pub mod engine;
pub mod error;
pub mod events;
pub mod frame;
pub mod notify;
pub mod persist;
pub mod settings;
pub mod signal;
mod utils;

pub use diff::{absdiff_sum, Thresholds};
pub use engine::{ConfirmationGate, EngineConfig, EngineController, EngineState, Mode};
pub use error::{CaptureError, DimensionMismatch, EngineError, PersistError, SettingsError};
pub use events::{EngineEvent, EventReceiver, EventSender};
pub use frame::{Frame, FrameSource};
pub use notify::{CueKind, CuePlayer, Notifier, NullNotifier};
pub use persist::{DirectorySink, PersistenceSink};
pub use settings::{CaptureSettings, SettingsStore};
pub use signal::{InProcessSignal, SignalChannel};

/// Initialize logging (reads RUST_LOG env var). Intended for host binaries;
/// call at most once per process.
pub fn init_logging() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
}
