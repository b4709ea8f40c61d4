pub mod confirm;
pub mod controller;
pub mod loop_worker;

use serde::{Deserialize, Serialize};

pub use confirm::ConfirmationGate;
pub use controller::{EngineConfig, EngineController};

/// Capture policy, fixed for the engine's lifetime.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum Mode {
    /// Persist every settled change immediately.
    Auto,
    /// Hold each settled change for human confirmation, with a cancellation
    /// timeout.
    Manual,
}

/// Phase of the capture trigger state machine. Owned exclusively by the poll
/// worker; other contexts only ever observe it through emitted events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EngineState {
    Watching,
    Stabilizing,
    AwaitingConfirmation,
    Stopped,
}
