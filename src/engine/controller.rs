use std::sync::Arc;

use anyhow::{Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::diff::Thresholds;
use crate::error::EngineError;
use crate::events::EventSender;
use crate::frame::FrameSource;
use crate::notify::Notifier;
use crate::persist::PersistenceSink;
use crate::settings::CaptureSettings;
use crate::signal::SignalChannel;

use super::confirm::ConfirmationGate;
use super::loop_worker::watch_loop;
use super::Mode;

/// Everything the engine needs to know at construction. Fixed for its
/// lifetime.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub mode: Mode,
    pub sensitivity_percent: f64,
    /// How long a pending capture waits for confirmation. Ignored in auto
    /// mode.
    pub confirm_timeout: Duration,
}

impl From<&CaptureSettings> for EngineConfig {
    fn from(settings: &CaptureSettings) -> Self {
        Self {
            mode: settings.mode(),
            sensitivity_percent: settings.sensitivity_percent,
            confirm_timeout: Duration::from_secs(settings.confirm_timeout_secs),
        }
    }
}

/// Start/stop lifecycle around the watch loop worker.
///
/// One controller drives at most one worker at a time; one worker watches
/// exactly one source.
pub struct EngineController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
    gate: Option<ConfirmationGate>,
}

impl EngineController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
            gate: None,
        }
    }

    /// Captures an initial frame (failing fast if the source is already
    /// gone), derives the thresholds from its resolution, and spawns the
    /// watch loop.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<S: FrameSource + 'static>(
        &mut self,
        mut source: S,
        sink: Arc<dyn PersistenceSink>,
        notifier: Arc<dyn Notifier>,
        signal: Arc<dyn SignalChannel>,
        config: EngineConfig,
        events: EventSender,
    ) -> Result<(), EngineError> {
        if self.handle.is_some() {
            return Err(EngineError::AlreadyRunning);
        }

        let initial = source.capture().ok_or(EngineError::NoInitialFrame)?;
        let thresholds =
            Thresholds::from_resolution(initial.width(), initial.height(), config.sensitivity_percent);
        info!(
            "starting engine: {:?} mode, {}x{} source",
            config.mode,
            initial.width(),
            initial.height()
        );

        let gate = ConfirmationGate::new(signal, notifier, sink, events.clone());
        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(watch_loop(
            source,
            initial,
            thresholds,
            config.mode,
            config.confirm_timeout,
            gate.clone(),
            events,
            cancel_token.clone(),
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        self.gate = Some(gate);
        Ok(())
    }

    /// Signals the worker to exit at its next tick boundary and waits for it
    /// to drain. Idempotent; safe to call while a confirmation is resolving.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
        self.gate = None;

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("watch loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }

    /// Number of captures written since this engine started. Zero when no
    /// engine is running.
    pub fn saved_count(&self) -> u64 {
        self.gate.as_ref().map(ConfirmationGate::saved_count).unwrap_or(0)
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

impl Default for EngineController {
    fn default() -> Self {
        Self::new()
    }
}
