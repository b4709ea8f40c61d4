pub mod tone;

use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;
use std::time::Duration;

use log::warn;
use rodio::{OutputStream, Sink};

use tone::Tone;

/// Audio cue identifiers the engine can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CueKind {
    /// A settled frame is waiting for human confirmation.
    CapturePending,
    /// A capture was written to disk.
    Saved,
}

/// Fire-and-forget cue playback. Failures are logged, never propagated; the
/// engine must not block or die because audio output is unavailable.
pub trait Notifier: Send + Sync {
    fn play(&self, cue: CueKind);
}

/// Silent notifier for headless use and tests.
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn play(&self, _cue: CueKind) {}
}

/// Plays synthesized cue tones through rodio.
pub struct CuePlayer {
    tx: Arc<Mutex<Option<Sender<CueKind>>>>,
}

impl CuePlayer {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<CueKind>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<CueKind>();

        // Spawn dedicated audio thread holding non-Send audio objects
        thread::Builder::new()
            .name("cue-player".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cue) = rx.recv() {
                    if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                        warn!("cue playback unavailable: {err}");
                        continue;
                    }
                    if let Some(ref s) = sink {
                        match cue {
                            CueKind::CapturePending => {
                                s.append(Tone::new(880.0, Duration::from_millis(180)));
                            }
                            CueKind::Saved => {
                                // Rising two-note chime
                                s.append(Tone::new(660.0, Duration::from_millis(120)));
                                s.append(Tone::new(990.0, Duration::from_millis(160)));
                            }
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }
}

impl Default for CuePlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for CuePlayer {
    fn play(&self, cue: CueKind) {
        match self.ensure_thread() {
            Ok(tx) => {
                if tx.send(cue).is_err() {
                    warn!("cue player thread is gone; dropping {cue:?}");
                }
            }
            Err(err) => warn!("failed to start cue player: {err}"),
        }
    }
}
