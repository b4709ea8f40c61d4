use std::path::PathBuf;
use thiserror::Error;

/// Two grayscale rasters were compared that do not share a resolution.
///
/// The watch loop treats this as a lost source: the monitored window is
/// assumed to keep its size for the whole session, so a mismatch means it
/// was resized or replaced.
#[derive(Debug, Error)]
#[error("frame dimensions differ: {left_width}x{left_height} vs {right_width}x{right_height}")]
pub struct DimensionMismatch {
    pub left_width: u32,
    pub left_height: u32,
    pub right_width: u32,
    pub right_height: u32,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine could not obtain an initial frame at start-up, so it never
    /// started. The caller is responsible for surfacing this to the user.
    #[error("could not capture an initial frame; make sure the target window is visible and not minimized")]
    NoInitialFrame,
    #[error("engine already running")]
    AlreadyRunning,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode frame as png: {0}")]
    Encode(#[source] image::ImageError),
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no visible window titled \"{0}\"")]
    WindowNotFound(String),
    #[error("window enumeration failed: {0}")]
    Platform(String),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("sensitivity must be between {min} and {max} percent, got {value}")]
    SensitivityOutOfRange { value: f64, min: f64, max: f64 },
    #[error("confirmation timeout must be between {min} and {max} seconds, got {value}")]
    TimeoutOutOfRange { value: u64, min: u64, max: u64 },
}
