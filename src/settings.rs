use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, sync::RwLock};

use crate::engine::Mode;
use crate::error::SettingsError;

pub const SENSITIVITY_RANGE: (f64, f64) = (0.1, 20.0);
pub const CONFIRM_TIMEOUT_RANGE: (u64, u64) = (1, 10);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CaptureSettings {
    /// Destination directory for saved captures. Must exist and be writable
    /// when the engine starts; that is checked by the host, not here.
    pub save_path: PathBuf,
    /// Percentage of the full-intensity range a frame diff must exceed to
    /// count as a content change.
    pub sensitivity_percent: f64,
    /// Seconds a pending capture waits for confirmation before being
    /// discarded. Ignored entirely in auto mode.
    pub confirm_timeout_secs: u64,
    /// Save every settled change without asking.
    pub auto_mode: bool,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            save_path: PathBuf::new(),
            sensitivity_percent: 5.0,
            confirm_timeout_secs: 5,
            auto_mode: false,
        }
    }
}

impl CaptureSettings {
    pub fn mode(&self) -> Mode {
        if self.auto_mode {
            Mode::Auto
        } else {
            Mode::Manual
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let (min, max) = SENSITIVITY_RANGE;
        if !(min..=max).contains(&self.sensitivity_percent) {
            return Err(SettingsError::SensitivityOutOfRange {
                value: self.sensitivity_percent,
                min,
                max,
            });
        }
        let (min, max) = CONFIRM_TIMEOUT_RANGE;
        if !(min..=max).contains(&self.confirm_timeout_secs) {
            return Err(SettingsError::TimeoutOutOfRange {
                value: self.confirm_timeout_secs,
                min,
                max,
            });
        }
        Ok(())
    }
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<CaptureSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_default()
        } else {
            CaptureSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn capture(&self) -> CaptureSettings {
        self.data.read().unwrap().clone()
    }

    pub fn update_capture(&self, settings: CaptureSettings) -> Result<()> {
        settings.validate()?;
        {
            let mut guard = self.data.write().unwrap();
            *guard = settings;
            self.persist(&guard)?;
        }
        Ok(())
    }

    fn persist(&self, data: &CaptureSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }
}
