use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use image::ImageFormat;

use crate::error::PersistError;
use crate::frame::Frame;

/// Encodes a frame and writes it to storage under a suggested name.
pub trait PersistenceSink: Send + Sync {
    fn write(&self, frame: &Frame, suggested_name: &str) -> Result<PathBuf, PersistError>;
}

/// Filename convention for saved captures. Wall-clock second resolution; a
/// same-second double save overwrites the earlier file.
pub fn suggested_filename(now: DateTime<Local>) -> String {
    format!("screenshot_{}.png", now.format("%Y%m%d_%H%M%S"))
}

/// Writes PNG files into a fixed destination directory.
///
/// The directory is expected to exist and be writable at engine start; that
/// is checked by the caller, not here.
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl PersistenceSink for DirectorySink {
    fn write(&self, frame: &Frame, suggested_name: &str) -> Result<PathBuf, PersistError> {
        let mut encoded = Vec::new();
        frame
            .color()
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Png)
            .map_err(PersistError::Encode)?;

        let path = self.dir.join(suggested_name);
        fs::write(&path, &encoded).map_err(|source| PersistError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}
