use log::debug;
use xcap::Window;

use crate::error::CaptureError;
use crate::frame::{Frame, FrameSource};

/// Frame source backed by xcap window capture.
///
/// A minimized window, a closed window, or a platform capture failure all
/// surface as `None` from [`FrameSource::capture`]; the engine treats those
/// as a lost source.
pub struct WindowSource {
    window: Window,
}

impl WindowSource {
    /// Picks the first visible window whose title contains `title`.
    pub fn by_title(title: &str) -> Result<Self, CaptureError> {
        let windows =
            Window::all().map_err(|e| CaptureError::Platform(e.to_string()))?;

        let window = windows
            .into_iter()
            .find(|w| {
                w.title()
                    .map(|t| !t.is_empty() && t.contains(title))
                    .unwrap_or(false)
            })
            .ok_or_else(|| CaptureError::WindowNotFound(title.to_string()))?;

        Ok(Self { window })
    }

    /// Titles of all capturable windows, for a host picker UI.
    pub fn list_titles() -> Result<Vec<String>, CaptureError> {
        let windows =
            Window::all().map_err(|e| CaptureError::Platform(e.to_string()))?;

        Ok(windows
            .iter()
            .filter_map(|w| w.title().ok())
            .filter(|t| !t.is_empty())
            .collect())
    }
}

impl FrameSource for WindowSource {
    fn capture(&mut self) -> Option<Frame> {
        if self.window.is_minimized().unwrap_or(true) {
            return None;
        }

        match self.window.capture_image() {
            Ok(image) => {
                debug!("captured {}x{} window frame", image.width(), image.height());
                Some(Frame::from_rgba(image))
            }
            Err(err) => {
                debug!("window capture failed: {err}");
                None
            }
        }
    }
}
