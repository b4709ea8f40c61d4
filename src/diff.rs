use image::GrayImage;

use crate::error::DimensionMismatch;

// Fraction of the full-intensity range below which two consecutive frames
// count as "not moving" (0.5% of width * height * 255).
const STABLE_FRACTION: f64 = 0.005;

/// Sum of absolute per-pixel intensity differences between two grayscale
/// rasters of equal dimensions.
///
/// Monotonically increasing with visual change magnitude and frame area;
/// bounded by `255 * width * height`.
pub fn absdiff_sum(a: &GrayImage, b: &GrayImage) -> Result<u64, DimensionMismatch> {
    if a.dimensions() != b.dimensions() {
        return Err(DimensionMismatch {
            left_width: a.width(),
            left_height: a.height(),
            right_width: b.width(),
            right_height: b.height(),
        });
    }

    let sum = a
        .as_raw()
        .iter()
        .zip(b.as_raw().iter())
        .map(|(&x, &y)| x.abs_diff(y) as u64)
        .sum();
    Ok(sum)
}

/// Sensitivity thresholds, precomputed from a user percentage and the first
/// captured frame's resolution. Frozen for the engine's lifetime; a window
/// resize mid-session is treated as a lost source rather than recomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Diff value above which a change counts as a real content change.
    pub trigger: f64,
    /// Diff value below which two consecutive samples count as settled.
    pub stable: f64,
}

impl Thresholds {
    pub fn from_resolution(width: u32, height: u32, sensitivity_percent: f64) -> Self {
        let full_scale = width as f64 * height as f64 * 255.0;
        Self {
            trigger: (sensitivity_percent / 100.0) * full_scale,
            stable: STABLE_FRACTION * full_scale,
        }
    }
}
