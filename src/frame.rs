use image::{DynamicImage, GrayImage, RgbaImage};

/// One captured raster, held in both color and derived grayscale form.
///
/// The color buffer is what gets persisted; the grayscale buffer is what the
/// change detector compares. Both are computed once at capture time and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    color: RgbaImage,
    gray: GrayImage,
}

impl Frame {
    pub fn from_rgba(color: RgbaImage) -> Self {
        let dynamic = DynamicImage::ImageRgba8(color);
        let gray = dynamic.to_luma8();
        Self {
            color: dynamic.into_rgba8(),
            gray,
        }
    }

    pub fn width(&self) -> u32 {
        self.color.width()
    }

    pub fn height(&self) -> u32 {
        self.color.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.color.dimensions()
    }

    pub fn color(&self) -> &RgbaImage {
        &self.color
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }
}

/// Produces a raster snapshot of the target surface on demand.
///
/// Returning `None` means the surface is gone (closed or minimized). That is
/// a normal outcome, not an exceptional one; the engine treats it as terminal
/// for the current monitoring session.
pub trait FrameSource: Send {
    fn capture(&mut self) -> Option<Frame>;
}
