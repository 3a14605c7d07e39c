use foundation::math::Vec2;
use foundation::{Extent, ScreenRect, ViewTransform};

/// Pixel geometry of the interactive drawing surface.
///
/// The plot area fills the surface (zero layout padding), but the two are kept
/// apart because the table's normalized coordinates are relative to the plot.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceGeometry {
    pub width_px: f64,
    pub height_px: f64,
    pub dpi: f64,
    pub plot: ScreenRect,
}

impl SurfaceGeometry {
    pub fn new(width_px: f64, height_px: f64, dpi: f64) -> Self {
        Self {
            width_px,
            height_px,
            dpi,
            plot: ScreenRect::new(0.0, 0.0, width_px, height_px),
        }
    }

    /// Surface for a figure of `width_in` x `height_in` inches at `dpi`.
    pub fn from_figure(width_in: f64, height_in: f64, dpi: f64) -> Self {
        Self::new((width_in * dpi).round(), (height_in * dpi).round(), dpi)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width_px, self.height_px)
    }
}

/// Everything needed to place an overlay on screen for the current view.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewContext {
    pub surface: SurfaceGeometry,
    pub extent: Extent,
}

impl ViewContext {
    pub fn new(surface: SurfaceGeometry, extent: Extent) -> Self {
        Self { surface, extent }
    }

    pub fn transform(&self) -> ViewTransform {
        ViewTransform::new(self.extent, self.surface.plot)
    }
}
