use foundation::Extent;
use foundation::math::Vec2;
use thiserror::Error;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

/// A zoom step that would have produced a non-positive dimension.
#[derive(Debug, Copy, Clone, PartialEq, Error)]
#[error("zoom rejected: resulting extent would be {width} x {height}")]
pub struct ZoomRejected {
    pub width: f64,
    pub height: f64,
}

/// A view that finished changing and should get fresh basemap imagery.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SettledView {
    pub extent: Extent,
    pub generation: u64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
struct PanSession {
    start_extent: Extent,
    /// Map units per screen pixel, captured at drag start.
    scale: Vec2,
}

/// Sole owner of the visible extent.
///
/// Pan only translates; zoom adjusts both dimensions proportionally to the
/// current height/width ratio, so the aspect ratio holds after every step.
#[derive(Debug, Clone)]
pub struct ViewportController {
    extent: Extent,
    pan: Option<PanSession>,
    generation: u64,
}

impl ViewportController {
    pub fn new(extent: Extent) -> Self {
        Self {
            extent,
            pan: None,
            generation: 0,
        }
    }

    pub fn extent(&self) -> Extent {
        self.extent
    }

    pub fn is_panning(&self) -> bool {
        self.pan.is_some()
    }

    /// Starts a pan; `scale` is the screen-to-map ratio at this moment.
    pub fn begin_pan(&mut self, scale: Vec2) {
        self.pan = Some(PanSession {
            start_extent: self.extent,
            scale,
        });
    }

    /// Applies the cumulative pointer delta since `begin_pan`.
    ///
    /// Screen y grows downward while map y grows upward, so dragging down
    /// moves the view north. Returns `None` when no pan is active.
    pub fn pan(&mut self, delta_screen: Vec2) -> Option<Extent> {
        let session = self.pan?;
        let shift = Vec2::new(
            -delta_screen.x * session.scale.x,
            delta_screen.y * session.scale.y,
        );
        self.extent = session.start_extent.translated(shift);
        Some(self.extent)
    }

    /// Returns `true` if a pan was active.
    pub fn end_pan(&mut self) -> bool {
        self.pan.take().is_some()
    }

    /// Shrinks (`In`) or grows (`Out`) the extent around its centre by a fixed
    /// absolute step on x and a proportional step on y.
    pub fn zoom(&mut self, direction: ZoomDirection, step: f64) -> Result<Extent, ZoomRejected> {
        let ratio = self.extent.height() / self.extent.width();
        let signed = match direction {
            ZoomDirection::In => step,
            ZoomDirection::Out => -step,
        };
        let next = self.extent.inset(signed, signed * ratio);
        if !(next.width() > 0.0 && next.height() > 0.0) {
            return Err(ZoomRejected {
                width: next.width(),
                height: next.height(),
            });
        }
        self.extent = next;
        Ok(next)
    }

    /// Marks the current extent as settled and bumps the refresh generation.
    pub fn settle(&mut self) -> SettledView {
        self.generation += 1;
        SettledView {
            extent: self.extent,
            generation: self.generation,
        }
    }
}
