use std::sync::Arc;

use foundation::ScreenRect;
use image::RgbaImage;
use layers::Rgba;
use scene::{ElementId, ElementKind};

use crate::placement::Placement;

/// What an overlay looks like in the exported raster.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayContent {
    /// A bitmap resized to the placement box.
    Sprite(Arc<RgbaImage>),
    /// A bordered box split into text rows. Legends put one swatch on each
    /// row after the `header_rows` title lines.
    Panel {
        background: Rgba,
        border: Rgba,
        header_rows: usize,
        swatches: Vec<Rgba>,
    },
}

/// An overlay as it stood on the interactive surface when the job was built.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlaySnapshot {
    pub id: ElementId,
    pub kind: ElementKind,
    /// Interactive pixels, top-left origin.
    pub rect: ScreenRect,
    pub z: i32,
    pub content: OverlayContent,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExportTarget {
    CurrentLayer,
    AllLayers,
}

/// One export invocation; built, executed, dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportJob {
    pub export_dpi: f64,
    pub interactive_dpi: f64,
    /// Interactive surface size in pixels.
    pub surface: (u32, u32),
    pub overlays: Vec<OverlaySnapshot>,
}

impl ExportJob {
    pub fn scale(&self) -> f64 {
        if self.interactive_dpi > 0.0 {
            self.export_dpi / self.interactive_dpi
        } else {
            1.0
        }
    }

    pub fn output_size(&self) -> (u32, u32) {
        let s = self.scale();
        let (w, h) = self.surface;
        if s == 1.0 {
            return (w, h);
        }
        (
            (f64::from(w) * s).round() as u32,
            (f64::from(h) * s).round() as u32,
        )
    }

    /// Placements in back-to-front order (z, then id).
    pub fn placements(&self) -> Vec<(&OverlaySnapshot, Placement)> {
        let height = f64::from(self.surface.1);
        let scale = self.scale();
        let mut out: Vec<_> = self
            .overlays
            .iter()
            .map(|o| (o, Placement::from_screen(o.rect, height, scale)))
            .collect();
        out.sort_by_key(|(o, _)| (o.z, o.id));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::{ExportJob, OverlayContent, OverlaySnapshot};
    use foundation::ScreenRect;
    use layers::Rgba;
    use scene::{ElementId, ElementKind};

    fn panel(id: u32, z: i32) -> OverlaySnapshot {
        OverlaySnapshot {
            id: ElementId(id),
            kind: ElementKind::Label,
            rect: ScreenRect::new(10.0, 10.0, 20.0, 10.0),
            z,
            content: OverlayContent::Panel {
                background: Rgba::WHITE,
                border: Rgba::BLACK,
                header_rows: 1,
                swatches: Vec::new(),
            },
        }
    }

    #[test]
    fn output_size_follows_dpi_ratio() {
        let job = ExportJob {
            export_dpi: 200.0,
            interactive_dpi: 95.0,
            surface: (1140, 855),
            overlays: Vec::new(),
        };
        assert_eq!(job.output_size(), (2400, 1800));
    }

    #[test]
    fn placements_are_back_to_front() {
        let job = ExportJob {
            export_dpi: 95.0,
            interactive_dpi: 95.0,
            surface: (100, 100),
            overlays: vec![panel(0, 6), panel(2, 3), panel(1, 3)],
        };
        let ids: Vec<u32> = job.placements().iter().map(|(o, _)| o.id.0).collect();
        assert_eq!(ids, vec![1, 2, 0]);
    }
}
