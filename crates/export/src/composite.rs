use foundation::ScreenRect;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use render::Canvas;

use crate::job::{OverlayContent, OverlaySnapshot};
use crate::placement::Placement;

/// Swatch squares of a panel split into `header_rows + count` equal rows,
/// one per row after the header, inset from the left edge.
pub fn swatch_rects(panel: ScreenRect, header_rows: usize, count: usize) -> Vec<ScreenRect> {
    let row = panel.height / (header_rows + count).max(1) as f64;
    let side = row * 0.7;
    (0..count)
        .map(|i| {
            let y = panel.y + row * (header_rows + i) as f64 + (row - side) / 2.0;
            ScreenRect::new(panel.x + side / 2.0, y, side, side)
        })
        .collect()
}

/// Draws overlays onto a copy of the base raster.
///
/// The caller's base image and element set are untouched; the composited
/// overlays only exist in the returned raster.
pub fn composite(base: &RgbaImage, overlays: &[(&OverlaySnapshot, Placement)]) -> RgbaImage {
    let height = base.height();
    let mut canvas = Canvas::from_image(base.clone());
    for (overlay, placement) in overlays {
        if placement.width == 0 || placement.height == 0 {
            continue;
        }
        match &overlay.content {
            OverlayContent::Sprite(sprite) => {
                let top = placement.top(height);
                if sprite.dimensions() == (placement.width, placement.height) {
                    imageops::overlay(canvas.image_mut(), &**sprite, placement.x, top);
                } else {
                    let resized =
                        imageops::resize(&**sprite, placement.width, placement.height, FilterType::Triangle);
                    imageops::overlay(canvas.image_mut(), &resized, placement.x, top);
                }
            }
            OverlayContent::Panel {
                background,
                border,
                header_rows,
                swatches,
            } => {
                let rect = placement.to_screen_rect(height);
                canvas.fill_rect(rect, *background);
                canvas.stroke_rect(rect, *border, 1.0);
                for (swatch, color) in swatch_rects(rect, *header_rows, swatches.len()).into_iter().zip(swatches) {
                    canvas.fill_rect(swatch, *color);
                }
            }
        }
    }
    canvas.into_image()
}
