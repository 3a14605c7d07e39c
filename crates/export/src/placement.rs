//! Interactive screen rectangles to export-raster placements.
//!
//! Interactive rectangles are top-left origin. Placements are bottom-left
//! origin, the convention of the output figure: `offset_y = H - y - h`.

use foundation::ScreenRect;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Placement {
    pub x: i64,
    /// Distance from the bottom edge of the raster to the bottom of the box.
    pub offset_y: i64,
    pub width: u32,
    pub height: u32,
}

impl Placement {
    /// Rescales an interactive rectangle onto a raster `scale` times larger.
    ///
    /// At `scale == 1` the rectangle is copied unchanged. Otherwise the width
    /// is scaled and rounded and the height follows from the rounded width so
    /// the box keeps its aspect ratio.
    pub fn from_screen(rect: ScreenRect, surface_height: f64, scale: f64) -> Self {
        let offset_y = surface_height - rect.y - rect.height;
        if scale == 1.0 {
            return Self {
                x: rect.x.round() as i64,
                offset_y: offset_y.round() as i64,
                width: rect.width.round().max(0.0) as u32,
                height: rect.height.round().max(0.0) as u32,
            };
        }
        let width = (rect.width * scale).round().max(0.0);
        let height = if rect.width > 0.0 {
            (rect.height / rect.width * width).round().max(0.0)
        } else {
            (rect.height * scale).round().max(0.0)
        };
        Self {
            x: (rect.x * scale).round() as i64,
            offset_y: (offset_y * scale).round() as i64,
            width: width as u32,
            height: height as u32,
        }
    }

    /// Top edge in the raster's own (top-left origin) pixel rows.
    pub fn top(&self, raster_height: u32) -> i64 {
        i64::from(raster_height) - self.offset_y - i64::from(self.height)
    }

    pub fn to_screen_rect(&self, raster_height: u32) -> ScreenRect {
        ScreenRect::new(
            self.x as f64,
            self.top(raster_height) as f64,
            f64::from(self.width),
            f64::from(self.height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::Placement;
    use foundation::ScreenRect;
    use pretty_assertions::assert_eq;

    #[test]
    fn unit_scale_flips_origin_only() {
        let p = Placement::from_screen(ScreenRect::new(100.0, 50.0, 40.0, 20.0), 600.0, 1.0);
        assert_eq!(
            p,
            Placement {
                x: 100,
                offset_y: 530,
                width: 40,
                height: 20
            }
        );
        assert_eq!(p.top(600), 50);
        assert_eq!(p.to_screen_rect(600), ScreenRect::new(100.0, 50.0, 40.0, 20.0));
    }

    #[test]
    fn double_scale_doubles_position_and_size() {
        let p = Placement::from_screen(ScreenRect::new(100.0, 50.0, 40.0, 20.0), 600.0, 2.0);
        assert_eq!(
            p,
            Placement {
                x: 200,
                offset_y: 1060,
                width: 80,
                height: 40
            }
        );
        assert_eq!(p.top(1200), 100);
    }

    #[test]
    fn height_follows_rounded_width() {
        let p = Placement::from_screen(ScreenRect::new(0.0, 0.0, 65.0, 100.0), 855.0, 200.0 / 95.0);
        // 65 * 2.105... = 136.8 -> 137; 100 / 65 * 137 = 210.77 -> 211
        assert_eq!((p.width, p.height), (137, 211));
    }
}
