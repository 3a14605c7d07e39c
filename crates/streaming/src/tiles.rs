//! XYZ tile math on the web-mercator plane.

use foundation::Extent;
use foundation::math::MERCATOR_HALF_WORLD;

/// Tile coordinate in ZXY scheme (y grows southward).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TileCoord {
    pub z: u8,
    pub x: u32,
    pub y: u32,
}

impl TileCoord {
    pub fn new(z: u8, x: u32, y: u32) -> Self {
        Self { z, x, y }
    }

    /// Number of tiles along one axis at zoom `z`.
    pub fn tiles_per_axis(z: u8) -> u32 {
        1u32 << z
    }

    /// Side length of a tile at zoom `z`, in projected metres.
    pub fn span_m(z: u8) -> f64 {
        2.0 * MERCATOR_HALF_WORLD / f64::from(Self::tiles_per_axis(z))
    }

    pub fn extent(&self) -> Extent {
        let span = Self::span_m(self.z);
        let xmin = -MERCATOR_HALF_WORLD + f64::from(self.x) * span;
        let ymax = MERCATOR_HALF_WORLD - f64::from(self.y) * span;
        Extent::new(xmin, ymax - span, xmin + span, ymax)
    }

    pub fn url(&self, template: &str) -> String {
        template
            .replace("{z}", &self.z.to_string())
            .replace("{x}", &self.x.to_string())
            .replace("{y}", &self.y.to_string())
    }
}

/// Zoom whose tile pixels are at least as dense as the surface pixels.
pub fn zoom_for_extent(extent: &Extent, width_px: u32, tile_size: u32, max_zoom: u8) -> u8 {
    let width_px = f64::from(width_px.max(1));
    let metres_per_px = extent.width() / width_px;
    if !(metres_per_px.is_finite() && metres_per_px > 0.0) {
        return 0;
    }
    let z = (2.0 * MERCATOR_HALF_WORLD / (f64::from(tile_size) * metres_per_px))
        .log2()
        .ceil();
    z.clamp(0.0, f64::from(max_zoom)) as u8
}

/// Inclusive tile column/row ranges covering an extent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TileRange {
    pub z: u8,
    pub x0: u32,
    pub x1: u32,
    pub y0: u32,
    pub y1: u32,
}

impl TileRange {
    pub fn covering(extent: &Extent, z: u8) -> Self {
        let span = TileCoord::span_m(z);
        let last = f64::from(TileCoord::tiles_per_axis(z) - 1);
        let col = |x: f64| ((x + MERCATOR_HALF_WORLD) / span).floor().clamp(0.0, last) as u32;
        let row = |y: f64| ((MERCATOR_HALF_WORLD - y) / span).floor().clamp(0.0, last) as u32;
        Self {
            z,
            x0: col(extent.xmin),
            x1: col(extent.xmax),
            y0: row(extent.ymax),
            y1: row(extent.ymin),
        }
    }

    pub fn columns(&self) -> u32 {
        self.x1 - self.x0 + 1
    }

    pub fn rows(&self) -> u32 {
        self.y1 - self.y0 + 1
    }

    /// Row-major, north to south then west to east.
    pub fn coords(&self) -> Vec<TileCoord> {
        let mut out = Vec::with_capacity((self.columns() * self.rows()) as usize);
        for y in self.y0..=self.y1 {
            for x in self.x0..=self.x1 {
                out.push(TileCoord::new(self.z, x, y));
            }
        }
        out
    }

    /// Extent covered by the whole range.
    pub fn extent(&self) -> Extent {
        let nw = TileCoord::new(self.z, self.x0, self.y0).extent();
        let se = TileCoord::new(self.z, self.x1, self.y1).extent();
        Extent::new(nw.xmin, se.ymin, se.xmax, nw.ymax)
    }
}

#[cfg(test)]
mod tests {
    use super::{TileCoord, TileRange, zoom_for_extent};
    use foundation::Extent;
    use foundation::math::MERCATOR_HALF_WORLD;

    #[test]
    fn zoom_zero_tile_is_the_world() {
        let e = TileCoord::new(0, 0, 0).extent();
        assert_eq!(e.xmin, -MERCATOR_HALF_WORLD);
        assert_eq!(e.ymax, MERCATOR_HALF_WORLD);
        assert_eq!(e.width(), 2.0 * MERCATOR_HALF_WORLD);
    }

    #[test]
    fn url_template_is_filled() {
        let url = TileCoord::new(12, 2044, 1370).url("https://t/{z}/{x}/{y}.png");
        assert_eq!(url, "https://t/12/2044/1370.png");
    }

    #[test]
    fn range_covers_extent() {
        let extent = Extent::new(-40_000.0, 6_590_000.0, -26_670.0, 6_600_000.0);
        let z = zoom_for_extent(&extent, 1140, 256, 18);
        let range = TileRange::covering(&extent, z);
        let covered = range.extent();
        assert!(covered.xmin <= extent.xmin && covered.xmax >= extent.xmax);
        assert!(covered.ymin <= extent.ymin && covered.ymax >= extent.ymax);
        assert_eq!(range.coords().len(), (range.columns() * range.rows()) as usize);
    }

    #[test]
    fn zoom_is_clamped() {
        let tiny = Extent::new(0.0, 0.0, 1.0, 1.0);
        assert_eq!(zoom_for_extent(&tiny, 1000, 256, 18), 18);
        let world = TileCoord::new(0, 0, 0).extent();
        assert_eq!(zoom_for_extent(&world, 256, 256, 18), 0);
    }
}
