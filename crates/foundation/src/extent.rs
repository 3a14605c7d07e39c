//! Visible extents in the projected (web-mercator) plane.

use thiserror::Error;

use crate::bounds::{Aabb2, ScreenRect};
use crate::math::{Vec2, approx_eq, lonlat_to_mercator};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExtentError {
    #[error("boundary bounds have zero area: {0:?}")]
    Degenerate(Aabb2),
    #[error("aspect ratio must be finite and positive, got {0}")]
    InvalidAspect(f64),
}

/// Bounding box in projected-plane units (metres).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Extent {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Extent {
    pub const fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn from_center_size(center: Vec2, width: f64, height: f64) -> Self {
        Self::new(
            center.x - width / 2.0,
            center.y - height / 2.0,
            center.x + width / 2.0,
            center.y + height / 2.0,
        )
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn aspect(&self) -> f64 {
        self.width() / self.height()
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new((self.xmin + self.xmax) / 2.0, (self.ymin + self.ymax) / 2.0)
    }

    /// Moves the extent without resizing it.
    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(
            self.xmin + delta.x,
            self.ymin + delta.y,
            self.xmax + delta.x,
            self.ymax + delta.y,
        )
    }

    /// Adjusts every edge inward by `(dx, dy)`; negative values grow the extent.
    pub fn inset(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.xmin + dx, self.ymin + dy, self.xmax - dx, self.ymax - dy)
    }

    pub fn approx_eq(&self, other: &Extent, rel: f64) -> bool {
        approx_eq(self.xmin, other.xmin, rel)
            && approx_eq(self.ymin, other.ymin, rel)
            && approx_eq(self.xmax, other.xmax, rel)
            && approx_eq(self.ymax, other.ymax, rel)
    }
}

/// Projects the corners of lon/lat bounds onto the mercator plane.
pub fn project_bounds(lonlat: Aabb2) -> Aabb2 {
    let lo = lonlat_to_mercator(Vec2::new(lonlat.min[0], lonlat.min[1]));
    let hi = lonlat_to_mercator(Vec2::new(lonlat.max[0], lonlat.max[1]));
    Aabb2::new([lo.x, lo.y], [hi.x, hi.y])
}

/// Width and height of the aspect-locked box around a projected
/// `width` x `height`.
///
/// A box taller than wide is height-controlled; otherwise (ties included) it is
/// width-controlled. When the derived dimension comes out shorter than the
/// original, the controlling value is reused for the other axis so the box
/// still covers the bounds.
pub fn locked_size(width: f64, height: f64, aspect: f64) -> (f64, f64) {
    if width < height {
        if height * aspect < width {
            (height, height / aspect)
        } else {
            (height * aspect, height)
        }
    } else if width / aspect < height {
        (width * aspect, width)
    } else {
        (width, width / aspect)
    }
}

/// Builds the initial, aspect-locked view over the boundary geometry.
///
/// `raw` is in lon/lat degrees; `padding` is an absolute margin in the same
/// units. The box size comes from [`locked_size`] and is centred on the
/// midpoint of the projected bounds.
pub fn compute_locked_extent(raw: Aabb2, aspect: f64, padding: f64) -> Result<Extent, ExtentError> {
    if !(aspect.is_finite() && aspect > 0.0) {
        return Err(ExtentError::InvalidAspect(aspect));
    }
    if raw.is_degenerate() {
        return Err(ExtentError::Degenerate(raw));
    }

    let projected = project_bounds(raw.padded(padding));
    if projected.is_degenerate() {
        return Err(ExtentError::Degenerate(raw));
    }
    let (x_len, y_len) = locked_size(projected.width(), projected.height(), aspect);

    let center = Vec2::new(
        (projected.min[0] + projected.max[0]) / 2.0,
        (projected.min[1] + projected.max[1]) / 2.0,
    );
    Ok(Extent::from_center_size(center, x_len, y_len))
}

/// Maps between the projected plane and a pixel rectangle (top-left origin).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ViewTransform {
    pub extent: Extent,
    pub plot: ScreenRect,
}

impl ViewTransform {
    pub fn new(extent: Extent, plot: ScreenRect) -> Self {
        Self { extent, plot }
    }

    /// Map units per screen pixel along each axis.
    pub fn map_per_pixel(&self) -> Vec2 {
        Vec2::new(
            self.extent.width() / self.plot.width,
            self.extent.height() / self.plot.height,
        )
    }

    pub fn map_to_screen(&self, p: Vec2) -> Vec2 {
        let e = &self.extent;
        Vec2::new(
            self.plot.x + (p.x - e.xmin) / e.width() * self.plot.width,
            self.plot.y + (e.ymax - p.y) / e.height() * self.plot.height,
        )
    }

    pub fn screen_to_map(&self, s: Vec2) -> Vec2 {
        let e = &self.extent;
        Vec2::new(
            e.xmin + (s.x - self.plot.x) / self.plot.width * e.width(),
            e.ymax - (s.y - self.plot.y) / self.plot.height * e.height(),
        )
    }

    /// Converts a screen-space delta into a map-plane delta (y flips).
    pub fn screen_delta_to_map(&self, delta: Vec2) -> Vec2 {
        let mpp = self.map_per_pixel();
        Vec2::new(delta.x * mpp.x, -delta.y * mpp.y)
    }
}

#[cfg(test)]
mod tests {
    use super::{Extent, ExtentError, ViewTransform, compute_locked_extent, locked_size, project_bounds};
    use crate::bounds::{Aabb2, ScreenRect};
    use crate::math::Vec2;

    const ASPECT: f64 = 1.333;

    fn check_locked(raw: Aabb2) {
        let e = compute_locked_extent(raw, ASPECT, 0.003).expect("extent");
        assert!((e.aspect() - ASPECT).abs() < 1e-9, "aspect {}", e.aspect());
        let projected = project_bounds(raw.padded(0.003));
        let slack = 1e-6;
        assert!(e.xmin <= projected.min[0] + slack);
        assert!(e.ymin <= projected.min[1] + slack);
        assert!(e.xmax >= projected.max[0] - slack);
        assert!(e.ymax >= projected.max[1] - slack);
    }

    #[test]
    fn tall_bounds_are_height_controlled() {
        check_locked(Aabb2::new([-0.35, 50.80], [-0.30, 50.90]));
    }

    #[test]
    fn wide_bounds_are_width_controlled() {
        check_locked(Aabb2::new([-0.45, 50.82], [-0.20, 50.86]));
    }

    #[test]
    fn slightly_wide_bounds_flip_to_height() {
        // Projected width a little over projected height: width/aspect is too short.
        let raw = Aabb2::new([-0.30, 50.80], [-0.20, 50.8508]);
        check_locked(raw);
        let p = project_bounds(raw.padded(0.003));
        assert!(p.width() > p.height() && p.width() / ASPECT < p.height());
        let e = compute_locked_extent(raw, ASPECT, 0.003).unwrap();
        assert!((e.width() - p.width() * ASPECT).abs() < 1e-6, "width {}", e.width());
        assert!((e.height() - p.width()).abs() < 1e-6, "height {}", e.height());
    }

    #[test]
    fn square_box_takes_the_width_branch() {
        // width / aspect falls short, so the width value becomes the height.
        assert_eq!(locked_size(300.0, 300.0, ASPECT), (300.0 * ASPECT, 300.0));
        // With a tall aspect the width-controlled box already covers the square.
        assert_eq!(locked_size(300.0, 300.0, 0.75), (300.0, 400.0));
    }

    #[test]
    fn locked_size_branches() {
        assert_eq!(locked_size(100.0, 200.0, 1.5), (300.0, 200.0));
        assert_eq!(locked_size(400.0, 100.0, 2.0), (400.0, 200.0));
        // Tall aspect on tall bounds: height*aspect is too narrow.
        assert_eq!(locked_size(180.0, 200.0, 0.5), (200.0, 400.0));
    }

    #[test]
    fn locked_extent_is_centered_on_bounds() {
        let raw = Aabb2::new([-0.35, 50.80], [-0.30, 50.90]);
        let e = compute_locked_extent(raw, ASPECT, 0.0).unwrap();
        let p = project_bounds(raw);
        let c = e.center();
        assert!((c.x - (p.min[0] + p.max[0]) / 2.0).abs() < 1e-6);
        assert!((c.y - (p.min[1] + p.max[1]) / 2.0).abs() < 1e-6);
    }

    #[test]
    fn degenerate_bounds_are_rejected() {
        let raw = Aabb2::new([0.0, 1.0], [0.0, 2.0]);
        assert_eq!(
            compute_locked_extent(raw, ASPECT, 0.003),
            Err(ExtentError::Degenerate(raw))
        );
    }

    #[test]
    fn invalid_aspect_is_rejected() {
        let raw = Aabb2::new([0.0, 0.0], [1.0, 1.0]);
        assert!(matches!(
            compute_locked_extent(raw, 0.0, 0.0),
            Err(ExtentError::InvalidAspect(_))
        ));
    }

    #[test]
    fn translation_keeps_size() {
        let e = Extent::new(0.0, 0.0, 400.0, 300.0);
        let t = e.translated(Vec2::new(-50.0, 25.0));
        assert_eq!(t.width(), 400.0);
        assert_eq!(t.height(), 300.0);
        assert_eq!(t.xmin, -50.0);
    }

    #[test]
    fn view_transform_round_trips_and_flips_y() {
        let vt = ViewTransform::new(
            Extent::new(0.0, 0.0, 400.0, 300.0),
            ScreenRect::new(0.0, 0.0, 800.0, 600.0),
        );
        assert_eq!(vt.map_to_screen(Vec2::new(0.0, 300.0)), Vec2::new(0.0, 0.0));
        assert_eq!(vt.map_to_screen(Vec2::new(400.0, 0.0)), Vec2::new(800.0, 600.0));
        assert_eq!(vt.screen_to_map(Vec2::new(400.0, 300.0)), Vec2::new(200.0, 150.0));
        assert_eq!(
            vt.screen_delta_to_map(Vec2::new(10.0, 10.0)),
            Vec2::new(5.0, -5.0)
        );
    }
}
