use crate::math::Vec2;

/// Axis-aligned bounding box in an arbitrary planar space.
///
/// Used for raw geometry bounds (lon/lat degrees) before projection.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Smallest box containing every point, or `None` for an empty iterator.
    pub fn from_points(points: impl IntoIterator<Item = Vec2>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let mut out = Aabb2::new([first.x, first.y], [first.x, first.y]);
        for p in iter {
            out.include(p);
        }
        Some(out)
    }

    pub fn include(&mut self, p: Vec2) {
        self.min[0] = self.min[0].min(p.x);
        self.min[1] = self.min[1].min(p.y);
        self.max[0] = self.max[0].max(p.x);
        self.max[1] = self.max[1].max(p.y);
    }

    pub fn union(self, other: Self) -> Self {
        Aabb2::new(
            [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        )
    }

    /// Expands minima outward and maxima outward by a fixed absolute amount.
    pub fn padded(self, padding: f64) -> Self {
        Aabb2::new(
            [self.min[0] - padding, self.min[1] - padding],
            [self.max[0] + padding, self.max[1] + padding],
        )
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }

    /// True when the box has no positive area (or is not finite).
    pub fn is_degenerate(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        !(w.is_finite() && h.is_finite()) || w <= 0.0 || h <= 0.0
    }
}

/// Pixel rectangle with a top-left origin, as pointer events report it.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ScreenRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl ScreenRect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn from_origin_size(origin: Vec2, size: Vec2) -> Self {
        Self::new(origin.x, origin.y, size.x, size.y)
    }

    pub fn origin(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Edges are inclusive so a press on the border still hits.
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    pub fn translated(&self, delta: Vec2) -> Self {
        Self::new(self.x + delta.x, self.y + delta.y, self.width, self.height)
    }
}
