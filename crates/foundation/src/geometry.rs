//! Region polygons. Coordinates are lon/lat degrees unless `projected()`.

use crate::bounds::Aabb2;
use crate::ids::RegionId;
use crate::math::{Vec2, lonlat_to_mercator};

/// A polygon as an outer ring followed by zero or more holes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Polygon {
    pub rings: Vec<Vec<Vec2>>,
}

impl Polygon {
    pub fn new(rings: Vec<Vec<Vec2>>) -> Self {
        Self { rings }
    }

    pub fn outer(&self) -> Option<&[Vec2]> {
        self.rings.first().map(|r| r.as_slice())
    }

    pub fn bounds(&self) -> Option<Aabb2> {
        Aabb2::from_points(self.outer()?.iter().copied())
    }

    pub fn projected(&self) -> Polygon {
        Polygon::new(
            self.rings
                .iter()
                .map(|ring| ring.iter().map(|p| lonlat_to_mercator(*p)).collect())
                .collect(),
        )
    }

    /// Unsigned area with holes subtracted, and the area-weighted centroid.
    fn area_centroid(&self) -> Option<(f64, Vec2)> {
        let (outer_area, outer_c) = ring_area_centroid(self.outer()?)?;
        let mut area = outer_area;
        let mut moment = outer_c.scale(outer_area);
        for hole in self.rings.iter().skip(1) {
            if let Some((a, c)) = ring_area_centroid(hole) {
                area -= a;
                moment = moment - c.scale(a);
            }
        }
        if area <= 0.0 {
            return None;
        }
        Some((area, moment.scale(1.0 / area)))
    }
}

/// An administrative or statistical region.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub id: RegionId,
    pub name: String,
    pub polygons: Vec<Polygon>,
}

impl Region {
    pub fn new(id: impl Into<RegionId>, name: impl Into<String>, polygons: Vec<Polygon>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            polygons,
        }
    }

    pub fn bounds(&self) -> Option<Aabb2> {
        self.polygons
            .iter()
            .filter_map(Polygon::bounds)
            .reduce(Aabb2::union)
    }

    pub fn projected(&self) -> Region {
        Region {
            id: self.id.clone(),
            name: self.name.clone(),
            polygons: self.polygons.iter().map(Polygon::projected).collect(),
        }
    }

    /// Area-weighted centroid over all parts; falls back to the vertex mean
    /// when every part has zero area.
    pub fn centroid(&self) -> Option<Vec2> {
        let mut area = 0.0;
        let mut moment = Vec2::ZERO;
        for poly in &self.polygons {
            if let Some((a, c)) = poly.area_centroid() {
                area += a;
                moment = moment + c.scale(a);
            }
        }
        if area > 0.0 {
            return Some(moment.scale(1.0 / area));
        }
        let points: Vec<Vec2> = self
            .polygons
            .iter()
            .filter_map(Polygon::outer)
            .flatten()
            .copied()
            .collect();
        if points.is_empty() {
            return None;
        }
        let sum = points.iter().fold(Vec2::ZERO, |acc, p| acc + *p);
        Some(sum.scale(1.0 / points.len() as f64))
    }
}

/// Union of the bounds of every region, `None` when nothing has geometry.
pub fn regions_bounds<'a>(regions: impl IntoIterator<Item = &'a Region>) -> Option<Aabb2> {
    regions
        .into_iter()
        .filter_map(Region::bounds)
        .reduce(Aabb2::union)
}

fn ring_area_centroid(ring: &[Vec2]) -> Option<(f64, Vec2)> {
    if ring.len() < 3 {
        return None;
    }
    // Shift to the first vertex to keep the shoelace sums well conditioned.
    let origin = ring[0];
    let mut twice_area = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for i in 0..ring.len() {
        let a = ring[i] - origin;
        let b = ring[(i + 1) % ring.len()] - origin;
        let cross = a.x * b.y - b.x * a.y;
        twice_area += cross;
        cx += (a.x + b.x) * cross;
        cy += (a.y + b.y) * cross;
    }
    if twice_area == 0.0 {
        return None;
    }
    let c = Vec2::new(cx / (3.0 * twice_area), cy / (3.0 * twice_area)) + origin;
    Some(((twice_area / 2.0).abs(), c))
}

#[cfg(test)]
mod tests {
    use super::{Polygon, Region, regions_bounds};
    use crate::bounds::Aabb2;
    use crate::math::Vec2;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x0 + size, y0),
            Vec2::new(x0 + size, y0 + size),
            Vec2::new(x0, y0 + size),
            Vec2::new(x0, y0),
        ]
    }

    #[test]
    fn square_centroid_is_its_middle() {
        let r = Region::new("W1", "Ward", vec![Polygon::new(vec![square(0.0, 0.0, 2.0)])]);
        assert_eq!(r.centroid(), Some(Vec2::new(1.0, 1.0)));
    }

    #[test]
    fn hole_shifts_centroid_away() {
        let poly = Polygon::new(vec![square(0.0, 0.0, 4.0), square(2.0, 0.0, 2.0)]);
        let r = Region::new("W1", "Ward", vec![poly]);
        let c = r.centroid().unwrap();
        assert!(c.x < 2.0);
    }

    #[test]
    fn multipart_centroid_is_area_weighted() {
        let r = Region::new(
            "W1",
            "Ward",
            vec![
                Polygon::new(vec![square(0.0, 0.0, 2.0)]),
                Polygon::new(vec![square(10.0, 0.0, 1.0)]),
            ],
        );
        let c = r.centroid().unwrap();
        // (4 * 1.0 + 1 * 10.5) / 5
        assert!((c.x - 2.9).abs() < 1e-12);
    }

    #[test]
    fn bounds_union_over_regions() {
        let a = Region::new("A", "a", vec![Polygon::new(vec![square(0.0, 0.0, 1.0)])]);
        let b = Region::new("B", "b", vec![Polygon::new(vec![square(3.0, -2.0, 1.0)])]);
        assert_eq!(
            regions_bounds([&a, &b]),
            Some(Aabb2::new([0.0, -2.0], [4.0, 1.0]))
        );
    }
}
