use foundation::ScreenRect;
use foundation::math::{Vec2, mercator_scale_factor, mercator_to_lonlat};

use crate::surface::ViewContext;

/// Longest bar allowed, as a fraction of the plot width.
pub const MAX_PLOT_FRACTION: f64 = 0.35;

const INSET_PX: f64 = 10.0;
const BAR_HEIGHT_PX: f64 = 24.0;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ScaleBarLocation {
    UpperRight,
    UpperLeft,
    LowerLeft,
    LowerRight,
    Right,
    CenterLeft,
    CenterRight,
    LowerCenter,
    UpperCenter,
    Center,
}

impl ScaleBarLocation {
    pub const ALL: [ScaleBarLocation; 10] = [
        ScaleBarLocation::UpperRight,
        ScaleBarLocation::UpperLeft,
        ScaleBarLocation::LowerLeft,
        ScaleBarLocation::LowerRight,
        ScaleBarLocation::Right,
        ScaleBarLocation::CenterLeft,
        ScaleBarLocation::CenterRight,
        ScaleBarLocation::LowerCenter,
        ScaleBarLocation::UpperCenter,
        ScaleBarLocation::Center,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ScaleBarLocation::UpperRight => "upper right",
            ScaleBarLocation::UpperLeft => "upper left",
            ScaleBarLocation::LowerLeft => "lower left",
            ScaleBarLocation::LowerRight => "lower right",
            ScaleBarLocation::Right => "right",
            ScaleBarLocation::CenterLeft => "center left",
            ScaleBarLocation::CenterRight => "center right",
            ScaleBarLocation::LowerCenter => "lower center",
            ScaleBarLocation::UpperCenter => "upper center",
            ScaleBarLocation::Center => "center",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|loc| loc.name() == name)
    }

    /// Horizontal and vertical alignment in `0.0 ..= 1.0` (left/top = 0).
    fn alignment(self) -> (f64, f64) {
        match self {
            ScaleBarLocation::UpperRight => (1.0, 0.0),
            ScaleBarLocation::UpperLeft => (0.0, 0.0),
            ScaleBarLocation::LowerLeft => (0.0, 1.0),
            ScaleBarLocation::LowerRight => (1.0, 1.0),
            ScaleBarLocation::Right | ScaleBarLocation::CenterRight => (1.0, 0.5),
            ScaleBarLocation::CenterLeft => (0.0, 0.5),
            ScaleBarLocation::LowerCenter => (0.5, 1.0),
            ScaleBarLocation::UpperCenter => (0.5, 0.0),
            ScaleBarLocation::Center => (0.5, 0.5),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScaleBarLayout {
    pub rect: ScreenRect,
    pub length_km: f64,
    pub label: String,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScaleBar {
    pub location: ScaleBarLocation,
    pub visible: bool,
}

impl Default for ScaleBar {
    fn default() -> Self {
        Self {
            location: ScaleBarLocation::LowerCenter,
            visible: true,
        }
    }
}

impl ScaleBar {
    /// Bar placement for the current view, or `None` when hidden or when the
    /// view is too small to show even the shortest bar.
    pub fn layout(&self, view: &ViewContext) -> Option<ScaleBarLayout> {
        if !self.visible {
            return None;
        }
        let centre_lat = mercator_to_lonlat(view.extent.center()).y;
        let ground_per_map = mercator_scale_factor(centre_lat);
        let max_km = MAX_PLOT_FRACTION * view.extent.width() * ground_per_map / 1000.0;
        let length_km = nice_length(max_km)?;

        let map_len = length_km * 1000.0 / ground_per_map;
        let width_px = map_len / view.transform().map_per_pixel().x;
        let plot = view.surface.plot;
        let (ax, ay) = self.location.alignment();
        let x = plot.x + INSET_PX + ax * (plot.width - 2.0 * INSET_PX - width_px);
        let y = plot.y + INSET_PX + ay * (plot.height - 2.0 * INSET_PX - BAR_HEIGHT_PX);

        Some(ScaleBarLayout {
            rect: ScreenRect::from_origin_size(Vec2::new(x, y), Vec2::new(width_px, BAR_HEIGHT_PX)),
            length_km,
            label: format!("{length_km:.2} km"),
        })
    }
}

/// Largest `{1, 2, 5} x 10^k` not exceeding `max`.
fn nice_length(max: f64) -> Option<f64> {
    if !(max.is_finite() && max > 0.0) {
        return None;
    }
    let magnitude = 10f64.powf(max.log10().floor());
    [5.0, 2.0, 1.0]
        .into_iter()
        .map(|m| m * magnitude)
        .find(|len| *len <= max * (1.0 + 1e-12))
}

#[cfg(test)]
mod tests {
    use super::{ScaleBar, ScaleBarLocation, nice_length};
    use crate::surface::{SurfaceGeometry, ViewContext};
    use foundation::Extent;

    #[test]
    fn nice_lengths_round_down() {
        assert_eq!(nice_length(3.7), Some(2.0));
        assert_eq!(nice_length(7.0), Some(5.0));
        assert_eq!(nice_length(0.42), Some(0.2));
        assert_eq!(nice_length(10.0), Some(10.0));
        assert_eq!(nice_length(0.0), None);
    }

    #[test]
    fn every_location_round_trips_by_name() {
        for loc in ScaleBarLocation::ALL {
            assert_eq!(ScaleBarLocation::from_name(loc.name()), Some(loc));
        }
        assert_eq!(ScaleBarLocation::from_name("nowhere"), None);
    }

    #[test]
    fn bar_fits_within_plot_fraction() {
        // Equator: one projected metre is one ground metre.
        let view = ViewContext::new(
            SurfaceGeometry::new(1000.0, 750.0, 100.0),
            Extent::new(0.0, -3750.0, 10_000.0, 3750.0),
        );
        let layout = ScaleBar::default().layout(&view).unwrap();
        assert_eq!(layout.length_km, 2.0);
        assert_eq!(layout.label, "2.00 km");
        assert!((layout.rect.width - 200.0).abs() < 1e-6);
        assert!(layout.rect.width <= 0.35 * 1000.0);
        assert!(view.surface.plot.contains(layout.rect.origin()));
        // Lower centre: horizontally centred inside the insets.
        assert!((layout.rect.x - 400.0).abs() < 1e-6);
    }

    #[test]
    fn hidden_bar_has_no_layout() {
        let view = ViewContext::new(
            SurfaceGeometry::new(1000.0, 750.0, 100.0),
            Extent::new(0.0, 0.0, 10_000.0, 7500.0),
        );
        let bar = ScaleBar {
            visible: false,
            ..ScaleBar::default()
        };
        assert_eq!(bar.layout(&view), None);
    }
}
