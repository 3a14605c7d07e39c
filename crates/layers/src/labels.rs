use foundation::Region;
use foundation::math::Vec2;

/// Label text style, sized in points and converted at the surface DPI.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LabelStyle {
    pub font_pt: f64,
    /// Average glyph advance as a fraction of the font size.
    pub char_width: f64,
    pub halo_width_pt: f64,
}

impl Default for LabelStyle {
    fn default() -> Self {
        Self {
            font_pt: 14.0,
            char_width: 0.6,
            halo_width_pt: 6.0,
        }
    }
}

impl LabelStyle {
    pub fn font_px(&self, dpi: f64) -> f64 {
        self.font_pt * dpi / 72.0
    }

    /// Approximate single-line box size in pixels.
    pub fn text_size(&self, text: &str, dpi: f64) -> Vec2 {
        let font = self.font_px(dpi);
        Vec2::new(text.chars().count() as f64 * font * self.char_width, font * 1.2)
    }
}

/// A boundary label anchored in the projected plane.
#[derive(Debug, Clone, PartialEq)]
pub struct WardLabel {
    pub text: String,
    pub anchor: Vec2,
}

/// One label per boundary, at its area-weighted projected centroid.
///
/// Boundaries without usable geometry get no label.
pub fn ward_labels(wards: &[Region]) -> Vec<WardLabel> {
    wards
        .iter()
        .filter_map(|w| {
            let anchor = w.projected().centroid()?;
            Some(WardLabel {
                text: w.id.as_str().to_string(),
                anchor,
            })
        })
        .collect()
}

/// Ward id / name rows, sorted by id.
#[derive(Debug, Clone, PartialEq)]
pub struct WardTable {
    pub header: [String; 2],
    pub rows: Vec<[String; 2]>,
}

impl WardTable {
    pub fn from_regions(wards: &[Region]) -> Self {
        let mut rows: Vec<[String; 2]> = wards
            .iter()
            .map(|w| [w.id.as_str().to_string(), w.name.clone()])
            .collect();
        rows.sort();
        Self {
            header: ["Ward ID".to_string(), "Ward Name".to_string()],
            rows,
        }
    }

    /// Approximate box size in pixels using `style` for every cell.
    pub fn estimated_size(&self, style: &LabelStyle, dpi: f64) -> Vec2 {
        let font = style.font_px(dpi);
        let cell_pad = font * 0.5;
        let col_width = |col: usize| {
            std::iter::once(&self.header[col])
                .chain(self.rows.iter().map(|r| &r[col]))
                .map(|s| style.text_size(s, dpi).x)
                .fold(0.0, f64::max)
                + 2.0 * cell_pad
        };
        let row_height = font * 1.2 + cell_pad;
        Vec2::new(
            col_width(0) + col_width(1),
            (self.rows.len() + 1) as f64 * row_height,
        )
    }
}
