use foundation::math::Vec2;

use crate::catalog::LayerDefinition;
use crate::classify::Classes;
use crate::symbology::Rgba;

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub label: String,
    pub count: usize,
    pub color: Rgba,
}

/// Labelled swatches for the active layer. Rebuilt on every layer swap.
#[derive(Debug, Clone, PartialEq)]
pub struct LegendSpec {
    pub title: String,
    pub entries: Vec<LegendEntry>,
}

pub fn legend_title(indicator: &str, unit: &str) -> String {
    format!("Private Rented\n{indicator}\n{unit} and (no. of COAs)")
}

/// Pairs ascending class bounds with ramp colours.
///
/// The first range starts at the dataset minimum; every later range starts at
/// the previous class's upper bound.
pub fn build_legend(def: &LayerDefinition, classes: &Classes, min_value: f64) -> LegendSpec {
    let p = def.precision;
    let mut lower = min_value;
    let entries = classes
        .uppers
        .iter()
        .zip(&classes.slots)
        .zip(&classes.counts)
        .map(|((upper, slot), count)| {
            let label = format!("{lower:.p$} - {upper:.p$}({count})");
            lower = *upper;
            LegendEntry {
                label,
                count: *count,
                color: def.ramp.color(*slot),
            }
        })
        .collect();
    LegendSpec {
        title: legend_title(&def.indicator, &def.unit),
        entries,
    }
}

/// Text metrics used to size the legend box without a shaping engine.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LegendMetrics {
    pub font_px: f64,
    pub char_width: f64,
    pub line_height: f64,
    pub padding_px: f64,
    pub swatch_px: f64,
}

impl LegendMetrics {
    /// Metrics for a 10 pt font at `dpi`.
    pub fn for_dpi(dpi: f64) -> Self {
        let font_px = 10.0 * dpi / 72.0;
        Self {
            font_px,
            char_width: 0.6,
            line_height: 1.4,
            padding_px: font_px * 0.5,
            swatch_px: font_px,
        }
    }
}

impl LegendSpec {
    /// Approximate box size in pixels for hit-testing and export placement.
    pub fn estimated_size(&self, m: &LegendMetrics) -> Vec2 {
        let glyph = m.font_px * m.char_width;
        let line = m.font_px * m.line_height;
        let title_w = self
            .title
            .lines()
            .map(|l| l.chars().count())
            .max()
            .unwrap_or(0) as f64
            * glyph;
        let entry_w = self
            .entries
            .iter()
            .map(|e| e.label.chars().count())
            .max()
            .unwrap_or(0) as f64
            * glyph
            + m.swatch_px
            + m.padding_px;
        let rows = self.title.lines().count() + self.entries.len();
        Vec2::new(
            title_w.max(entry_w) + 2.0 * m.padding_px,
            rows as f64 * line + 2.0 * m.padding_px,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{LegendMetrics, build_legend, legend_title};
    use crate::catalog::LayerDefinition;
    use crate::classify::{ClassificationResult, Classes};
    use crate::symbology::{ColorRamp, Rgba};
    use pretty_assertions::assert_eq;

    fn def() -> LayerDefinition {
        LayerDefinition::new(
            "pcHHSRS",
            "HHSRS Cat. 1 Hazards",
            ColorRamp::from_hex(&["#ffffdd", "#ffd799", "#f29d52", "#c06e46", "#a66141"]).unwrap(),
        )
    }

    #[test]
    fn labels_start_at_dataset_minimum() {
        let values: Vec<f64> = (1..=10).map(f64::from).collect();
        let result = ClassificationResult {
            breaks: vec![2.0, 4.0, 6.0, 8.0, 10.0],
            counts: vec![2; 5],
        };
        let legend = build_legend(&def(), &Classes::from_result(&result, &values), 1.0);
        let labels: Vec<&str> = legend.entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(
            labels,
            vec!["1 - 2(2)", "2 - 4(2)", "4 - 6(2)", "6 - 8(2)", "8 - 10(2)"]
        );
        assert_eq!(legend.entries[4].color, Rgba::from_hex("#a66141").unwrap());
        assert_eq!(
            legend.title,
            "Private Rented\nHHSRS Cat. 1 Hazards\nPercent and (no. of COAs)"
        );
    }

    #[test]
    fn precision_and_unit_follow_definition() {
        let d = def().with_precision(1).with_unit("Tonnes/year");
        let values = [1.5, 3.5];
        let result = ClassificationResult {
            breaks: vec![1.5, 3.5],
            counts: vec![1, 1],
        };
        let legend = build_legend(&d, &Classes::from_result(&result, &values), 1.5);
        assert_eq!(legend.entries[0].label, "1.5 - 1.5(1)");
        assert_eq!(legend.entries[1].label, "1.5 - 3.5(1)");
        assert!(legend.title.ends_with("Tonnes/year and (no. of COAs)"));
    }

    #[test]
    fn size_grows_with_entries() {
        let m = LegendMetrics::for_dpi(72.0);
        let values = [1.0, 2.0];
        let one = ClassificationResult {
            breaks: vec![2.0],
            counts: vec![2],
        };
        let two = ClassificationResult {
            breaks: vec![1.0, 2.0],
            counts: vec![1, 1],
        };
        let small = build_legend(&def(), &Classes::from_result(&one, &values), 1.0);
        let large = build_legend(&def(), &Classes::from_result(&two, &values), 1.0);
        assert!(large.estimated_size(&m).y > small.estimated_size(&m).y);
        assert_eq!(legend_title("X", "Score").lines().count(), 3);
    }
}
