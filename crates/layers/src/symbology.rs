use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorError {
    #[error("invalid hex colour {0:?} (expected #rrggbb or #rrggbbaa)")]
    InvalidHex(String),
    #[error("colour ramp needs {expected} colours, got {got}")]
    RampLength { expected: usize, got: usize },
}

/// 8-bit straight-alpha colour.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    /// CSS `lightgray`.
    pub const LIGHT_GRAY: Rgba = Rgba([211, 211, 211, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba([r, g, b, 255])
    }

    pub fn from_hex(hex: &str) -> Result<Self, ColorError> {
        let invalid = || ColorError::InvalidHex(hex.to_string());
        let digits = hex.strip_prefix('#').ok_or_else(invalid)?;
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return Err(invalid());
        }
        let mut out = [255u8; 4];
        for (i, slot) in out.iter_mut().enumerate().take(digits.len() / 2) {
            *slot = u8::from_str_radix(&digits[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }
        Ok(Rgba(out))
    }

    pub fn with_alpha(self, alpha: f32) -> Self {
        let [r, g, b, _] = self.0;
        Rgba([r, g, b, (alpha.clamp(0.0, 1.0) * 255.0).round() as u8])
    }

    pub fn to_hex(self) -> String {
        let [r, g, b, a] = self.0;
        if a == 255 {
            format!("#{r:02x}{g:02x}{b:02x}")
        } else {
            format!("#{r:02x}{g:02x}{b:02x}{a:02x}")
        }
    }
}

/// Ordered colours, one per class, lightest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRamp {
    colors: Vec<Rgba>,
}

impl ColorRamp {
    pub fn new(colors: Vec<Rgba>) -> Self {
        Self { colors }
    }

    pub fn from_hex<S: AsRef<str>>(hexes: &[S]) -> Result<Self, ColorError> {
        let colors = hexes
            .iter()
            .map(|h| Rgba::from_hex(h.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { colors })
    }

    /// Fails unless the ramp has exactly `classes` colours.
    pub fn ensure_len(&self, classes: usize) -> Result<(), ColorError> {
        if self.colors.len() == classes {
            Ok(())
        } else {
            Err(ColorError::RampLength {
                expected: classes,
                got: self.colors.len(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Colour for a class slot; slots past the end reuse the last colour.
    pub fn color(&self, slot: usize) -> Rgba {
        self.colors
            .get(slot)
            .or_else(|| self.colors.last())
            .copied()
            .unwrap_or(Rgba::WHITE)
    }

    pub fn colors(&self) -> &[Rgba] {
        &self.colors
    }
}

/// How choropleth polygons are painted.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct FillStyle {
    pub alpha: f32,
    pub edge: Rgba,
    pub edge_width_px: f32,
}

impl Default for FillStyle {
    fn default() -> Self {
        Self {
            alpha: 0.7,
            edge: Rgba::LIGHT_GRAY,
            edge_width_px: 1.0,
        }
    }
}

/// Boundary outline style, drawn above the fills.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OutlineStyle {
    pub color: Rgba,
    pub width_px: f32,
}

impl Default for OutlineStyle {
    fn default() -> Self {
        Self {
            color: Rgba::BLACK,
            width_px: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ColorError, ColorRamp, Rgba};

    #[test]
    fn parses_rgb_and_rgba_hex() {
        assert_eq!(Rgba::from_hex("#ffd799").unwrap(), Rgba([0xff, 0xd7, 0x99, 255]));
        assert_eq!(Rgba::from_hex("#00000080").unwrap(), Rgba([0, 0, 0, 0x80]));
        assert!(Rgba::from_hex("ffd799").is_err());
        assert!(Rgba::from_hex("#ffd79").is_err());
        assert!(Rgba::from_hex("#gg0000").is_err());
        assert_eq!(Rgba::from_hex("#a66141").unwrap().to_hex(), "#a66141");
    }

    #[test]
    fn ramp_length_is_checked() {
        let ramp = ColorRamp::from_hex(&["#ffffff", "#000000"]).unwrap();
        assert_eq!(
            ramp.ensure_len(5),
            Err(ColorError::RampLength {
                expected: 5,
                got: 2
            })
        );
        assert_eq!(ramp.color(7), Rgba::BLACK);
    }

    #[test]
    fn alpha_is_scaled_to_byte() {
        assert_eq!(Rgba::WHITE.with_alpha(0.5).0[3], 128);
        assert_eq!(Rgba::WHITE.with_alpha(2.0).0[3], 255);
    }
}
