//! CPU rasterizer for [`RenderFrame`]s.
//!
//! Pixel `(x, y)` is covered when its centre `(x + 0.5, y + 0.5)` lies inside
//! the shape. Colours are straight alpha and blended source-over.

use earcutr::earcut;
use foundation::ScreenRect;
use foundation::math::Vec2;
use image::{Rgba as Pixel, RgbaImage};
use layers::Rgba;

use crate::frame::{RenderCommand, RenderFrame};

pub struct Canvas {
    image: RgbaImage,
}

impl Canvas {
    pub fn new(width: u32, height: u32, background: Rgba) -> Self {
        Self {
            image: RgbaImage::from_pixel(width, height, Pixel(background.0)),
        }
    }

    pub fn from_image(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn image_mut(&mut self) -> &mut RgbaImage {
        &mut self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    pub fn blend(&mut self, x: i64, y: i64, color: Rgba) {
        if x < 0 || y < 0 || x >= i64::from(self.image.width()) || y >= i64::from(self.image.height()) {
            return;
        }
        let dst = self.image.get_pixel_mut(x as u32, y as u32);
        dst.0 = blend_over(dst.0, color.0);
    }

    pub fn fill_rect(&mut self, rect: ScreenRect, color: Rgba) {
        let (x0, x1) = self.clip_span(rect.x, rect.right(), self.image.width());
        let (y0, y1) = self.clip_span(rect.y, rect.bottom(), self.image.height());
        for y in y0..y1 {
            for x in x0..x1 {
                self.blend(x, y, color);
            }
        }
    }

    /// Border drawn inside `rect`.
    pub fn stroke_rect(&mut self, rect: ScreenRect, color: Rgba, width: f64) {
        if width <= 0.0 {
            return;
        }
        let w = width.min(rect.width / 2.0).min(rect.height / 2.0);
        let inner_h = rect.height - 2.0 * w;
        self.fill_rect(ScreenRect::new(rect.x, rect.y, rect.width, w), color);
        self.fill_rect(ScreenRect::new(rect.x, rect.bottom() - w, rect.width, w), color);
        self.fill_rect(ScreenRect::new(rect.x, rect.y + w, w, inner_h), color);
        self.fill_rect(ScreenRect::new(rect.right() - w, rect.y + w, w, inner_h), color);
    }

    /// Fills an outer ring with optional holes. Returns `false` when the
    /// rings could not be triangulated.
    pub fn fill_polygon(&mut self, rings: &[Vec<Vec2>], color: Rgba) -> bool {
        let mut coords = Vec::new();
        let mut holes = Vec::new();
        for (i, ring) in rings.iter().enumerate() {
            if i > 0 {
                holes.push(coords.len() / 2);
            }
            for p in ring {
                coords.push(p.x);
                coords.push(p.y);
            }
        }
        let Ok(indices) = earcut(&coords, &holes, 2) else {
            return false;
        };
        let vertex = |i: usize| Vec2::new(coords[i * 2], coords[i * 2 + 1]);
        for tri in indices.chunks_exact(3) {
            self.fill_triangle([vertex(tri[0]), vertex(tri[1]), vertex(tri[2])], color);
        }
        true
    }

    pub fn fill_triangle(&mut self, t: [Vec2; 3], color: Rgba) {
        let area = edge(t[0], t[1], t[2]);
        if area == 0.0 || !area.is_finite() {
            return;
        }
        let sign = area.signum();
        let min_x = t.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
        let max_x = t.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max);
        let min_y = t.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
        let max_y = t.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
        let (x0, x1) = self.clip_span(min_x, max_x, self.image.width());
        let (y0, y1) = self.clip_span(min_y, max_y, self.image.height());
        for y in y0..y1 {
            for x in x0..x1 {
                let p = Vec2::new(x as f64 + 0.5, y as f64 + 0.5);
                let inside = edge(t[0], t[1], p) * sign >= 0.0
                    && edge(t[1], t[2], p) * sign >= 0.0
                    && edge(t[2], t[0], p) * sign >= 0.0;
                if inside {
                    self.blend(x, y, color);
                }
            }
        }
    }

    /// Strokes a closed ring with square-ended segments of `width` pixels.
    pub fn stroke_ring(&mut self, ring: &[Vec2], color: Rgba, width: f64) {
        if width <= 0.0 || ring.len() < 2 {
            return;
        }
        let half = width / 2.0;
        let closing = ring.last().zip(ring.first()).map(|(a, b)| (*a, *b));
        let segments = ring.windows(2).map(|w| (w[0], w[1])).chain(closing);
        for (a, b) in segments {
            let d = b - a;
            let len = d.length();
            if len == 0.0 {
                continue;
            }
            let along = d.scale(half / len);
            let normal = Vec2::new(-along.y, along.x);
            let (a, b) = (a - along, b + along);
            let quad = [a + normal, b + normal, b - normal, a - normal];
            self.fill_triangle([quad[0], quad[1], quad[2]], color);
            self.fill_triangle([quad[0], quad[2], quad[3]], color);
        }
    }

    /// Nearest-neighbour resample of `src` into `dest`.
    pub fn draw_image(&mut self, src: &RgbaImage, dest: ScreenRect) {
        if src.width() == 0 || src.height() == 0 || dest.width <= 0.0 || dest.height <= 0.0 {
            return;
        }
        let (x0, x1) = self.clip_span(dest.x, dest.right(), self.image.width());
        let (y0, y1) = self.clip_span(dest.y, dest.bottom(), self.image.height());
        let sx = f64::from(src.width()) / dest.width;
        let sy = f64::from(src.height()) / dest.height;
        for y in y0..y1 {
            let v = ((y as f64 + 0.5 - dest.y) * sy).floor();
            let v = (v.max(0.0) as u32).min(src.height() - 1);
            for x in x0..x1 {
                let u = ((x as f64 + 0.5 - dest.x) * sx).floor();
                let u = (u.max(0.0) as u32).min(src.width() - 1);
                let px = src.get_pixel(u, v).0;
                self.blend(x, y, Rgba(px));
            }
        }
    }

    pub fn execute(&mut self, command: &RenderCommand<'_>) -> bool {
        match command {
            RenderCommand::Image { image, dest } => {
                self.draw_image(image, *dest);
                true
            }
            RenderCommand::Fill {
                rings,
                color,
                edge,
                edge_width,
            } => {
                let filled = self.fill_polygon(rings, *color);
                for ring in rings {
                    self.stroke_ring(ring, *edge, f64::from(*edge_width));
                }
                filled
            }
            RenderCommand::Outline { rings, color, width } => {
                for ring in rings {
                    self.stroke_ring(ring, *color, f64::from(*width));
                }
                true
            }
            RenderCommand::Panel {
                rect,
                background,
                border,
            } => {
                self.fill_rect(*rect, *background);
                self.stroke_rect(*rect, *border, 1.0);
                true
            }
        }
    }

    /// Pixel indices whose centres fall in `[lo, hi)`, clipped to `0..limit`.
    fn clip_span(&self, lo: f64, hi: f64, limit: u32) -> (i64, i64) {
        let a = (lo - 0.5).ceil().max(0.0);
        let b = (hi - 0.5).ceil().min(f64::from(limit));
        if !(a.is_finite() && b.is_finite()) || b <= a {
            return (0, 0);
        }
        (a as i64, b as i64)
    }
}

/// Draws every command in order onto a fresh canvas.
pub fn rasterize(frame: &RenderFrame<'_>, background: Rgba) -> RgbaImage {
    let mut canvas = Canvas::new(frame.width, frame.height, background);
    let mut skipped = 0usize;
    for command in &frame.commands {
        if !canvas.execute(command) {
            skipped += 1;
        }
    }
    if skipped > 0 {
        tracing::debug!(skipped, "polygons could not be triangulated");
    }
    canvas.into_image()
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

fn blend_over(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = f32::from(src[3]) / 255.0;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }
    let da = f32::from(dst[3]) / 255.0;
    let out_a = sa + da * (1.0 - sa);
    let mut out = [0u8; 4];
    for c in 0..3 {
        let s = f32::from(src[c]);
        let d = f32::from(dst[c]);
        out[c] = ((s * sa + d * da * (1.0 - sa)) / out_a).round().clamp(0.0, 255.0) as u8;
    }
    out[3] = (out_a * 255.0).round() as u8;
    out
}
