use foundation::math::Vec2;
use foundation::{Region, ScreenRect, ViewTransform};
use image::RgbaImage;
use layers::{ChoroplethArtifacts, OutlineStyle, Rgba};
use streaming::BasemapImage;

/// Drawing operations in surface pixels (top-left origin), back to front.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand<'a> {
    Image {
        image: &'a RgbaImage,
        dest: ScreenRect,
    },
    Fill {
        rings: Vec<Vec<Vec2>>,
        color: Rgba,
        edge: Rgba,
        edge_width: f32,
    },
    Outline {
        rings: Vec<Vec<Vec2>>,
        color: Rgba,
        width: f32,
    },
    Panel {
        rect: ScreenRect,
        background: Rgba,
        border: Rgba,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame<'a> {
    pub width: u32,
    pub height: u32,
    pub commands: Vec<RenderCommand<'a>>,
}

impl<'a> RenderFrame<'a> {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn push(&mut self, command: RenderCommand<'a>) {
        self.commands.push(command);
    }
}

/// Map content already projected to the mercator plane.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MapContent {
    pub wards: Vec<Region>,
    pub small_areas: Vec<Region>,
}

impl MapContent {
    /// Projects lon/lat regions once so every frame can reuse them.
    pub fn from_lonlat(wards: &[Region], small_areas: &[Region]) -> Self {
        Self {
            wards: wards.iter().map(Region::projected).collect(),
            small_areas: small_areas.iter().map(Region::projected).collect(),
        }
    }
}

pub struct Renderer;

impl Renderer {
    /// Collects the map layers for one view: basemap, choropleth fills, then
    /// boundary outlines on top. Overlays are appended by the caller.
    ///
    /// `stroke_scale` multiplies every line width (output DPI / screen DPI).
    pub fn collect_map<'a>(
        content: &MapContent,
        choropleth: Option<&ChoroplethArtifacts>,
        basemap: Option<&'a BasemapImage>,
        outline: OutlineStyle,
        transform: &ViewTransform,
        stroke_scale: f32,
    ) -> RenderFrame<'a> {
        let plot = transform.plot;
        let mut frame = RenderFrame::new(
            (plot.x + plot.width).round().max(0.0) as u32,
            (plot.y + plot.height).round().max(0.0) as u32,
        );

        if let Some(b) = basemap {
            let tl = transform.map_to_screen(Vec2::new(b.extent.xmin, b.extent.ymax));
            let br = transform.map_to_screen(Vec2::new(b.extent.xmax, b.extent.ymin));
            frame.push(RenderCommand::Image {
                image: &b.image,
                dest: ScreenRect::new(tl.x, tl.y, br.x - tl.x, br.y - tl.y),
            });
        }

        if let Some(layer) = choropleth {
            for area in &content.small_areas {
                let Some(color) = layer.fill_for(&area.id) else {
                    continue;
                };
                for poly in &area.polygons {
                    frame.push(RenderCommand::Fill {
                        rings: to_screen(&poly.rings, transform),
                        color: color.with_alpha(layer.style.alpha),
                        edge: layer.style.edge,
                        edge_width: layer.style.edge_width_px * stroke_scale,
                    });
                }
            }
        }

        for ward in &content.wards {
            for poly in &ward.polygons {
                frame.push(RenderCommand::Outline {
                    rings: to_screen(&poly.rings, transform),
                    color: outline.color,
                    width: outline.width_px * stroke_scale,
                });
            }
        }
        frame
    }
}

fn to_screen(rings: &[Vec<Vec2>], transform: &ViewTransform) -> Vec<Vec<Vec2>> {
    rings
        .iter()
        .map(|r| r.iter().map(|p| transform.map_to_screen(*p)).collect())
        .collect()
}
