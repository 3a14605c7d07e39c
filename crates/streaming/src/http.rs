use foundation::Extent;
use futures_util::future::join_all;
use image::{RgbaImage, imageops};
use tracing::debug;

use crate::source::{BasemapError, BasemapImage, BasemapSource, BoxFuture};
use crate::tiles::{TileCoord, TileRange, zoom_for_extent};

/// HTTP tile source for an XYZ URL template (`{z}/{x}/{y}`).
pub struct XyzTileSource {
    url_template: String,
    tile_size: u32,
    max_zoom: u8,
    client: reqwest::Client,
}

impl XyzTileSource {
    pub fn new(url_template: impl Into<String>) -> Self {
        Self {
            url_template: url_template.into(),
            tile_size: 256,
            max_zoom: 19,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_tile_size(mut self, tile_size: u32) -> Self {
        self.tile_size = tile_size;
        self
    }

    async fn fetch_tile(&self, coord: TileCoord) -> Result<(TileCoord, RgbaImage), BasemapError> {
        let url = coord.url(&self.url_template);
        let http_err = |message: String| BasemapError::Http {
            url: url.clone(),
            message,
        };
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| http_err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(http_err(format!("status {}", resp.status())));
        }
        let bytes = resp.bytes().await.map_err(|e| http_err(e.to_string()))?;
        let tile = image::load_from_memory(&bytes).map_err(|e| BasemapError::Decode {
            url: url.clone(),
            message: e.to_string(),
        })?;
        Ok((coord, tile.to_rgba8()))
    }

    async fn fetch_extent(&self, extent: Extent, width_px: u32) -> Result<BasemapImage, BasemapError> {
        if !(extent.width() > 0.0 && extent.height() > 0.0) {
            return Err(BasemapError::EmptyExtent);
        }
        let z = zoom_for_extent(&extent, width_px, self.tile_size, self.max_zoom);
        let range = TileRange::covering(&extent, z);
        debug!(z, tiles = range.columns() * range.rows(), "fetching basemap tiles");

        let tiles = join_all(range.coords().into_iter().map(|c| self.fetch_tile(c))).await;
        let ts = self.tile_size;
        let mut canvas = RgbaImage::new(range.columns() * ts, range.rows() * ts);
        for tile in tiles {
            let (coord, img) = tile?;
            let img = if img.width() != ts || img.height() != ts {
                imageops::resize(&img, ts, ts, imageops::FilterType::Triangle)
            } else {
                img
            };
            let x = i64::from((coord.x - range.x0) * ts);
            let y = i64::from((coord.y - range.y0) * ts);
            imageops::replace(&mut canvas, &img, x, y);
        }
        Ok(crop_to_extent(canvas, range.extent(), extent))
    }
}

impl BasemapSource for XyzTileSource {
    fn fetch(&self, extent: Extent, width_px: u32) -> BoxFuture<'_, Result<BasemapImage, BasemapError>> {
        Box::pin(self.fetch_extent(extent, width_px))
    }
}

/// Cuts the pixels of `want` out of an image covering `covered`.
///
/// The crop snaps outward to whole pixels; the returned extent is the one the
/// kept pixels actually cover.
pub fn crop_to_extent(image: RgbaImage, covered: Extent, want: Extent) -> BasemapImage {
    let (w, h) = (f64::from(image.width()), f64::from(image.height()));
    let mx = covered.width() / w;
    let my = covered.height() / h;
    let px0 = ((want.xmin - covered.xmin) / mx).floor().clamp(0.0, w - 1.0);
    let px1 = ((want.xmax - covered.xmin) / mx).ceil().clamp(px0 + 1.0, w);
    let py0 = ((covered.ymax - want.ymax) / my).floor().clamp(0.0, h - 1.0);
    let py1 = ((covered.ymax - want.ymin) / my).ceil().clamp(py0 + 1.0, h);

    let cropped = imageops::crop_imm(
        &image,
        px0 as u32,
        py0 as u32,
        (px1 - px0) as u32,
        (py1 - py0) as u32,
    )
    .to_image();
    BasemapImage {
        extent: Extent::new(
            covered.xmin + px0 * mx,
            covered.ymax - py1 * my,
            covered.xmin + px1 * mx,
            covered.ymax - py0 * my,
        ),
        image: cropped,
    }
}
