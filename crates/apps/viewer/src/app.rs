//! Startup: configuration to loaded data to a live session.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use export::{BulkExportReport, ExportPipeline, ExportTarget};
use formats::{LoadError, MapData, load_map_data};
use image::RgbaImage;
use image::imageops::{self, FilterType};
use scene::SurfaceGeometry;
use streaming::{BasemapRefresher, BasemapSource, StoreUpdate, XyzTileSource};
use thiserror::Error;
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use crate::config::{ConfigError, ViewerConfig};
use crate::session::{Session, SessionError, SessionInit};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("cannot read image {path}: {source}")]
    Sprite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Resizes to `width` pixels, keeping the aspect ratio.
pub fn fit_width(image: &RgbaImage, width: u32) -> RgbaImage {
    let (w, h) = image.dimensions();
    if w == 0 || width == 0 || w == width {
        return image.clone();
    }
    let height = (f64::from(h) / f64::from(w) * f64::from(width)).round().max(1.0) as u32;
    imageops::resize(image, width, height, FilterType::Triangle)
}

fn load_sprite(path: &Path, width: u32) -> Result<RgbaImage, StartupError> {
    let image = image::open(path).map_err(|source| StartupError::Sprite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(fit_width(&image.to_rgba8(), width))
}

pub fn load_data(config: &ViewerConfig) -> Result<MapData, StartupError> {
    let data = &config.data;
    Ok(load_map_data(
        &data.wards,
        &data.small_areas,
        &data.tables,
        &data.fields.to_data_fields(),
        &config.region,
        &config.indicator_ids(),
    )?)
}

/// Opens a session over `data` with the configured tile server. Basemap
/// fetches are spawned on `runtime`.
pub fn build_session(
    config: &ViewerConfig,
    data: MapData,
    runtime: Handle,
) -> Result<Session<XyzTileSource>, StartupError> {
    let source = XyzTileSource::new(config.basemap.url_template.as_str())
        .with_max_zoom(config.basemap.max_zoom)
        .with_tile_size(config.basemap.tile_size);
    build_session_with(config, data, Arc::new(source), runtime)
}

/// Same as [`build_session`] over any basemap source.
pub fn build_session_with<S: BasemapSource + 'static>(
    config: &ViewerConfig,
    data: MapData,
    source: Arc<S>,
    runtime: Handle,
) -> Result<Session<S>, StartupError> {
    let refresher = BasemapRefresher::new(source, runtime, config.basemap.retry_policy());

    let logo = match &config.data.logo {
        Some(path) => Some(load_sprite(path, config.data.logo_width_px)?),
        None => None,
    };
    let arrow = match &config.data.arrow {
        Some(path) => Some(load_sprite(path, config.data.arrow_width_px)?),
        None => None,
    };

    Ok(Session::new(SessionInit {
        surface: SurfaceGeometry::from_figure(config.figure_width_in, config.figure_height_in, config.dpi),
        aspect: config.aspect,
        padding_deg: config.padding_deg,
        zoom_step: config.zoom_step,
        class_count: config.class_count,
        navigation: config.navigation,
        definitions: config.layer_definitions()?,
        data,
        refresher,
        logo,
        arrow,
    })?)
}

/// Loads everything, waits for the first basemap, and exports every layer.
pub async fn run_headless(config: &ViewerConfig) -> Result<BulkExportReport, StartupError> {
    let data = load_data(config)?;
    let mut session = build_session(config, data, Handle::current())?;
    Ok(export_all_layers(&mut session, config).await)
}

/// Requests the first basemap, waits up to the configured timeout for it,
/// then writes one file per layer.
pub async fn export_all_layers<S: BasemapSource + 'static>(
    session: &mut Session<S>,
    config: &ViewerConfig,
) -> BulkExportReport {
    session.refresh_basemap();
    let timeout = Duration::from_millis(config.basemap.initial_timeout_ms);
    match session.wait_basemap(timeout).await {
        Some(StoreUpdate::Applied(_)) => {}
        Some(StoreUpdate::KeptStale(_)) | None => warn!("exporting without basemap imagery"),
    }

    let pipeline = ExportPipeline::new(config.output.dir.clone(), config.export_dpi)
        .with_file_pattern(config.output.file_pattern.as_str());
    let report = session.export(&pipeline, ExportTarget::AllLayers);
    for (selection, err) in &report.failures {
        error!(layer = %selection, %err, "layer not exported");
    }
    info!(
        written = report.written.len(),
        failed = report.failures.len(),
        dir = %config.output.dir.display(),
        "headless export done"
    );
    report
}
