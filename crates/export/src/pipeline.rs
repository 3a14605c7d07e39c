use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use layers::{LayerError, LayerSelection};
use scene::SurfaceGeometry;
use thiserror::Error;
use tracing::{info, warn};

use crate::composite::composite;
use crate::job::{ExportJob, ExportTarget, OverlaySnapshot};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("cannot prepare {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("nothing to export: surface is {width} x {height}")]
    EmptySurface { width: u32, height: u32 },
    #[error("cannot activate {selection}: {source}")]
    Layer {
        selection: LayerSelection,
        #[source]
        source: LayerError,
    },
}

/// What the export pipeline needs from the interactive session.
///
/// Rendering is read-only. Only bulk export mutates the scene, to step
/// through layers and to hold it busy while it does.
pub trait ExportScene {
    fn surface(&self) -> SurfaceGeometry;

    /// Map content (basemap, fills, outlines, scale bar) at `width` x
    /// `height`, with line widths multiplied by `scale`. No overlays.
    fn render_base(&self, width: u32, height: u32, scale: f64) -> RgbaImage;

    /// Every visible overlay as it currently stands on screen.
    fn overlays(&self) -> Vec<OverlaySnapshot>;

    fn active_layer(&self) -> LayerSelection;

    /// Selectable layers in menu order, "no layer" included.
    fn layer_selections(&self) -> Vec<LayerSelection>;

    fn activate(&mut self, selection: &LayerSelection) -> Result<(), LayerError>;

    fn set_busy(&mut self, busy: bool);
}

/// Holds the scene busy until dropped, so an early return cannot leave
/// input blocked.
struct BusyScene<'a, S: ExportScene + ?Sized> {
    scene: &'a mut S,
}

impl<'a, S: ExportScene + ?Sized> BusyScene<'a, S> {
    fn enter(scene: &'a mut S) -> Self {
        scene.set_busy(true);
        Self { scene }
    }
}

impl<S: ExportScene + ?Sized> Deref for BusyScene<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.scene
    }
}

impl<S: ExportScene + ?Sized> DerefMut for BusyScene<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.scene
    }
}

impl<S: ExportScene + ?Sized> Drop for BusyScene<'_, S> {
    fn drop(&mut self) {
        self.scene.set_busy(false);
    }
}

#[derive(Debug, Default)]
pub struct BulkExportReport {
    pub written: Vec<(LayerSelection, PathBuf)>,
    pub failures: Vec<(LayerSelection, ExportError)>,
}

impl BulkExportReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn all_failed(&self) -> bool {
        self.written.is_empty() && !self.failures.is_empty()
    }
}

/// File name for one layer: `{layer}` in `pattern` replaced by the layer name
/// with anything outside `[A-Za-z0-9_-]` turned into `_`.
pub fn file_name(pattern: &str, selection: &LayerSelection) -> String {
    let safe: String = selection
        .name()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    pattern.replace("{layer}", &safe)
}

/// Writes the map at a fixed output DPI, one PNG per layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportPipeline {
    pub output_dir: PathBuf,
    pub export_dpi: f64,
    pub file_pattern: String,
}

impl ExportPipeline {
    pub fn new(output_dir: impl Into<PathBuf>, export_dpi: f64) -> Self {
        Self {
            output_dir: output_dir.into(),
            export_dpi,
            file_pattern: "{layer}.png".to_string(),
        }
    }

    pub fn with_file_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    pub fn job<S: ExportScene + ?Sized>(&self, scene: &S) -> ExportJob {
        let surface = scene.surface();
        ExportJob {
            export_dpi: self.export_dpi,
            interactive_dpi: surface.dpi,
            surface: (
                surface.width_px.round().max(0.0) as u32,
                surface.height_px.round().max(0.0) as u32,
            ),
            overlays: scene.overlays(),
        }
    }

    /// Base map at export size with the job's overlays composited on top.
    pub fn render<S: ExportScene + ?Sized>(&self, scene: &S, job: &ExportJob) -> Result<RgbaImage, ExportError> {
        let (width, height) = job.output_size();
        if width == 0 || height == 0 {
            return Err(ExportError::EmptySurface { width, height });
        }
        let base = scene.render_base(width, height, job.scale());
        Ok(composite(&base, &job.placements()))
    }

    /// Exports whatever layer is active right now.
    pub fn export_current<S: ExportScene + ?Sized>(&self, scene: &S) -> Result<PathBuf, ExportError> {
        let selection = scene.active_layer();
        let job = self.job(scene);
        let image = self.render(scene, &job)?;
        let path = self.output_dir.join(file_name(&self.file_pattern, &selection));
        write_png(&image, &path)?;
        info!(
            layer = %selection,
            path = %path.display(),
            width = image.width(),
            height = image.height(),
            overlays = job.overlays.len(),
            "export written"
        );
        Ok(path)
    }

    /// Activates each layer in menu order and exports it.
    ///
    /// The scene is busy for the whole loop. A failing layer is recorded and
    /// skipped; the layer active beforehand is restored at the end.
    pub fn export_all<S: ExportScene + ?Sized>(&self, scene: &mut S) -> BulkExportReport {
        let mut scene = BusyScene::enter(scene);
        let previous = scene.active_layer();
        let mut report = BulkExportReport::default();

        for selection in scene.layer_selections() {
            if let Err(source) = scene.activate(&selection) {
                warn!(layer = %selection, %source, "skipping layer that failed to activate");
                report.failures.push((
                    selection.clone(),
                    ExportError::Layer { selection, source },
                ));
                continue;
            }
            match self.export_current(&*scene) {
                Ok(path) => report.written.push((selection, path)),
                Err(err) => {
                    warn!(layer = %selection, %err, "layer export failed");
                    report.failures.push((selection, err));
                }
            }
        }

        if let Err(err) = scene.activate(&previous) {
            warn!(layer = %previous, %err, "could not restore the active layer");
        }
        info!(
            written = report.written.len(),
            failed = report.failures.len(),
            "bulk export finished"
        );
        report
    }

    pub fn run<S: ExportScene + ?Sized>(&self, scene: &mut S, target: ExportTarget) -> BulkExportReport {
        match target {
            ExportTarget::AllLayers => self.export_all(scene),
            ExportTarget::CurrentLayer => {
                let selection = scene.active_layer();
                let mut report = BulkExportReport::default();
                match self.export_current(&*scene) {
                    Ok(path) => report.written.push((selection, path)),
                    Err(err) => {
                        warn!(layer = %selection, %err, "export failed");
                        report.failures.push((selection, err));
                    }
                }
                report
            }
        }
    }
}

fn write_png(image: &RgbaImage, path: &Path) -> Result<(), ExportError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| ExportError::Image {
            path: path.to_path_buf(),
            source,
        })
}
