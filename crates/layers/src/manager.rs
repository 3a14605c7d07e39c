use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::LayerCatalog;
use crate::choropleth::{ArtifactRegistry, ChoroplethArtifacts};
use crate::classify::{Classes, ClassifyError, Classifier, NaturalBreaks};
use crate::layer::{LayerId, LayerSelection};
use crate::legend::{LegendSpec, build_legend};
use crate::symbology::FillStyle;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LayerError {
    #[error("classification of layer {layer} failed: {source}")]
    Classify {
        layer: LayerId,
        #[source]
        source: ClassifyError,
    },
    #[error("layer {0} has no values")]
    EmptyLayer(LayerId),
}

/// Application state readable by every consumer (export, legend lookup).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub active: LayerSelection,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Unknown layer id; nothing changed.
    Ignored,
    /// Switched to "no layer"; fills and legend are gone.
    Cleared,
    Activated { layer: LayerId, classes: usize },
}

impl Activation {
    pub fn needs_redraw(&self) -> bool {
        !matches!(self, Activation::Ignored)
    }
}

/// Swaps the active statistical layer.
///
/// A swap is transactional: the new fills and legend are computed first and
/// only then replace the old ones, so a failed classification leaves the
/// previous layer on screen. The viewport is never touched.
#[derive(Debug)]
pub struct LayerManager<C = NaturalBreaks> {
    catalog: LayerCatalog,
    classifier: C,
    style: FillStyle,
    state: AppState,
    registry: ArtifactRegistry,
}

impl LayerManager<NaturalBreaks> {
    pub fn new(catalog: LayerCatalog) -> Self {
        Self::with_classifier(catalog, NaturalBreaks)
    }
}

impl<C: Classifier> LayerManager<C> {
    pub fn with_classifier(catalog: LayerCatalog, classifier: C) -> Self {
        Self {
            catalog,
            classifier,
            style: FillStyle::default(),
            state: AppState::default(),
            registry: ArtifactRegistry::new(),
        }
    }

    pub fn catalog(&self) -> &LayerCatalog {
        &self.catalog
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn active(&self) -> &LayerSelection {
        &self.state.active
    }

    pub fn artifacts(&self) -> &ArtifactRegistry {
        &self.registry
    }

    pub fn choropleth(&self) -> Option<&ChoroplethArtifacts> {
        self.registry.choropleth()
    }

    pub fn legend(&self) -> Option<&LegendSpec> {
        self.registry.legend()
    }

    pub fn activate(&mut self, selection: &LayerSelection) -> Result<Activation, LayerError> {
        let id = match selection {
            LayerSelection::None => {
                let removed = self.registry.clear();
                self.state.active = LayerSelection::None;
                info!(removed, "layer cleared");
                return Ok(Activation::Cleared);
            }
            LayerSelection::Layer(id) => id,
        };
        let (Some(def), Some(descriptor)) = (self.catalog.definition(id), self.catalog.descriptor(id))
        else {
            debug!(layer = %id, "ignoring unknown layer");
            return Ok(Activation::Ignored);
        };

        let values = descriptor.numeric_values();
        let result = self
            .classifier
            .classify(&values, self.catalog.class_count())
            .map_err(|source| LayerError::Classify {
                layer: id.clone(),
                source,
            })?;
        let min = descriptor
            .min_value()
            .ok_or_else(|| LayerError::EmptyLayer(id.clone()))?;
        let classes = Classes::from_result(&result, &values);
        if classes.len() < result.breaks.len() {
            debug!(
                layer = %id,
                requested = result.breaks.len(),
                kept = classes.len(),
                "collapsed degenerate class breaks"
            );
        }

        let legend = build_legend(def, &classes, min);
        let fills = ChoroplethArtifacts::build(def, descriptor, &classes, self.style);
        let class_count = classes.len();
        self.registry.replace(fills, legend);
        self.state.active = selection.clone();
        info!(layer = %id, classes = class_count, "layer activated");
        Ok(Activation::Activated {
            layer: id.clone(),
            classes: class_count,
        })
    }
}
