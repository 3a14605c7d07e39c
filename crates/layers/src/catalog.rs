use std::collections::HashMap;

use thiserror::Error;

use crate::layer::{LayerDescriptor, LayerId, LayerSelection};
use crate::symbology::{ColorError, ColorRamp};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CatalogError {
    #[error("layer {0} is defined more than once")]
    DuplicateLayer(LayerId),
    #[error("layer {0} has no loaded values")]
    MissingData(LayerId),
    #[error("layer {layer}: {source}")]
    Ramp {
        layer: LayerId,
        #[source]
        source: ColorError,
    },
}

/// Static presentation settings for one indicator.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDefinition {
    pub id: LayerId,
    /// Indicator name shown in the legend title.
    pub indicator: String,
    pub unit: String,
    /// Decimal places in legend range labels.
    pub precision: usize,
    pub ramp: ColorRamp,
}

impl LayerDefinition {
    pub fn new(id: impl Into<String>, indicator: impl Into<String>, ramp: ColorRamp) -> Self {
        Self {
            id: LayerId::new(id),
            indicator: indicator.into(),
            unit: "Percent".to_string(),
            precision: 0,
            ramp,
        }
    }

    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }
}

/// The configured layer set with its loaded values. Read-only after startup.
///
/// Ordering contract:
/// - `selections()` yields the "no layer" sentinel first, then layers in
///   definition order.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerCatalog {
    definitions: Vec<LayerDefinition>,
    index: HashMap<LayerId, usize>,
    data: HashMap<LayerId, LayerDescriptor>,
    classes: usize,
}

impl LayerCatalog {
    pub fn new(
        definitions: Vec<LayerDefinition>,
        descriptors: Vec<LayerDescriptor>,
        classes: usize,
    ) -> Result<Self, CatalogError> {
        let mut index = HashMap::with_capacity(definitions.len());
        for (i, def) in definitions.iter().enumerate() {
            if index.insert(def.id.clone(), i).is_some() {
                return Err(CatalogError::DuplicateLayer(def.id.clone()));
            }
            def.ramp.ensure_len(classes).map_err(|source| CatalogError::Ramp {
                layer: def.id.clone(),
                source,
            })?;
        }
        let data: HashMap<LayerId, LayerDescriptor> =
            descriptors.into_iter().map(|d| (d.id.clone(), d)).collect();
        if let Some(def) = definitions.iter().find(|d| !data.contains_key(&d.id)) {
            return Err(CatalogError::MissingData(def.id.clone()));
        }
        Ok(Self {
            definitions,
            index,
            data,
            classes,
        })
    }

    pub fn class_count(&self) -> usize {
        self.classes
    }

    pub fn definition(&self, id: &LayerId) -> Option<&LayerDefinition> {
        self.index.get(id).and_then(|i| self.definitions.get(*i))
    }

    pub fn descriptor(&self, id: &LayerId) -> Option<&LayerDescriptor> {
        self.data.get(id)
    }

    pub fn contains(&self, id: &LayerId) -> bool {
        self.index.contains_key(id)
    }

    pub fn definitions(&self) -> &[LayerDefinition] {
        &self.definitions
    }

    pub fn selections(&self) -> impl Iterator<Item = LayerSelection> + '_ {
        std::iter::once(LayerSelection::None).chain(
            self.definitions
                .iter()
                .map(|d| LayerSelection::Layer(d.id.clone())),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, LayerCatalog, LayerDefinition};
    use crate::layer::{LayerDescriptor, LayerId, LayerSelection};
    use crate::symbology::ColorRamp;

    fn ramp(n: usize) -> ColorRamp {
        ColorRamp::from_hex(&vec!["#ffffff"; n]).unwrap()
    }

    fn data(id: &str) -> LayerDescriptor {
        LayerDescriptor::new(LayerId::new(id), Vec::new())
    }

    #[test]
    fn selections_start_with_sentinel() {
        let cat = LayerCatalog::new(
            vec![
                LayerDefinition::new("b", "B", ramp(5)),
                LayerDefinition::new("a", "A", ramp(5)),
            ],
            vec![data("a"), data("b")],
            5,
        )
        .unwrap();
        let names: Vec<String> = cat.selections().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["--No Layer--", "b", "a"]);
        assert_eq!(cat.selections().next(), Some(LayerSelection::None));
    }

    #[test]
    fn rejects_duplicates_missing_data_and_short_ramps() {
        let dup = LayerCatalog::new(
            vec![
                LayerDefinition::new("a", "A", ramp(5)),
                LayerDefinition::new("a", "A", ramp(5)),
            ],
            vec![data("a")],
            5,
        );
        assert_eq!(dup, Err(CatalogError::DuplicateLayer(LayerId::new("a"))));

        let missing = LayerCatalog::new(vec![LayerDefinition::new("a", "A", ramp(5))], vec![], 5);
        assert_eq!(missing, Err(CatalogError::MissingData(LayerId::new("a"))));

        let short = LayerCatalog::new(vec![LayerDefinition::new("a", "A", ramp(3))], vec![data("a")], 5);
        assert!(matches!(short, Err(CatalogError::Ramp { .. })));
    }
}
