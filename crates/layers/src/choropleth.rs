use std::collections::BTreeMap;

use foundation::RegionId;

use crate::catalog::LayerDefinition;
use crate::classify::Classes;
use crate::layer::{LayerDescriptor, LayerId};
use crate::legend::LegendSpec;
use crate::symbology::{FillStyle, Rgba};

#[derive(Debug, Clone, PartialEq)]
pub struct RegionFill {
    pub region: RegionId,
    pub color: Rgba,
}

/// Coloured small-area polygons for one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoroplethArtifacts {
    pub layer: LayerId,
    pub fills: Vec<RegionFill>,
    pub style: FillStyle,
}

impl ChoroplethArtifacts {
    pub fn build(
        def: &LayerDefinition,
        descriptor: &LayerDescriptor,
        classes: &Classes,
        style: FillStyle,
    ) -> Self {
        let fills = descriptor
            .values
            .iter()
            .filter_map(|(region, v)| {
                let slot = classes.slot_of(*v)?;
                Some(RegionFill {
                    region: region.clone(),
                    color: def.ramp.color(slot),
                })
            })
            .collect();
        Self {
            layer: def.id.clone(),
            fills,
            style,
        }
    }

    pub fn fill_for(&self, region: &RegionId) -> Option<Rgba> {
        self.fills
            .iter()
            .find(|f| &f.region == region)
            .map(|f| f.color)
    }
}

/// Stable names for the artifacts a layer swap replaces.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ArtifactKey {
    ActiveLayer,
    ActiveLegend,
}

impl ArtifactKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ArtifactKey::ActiveLayer => "activeLayerArtifacts",
            ArtifactKey::ActiveLegend => "activeLegend",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Artifact {
    Layer(ChoroplethArtifacts),
    Legend(LegendSpec),
}

/// Owned handles to what is currently drawn for the active layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactRegistry {
    slots: BTreeMap<ArtifactKey, Artifact>,
}

impl ArtifactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swaps both entries at once. Returns how many entries were removed.
    pub fn replace(&mut self, layer: ChoroplethArtifacts, legend: LegendSpec) -> usize {
        let removed = self.clear();
        self.slots.insert(ArtifactKey::ActiveLayer, Artifact::Layer(layer));
        self.slots
            .insert(ArtifactKey::ActiveLegend, Artifact::Legend(legend));
        removed
    }

    /// Removes everything; a no-op when nothing is active.
    pub fn clear(&mut self) -> usize {
        let n = self.slots.len();
        self.slots.clear();
        n
    }

    pub fn get(&self, key: ArtifactKey) -> Option<&Artifact> {
        self.slots.get(&key)
    }

    pub fn choropleth(&self) -> Option<&ChoroplethArtifacts> {
        match self.slots.get(&ArtifactKey::ActiveLayer) {
            Some(Artifact::Layer(a)) => Some(a),
            _ => None,
        }
    }

    pub fn legend(&self) -> Option<&LegendSpec> {
        match self.slots.get(&ArtifactKey::ActiveLegend) {
            Some(Artifact::Legend(l)) => Some(l),
            _ => None,
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = ArtifactKey> + '_ {
        self.slots.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
