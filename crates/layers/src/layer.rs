use std::fmt;

use foundation::RegionId;

/// Indicator column name, e.g. `pcHHSRS`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(pub String);

impl LayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LayerId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A layer choice as the UI offers it, including the "no layer" sentinel.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum LayerSelection {
    #[default]
    None,
    Layer(LayerId),
}

impl LayerSelection {
    pub const NONE_NAME: &'static str = "--No Layer--";

    /// Parses a menu entry; the sentinel name maps to `None`.
    pub fn parse(name: &str) -> Self {
        if name == Self::NONE_NAME {
            LayerSelection::None
        } else {
            LayerSelection::Layer(LayerId::new(name))
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LayerSelection::None => Self::NONE_NAME,
            LayerSelection::Layer(id) => id.as_str(),
        }
    }

    pub fn layer_id(&self) -> Option<&LayerId> {
        match self {
            LayerSelection::None => None,
            LayerSelection::Layer(id) => Some(id),
        }
    }
}

impl fmt::Display for LayerSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-region values of one indicator, in small-area order. Immutable once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerDescriptor {
    pub id: LayerId,
    pub values: Vec<(RegionId, f64)>,
}

impl LayerDescriptor {
    pub fn new(id: LayerId, values: Vec<(RegionId, f64)>) -> Self {
        Self { id, values }
    }

    pub fn numeric_values(&self) -> Vec<f64> {
        self.values.iter().map(|(_, v)| *v).collect()
    }

    /// Smallest value. `None` for an empty layer.
    pub fn min_value(&self) -> Option<f64> {
        self.values.iter().map(|(_, v)| *v).reduce(f64::min)
    }
}
