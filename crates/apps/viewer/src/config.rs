//! Viewer configuration.
//!
//! Every field has a default, so `{}` is a complete configuration for the
//! Adur ward map. A handful of fields can be overridden from the environment
//! (`VIEWER_*`).

use std::collections::HashSet;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use formats::DataFields;
use layers::{ColorError, ColorRamp, LayerDefinition};
use serde::{Deserialize, Serialize};
use streaming::RetryPolicy;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("class count must be at least 1")]
    NoClasses,
    #[error("layer {layer} has {got} ramp colours but the class count is {expected}")]
    RampLength {
        layer: String,
        expected: usize,
        got: usize,
    },
    #[error("layer {0} is configured twice")]
    DuplicateLayer(String),
    #[error("layer {layer}: {source}")]
    Color {
        layer: String,
        #[source]
        source: ColorError,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasemapConfig {
    /// XYZ template with `{z}`, `{x}` and `{y}` placeholders.
    pub url_template: String,
    pub max_zoom: u8,
    pub tile_size: u32,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    /// How long the headless binary waits for the first imagery.
    pub initial_timeout_ms: u64,
}

impl Default for BasemapConfig {
    fn default() -> Self {
        Self {
            url_template: "https://a.basemaps.cartocdn.com/rastertiles/voyager/{z}/{x}/{y}.png".to_string(),
            max_zoom: 19,
            tile_size: 256,
            retry_attempts: 3,
            retry_delay_ms: 500,
            initial_timeout_ms: 15_000,
        }
    }
}

impl BasemapConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.retry_attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    /// `{layer}` is replaced by the layer id.
    pub file_pattern: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("exports"),
            file_pattern: "{layer}.png".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub region_filter: String,
    pub ward_id: String,
    pub ward_name: String,
    pub small_area_key: String,
    pub table_key: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        let d = DataFields::default();
        Self {
            region_filter: d.region_filter,
            ward_id: d.ward_id,
            ward_name: d.ward_name,
            small_area_key: d.small_area_key,
            table_key: d.table_key,
        }
    }
}

impl FieldConfig {
    pub fn to_data_fields(&self) -> DataFields {
        DataFields {
            region_filter: self.region_filter.clone(),
            ward_id: self.ward_id.clone(),
            ward_name: self.ward_name.clone(),
            small_area_key: self.small_area_key.clone(),
            table_key: self.table_key.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub wards: PathBuf,
    pub small_areas: PathBuf,
    pub tables: Vec<PathBuf>,
    pub fields: FieldConfig,
    pub logo: Option<PathBuf>,
    pub logo_width_px: u32,
    pub arrow: Option<PathBuf>,
    pub arrow_width_px: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            wards: PathBuf::from("data/wards.geojson"),
            small_areas: PathBuf::from("data/coas.geojson"),
            tables: vec![
                PathBuf::from("data/coa_indicators.csv"),
                PathBuf::from("data/coa_private_rented.csv"),
            ],
            fields: FieldConfig::default(),
            logo: None,
            logo_width_px: 100,
            arrow: None,
            arrow_width_px: 65,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerConfig {
    pub id: String,
    pub indicator: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub precision: usize,
    pub ramp: Vec<String>,
}

impl LayerConfig {
    fn new(id: &str, indicator: &str, unit: Option<&str>, ramp: [&str; 5]) -> Self {
        Self {
            id: id.to_string(),
            indicator: indicator.to_string(),
            unit: unit.map(str::to_string),
            precision: 0,
            ramp: ramp.iter().map(|c| c.to_string()).collect(),
        }
    }

    fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn to_definition(&self) -> Result<LayerDefinition, ConfigError> {
        let ramp = ColorRamp::from_hex(&self.ramp).map_err(|source| ConfigError::Color {
            layer: self.id.clone(),
            source,
        })?;
        let def = LayerDefinition::new(self.id.as_str(), self.indicator.as_str(), ramp)
            .with_precision(self.precision);
        Ok(match &self.unit {
            Some(unit) => def.with_unit(unit.as_str()),
            None => def,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    /// Value of the region filter field selecting the boundaries to show.
    pub region: String,
    pub dpi: f64,
    pub export_dpi: f64,
    pub figure_width_in: f64,
    pub figure_height_in: f64,
    pub aspect: f64,
    /// Degrees added around the boundary bounds before projecting.
    pub padding_deg: f64,
    /// Map units added or removed on each side per wheel step.
    pub zoom_step: f64,
    pub class_count: usize,
    pub navigation: bool,
    pub basemap: BasemapConfig,
    pub output: OutputConfig,
    pub data: DataConfig,
    pub layers: Vec<LayerConfig>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            region: "Adur".to_string(),
            dpi: 95.0,
            export_dpi: 200.0,
            figure_width_in: 12.0,
            figure_height_in: 9.0,
            aspect: 1.333,
            padding_deg: 0.003,
            zoom_step: 300.0,
            class_count: 5,
            navigation: false,
            basemap: BasemapConfig::default(),
            output: OutputConfig::default(),
            data: DataConfig::default(),
            layers: default_layers(),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(payload: &str, origin: &Path) -> Result<Self, ConfigError> {
        serde_json::from_str(payload).map_err(|source| ConfigError::Json {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let payload = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&payload, path)
    }

    /// File named by `VIEWER_CONFIG` (or defaults), then environment
    /// overrides, then validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match env::var("VIEWER_CONFIG") {
            Ok(path) => Self::from_path(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        self.dpi = env_var_f64("VIEWER_DPI", self.dpi);
        self.export_dpi = env_var_f64("VIEWER_EXPORT_DPI", self.export_dpi);
        if let Ok(dir) = env::var("VIEWER_OUTPUT_DIR") {
            self.output.dir = PathBuf::from(dir);
        }
        if let Ok(url) = env::var("VIEWER_BASEMAP_URL") {
            self.basemap.url_template = url;
        }
        if let Ok(region) = env::var("VIEWER_REGION") {
            self.region = region;
        }
        self.basemap.initial_timeout_ms =
            env_var_u64("VIEWER_BASEMAP_TIMEOUT_MS", self.basemap.initial_timeout_ms);
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("dpi", self.dpi),
            ("export_dpi", self.export_dpi),
            ("aspect", self.aspect),
            ("figure_width_in", self.figure_width_in),
            ("figure_height_in", self.figure_height_in),
            ("zoom_step", self.zoom_step),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::NonPositive { field, value });
            }
        }
        if self.class_count == 0 {
            return Err(ConfigError::NoClasses);
        }
        let mut seen = HashSet::new();
        for layer in &self.layers {
            if !seen.insert(layer.id.as_str()) {
                return Err(ConfigError::DuplicateLayer(layer.id.clone()));
            }
            if layer.ramp.len() != self.class_count {
                return Err(ConfigError::RampLength {
                    layer: layer.id.clone(),
                    expected: self.class_count,
                    got: layer.ramp.len(),
                });
            }
        }
        Ok(())
    }

    pub fn layer_definitions(&self) -> Result<Vec<LayerDefinition>, ConfigError> {
        self.layers.iter().map(LayerConfig::to_definition).collect()
    }

    pub fn indicator_ids(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }
}

fn env_var_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_var_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// The 23 indicators of the private-rented stock model, in menu order.
pub fn default_layers() -> Vec<LayerConfig> {
    const PURPLES: [&str; 5] = ["#ebdff5", "#cfbadb", "#b599c2", "#9b7ca8", "#866194"];
    const ORANGES: [&str; 5] = ["#ffffff", "#fee6e6", "#ffcfcf", "#f9a487", "#ed7a41"];
    const BLUES: [&str; 5] = ["#ffffff", "#b2cef5", "#57a1e8", "#5772c9", "#4847ad"];
    vec![
        LayerConfig::new("pcHHSRS", "HHSRS Cat. 1 Hazards", None, ["#ffffdd", "#ffd799", "#f29d52", "#c06e46", "#a66141"]),
        LayerConfig::new("pcExcessCold", "HHSRS Excess Cold", None, ["#f4f2f7", "#ccd4e7", "#97bfdb", "#60aacf", "#4383a7"]),
        LayerConfig::new("pcHHSRSFalls", "HHSRS Falls Hazards", None, ["#fff2ec", "#f9c5ca", "#fa8eb8", "#d454a7", "#9b4199"]),
        LayerConfig::new("pcDisrepair", "Disrepair", None, ["#fafafa", "#d9d9d9", "#b0b0b0", "#8a8a8a", "#5c5c5c"]),
        LayerConfig::new("pcFP10", "Fuel Poverty 10%", None, ["#fff3e3", "#fcd8a8", "#fca981", "#eb7865", "#c6403f"]),
        LayerConfig::new("pcFPLIHC", "Fuel Poverty LIHC", None, ["#faf5fb", "#d3d6e9", "#e6b1c3", "#e68a97", "#b35273"]),
        LayerConfig::new("pcLowIncome", "Low Income Households", None, ["#ffffd9", "#d4edb4", "#9cd69d", "#65ba7e", "#418e6a"]),
        LayerConfig::new("pcECLI", "Excess Cold and Low Income", None, ["#feffd8", "#b8e3c5", "#72cad6", "#61a0c9", "#5e68b0"]),
        LayerConfig::new("pcEPCFG", "EPC Rating F or G", None, ["#e1f5f3", "#b7d4cf", "#8eb4ad", "#6f9693", "#4f7a76"]),
        LayerConfig::new("pcSolidWall", "Solid Walls", None, PURPLES),
        LayerConfig::new("pcInsCavity", "Insulated Cavity Walls", None, PURPLES),
        LayerConfig::new("pcUninsCavity", "Un-Insulated Cavity Walls", None, PURPLES),
        LayerConfig::new("pcLInsLT100", "Loft Insulation less than 100mm", None, ORANGES),
        LayerConfig::new("SimpleCO2", "Average SimpleCO2", Some("Tonnes/year"), ["#fff0e0", "#f6ceb5", "#e8a18b", "#dd7667", "#d44847"])
            .with_precision(1),
        LayerConfig::new("HeatDemand", "Average Total Heat Demand", Some("kWh/year"), ORANGES),
        LayerConfig::new("HeatCost", "Average Total Heat Cost", Some("£/year"), ["#ffd8d9", "#ffb7ab", "#f99482", "#f17261", "#e3413f"]),
        LayerConfig::new("EnergyDemand", "Average Total Energy Demand", Some("kWh/year"), ["#ffffd9", "#d4edb4", "#9cd59e", "#65bb7e", "#418e6a"]),
        LayerConfig::new("EnergyCost", "Average Total Energy Cost", Some("£/year"), ["#e1f5f3", "#b7d4cf", "#8fb4ad", "#6f9693", "#507a76"]),
        LayerConfig::new("ElectricityDemand", "Average Total Electricity Demand", Some("kWh/year"), BLUES),
        LayerConfig::new("ElectricityCost", "Average Total Electricity Cost", Some("£/year"), BLUES),
        LayerConfig::new("SimpleSAP", "Average SimpleSAP", Some("Score"), ["#418f81", "#53acb2", "#8cbddb", "#ccd4e7", "#faf5fb"]),
        LayerConfig::new("pcPrivateRentedModel", "Private Rented (BRE Model)", None, ["#ffffff", "#f5e6fb", "#ebcaf9", "#e3b4fa", "#d699f8"]),
        LayerConfig::new("pc2011CensusPR", "Private Rented (Census 2011)", None, ["#ffffff", "#ffe6f1", "#fccce2", "#fab4d6", "#f699c6"]),
    ]
}
