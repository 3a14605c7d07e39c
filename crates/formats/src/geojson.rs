//! Areal GeoJSON feature collections (Polygon / MultiPolygon only).

use foundation::Polygon;
use foundation::math::Vec2;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GeoJsonError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected GeoJSON FeatureCollection")]
    NotAFeatureCollection,
    #[error("invalid feature at index {index}: {reason}")]
    InvalidFeature { index: usize, reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AreaFeature {
    pub properties: Map<String, Value>,
    /// Lon/lat degrees; one entry per polygon part.
    pub polygons: Vec<Polygon>,
}

impl AreaFeature {
    /// Property rendered as text; numbers are formatted, null is absent.
    pub fn property_text(&self, key: &str) -> Option<String> {
        match self.properties.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AreaCollection {
    pub features: Vec<AreaFeature>,
}

impl AreaCollection {
    pub fn from_geojson_str(payload: &str) -> Result<Self, GeoJsonError> {
        let value: Value = serde_json::from_str(payload)?;
        Self::from_geojson_value(&value)
    }

    pub fn from_geojson_value(value: &Value) -> Result<Self, GeoJsonError> {
        let obj = value
            .as_object()
            .ok_or(GeoJsonError::NotAFeatureCollection)?;
        if obj.get("type").and_then(Value::as_str) != Some("FeatureCollection") {
            return Err(GeoJsonError::NotAFeatureCollection);
        }
        let features_val = obj
            .get("features")
            .and_then(Value::as_array)
            .ok_or(GeoJsonError::NotAFeatureCollection)?;

        let mut features = Vec::with_capacity(features_val.len());
        for (index, feat_val) in features_val.iter().enumerate() {
            let invalid = |reason: String| GeoJsonError::InvalidFeature { index, reason };
            let feat_obj = feat_val
                .as_object()
                .ok_or_else(|| invalid("feature must be an object".to_string()))?;
            let properties = feat_obj
                .get("properties")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            let geometry = feat_obj
                .get("geometry")
                .ok_or_else(|| invalid("feature missing geometry".to_string()))?;
            let polygons = parse_areal(geometry).map_err(invalid)?;
            features.push(AreaFeature {
                properties,
                polygons,
            });
        }
        Ok(Self { features })
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

fn parse_areal(value: &Value) -> Result<Vec<Polygon>, String> {
    let obj = value
        .as_object()
        .ok_or("geometry must be an object".to_string())?;
    let ty = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or("geometry missing type".to_string())?;
    let coords = obj
        .get("coordinates")
        .ok_or("geometry missing coordinates".to_string())?;
    match ty {
        "Polygon" => Ok(vec![parse_polygon(coords)?]),
        "MultiPolygon" => coords
            .as_array()
            .ok_or("MultiPolygon coordinates must be an array of polygons".to_string())?
            .iter()
            .map(parse_polygon)
            .collect(),
        other => Err(format!("unsupported geometry type: {other}")),
    }
}

fn parse_polygon(coords: &Value) -> Result<Polygon, String> {
    let rings = coords
        .as_array()
        .ok_or("Polygon coordinates must be an array of rings".to_string())?;
    let rings = rings.iter().map(parse_ring).collect::<Result<Vec<_>, _>>()?;
    Ok(Polygon::new(rings))
}

fn parse_ring(coords: &Value) -> Result<Vec<Vec2>, String> {
    let arr = coords
        .as_array()
        .ok_or("ring must be an array of positions".to_string())?;
    arr.iter()
        .map(|pos| {
            let p = pos
                .as_array()
                .filter(|p| p.len() >= 2)
                .ok_or("position must have [lon, lat]".to_string())?;
            let lon = p[0].as_f64().ok_or("lon must be a number".to_string())?;
            let lat = p[1].as_f64().ok_or("lat must be a number".to_string())?;
            Ok(Vec2::new(lon, lat))
        })
        .collect()
}
