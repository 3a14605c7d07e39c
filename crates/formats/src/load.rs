//! Loads boundaries, small areas and indicator tables into [`MapData`].

use std::fs;
use std::path::{Path, PathBuf};

use foundation::{Region, RegionId};
use layers::{LayerDescriptor, LayerId};
use thiserror::Error;
use tracing::info;

use crate::geojson::{AreaCollection, AreaFeature, GeoJsonError};
use crate::table::{KeyedTable, TableError};

/// Unmatched keys listed in an error message, at most.
const MAX_REPORTED_KEYS: usize = 10;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}: {source}")]
    GeoJson {
        path: PathBuf,
        #[source]
        source: GeoJsonError,
    },
    #[error("{path}: {source}")]
    Table {
        path: PathBuf,
        #[source]
        source: TableError,
    },
    #[error("feature {index} has no {field:?} property")]
    MissingField { index: usize, field: String },
    #[error("no boundaries with {field} = {region:?}")]
    EmptyRegion { field: String, region: String },
    #[error("{count} small-area keys have no match in table {table} (first: {sample:?})")]
    UnmatchedKeys {
        table: String,
        count: usize,
        sample: Vec<String>,
    },
    #[error("indicator column {0:?} not found in any table")]
    MissingColumn(String),
    #[error("{key}: value {value:?} in column {column} is not numeric")]
    InvalidValue {
        key: String,
        column: String,
        value: String,
    },
}

/// Attribute names used to read the source collections.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFields {
    pub region_filter: String,
    pub ward_id: String,
    pub ward_name: String,
    pub small_area_key: String,
    pub table_key: String,
}

impl Default for DataFields {
    fn default() -> Self {
        Self {
            region_filter: "LAD11NM".to_string(),
            ward_id: "Ward_ID".to_string(),
            ward_name: "WardName".to_string(),
            small_area_key: "OA11CD".to_string(),
            table_key: "COACode".to_string(),
        }
    }
}

/// Everything the viewer draws, in lon/lat.
#[derive(Debug, Clone, PartialEq)]
pub struct MapData {
    pub wards: Vec<Region>,
    pub small_areas: Vec<Region>,
    pub layers: Vec<LayerDescriptor>,
}

/// Reads and joins the sources from disk.
pub fn load_map_data(
    wards_path: &Path,
    small_areas_path: &Path,
    table_paths: &[PathBuf],
    fields: &DataFields,
    region: &str,
    indicators: &[String],
) -> Result<MapData, LoadError> {
    let wards = read_collection(wards_path)?;
    let small_areas = read_collection(small_areas_path)?;
    let mut tables = Vec::with_capacity(table_paths.len());
    for path in table_paths {
        let file = fs::File::open(path).map_err(|source| LoadError::Io {
            path: path.clone(),
            source,
        })?;
        let table =
            KeyedTable::from_reader(file, &fields.table_key).map_err(|source| LoadError::Table {
                path: path.clone(),
                source,
            })?;
        tables.push((path.display().to_string(), table));
    }
    let data = join_map_data(&wards, &small_areas, &tables, fields, region, indicators)?;
    info!(
        wards = data.wards.len(),
        small_areas = data.small_areas.len(),
        layers = data.layers.len(),
        "map data loaded"
    );
    Ok(data)
}

fn read_collection(path: &Path) -> Result<AreaCollection, LoadError> {
    let payload = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    AreaCollection::from_geojson_str(&payload).map_err(|source| LoadError::GeoJson {
        path: path.to_path_buf(),
        source,
    })
}

/// Filters boundaries to `region` and joins every small area against every
/// table. Any small-area key missing from a table is fatal.
pub fn join_map_data(
    wards: &AreaCollection,
    small_areas: &AreaCollection,
    tables: &[(String, KeyedTable)],
    fields: &DataFields,
    region: &str,
    indicators: &[String],
) -> Result<MapData, LoadError> {
    let mut ward_regions = Vec::new();
    for (index, f) in wards.features.iter().enumerate() {
        if f.property_text(&fields.region_filter).as_deref() != Some(region) {
            continue;
        }
        let id = required(f, index, &fields.ward_id)?;
        let name = f.property_text(&fields.ward_name).unwrap_or_default();
        ward_regions.push(Region::new(id, name, f.polygons.clone()));
    }
    if ward_regions.is_empty() {
        return Err(LoadError::EmptyRegion {
            field: fields.region_filter.clone(),
            region: region.to_string(),
        });
    }

    let mut area_regions = Vec::with_capacity(small_areas.len());
    for (index, f) in small_areas.features.iter().enumerate() {
        let key = required(f, index, &fields.small_area_key)?;
        area_regions.push(Region::new(key.clone(), key, f.polygons.clone()));
    }

    for (name, table) in tables {
        let missing: Vec<String> = area_regions
            .iter()
            .filter(|r| !table.contains_key(r.id.as_str()))
            .map(|r| r.id.as_str().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LoadError::UnmatchedKeys {
                table: name.clone(),
                count: missing.len(),
                sample: missing.into_iter().take(MAX_REPORTED_KEYS).collect(),
            });
        }
    }

    let mut layers = Vec::with_capacity(indicators.len());
    for column in indicators {
        // Later tables win when a column appears twice.
        let table = tables
            .iter()
            .rev()
            .map(|(_, t)| t)
            .find(|t| t.has_column(column))
            .ok_or_else(|| LoadError::MissingColumn(column.clone()))?;
        let values = area_regions
            .iter()
            .map(|r| {
                let key = r.id.as_str();
                let raw = table.cell(key, column).unwrap_or_default();
                // "NaN" and "inf" parse, but cannot be classified.
                match raw.parse::<f64>() {
                    Ok(value) if value.is_finite() => Ok((r.id.clone(), value)),
                    _ => Err(LoadError::InvalidValue {
                        key: key.to_string(),
                        column: column.clone(),
                        value: raw.to_string(),
                    }),
                }
            })
            .collect::<Result<Vec<(RegionId, f64)>, LoadError>>()?;
        layers.push(LayerDescriptor::new(LayerId::new(column.as_str()), values));
    }

    Ok(MapData {
        wards: ward_regions,
        small_areas: area_regions,
        layers,
    })
}

fn required(f: &AreaFeature, index: usize, field: &str) -> Result<String, LoadError> {
    f.property_text(field).ok_or_else(|| LoadError::MissingField {
        index,
        field: field.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{DataFields, LoadError, join_map_data, load_map_data};
    use crate::geojson::AreaCollection;
    use crate::table::KeyedTable;
    use std::io::Write;

    fn square(props: &str, x: f64) -> String {
        format!(
            r#"{{"type":"Feature","properties":{props},"geometry":{{"type":"Polygon","coordinates":[[[{x},50.8],[{x1},50.8],[{x1},50.81],[{x},50.8]]]}}}}"#,
            x1 = x + 0.01
        )
    }

    fn collection(features: &[String]) -> String {
        format!(r#"{{"type":"FeatureCollection","features":[{}]}}"#, features.join(","))
    }

    fn wards() -> AreaCollection {
        AreaCollection::from_geojson_str(&collection(&[
            square(r#"{"LAD11NM":"Adur","Ward_ID":"W1","WardName":"One"}"#, -0.30),
            square(r#"{"LAD11NM":"Worthing","Ward_ID":"W9","WardName":"Nine"}"#, -0.40),
        ]))
        .unwrap()
    }

    fn areas() -> AreaCollection {
        AreaCollection::from_geojson_str(&collection(&[
            square(r#"{"OA11CD":"E1"}"#, -0.30),
            square(r#"{"OA11CD":"E2"}"#, -0.29),
        ]))
        .unwrap()
    }

    fn table(csv: &str) -> (String, KeyedTable) {
        ("t.csv".to_string(), KeyedTable::from_reader(csv.as_bytes(), "COACode").unwrap())
    }

    fn indicators() -> Vec<String> {
        vec!["pcHHSRS".to_string()]
    }

    #[test]
    fn joins_in_small_area_order() {
        let data = join_map_data(
            &wards(),
            &areas(),
            &[table("COACode,pcHHSRS\nE2,4\nE1,3.5\n")],
            &DataFields::default(),
            "Adur",
            &indicators(),
        )
        .unwrap();
        assert_eq!(data.wards.len(), 1);
        assert_eq!(data.wards[0].name, "One");
        assert_eq!(data.layers[0].numeric_values(), vec![3.5, 4.0]);
    }

    #[test]
    fn unmatched_keys_are_fatal() {
        let err = join_map_data(
            &wards(),
            &areas(),
            &[table("COACode,pcHHSRS\nE1,3\n")],
            &DataFields::default(),
            "Adur",
            &indicators(),
        )
        .unwrap_err();
        assert!(matches!(err, LoadError::UnmatchedKeys { count: 1, ref sample, .. } if sample == &["E2"]));
    }

    #[test]
    fn empty_region_and_bad_values_are_fatal() {
        let t = table("COACode,pcHHSRS\nE1,3\nE2,n/a\n");
        let empty = join_map_data(&wards(), &areas(), &[t.clone()], &DataFields::default(), "Nowhere", &indicators());
        assert!(matches!(empty, Err(LoadError::EmptyRegion { .. })));
        let bad = join_map_data(&wards(), &areas(), &[t], &DataFields::default(), "Adur", &indicators());
        assert!(matches!(bad, Err(LoadError::InvalidValue { ref key, .. }) if key == "E2"));
    }

    #[test]
    fn non_finite_values_are_fatal() {
        for cell in ["NaN", "inf", "-infinity"] {
            let t = table(&format!("COACode,pcHHSRS\nE1,{cell}\nE2,4\n"));
            let err = join_map_data(&wards(), &areas(), &[t], &DataFields::default(), "Adur", &indicators());
            assert!(
                matches!(err, Err(LoadError::InvalidValue { ref key, ref value, .. }) if key == "E1" && value == cell),
                "{cell}: {err:?}"
            );
        }
    }

    #[test]
    fn loads_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let wards_path = dir.path().join("wards.geojson");
        let areas_path = dir.path().join("coas.geojson");
        let csv_path = dir.path().join("data.csv");
        std::fs::write(
            &wards_path,
            collection(&[square(r#"{"LAD11NM":"Adur","Ward_ID":"W1","WardName":"One"}"#, -0.30)]),
        )
        .unwrap();
        std::fs::write(&areas_path, collection(&[square(r#"{"OA11CD":"E1"}"#, -0.30)])).unwrap();
        let mut f = std::fs::File::create(&csv_path).unwrap();
        writeln!(f, "COACode,pcHHSRS").unwrap();
        writeln!(f, "E1,12").unwrap();
        drop(f);

        let data = load_map_data(
            &wards_path,
            &areas_path,
            &[csv_path],
            &DataFields::default(),
            "Adur",
            &indicators(),
        )
        .unwrap();
        assert_eq!(data.small_areas.len(), 1);
        assert_eq!(data.layers[0].values[0].1, 12.0);

        let missing = load_map_data(
            &dir.path().join("nope.geojson"),
            &areas_path,
            &[],
            &DataFields::default(),
            "Adur",
            &indicators(),
        );
        assert!(matches!(missing, Err(LoadError::Io { .. })));
    }
}
