//! Keyed CSV tables of per-area indicator values.

use std::collections::HashMap;
use std::io::Read;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("csv: {0}")]
    Csv(#[from] csv::Error),
    #[error("key column {0:?} not found")]
    MissingKeyColumn(String),
    #[error("duplicate key {0:?}")]
    DuplicateKey(String),
}

/// A CSV table indexed by one key column. Cells are kept as text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KeyedTable {
    headers: Vec<String>,
    columns: HashMap<String, usize>,
    rows: HashMap<String, Vec<String>>,
}

impl KeyedTable {
    pub fn from_reader<R: Read>(reader: R, key_field: &str) -> Result<Self, TableError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let key_index = headers
            .iter()
            .position(|h| h == key_field)
            .ok_or_else(|| TableError::MissingKeyColumn(key_field.to_string()))?;

        let mut rows = HashMap::new();
        for record in reader.records() {
            let record = record?;
            let cells: Vec<String> = record.iter().map(str::to_string).collect();
            let key = cells.get(key_index).cloned().unwrap_or_default();
            if rows.insert(key.clone(), cells).is_some() {
                return Err(TableError::DuplicateKey(key));
            }
        }
        let columns = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.clone(), i))
            .collect();
        Ok(Self {
            headers,
            columns,
            rows,
        })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains_key(column)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.rows.contains_key(key)
    }

    pub fn cell(&self, key: &str, column: &str) -> Option<&str> {
        let i = *self.columns.get(column)?;
        self.rows.get(key)?.get(i).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyedTable, TableError};

    const CSV: &str = "COACode,pcHHSRS, SimpleCO2\nE00001, 12.5,3.1\nE00002,7,2.25\n";

    #[test]
    fn cells_are_found_by_key_and_column() {
        let t = KeyedTable::from_reader(CSV.as_bytes(), "COACode").unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(t.cell("E00001", "pcHHSRS"), Some("12.5"));
        assert_eq!(t.cell("E00002", "SimpleCO2"), Some("2.25"));
        assert_eq!(t.cell("E00003", "pcHHSRS"), None);
        assert!(t.has_column("SimpleCO2"));
    }

    #[test]
    fn missing_key_column_and_duplicates_fail() {
        assert!(matches!(
            KeyedTable::from_reader(CSV.as_bytes(), "OA11CD"),
            Err(TableError::MissingKeyColumn(_))
        ));
        let dup = "COACode,x\nA,1\nA,2\n";
        assert!(matches!(
            KeyedTable::from_reader(dup.as_bytes(), "COACode"),
            Err(TableError::DuplicateKey(k)) if k == "A"
        ));
    }
}
