//! Fertilizer Ratio Table
//!
//! Immutable crop -> NPK ratio mapping, keyed by trimmed lowercase crop name.
//! Loaded once at startup from `fertilizer_ratios.json`
//! (`{"rice": {"N": 80, "P": 40, "K": 40}, ...}`) or from a CSV with
//! `crop,N,P,K` columns.
//!
//! Ratio values are kept as JSON numbers so they are returned exactly as
//! written in the source table.

use anyhow::{Context, Result};
use polars::prelude::{CsvReadOptions, DataFrame, SerReader};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FertilizerError {
    #[error("Request body must be a JSON object")]
    NotAnObject,

    #[error("Missing crop name")]
    MissingCrop,

    #[error("Invalid crop name")]
    InvalidCrop,

    #[error("No fertilizer data for crop '{0}'")]
    UnknownCrop(String),
}

/// Recommended nitrogen / phosphorus / potassium ratio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NpkRatio {
    #[serde(rename = "N")]
    pub n: Number,
    #[serde(rename = "P")]
    pub p: Number,
    #[serde(rename = "K")]
    pub k: Number,
}

#[derive(Debug, Clone, Default)]
pub struct FertilizerTable {
    ratios: FxHashMap<String, NpkRatio>,
}

/// Normalized lookup key: trimmed, lowercase
pub fn crop_key(name: &str) -> String {
    name.trim().to_lowercase()
}

impl FertilizerTable {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, NpkRatio)>,
        S: AsRef<str>,
    {
        let mut ratios = FxHashMap::default();
        for (name, ratio) in entries {
            let key = crop_key(name.as_ref());
            if ratios.insert(key.clone(), ratio).is_some() {
                tracing::warn!("Duplicate fertilizer entry for crop '{}', keeping the last", key);
            }
        }
        Self { ratios }
    }

    /// Load from JSON or CSV, chosen by file extension
    pub fn load(path: &Path) -> Result<Self> {
        let is_csv = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

        if is_csv {
            Self::load_csv(path)
        } else {
            Self::load_json(path)
        }
    }

    fn load_json(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read fertilizer table: {:?}", path))?;

        let entries: BTreeMap<String, NpkRatio> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse fertilizer table JSON: {:?}", path))?;

        Ok(Self::from_entries(entries))
    }

    fn load_csv(path: &Path) -> Result<Self> {
        // Every column read as text so each cell keeps its written number form
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.into()))
            .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
            .finish()
            .with_context(|| format!("Failed to load fertilizer CSV: {:?}", path))?;

        let crops = df
            .column("crop")
            .with_context(|| "Column 'crop' not found")?
            .str()
            .with_context(|| "Column 'crop' is not string type")?;

        let n = number_column(&df, "N")?;
        let p = number_column(&df, "P")?;
        let k = number_column(&df, "K")?;

        let mut entries = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            let crop = crops
                .get(idx)
                .with_context(|| format!("Row {}: missing crop name", idx + 1))?;
            let ratio = match (&n[idx], &p[idx], &k[idx]) {
                (Some(n), Some(p), Some(k)) => NpkRatio { n: n.clone(), p: p.clone(), k: k.clone() },
                _ => anyhow::bail!("Row {}: incomplete NPK values for crop '{}'", idx + 1, crop),
            };
            entries.push((crop.to_string(), ratio));
        }

        Ok(Self::from_entries(entries))
    }

    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }

    /// Crop names in sorted order
    pub fn crops(&self) -> Vec<String> {
        let mut crops: Vec<String> = self.ratios.keys().cloned().collect();
        crops.sort();
        crops
    }

    /// Case-insensitive lookup
    pub fn lookup(&self, crop: &str) -> Result<&NpkRatio, FertilizerError> {
        let key = crop_key(crop);
        if key.is_empty() {
            return Err(FertilizerError::MissingCrop);
        }
        self.ratios.get(&key).ok_or(FertilizerError::UnknownCrop(key))
    }

    /// Validate a `{"crop": "..."}` request body and look it up
    pub fn recommend(&self, body: &Value) -> Result<&NpkRatio, FertilizerError> {
        let obj = body.as_object().ok_or(FertilizerError::NotAnObject)?;
        match obj.get("crop") {
            None | Some(Value::Null) => Err(FertilizerError::MissingCrop),
            Some(Value::String(name)) => self.lookup(name),
            Some(_) => Err(FertilizerError::InvalidCrop),
        }
    }
}

/// Parse a text column cell by cell, so `40` stays an integer even when a
/// neighbouring row holds `30.5`
fn number_column(df: &DataFrame, name: &str) -> Result<Vec<Option<Number>>> {
    let values = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .str()
        .with_context(|| format!("Column '{}' is not string type", name))?;

    values
        .into_iter()
        .enumerate()
        .map(|(idx, cell)| match cell.map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => Number::from_str(raw).map(Some).with_context(|| {
                format!("Row {}: column '{}' value {:?} is not a number", idx + 1, name, raw)
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ratio(n: i64, p: i64, k: i64) -> NpkRatio {
        NpkRatio { n: n.into(), p: p.into(), k: k.into() }
    }

    fn table() -> FertilizerTable {
        FertilizerTable::from_entries([("rice", ratio(80, 40, 40)), ("Maize", ratio(120, 60, 40))])
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = table();
        assert_eq!(table.lookup("Rice").unwrap(), table.lookup("rice").unwrap());
        assert_eq!(table.lookup("  MAIZE ").unwrap(), &ratio(120, 60, 40));
    }

    #[test]
    fn test_unknown_crop_names_normalized_key() {
        let err = table().lookup("Quinoa").unwrap_err();
        assert_eq!(err.to_string(), "No fertilizer data for crop 'quinoa'");
    }

    #[test]
    fn test_recommend_validation() {
        let table = table();
        assert_eq!(table.recommend(&json!({})).unwrap_err(), FertilizerError::MissingCrop);
        assert_eq!(table.recommend(&json!({"crop": null})).unwrap_err(), FertilizerError::MissingCrop);
        assert_eq!(table.recommend(&json!({"crop": "   "})).unwrap_err(), FertilizerError::MissingCrop);
        assert_eq!(table.recommend(&json!({"crop": 7})).unwrap_err(), FertilizerError::InvalidCrop);
        assert_eq!(table.recommend(&json!("rice")).unwrap_err(), FertilizerError::NotAnObject);
        assert_eq!(table.recommend(&json!({"crop": "rice"})).unwrap(), &ratio(80, 40, 40));
    }

    #[test]
    fn test_values_serialize_verbatim() {
        let mixed: NpkRatio = serde_json::from_value(json!({"N": 80, "P": 40.5, "K": 40})).unwrap();
        assert_eq!(
            serde_json::to_value(&mixed).unwrap(),
            json!({"N": 80, "P": 40.5, "K": 40})
        );
    }

    fn temp_csv(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("crop_advisor_fertilizer_{}_{}", name, std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("fertilizer_ratios.csv");
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_csv_keeps_integer_cells_in_mixed_column() {
        let path = temp_csv("mixed", "crop,N,P,K\nRice,80,40,40\nCoffee,100,25,30.5\n");
        let table = FertilizerTable::load(&path).unwrap();

        assert_eq!(table.lookup("rice").unwrap().k, Number::from(40));
        assert_eq!(
            serde_json::to_value(table.lookup("rice").unwrap()).unwrap(),
            json!({"N": 80, "P": 40, "K": 40})
        );
        assert_eq!(
            serde_json::to_string(table.lookup("coffee").unwrap()).unwrap(),
            r#"{"N":100,"P":25,"K":30.5}"#
        );
    }

    #[test]
    fn test_csv_rejects_non_numeric_cell() {
        let path = temp_csv("non_numeric", "crop,N,P,K\nRice,80,forty,40\n");
        let err = FertilizerTable::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("column 'P'"));
    }

    #[test]
    fn test_crops_sorted() {
        assert_eq!(table().crops(), vec!["maize", "rice"]);
    }
}
