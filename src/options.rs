//! Form Options
//!
//! Select-box values for the client form, read once from the training
//! dataset CSV (`soil_type` and `label` columns).

use crate::fertilizer::FertilizerTable;
use crate::soil::soil_labels;
use anyhow::{Context, Result};
use polars::prelude::{CsvReadOptions, DataFrame, SerReader};
use serde::Serialize;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FormOptions {
    pub soil_types: Vec<String>,
    pub crops: Vec<String>,
}

impl FormOptions {
    /// Options when no dataset is available
    pub fn fallback(fertilizer: Option<&FertilizerTable>) -> Self {
        Self {
            soil_types: soil_labels(),
            crops: fertilizer.map(FertilizerTable::crops).unwrap_or_default(),
        }
    }

    /// Read options from the dataset, falling back per column
    pub fn load(dataset_path: &Path, fertilizer: Option<&FertilizerTable>) -> Self {
        let fallback = Self::fallback(fertilizer);

        let df = match read_dataset(dataset_path) {
            Ok(df) => df,
            Err(e) => {
                tracing::warn!("Dataset unavailable, using default form options: {:#}", e);
                return fallback;
            }
        };

        let soil_types = unique_sorted(&df, "soil_type").unwrap_or_else(|e| {
            tracing::warn!("No soil types in dataset: {:#}", e);
            fallback.soil_types
        });
        let crops = unique_sorted(&df, "label").unwrap_or_else(|e| {
            tracing::warn!("No crop labels in dataset: {:#}", e);
            fallback.crops
        });

        Self { soil_types, crops }
    }
}

fn read_dataset(path: &Path) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.into()))
        .with_context(|| format!("Failed to create CSV reader: {:?}", path))?
        .finish()
        .with_context(|| format!("Failed to load dataset CSV: {:?}", path))
}

/// Unique non-null values of a string column, sorted
fn unique_sorted(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    let values = df
        .column(name)
        .with_context(|| format!("Column '{}' not found", name))?
        .str()
        .with_context(|| format!("Column '{}' is not string type", name))?;

    let unique: BTreeSet<&str> = values.into_iter().flatten().collect();
    if unique.is_empty() {
        anyhow::bail!("Column '{}' has no values", name);
    }
    Ok(unique.into_iter().map(str::to_string).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fertilizer::NpkRatio;

    #[test]
    fn test_fallback_uses_known_soils_and_table_crops() {
        let table = FertilizerTable::from_entries([(
            "Rice",
            NpkRatio { n: 80.into(), p: 40.into(), k: 40.into() },
        )]);
        let options = FormOptions::fallback(Some(&table));
        assert_eq!(options.soil_types.len(), 6);
        assert_eq!(options.crops, vec!["rice"]);

        assert!(FormOptions::fallback(None).crops.is_empty());
    }

    #[test]
    fn test_missing_dataset_falls_back() {
        let options = FormOptions::load(Path::new("/nonexistent/dataset.csv"), None);
        assert_eq!(options, FormOptions::fallback(None));
    }
}
