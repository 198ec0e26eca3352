//! Crop Classifier
//!
//! The prediction endpoint only sees the `CropClassifier` trait: an 8-feature
//! vector goes in, a human-readable crop name comes out. The concrete model
//! (`TreeEnsembleClassifier`) pairs a decision-tree ensemble with an optional
//! label decoder; tests substitute fakes.
//!
//! Artifacts (all JSON, loaded once at startup):
//! - `crop_model.json`: tree ensemble (required)
//! - `crop_encoder.json`: identifier -> crop name table (optional)
//! - `model_features.json`: ordered feature names (optional, compatibility check only)

pub mod decoder;
pub mod forest;

pub use decoder::LabelDecoder;
pub use forest::TreeEnsemble;

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Model input width: 7 continuous features + 1 soil code
pub const FEATURE_COUNT: usize = 8;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("Model expects {expected} features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Unseen crop identifier {0}")]
    UnseenIdentifier(i64),

    #[error("Invalid model: {0}")]
    Malformed(String),
}

/// Ordered model input `[N, P, K, temperature, humidity, ph, rainfall, soil_code]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    pub fn new(values: [f64; FEATURE_COUNT]) -> Self {
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }
}

/// Anything that can turn a feature vector into a crop name
pub trait CropClassifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> Result<String, ClassifierError>;
}

/// Tree ensemble plus optional label decoder
#[derive(Debug, Clone)]
pub struct TreeEnsembleClassifier {
    model: TreeEnsemble,
    decoder: Option<LabelDecoder>,
}

impl TreeEnsembleClassifier {
    pub fn new(model: TreeEnsemble, decoder: Option<LabelDecoder>) -> Result<Self, ClassifierError> {
        if model.n_features() != FEATURE_COUNT {
            return Err(ClassifierError::DimensionMismatch {
                expected: FEATURE_COUNT,
                actual: model.n_features(),
            });
        }

        if let Some(decoder) = &decoder {
            let undecodable = model
                .classes()
                .iter()
                .filter(|id| decoder.decode(**id).is_err())
                .count();
            if undecodable > 0 {
                tracing::warn!(
                    "{} of {} model classes have no entry in the label decoder ({} labels)",
                    undecodable,
                    model.classes().len(),
                    decoder.len()
                );
            }
        }

        Ok(Self { model, decoder })
    }

    /// Load model and decoder from their artifact files
    ///
    /// The decoder is optional: if it fails to load, predictions fall back to
    /// the raw class identifier.
    pub fn load(model_path: &Path, decoder_path: &Path) -> Result<Self> {
        let model = TreeEnsemble::load(model_path)?;
        tracing::info!(
            "Crop model loaded: {} trees, {} classes",
            model.n_trees(),
            model.classes().len()
        );

        let decoder = match LabelDecoder::load(decoder_path) {
            Ok(decoder) => {
                tracing::info!("Crop label decoder loaded: {} labels", decoder.len());
                Some(decoder)
            }
            Err(e) => {
                tracing::warn!("Label decoder unavailable, using raw identifiers: {:#}", e);
                None
            }
        };

        Self::new(model, decoder).with_context(|| format!("Incompatible model: {:?}", model_path))
    }

    pub fn model(&self) -> &TreeEnsemble {
        &self.model
    }

    pub fn decoder(&self) -> Option<&LabelDecoder> {
        self.decoder.as_ref()
    }
}

impl CropClassifier for TreeEnsembleClassifier {
    fn predict(&self, features: &FeatureVector) -> Result<String, ClassifierError> {
        let id = self.model.predict_class(features.as_slice())?;
        match &self.decoder {
            Some(decoder) => decoder.decode(id).map(str::to_string),
            None => Ok(id.to_string()),
        }
    }
}

/// Load the ordered feature-name list
pub fn load_feature_names(path: &Path) -> Result<Vec<String>> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read feature list: {:?}", path))?;
    serde_json::from_str(&contents)
        .with_context(|| format!("Failed to parse feature list JSON: {:?}", path))
}

/// Reasons a feature list disagrees with the positional soil encoding
pub fn feature_name_warnings(names: &[String]) -> Vec<String> {
    let mut warnings = Vec::new();

    if names.len() != FEATURE_COUNT {
        warnings.push(format!(
            "feature list has {} entries, service sends {}",
            names.len(),
            FEATURE_COUNT
        ));
    }

    let one_hot: Vec<&str> = names
        .iter()
        .map(String::as_str)
        .filter(|name| name.starts_with("soil_type_"))
        .collect();
    if !one_hot.is_empty() {
        warnings.push(format!(
            "feature list uses one-hot soil columns ({}), service sends a positional soil code",
            one_hot.join(", ")
        ));
    }

    warnings
}
