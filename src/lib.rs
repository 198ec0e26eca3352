//! Crop Advisor
//!
//! Crop recommendation and fertilizer lookup service.
//!
//! - `soil`: fixed soil-type encoding
//! - `query`: request validation for crop predictions
//! - `classifier`: tree-ensemble model + label decoder behind `CropClassifier`
//! - `fertilizer`: crop -> NPK ratio table
//! - `options`: form select-box values from the training dataset
//! - `credentials`: file-backed account store for the client UI
//! - `config`: environment configuration and artifact paths
//! - `api_server`: Axum HTTP surface (feature `api`)

pub mod classifier;
pub mod config;
pub mod credentials;
pub mod fertilizer;
pub mod options;
pub mod query;
pub mod soil;

#[cfg(feature = "api")]
pub mod api_server;

// Re-export commonly used types
pub use classifier::{ClassifierError, CropClassifier, FeatureVector, TreeEnsembleClassifier};
pub use config::{ArtifactPaths, ServiceConfig};
pub use credentials::{CredentialStore, ResetOutcome, SignupOutcome};
pub use fertilizer::{FertilizerTable, NpkRatio};
pub use options::FormOptions;
pub use query::{CropQuery, QueryError};
pub use soil::SoilType;

#[cfg(feature = "api")]
pub use api_server::{create_router, AppState};
