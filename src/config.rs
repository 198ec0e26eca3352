//! Service configuration from environment variables

use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CROP_MODEL_FILE: &str = "crop_model.json";
pub const CROP_ENCODER_FILE: &str = "crop_encoder.json";
pub const MODEL_FEATURES_FILE: &str = "model_features.json";
pub const FERTILIZER_JSON_FILE: &str = "fertilizer_ratios.json";
pub const FERTILIZER_CSV_FILE: &str = "fertilizer_ratios.csv";

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub model_dir: PathBuf,
    pub host: String,
    pub port: u16,
    pub users_file: PathBuf,
    pub dataset_path: PathBuf,
    pub request_timeout: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("."),
            host: "127.0.0.1".to_string(),
            port: 5000,
            users_file: PathBuf::from("users.json"),
            dataset_path: PathBuf::from("Crop_recommendation_with_soil.csv"),
            request_timeout: Duration::from_secs(12),
        }
    }
}

impl ServiceConfig {
    /// Read `MODEL_DIR`, `HOST`, `PORT`, `USERS_FILE`, `DATASET_PATH`,
    /// `REQUEST_TIMEOUT_SECS`; unset or unparseable values keep their
    /// defaults, as does a zero timeout
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let port = parse_or(&lookup, "PORT", defaults.port);
        let mut timeout_secs = parse_or(&lookup, "REQUEST_TIMEOUT_SECS", defaults.request_timeout.as_secs());
        if timeout_secs == 0 {
            // Zero would time out every request
            tracing::warn!("Ignoring REQUEST_TIMEOUT_SECS=0, using {}", defaults.request_timeout.as_secs());
            timeout_secs = defaults.request_timeout.as_secs();
        }

        Self {
            model_dir: lookup("MODEL_DIR").map(PathBuf::from).unwrap_or(defaults.model_dir),
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
            users_file: lookup("USERS_FILE").map(PathBuf::from).unwrap_or(defaults.users_file),
            dataset_path: lookup("DATASET_PATH").map(PathBuf::from).unwrap_or(defaults.dataset_path),
            request_timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn artifacts(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.model_dir)
    }
}

fn parse_or<T: std::str::FromStr + Copy + std::fmt::Display>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: T,
) -> T {
    match lookup(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring invalid {}={:?}, using {}", key, raw, default);
            default
        }),
    }
}

/// Locations of the startup artifacts
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub crop_model: PathBuf,
    pub crop_encoder: PathBuf,
    pub model_features: PathBuf,
    pub fertilizer_ratios: PathBuf,
}

impl ArtifactPaths {
    /// Standard file names under one directory; a CSV fertilizer table is
    /// used when the JSON one is absent
    pub fn in_dir(dir: &Path) -> Self {
        let json_table = dir.join(FERTILIZER_JSON_FILE);
        let csv_table = dir.join(FERTILIZER_CSV_FILE);
        let fertilizer_ratios = if !json_table.exists() && csv_table.exists() {
            csv_table
        } else {
            json_table
        };

        Self {
            crop_model: dir.join(CROP_MODEL_FILE),
            crop_encoder: dir.join(CROP_ENCODER_FILE),
            model_features: dir.join(MODEL_FEATURES_FILE),
            fertilizer_ratios,
        }
    }
}
