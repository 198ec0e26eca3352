// Artifact check: load every startup artifact and print a summary
//
// Usage: cargo run --bin check_artifacts -- [MODEL_DIR]
// Exits non-zero when the model or fertilizer table cannot be loaded.

use crop_advisor::classifier::{feature_name_warnings, load_feature_names};
use crop_advisor::{ArtifactPaths, FertilizerTable, ServiceConfig, TreeEnsembleClassifier};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let model_dir = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| ServiceConfig::from_env().model_dir);
    let paths = ArtifactPaths::in_dir(&model_dir);

    println!("Checking artifacts in {:?}", model_dir);
    let mut ok = true;

    match TreeEnsembleClassifier::load(&paths.crop_model, &paths.crop_encoder) {
        Ok(classifier) => {
            let model = classifier.model();
            println!("✅ Crop model: {} trees, {} features, {} classes",
                model.n_trees(), model.n_features(), model.classes().len());
            match classifier.decoder() {
                Some(decoder) => println!("✅ Crop encoder: {} labels", decoder.len()),
                None => println!("⚠️  Crop encoder missing: predictions return raw identifiers"),
            }
        }
        Err(e) => {
            println!("❌ Crop model: {:#}", e);
            ok = false;
        }
    }

    match load_feature_names(&paths.model_features) {
        Ok(names) => {
            println!("✅ Model features: {} ({})", names.len(), names.join(", "));
            for warning in feature_name_warnings(&names) {
                println!("⚠️  {}", warning);
            }
        }
        Err(e) => println!("⚠️  Model features: {:#}", e),
    }

    match FertilizerTable::load(&paths.fertilizer_ratios) {
        Ok(table) => println!("✅ Fertilizer ratios loaded for {} crops", table.len()),
        Err(e) => {
            println!("❌ Fertilizer ratios: {:#}", e);
            ok = false;
        }
    }

    if ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
