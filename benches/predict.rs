// Benchmark: validation + tree-ensemble inference for one crop query
//
// Usage: cargo bench --bench predict

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use crop_advisor::{ArtifactPaths, CropClassifier, CropQuery, TreeEnsembleClassifier};
use serde_json::json;
use std::path::PathBuf;

fn bench_predict(c: &mut Criterion) {
    let dir = PathBuf::from(concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures"));
    let paths = ArtifactPaths::in_dir(&dir);
    let classifier = TreeEnsembleClassifier::load(&paths.crop_model, &paths.crop_encoder)
        .expect("fixture model should load");

    let body = json!({
        "N": 90, "P": 42, "K": 43,
        "temperature": 25, "humidity": 75, "ph": 6.5, "rainfall": 150,
        "soil_type": "Loamy"
    });

    c.bench_function("validate_query", |b| {
        b.iter(|| CropQuery::from_json(black_box(&body)).unwrap())
    });

    let features = CropQuery::from_json(&body).unwrap().feature_vector();
    c.bench_function("predict_fixture_model", |b| {
        b.iter(|| classifier.predict(black_box(&features)).unwrap())
    });
}

criterion_group!(benches, bench_predict);
criterion_main!(benches);
