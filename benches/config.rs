#![allow(clippy::unwrap_used)]
//! Benchmarks for configuration serialization and validation

#![allow(missing_docs)]

use criterion::{Criterion, criterion_group, criterion_main};
use parsec_vdisplay::config::{AppConfig, ConfigManager, WindowState};
use std::hint::black_box;

fn sample_config() -> AppConfig {
    AppConfig {
        language: "Tiếng Việt".to_string(),
        fallback_display: true,
        check_update_on_startup: false,
        window_state: WindowState { x: 1440, y: 260 },
    }
}

fn bench_config_serialization(c: &mut Criterion) {
    let config = sample_config();

    c.bench_function("config_serialize", |b| {
        b.iter(|| {
            let json = serde_json::to_string_pretty(black_box(&config)).unwrap();
            black_box(json);
        });
    });
}

fn bench_config_validate(c: &mut Criterion) {
    let json = serde_json::to_string(&sample_config()).unwrap();

    c.bench_function("config_validate", |b| {
        b.iter(|| {
            let config = ConfigManager::validate(black_box(&json)).unwrap();
            black_box(config);
        });
    });
}

fn bench_config_partial_file(c: &mut Criterion) {
    // Files written by older builds only carry some of the fields
    let json = r#"{"language": "简体中文"}"#;

    c.bench_function("config_deserialize_partial", |b| {
        b.iter(|| {
            let config: AppConfig = serde_json::from_str(black_box(json)).unwrap();
            black_box(config);
        });
    });
}

criterion_group!(
    benches,
    bench_config_serialization,
    bench_config_validate,
    bench_config_partial_file
);
criterion_main!(benches);
