use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use hourcast::{
    observations_to_frame, Artifact, BoostingParams, Cleaner, FeatureEngineer, Forecaster,
    LaggedDatasetBuilder, ModelTrainer, RawObservation,
};
use polars::prelude::DataFrame;
use std::sync::Arc;

fn synthetic_history(hours: i64) -> DataFrame {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap();
    let rows: Vec<RawObservation> = (0..hours)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * (i % 24) as f64 / 24.0;
            let temperature = 25.0 + 5.0 * phase.sin();
            RawObservation {
                timestamp: start + Duration::hours(i),
                temperature: (i % 17 != 0).then_some(temperature),
                humidity: Some(90.0 - 2.0 * temperature),
                wind_speed: Some(5.0 + (i % 5) as f64),
                wind_direction: Some(180.0),
                pressure: Some(1010.0 - 0.1 * (i % 9) as f64),
                cloud_coverage: Some(if i % 24 < 6 { 80.0 } else { 10.0 }),
                precipitation: None,
                weather_code: Some(if i % 24 < 6 { 3 } else { 0 }),
            }
        })
        .collect();
    observations_to_frame(&rows).unwrap()
}

fn bench_pipeline(c: &mut Criterion) {
    let raw = synthetic_history(24 * 30);
    let params = BoostingParams {
        n_estimators: 20,
        ..BoostingParams::default()
    };

    c.bench_function("clean_and_engineer", |b| {
        b.iter(|| {
            let cleaned = Cleaner::default().clean(black_box(raw.clone())).unwrap();
            FeatureEngineer::default().engineer(cleaned).unwrap()
        })
    });

    let cleaned = Cleaner::default().clean(raw.clone()).unwrap();
    let (engineered, encoder) = FeatureEngineer::default().engineer(cleaned).unwrap();
    let lagged = LaggedDatasetBuilder::default()
        .build_lagged(engineered.clone())
        .unwrap();
    let trainer = ModelTrainer::new(params);
    let (x_reg, y_reg) = trainer.prepare_regression(&lagged).unwrap();

    c.bench_function("train_regressor", |b| {
        b.iter(|| trainer.train_regression(black_box(&x_reg), black_box(&y_reg)).unwrap())
    });

    let regressor = Artifact::new(
        trainer.train_regression(&x_reg, &y_reg).unwrap(),
        x_reg.schema().clone(),
    );
    let (x_clf, y_clf) = trainer.prepare_classification(&lagged, &encoder).unwrap();
    let (classifier, _) = trainer
        .train_classification(&x_clf, &y_clf, &Arc::new(encoder.clone()))
        .unwrap();
    let classifier = Artifact::new(classifier, x_clf.schema().clone());

    c.bench_function("forecast_next", |b| {
        b.iter(|| {
            Forecaster::new(&regressor, &classifier, &encoder)
                .forecast_next(black_box(&engineered))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_pipeline);
criterion_main!(benches);
