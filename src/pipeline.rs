//! One retrain cycle: clean, engineer, lag, train both models, persist them and
//! forecast the next hour.

use crate::artifacts::store::{
    Artifact, ArtifactStore, CONDITION_MODEL, LABEL_ENCODER, TEMPERATURE_MODEL,
};
use crate::cleaning::error::DataError;
use crate::cleaning::Cleaner;
use crate::config::ForecastConfig;
use crate::error::HourcastError;
use crate::features::FeatureEngineer;
use crate::fetch::open_meteo::OpenMeteoFetcher;
use crate::forecast::forecaster::{ForecastOutcome, Forecaster};
use crate::frame::has_column;
use crate::history::write_csv;
use crate::lagged::LaggedDatasetBuilder;
use crate::model::booster::{GradientBoostedClassifier, GradientBoostedRegressor};
use crate::model::trainer::ModelTrainer;
use crate::types::columns::{COL_WEATHER_CODE, RAW_COLUMN_MAP};
use crate::types::feature_schema::FeatureSchema;
use log::info;
use polars::prelude::DataFrame;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

pub const ENGINEERED_CSV: &str = "weather_data.csv";
pub const FORECAST_CSV: &str = "weather_data_with_predictions.csv";

/// What a completed cycle produced.
#[derive(Debug, Clone)]
pub struct CycleOutput {
    pub engineered: DataFrame,
    pub forecast: ForecastOutcome,
    pub lagged_rows: usize,
    pub engineered_path: PathBuf,
    pub forecast_path: PathBuf,
}

#[derive(Debug, Clone, Default)]
pub struct RetrainCycle {
    config: ForecastConfig,
}

impl RetrainCycle {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Runs a full cycle on a raw observation table.
    ///
    /// Both models and the label encoder are staged before any of them replaces
    /// a stored artifact, so a failed cycle leaves the previous artifacts intact.
    pub fn run(&self, raw: DataFrame) -> Result<CycleOutput, HourcastError> {
        let started = Instant::now();
        let config = &self.config;
        std::fs::create_dir_all(&config.output_dir)
            .map_err(|e| HourcastError::OutputDirCreation(config.output_dir.clone(), e))?;

        let cleaned = Cleaner::new(config.cleaning.clone()).clean(raw)?;
        let (engineered, encoder) =
            FeatureEngineer::new(config.features.rolling_window).engineer(cleaned)?;
        let engineered_path = config.output_dir.join(ENGINEERED_CSV);
        write_csv(&engineered, &engineered_path)?;

        let lagged =
            LaggedDatasetBuilder::new(config.features.lags).build_lagged(engineered.clone())?;
        let trainer = ModelTrainer::new(config.boosting.clone());
        let encoder = Arc::new(encoder);

        let (x_reg, y_reg) = trainer.prepare_regression(&lagged)?;
        let regressor = trainer.train_regression(&x_reg, &y_reg)?;
        let (x_clf, y_clf) = trainer.prepare_classification(&lagged, &encoder)?;
        let (classifier, _) = trainer.train_classification(&x_clf, &y_clf, &encoder)?;

        let store = ArtifactStore::open(&config.artifact_dir)?;
        let staged = vec![
            store.stage(TEMPERATURE_MODEL, &regressor, x_reg.schema())?,
            store.stage(CONDITION_MODEL, &classifier, x_clf.schema())?,
            store.stage(LABEL_ENCODER, encoder.as_ref(), &FeatureSchema::default())?,
        ];
        store.commit(staged)?;

        // forecast with the schemas exactly as persisted
        let regressor: Artifact<GradientBoostedRegressor> = store.load(TEMPERATURE_MODEL)?;
        let classifier: Artifact<GradientBoostedClassifier> = store.load(CONDITION_MODEL)?;
        let forecast = Forecaster::new(&regressor, &classifier, &encoder)
            .with_round_decimals(config.round_decimals)
            .forecast_next(&engineered)?;
        let forecast_path = config.output_dir.join(FORECAST_CSV);
        write_csv(&forecast.table, &forecast_path)?;

        info!(
            "Retrain cycle finished in {:?}: {} lagged rows, forecast {} -> {:.2}",
            started.elapsed(),
            lagged.height(),
            forecast.timestamp,
            forecast.temperature
        );
        Ok(CycleOutput {
            engineered,
            forecast,
            lagged_rows: lagged.height(),
            engineered_path,
            forecast_path,
        })
    }

    /// Fetches the configured history window, then runs a cycle on it.
    pub async fn run_from_source(&self, fetcher: &OpenMeteoFetcher) -> Result<CycleOutput, HourcastError> {
        let raw = fetcher.fetch_recent(self.config.history_years).await?;
        info!("Fetched {} raw hourly rows", raw.height());
        self.run(raw)
    }

    /// Forecasts from an existing history using the stored models and encoder,
    /// without retraining.
    ///
    /// # Arguments
    /// * `history`: A raw, cleaned or engineered hourly table, e.g. the
    ///   [`ENGINEERED_CSV`] a cycle wrote. It must carry weather codes; a
    ///   [`FORECAST_CSV`] table does not and is rejected with
    ///   [`DataError::NotHistory`].
    ///
    /// # Returns
    /// The forecast for the hour after the newest history row. Older rows whose
    /// condition the stored encoder never saw do not prevent a forecast.
    pub fn forecast_from_store(&self, history: DataFrame) -> Result<ForecastOutcome, HourcastError> {
        ensure_weather_codes(&history)?;
        let config = &self.config;
        let store = ArtifactStore::open(&config.artifact_dir)?;
        let encoder = store.load_encoder()?;
        let regressor: Artifact<GradientBoostedRegressor> = store.load(TEMPERATURE_MODEL)?;
        let classifier: Artifact<GradientBoostedClassifier> = store.load(CONDITION_MODEL)?;

        let cleaned = Cleaner::new(config.cleaning.clone()).clean(history)?;
        let engineered = FeatureEngineer::new(config.features.rolling_window)
            .engineer_with_encoder(cleaned, &encoder)?;
        Forecaster::new(&regressor, &classifier, &encoder)
            .with_round_decimals(config.round_decimals)
            .forecast_next(&engineered)
    }
}

/// Histories carry weather codes under their raw or canonical name.
fn ensure_weather_codes(history: &DataFrame) -> Result<(), DataError> {
    let present = RAW_COLUMN_MAP
        .iter()
        .filter(|(_, canonical)| *canonical == COL_WEATHER_CODE)
        .any(|(raw, _)| has_column(history, raw))
        || has_column(history, COL_WEATHER_CODE);
    if present {
        Ok(())
    } else {
        Err(DataError::NotHistory(COL_WEATHER_CODE.to_string()))
    }
}
