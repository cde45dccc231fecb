//! Recursive one-step-ahead forecasting.
//!
//! The newest history row has no lag predictors yet, so the feature vector for
//! the next hour is rebuilt from the latest engineered row, column by column, in
//! the order each model's schema dictates.

use crate::artifacts::store::{Artifact, CONDITION_MODEL, TEMPERATURE_MODEL};
use crate::cleaning::error::DataError;
use crate::error::HourcastError;
use crate::features::label_encoder::LabelEncoder;
use crate::forecast::error::SchemaMismatchError;
use crate::frame::{f64_values, get_column, has_column, is_numeric, str_values, timestamp_series, timestamp_values};
use crate::model::booster::{GradientBoostedClassifier, GradientBoostedRegressor};
use crate::types::columns::*;
use crate::types::feature_schema::FeatureSchema;
use chrono::{Duration, NaiveDateTime};
use log::{debug, info, warn};
use polars::prelude::*;

/// The history extended by one forecast row, plus what went into the forecast.
#[derive(Debug, Clone)]
pub struct ForecastOutcome {
    /// History plus the forecast row, in [`FORECAST_OUTPUT_COLUMNS`] order.
    pub table: DataFrame,
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    /// Reconstructed classifier input for the forecast hour. The classifier is
    /// not run, so the forecast row's `weather_condition` stays unset.
    pub condition_features: Vec<f64>,
}

pub struct Forecaster<'a> {
    regressor: &'a Artifact<GradientBoostedRegressor>,
    classifier: &'a Artifact<GradientBoostedClassifier>,
    encoder: &'a LabelEncoder,
    round_decimals: u32,
}

impl<'a> Forecaster<'a> {
    pub fn new(
        regressor: &'a Artifact<GradientBoostedRegressor>,
        classifier: &'a Artifact<GradientBoostedClassifier>,
        encoder: &'a LabelEncoder,
    ) -> Self {
        Self {
            regressor,
            classifier,
            encoder,
            round_decimals: 4,
        }
    }

    pub fn with_round_decimals(mut self, round_decimals: u32) -> Self {
        self.round_decimals = round_decimals;
        self
    }

    /// Predicts the temperature of the hour after the last history row and appends
    /// that row to the history.
    ///
    /// `history` is the engineered but not lagged table. Lag columns the schemas
    /// name cannot exist for the newest row and are filled with zero; any other
    /// column a schema names must be present. Only the newest row's
    /// `weather_condition` has to be known to the encoder.
    ///
    /// # Errors
    /// [`DataError`] for an empty history or a bad newest timestamp,
    /// [`SchemaMismatchError`] for a missing column and
    /// [`EncodingError`](crate::EncodingError) for an unseen newest condition.
    pub fn forecast_next(&self, history: &DataFrame) -> Result<ForecastOutcome, HourcastError> {
        let latest = history
            .height()
            .checked_sub(1)
            .ok_or(DataError::EmptyTable)?;
        let last_timestamp = timestamp_values(history, COL_DATE_TIME)?[latest]
            .ok_or(DataError::InvalidTimestamp { row: latest })?;
        let next_timestamp = last_timestamp + Duration::hours(1);

        let condition_code = self.encode_condition(history, latest)?;
        let regression_features = self.reconstruct(
            history,
            latest,
            &self.regressor.schema,
            TEMPERATURE_MODEL,
            condition_code,
        )?;
        let condition_features = self.reconstruct(
            history,
            latest,
            &self.classifier.schema,
            CONDITION_MODEL,
            condition_code,
        )?;

        let temperature = self.regressor.model.predict(&regression_features)?;
        info!(
            "Forecast for {}: temperature {:.2}",
            next_timestamp, temperature
        );

        let table = self.extend_history(history, next_timestamp, temperature)?;
        let temperature = forecast_temperature(&table, next_timestamp)?;
        Ok(ForecastOutcome {
            table,
            timestamp: next_timestamp,
            temperature,
            condition_features,
        })
    }

    /// Encodes the condition of row `row`, if either schema uses it.
    fn encode_condition(&self, history: &DataFrame, row: usize) -> Result<Option<f64>, HourcastError> {
        let needed = [&self.regressor.schema, &self.classifier.schema].iter().any(|schema| {
            schema.contains(COL_WEATHER_CONDITION) || schema.contains(COL_WEATHER_CONDITION_ENCODED)
        });
        if !needed {
            return Ok(None);
        }
        let label = str_values(history, COL_WEATHER_CONDITION)?[row]
            .clone()
            .ok_or_else(|| DataError::InvalidValue {
                column: COL_WEATHER_CONDITION.to_string(),
                row,
            })?;
        Ok(Some(self.encoder.transform(&label)? as f64))
    }

    /// Selects the schema's columns, in order, from row `row`.
    fn reconstruct(
        &self,
        history: &DataFrame,
        row: usize,
        schema: &FeatureSchema,
        model: &str,
        condition_code: Option<f64>,
    ) -> Result<Vec<f64>, HourcastError> {
        if schema.is_empty() {
            return Err(SchemaMismatchError::EmptySchema(model.to_string()).into());
        }

        let mut features = Vec::with_capacity(schema.len());
        let mut zero_filled = Vec::new();
        for name in schema.columns() {
            if !has_column(history, name) {
                if parse_lag_column(name).is_none() {
                    return Err(SchemaMismatchError::MissingColumn {
                        model: model.to_string(),
                        column: name.clone(),
                    }
                    .into());
                }
                zero_filled.push(name.as_str());
                features.push(0.0);
                continue;
            }

            // both models see the condition through the encoder's codes
            let value = if name == COL_WEATHER_CONDITION || name == COL_WEATHER_CONDITION_ENCODED {
                condition_code
            } else if is_numeric(get_column(history, name)?.dtype()) {
                f64_values(history, name)?[row]
            } else {
                None
            };
            if value.is_none() {
                zero_filled.push(name.as_str());
            }
            features.push(value.unwrap_or(0.0));
        }

        if !zero_filled.is_empty() {
            warn!(
                "Zero-filled {} of {} features for '{}'",
                zero_filled.len(),
                schema.len(),
                model
            );
            debug!("Zero-filled features for '{}': {:?}", model, zero_filled);
        }
        Ok(features)
    }

    /// Appends the forecast row, drops rows without a valid timestamp, keeps the
    /// last row per timestamp and rounds the measured columns.
    fn extend_history(
        &self,
        history: &DataFrame,
        timestamp: NaiveDateTime,
        temperature: f64,
    ) -> Result<DataFrame, DataError> {
        let output_columns: Vec<Expr> = FORECAST_OUTPUT_COLUMNS
            .iter()
            .map(|name| match *name {
                COL_DATE_TIME => col(*name).cast(DataType::Datetime(TimeUnit::Milliseconds, None)),
                COL_WEATHER_CONDITION => col(*name).cast(DataType::String),
                _ => col(*name).cast(DataType::Float64),
            })
            .collect();
        let rounded: Vec<Expr> = FORECAST_OUTPUT_COLUMNS
            .iter()
            .filter(|name| **name != COL_DATE_TIME && **name != COL_WEATHER_CONDITION)
            .map(|name| col(*name).round(self.round_decimals))
            .collect();

        let forecast_row = forecast_row(timestamp, temperature)?;
        let extended = concat(
            [history.clone().lazy().select(output_columns), forecast_row.lazy()],
            UnionArgs::default(),
        )?
        .filter(col(COL_DATE_TIME).is_not_null())
        .unique_stable(Some(vec![COL_DATE_TIME.into()]), UniqueKeepStrategy::Last)
        .with_columns(rounded)
        .collect()?;
        Ok(extended)
    }
}

/// One row in [`FORECAST_OUTPUT_COLUMNS`] order: the forecast temperature, all
/// other covariates unset.
fn forecast_row(timestamp: NaiveDateTime, temperature: f64) -> Result<DataFrame, DataError> {
    let columns = FORECAST_OUTPUT_COLUMNS
        .iter()
        .map(|name| -> PolarsResult<Column> {
            let series = match *name {
                COL_DATE_TIME => timestamp_series(name, &[Some(timestamp)])?,
                COL_TEMPERATURE => Series::new((*name).into(), [temperature]),
                COL_WEATHER_CONDITION => Series::full_null((*name).into(), 1, &DataType::String),
                _ => Series::full_null((*name).into(), 1, &DataType::Float64),
            };
            Ok(series.into())
        })
        .collect::<PolarsResult<Vec<_>>>()?;
    Ok(DataFrame::new(columns)?)
}

/// Reads the (rounded) temperature of the forecast row back out of the table.
fn forecast_temperature(table: &DataFrame, timestamp: NaiveDateTime) -> Result<f64, DataError> {
    let row = timestamp_values(table, COL_DATE_TIME)?
        .iter()
        .rposition(|ts| *ts == Some(timestamp))
        .ok_or(DataError::InvalidTimestamp { row: table.height() })?;
    f64_values(table, COL_TEMPERATURE)?[row].ok_or_else(|| DataError::InvalidValue {
        column: COL_TEMPERATURE.to_string(),
        row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaning::Cleaner;
    use crate::features::error::EncodingError;
    use crate::features::FeatureEngineer;
    use crate::frame::put_column;
    use crate::lagged::LaggedDatasetBuilder;
    use crate::model::booster::BoostingParams;
    use crate::model::trainer::ModelTrainer;
    use crate::test_support::{hour, synthetic_raw};
    use crate::types::observation::{observations_to_frame, RawObservation};
    use std::sync::Arc;

    struct Trained {
        regressor: Artifact<GradientBoostedRegressor>,
        classifier: Artifact<GradientBoostedClassifier>,
        encoder: LabelEncoder,
    }

    fn trained() -> Trained {
        let cleaned = Cleaner::default().clean(synthetic_raw(72)).unwrap();
        let (engineered, encoder) = FeatureEngineer::default().engineer(cleaned).unwrap();
        let lagged = LaggedDatasetBuilder::new(24).build_lagged(engineered).unwrap();
        let trainer = ModelTrainer::new(BoostingParams {
            n_estimators: 10,
            max_depth: 3,
            ..BoostingParams::default()
        });

        let (x, y) = trainer.prepare_regression(&lagged).unwrap();
        let regressor = Artifact::new(trainer.train_regression(&x, &y).unwrap(), x.schema().clone());
        let encoder_ref = Arc::new(encoder.clone());
        let (x, y) = trainer.prepare_classification(&lagged, &encoder).unwrap();
        let (classifier, _) = trainer.train_classification(&x, &y, &encoder_ref).unwrap();
        let classifier = Artifact::new(classifier, x.schema().clone());
        Trained {
            regressor,
            classifier,
            encoder,
        }
    }

    fn three_hour_history(encoder: &LabelEncoder) -> DataFrame {
        history_with(encoder, &[20.0, 21.0, 22.0])
    }

    fn history_with(encoder: &LabelEncoder, temperatures: &[f64]) -> DataFrame {
        let rows: Vec<RawObservation> = temperatures
            .iter()
            .enumerate()
            .map(|(i, temperature)| RawObservation {
                timestamp: hour(i as i64),
                temperature: Some(*temperature),
                humidity: Some(50.0),
                wind_speed: Some(4.0),
                wind_direction: Some(200.0),
                pressure: Some(1008.0),
                cloud_coverage: Some(80.0),
                precipitation: Some(0.0),
                weather_code: Some(3),
            })
            .collect();
        let cleaned = Cleaner::default()
            .clean(observations_to_frame(&rows).unwrap())
            .unwrap();
        FeatureEngineer::default()
            .engineer_with_encoder(cleaned, encoder)
            .unwrap()
    }

    #[test]
    fn appends_one_row_for_the_next_hour() -> Result<(), Box<dyn std::error::Error>> {
        let t = trained();
        let history = three_hour_history(&t.encoder);
        let outcome = Forecaster::new(&t.regressor, &t.classifier, &t.encoder).forecast_next(&history)?;
        let table = &outcome.table;

        let names: Vec<String> = table.get_column_names().iter().map(|c| c.to_string()).collect();
        assert_eq!(names, FORECAST_OUTPUT_COLUMNS);
        assert_eq!(table.height(), 4);
        assert_eq!(outcome.timestamp, hour(3));
        assert_eq!(timestamp_values(table, COL_DATE_TIME)?[3], Some(hour(3)));

        let temperature = table.column(COL_TEMPERATURE)?.f64()?.get(3);
        assert_eq!(temperature, Some(outcome.temperature));
        assert!(outcome.temperature.is_finite());
        for name in [COL_HUMIDITY, COL_WIND_SPEED, COL_WIND_DIRECTION, COL_PRESSURE, COL_CLOUD_COVERAGE] {
            assert_eq!(table.column(name)?.f64()?.get(3), None, "{name}");
        }
        assert_eq!(table.column(COL_WEATHER_CONDITION)?.str()?.get(3), None);
        assert_eq!(table.column(COL_TEMPERATURE)?.f64()?.get(0), Some(20.0));
        assert_eq!(outcome.condition_features.len(), t.classifier.schema.len());
        Ok(())
    }

    #[test]
    fn unseen_condition_is_an_encoding_error() -> Result<(), Box<dyn std::error::Error>> {
        let t = trained();
        let mut history = three_hour_history(&t.encoder);
        let labels = vec!["Overcast", "Overcast", "Thunderstorm"];
        put_column(&mut history, Series::new(COL_WEATHER_CONDITION.into(), labels))?;

        let err = Forecaster::new(&t.regressor, &t.classifier, &t.encoder)
            .forecast_next(&history)
            .unwrap_err();
        assert!(matches!(
            err,
            HourcastError::Encoding(EncodingError::UnseenLabel(label)) if label == "Thunderstorm"
        ));
        Ok(())
    }

    #[test]
    fn absent_non_lag_column_is_a_schema_mismatch() -> Result<(), Box<dyn std::error::Error>> {
        let t = trained();
        let history = three_hour_history(&t.encoder).drop(COL_HOUR_SIN)?;
        let err = Forecaster::new(&t.regressor, &t.classifier, &t.encoder)
            .forecast_next(&history)
            .unwrap_err();
        assert!(matches!(
            err,
            HourcastError::SchemaMismatch(SchemaMismatchError::MissingColumn { column, .. })
                if column == COL_HOUR_SIN
        ));
        Ok(())
    }

    #[test]
    fn empty_history_fails() {
        let t = trained();
        let history = three_hour_history(&t.encoder).head(Some(0));
        assert!(matches!(
            Forecaster::new(&t.regressor, &t.classifier, &t.encoder).forecast_next(&history),
            Err(HourcastError::Data(DataError::EmptyTable))
        ));
    }

    #[test]
    fn floats_are_rounded() -> Result<(), Box<dyn std::error::Error>> {
        let t = trained();
        let mut history = three_hour_history(&t.encoder);
        put_column(
            &mut history,
            Series::new(COL_HUMIDITY.into(), vec![50.123456, 50.0, 49.99999]),
        )?;
        let outcome = Forecaster::new(&t.regressor, &t.classifier, &t.encoder)
            .with_round_decimals(2)
            .forecast_next(&history)?;
        let humidity: Vec<Option<f64>> = outcome.table.column(COL_HUMIDITY)?.f64()?.into_iter().collect();
        assert_eq!(humidity, vec![Some(50.12), Some(50.0), Some(50.0), None]);
        Ok(())
    }

    #[test]
    fn duplicate_timestamps_keep_the_last_row() -> Result<(), Box<dyn std::error::Error>> {
        let t = trained();
        let mut history = history_with(&t.encoder, &[20.0, 21.0, 22.0, 23.0, 24.0]);
        let timestamps = [Some(hour(0)), None, Some(hour(1)), Some(hour(1)), Some(hour(2))];
        put_column(&mut history, timestamp_series(COL_DATE_TIME, &timestamps)?)?;
        put_column(
            &mut history,
            Series::new(COL_HUMIDITY.into(), vec![50.0, 51.0, 52.0, 53.0, 54.0]),
        )?;

        let outcome = Forecaster::new(&t.regressor, &t.classifier, &t.encoder).forecast_next(&history)?;
        let table = &outcome.table;
        assert_eq!(
            timestamp_values(table, COL_DATE_TIME)?,
            vec![Some(hour(0)), Some(hour(1)), Some(hour(2)), Some(hour(3))]
        );
        let humidity: Vec<Option<f64>> = table.column(COL_HUMIDITY)?.f64()?.into_iter().collect();
        assert_eq!(humidity, vec![Some(50.0), Some(53.0), Some(54.0), None]);
        Ok(())
    }

    #[test]
    fn unseen_condition_in_older_rows_is_tolerated() -> Result<(), Box<dyn std::error::Error>> {
        let t = trained();
        let mut history = three_hour_history(&t.encoder);
        let labels = vec!["Thunderstorm", "Overcast", "Overcast"];
        put_column(&mut history, Series::new(COL_WEATHER_CONDITION.into(), labels))?;

        let outcome = Forecaster::new(&t.regressor, &t.classifier, &t.encoder).forecast_next(&history)?;
        assert_eq!(outcome.table.height(), 4);
        let condition = t.classifier.schema.position(COL_WEATHER_CONDITION).unwrap();
        assert_eq!(
            outcome.condition_features[condition],
            t.encoder.transform("Overcast")? as f64
        );
        Ok(())
    }
}
