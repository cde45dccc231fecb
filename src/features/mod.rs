//! Adds time-aware features to a cleaned table: the encoded weather condition,
//! cyclical hour/day-of-week encodings and trailing rolling means.

pub mod cyclical;
pub mod error;
pub mod label_encoder;

use crate::cleaning::error::DataError;
use crate::error::HourcastError;
use crate::features::cyclical::{cyclical_encode, day_of_week, hour_of_day, DAYS_PER_WEEK, HOURS_PER_DAY};
use crate::features::label_encoder::LabelEncoder;
use crate::frame::{put_column, str_values, timestamp_series, timestamp_values};
use crate::types::columns::*;
use log::{debug, info, warn};
use polars::prelude::*;

#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    rolling_window: usize,
}

impl Default for FeatureEngineer {
    fn default() -> Self {
        Self { rolling_window: 3 }
    }
}

impl FeatureEngineer {
    /// Creates an engineer whose rolling means span `rolling_window` hours.
    pub fn new(rolling_window: usize) -> Self {
        Self {
            rolling_window: rolling_window.max(1),
        }
    }

    /// Fits a label encoder on the table's `weather_condition` column and adds
    /// every engineered feature. The encoder is returned so it can be persisted
    /// and reused; it must not be refitted at inference time.
    pub fn engineer(&self, cleaned: DataFrame) -> Result<(DataFrame, LabelEncoder), HourcastError> {
        let labels = condition_labels(&cleaned)?;
        let encoder = LabelEncoder::fit(&labels)?;
        info!(
            "Fitted label encoder with {} weather conditions",
            encoder.len()
        );
        let engineered = self.engineer_with_encoder(cleaned, &encoder)?;
        Ok((engineered, encoder))
    }

    /// Adds the engineered features using an already fitted encoder.
    ///
    /// Rows whose condition the encoder was never fitted on keep an undefined
    /// `weather_condition_encoded`; whether that matters is up to the consumer
    /// (the forecaster only requires the newest row to encode).
    ///
    /// # Arguments
    /// * `cleaned`: A table as produced by [`Cleaner::clean`](crate::Cleaner::clean).
    /// * `encoder`: The encoder fitted when the models were trained.
    ///
    /// # Returns
    /// The input columns plus the encoded condition, calendar features and the
    /// trailing rolling means.
    pub fn engineer_with_encoder(
        &self,
        cleaned: DataFrame,
        encoder: &LabelEncoder,
    ) -> Result<DataFrame, HourcastError> {
        let mut df = cleaned;

        let codes: Vec<Option<i64>> = condition_labels(&df)?
            .iter()
            .map(|label| encoder.transform(label).ok())
            .collect();
        let unseen = codes.iter().filter(|code| code.is_none()).count();
        if unseen > 0 {
            warn!("{} rows carry a weather condition the encoder was not fitted on", unseen);
        }
        put_column(&mut df, Series::new(COL_WEATHER_CONDITION_ENCODED.into(), codes))?;
        ensure_timestamps(&mut df)?;

        let df = df
            .lazy()
            .with_columns(time_features())
            .with_columns(self.rolling_features())
            .collect()
            .map_err(DataError::from)?;
        debug!("Engineered table has {} columns", df.width());
        Ok(df)
    }

    fn rolling_features(&self) -> Vec<Expr> {
        let window = self.rolling_window;
        ROLLING_COLUMNS
            .iter()
            .map(|column| {
                col(*column)
                    .cast(DataType::Float64)
                    .rolling_mean(RollingOptionsFixedWindow {
                        window_size: window,
                        min_periods: window,
                        weights: None,
                        center: false,
                        fn_params: None,
                    })
                    .alias(rolling_mean_column(column, window))
            })
            .collect()
    }
}

fn condition_labels(df: &DataFrame) -> Result<Vec<String>, DataError> {
    str_values(df, COL_WEATHER_CONDITION)?
        .into_iter()
        .enumerate()
        .map(|(row, label)| {
            label.ok_or_else(|| DataError::InvalidValue {
                column: COL_WEATHER_CONDITION.to_string(),
                row,
            })
        })
        .collect()
}

/// Rejects undefined timestamps and stores the column as `Datetime`.
fn ensure_timestamps(df: &mut DataFrame) -> Result<(), DataError> {
    let timestamps = timestamp_values(df, COL_DATE_TIME)?;
    if let Some(row) = timestamps.iter().position(Option::is_none) {
        return Err(DataError::InvalidTimestamp { row });
    }
    put_column(df, timestamp_series(COL_DATE_TIME, &timestamps)?)
}

fn time_features() -> Vec<Expr> {
    let hour = hour_of_day(col(COL_DATE_TIME));
    let day = day_of_week(col(COL_DATE_TIME));
    let [hour_sin, hour_cos] = cyclical_encode(hour.clone(), HOURS_PER_DAY);
    let [day_sin, day_cos] = cyclical_encode(day.clone(), DAYS_PER_WEEK);
    vec![
        hour.alias(COL_HOUR),
        day.alias(COL_DAY_OF_WEEK),
        hour_sin.alias(COL_HOUR_SIN),
        hour_cos.alias(COL_HOUR_COS),
        day_sin.alias(COL_DAY_OF_WEEK_SIN),
        day_cos.alias(COL_DAY_OF_WEEK_COS),
    ]
}
