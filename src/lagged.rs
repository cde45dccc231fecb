//! Expands an engineered table into a supervised-learning table with fixed-depth
//! lag predictors.

use crate::cleaning::error::DataError;
use crate::frame::timestamp_values;
use crate::types::columns::{lag_column, COL_DATE_TIME, COL_TEMPERATURE, COL_WEATHER_CODE};
use log::info;
use polars::prelude::*;

#[derive(Debug, Clone)]
pub struct LaggedDatasetBuilder {
    lags: usize,
}

impl Default for LaggedDatasetBuilder {
    fn default() -> Self {
        Self { lags: 24 }
    }
}

impl LaggedDatasetBuilder {
    pub fn new(lags: usize) -> Self {
        Self { lags }
    }

    pub fn lags(&self) -> usize {
        self.lags
    }

    /// Adds `temperature_lag_i` and `weather_code_lag_i` for `i` in `1..=lags`,
    /// then drops every row that still holds an undefined value.
    ///
    /// The input must be strictly increasing in `date_time`. Rows whose lag window
    /// reaches before the start of history are dropped, never backfilled.
    pub fn build_lagged(&self, engineered: DataFrame) -> Result<DataFrame, DataError> {
        ensure_chronological(&engineered)?;
        let input_rows = engineered.height();

        let lags: Vec<Expr> = (1..=self.lags)
            .flat_map(|step| {
                let offset = lit(step as i64);
                [
                    col(COL_TEMPERATURE)
                        .cast(DataType::Float64)
                        .shift(offset.clone())
                        .alias(lag_column(COL_TEMPERATURE, step)),
                    col(COL_WEATHER_CODE)
                        .cast(DataType::Int64)
                        .shift(offset)
                        .alias(lag_column(COL_WEATHER_CODE, step)),
                ]
            })
            .collect();

        let lagged = engineered
            .lazy()
            .with_columns(lags)
            .drop_nulls(None)
            .collect()?;
        info!(
            "Built lagged dataset with {} lags: {} of {} rows kept",
            self.lags,
            lagged.height(),
            input_rows
        );
        Ok(lagged)
    }
}

fn ensure_chronological(df: &DataFrame) -> Result<(), DataError> {
    let timestamps = timestamp_values(df, COL_DATE_TIME)?;
    let mut previous = None;
    for (row, ts) in timestamps.into_iter().enumerate() {
        let ts = ts.ok_or(DataError::InvalidTimestamp { row })?;
        if previous.is_some_and(|p| p >= ts) {
            return Err(DataError::NotChronological { row });
        }
        previous = Some(ts);
    }
    Ok(())
}
