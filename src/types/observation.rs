//! Row-oriented views of the hourly tables, for building inputs in code and
//! reading cleaned rows back out.

use crate::cleaning::error::DataError;
use crate::frame::{f64_values, has_column, i64_values, str_values, timestamp_series, timestamp_values};
use crate::types::columns::*;
use chrono::NaiveDateTime;
use polars::prelude::*;

/// One hour as delivered by the archive. Any measured field may be missing.
#[derive(Debug, PartialEq, Clone)]
pub struct RawObservation {
    pub timestamp: NaiveDateTime,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub pressure: Option<f64>,
    pub cloud_coverage: Option<f64>,
    pub precipitation: Option<f64>,
    pub weather_code: Option<i64>,
}

impl RawObservation {
    /// An hour with every measured field missing.
    pub fn empty(timestamp: NaiveDateTime) -> Self {
        Self {
            timestamp,
            temperature: None,
            humidity: None,
            wind_speed: None,
            wind_direction: None,
            pressure: None,
            cloud_coverage: None,
            precipitation: None,
            weather_code: None,
        }
    }
}

/// One hour after cleaning: every field present, condition as a label.
#[derive(Debug, PartialEq, Clone)]
pub struct CleanedObservation {
    pub timestamp: NaiveDateTime,
    pub temperature: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub wind_direction: f64,
    pub pressure: f64,
    pub cloud_coverage: f64,
    pub precipitation: f64,
    pub weather_code: i64,
    pub weather_condition: String,
}

/// Builds a table with canonical column names from raw observations.
pub fn observations_to_frame(rows: &[RawObservation]) -> PolarsResult<DataFrame> {
    let timestamps: Vec<Option<NaiveDateTime>> = rows.iter().map(|r| Some(r.timestamp)).collect();
    let float = |name: &str, get: fn(&RawObservation) -> Option<f64>| -> Column {
        Series::new(name.into(), rows.iter().map(get).collect::<Vec<_>>()).into()
    };

    DataFrame::new(vec![
        timestamp_series(COL_DATE_TIME, &timestamps)?.into(),
        float(COL_TEMPERATURE, |r| r.temperature),
        float(COL_HUMIDITY, |r| r.humidity),
        float(COL_WIND_SPEED, |r| r.wind_speed),
        float(COL_WIND_DIRECTION, |r| r.wind_direction),
        float(COL_PRESSURE, |r| r.pressure),
        float(COL_PRECIPITATION, |r| r.precipitation),
        float(COL_CLOUD_COVERAGE, |r| r.cloud_coverage),
        Series::new(
            COL_WEATHER_CODE.into(),
            rows.iter().map(|r| r.weather_code).collect::<Vec<_>>(),
        )
        .into(),
    ])
}

/// Reads the rows of a cleaned table.
///
/// Fails with [`DataError`] if a column is missing or a value is still undefined,
/// so it doubles as a check of the cleaning invariant.
pub fn cleaned_observations(df: &DataFrame) -> Result<Vec<CleanedObservation>, DataError> {
    let timestamps = timestamp_values(df, COL_DATE_TIME)?;
    let temperature = f64_values(df, COL_TEMPERATURE)?;
    let humidity = f64_values(df, COL_HUMIDITY)?;
    let wind_speed = f64_values(df, COL_WIND_SPEED)?;
    let wind_direction = f64_values(df, COL_WIND_DIRECTION)?;
    let pressure = f64_values(df, COL_PRESSURE)?;
    let cloud_coverage = f64_values(df, COL_CLOUD_COVERAGE)?;
    let precipitation = if has_column(df, COL_PRECIPITATION) {
        f64_values(df, COL_PRECIPITATION)?
    } else {
        vec![Some(0.0); df.height()]
    };
    let weather_code = i64_values(df, COL_WEATHER_CODE)?;
    let weather_condition = str_values(df, COL_WEATHER_CONDITION)?;

    let required = |column: &str, row: usize, value: Option<f64>| {
        value.ok_or_else(|| DataError::InvalidValue {
            column: column.to_string(),
            row,
        })
    };

    (0..df.height())
        .map(|row| {
            Ok(CleanedObservation {
                timestamp: timestamps[row].ok_or(DataError::InvalidTimestamp { row })?,
                temperature: required(COL_TEMPERATURE, row, temperature[row])?,
                humidity: required(COL_HUMIDITY, row, humidity[row])?,
                wind_speed: required(COL_WIND_SPEED, row, wind_speed[row])?,
                wind_direction: required(COL_WIND_DIRECTION, row, wind_direction[row])?,
                pressure: required(COL_PRESSURE, row, pressure[row])?,
                cloud_coverage: required(COL_CLOUD_COVERAGE, row, cloud_coverage[row])?,
                precipitation: required(COL_PRECIPITATION, row, precipitation[row])?,
                weather_code: weather_code[row].ok_or_else(|| DataError::InvalidValue {
                    column: COL_WEATHER_CODE.to_string(),
                    row,
                })?,
                weather_condition: weather_condition[row]
                    .clone()
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| DataError::InvalidValue {
                        column: COL_WEATHER_CONDITION.to_string(),
                        row,
                    })?,
            })
        })
        .collect()
}
