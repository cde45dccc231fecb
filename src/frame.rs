//! Column access helpers shared by the pipeline stages.
//!
//! Table transformations are polars expressions inside each stage; these
//! helpers only read single values back out (feature vectors, row views) and
//! coerce timestamp columns that arrive as text.

use crate::cleaning::error::DataError;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;

/// Formats accepted when a timestamp column arrives as text.
const TIMESTAMP_FORMATS: [&str; 6] = [
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
];

/// Retrieves a column by name from a DataFrame.
pub(crate) fn get_column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, DataError> {
    df.column(name)
        .map_err(|_| DataError::MissingColumn(name.to_string()))
}

pub(crate) fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

pub(crate) fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Reads a numeric column as `f64` values. NaN is treated as missing.
pub(crate) fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, DataError> {
    let column = get_column(df, name)?;
    column_f64_values(column).map_err(|source| DataError::ColumnOperation {
        column: name.to_string(),
        source,
    })
}

pub(crate) fn column_f64_values(column: &Column) -> PolarsResult<Vec<Option<f64>>> {
    let cast = column.cast(&DataType::Float64)?;
    let values = cast
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect();
    Ok(values)
}

pub(crate) fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<Option<i64>>, DataError> {
    let column = get_column(df, name)?;
    let to_err = |source| DataError::ColumnOperation {
        column: name.to_string(),
        source,
    };
    let cast = column.cast(&DataType::Int64).map_err(to_err)?;
    let values = cast.i64().map_err(to_err)?.into_iter().collect();
    Ok(values)
}

pub(crate) fn str_values(df: &DataFrame, name: &str) -> Result<Vec<Option<String>>, DataError> {
    let column = get_column(df, name)?;
    let to_err = |source| DataError::ColumnOperation {
        column: name.to_string(),
        source,
    };
    let cast = column.cast(&DataType::String).map_err(to_err)?;
    let values = cast
        .str()
        .map_err(to_err)?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect();
    Ok(values)
}

/// Reads a timestamp column, coercing text and date columns to `NaiveDateTime`.
/// Values that fail to parse come back as `None`.
pub(crate) fn timestamp_values(
    df: &DataFrame,
    name: &str,
) -> Result<Vec<Option<NaiveDateTime>>, DataError> {
    let column = get_column(df, name)?;
    let to_err = |source| DataError::ColumnOperation {
        column: name.to_string(),
        source,
    };
    let values = match column.dtype() {
        DataType::Datetime(unit, _) => {
            let unit = *unit;
            column
                .datetime()
                .map_err(to_err)?
                .into_iter()
                .map(|v| v.and_then(|v| timestamp_to_naive(v, unit)))
                .collect()
        }
        DataType::Date => column
            .date()
            .map_err(to_err)?
            .into_iter()
            .map(|v| v.and_then(days_to_naive))
            .collect(),
        _ => {
            let cast = column.cast(&DataType::String).map_err(to_err)?;
            cast.str()
                .map_err(to_err)?
                .into_iter()
                .map(|v| v.and_then(parse_timestamp))
                .collect()
        }
    };
    Ok(values)
}

pub(crate) fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn timestamp_to_naive(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let datetime = match unit {
        TimeUnit::Milliseconds => DateTime::from_timestamp_millis(value),
        TimeUnit::Microseconds => DateTime::from_timestamp_micros(value),
        TimeUnit::Nanoseconds => Some(DateTime::from_timestamp_nanos(value)),
    };
    datetime.map(|d| d.naive_utc())
}

fn days_to_naive(days: i32) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(i64::from(days) * 86_400, 0).map(|d| d.naive_utc())
}

/// Builds a millisecond `Datetime` Series from optional timestamps.
pub(crate) fn timestamp_series(
    name: &str,
    values: &[Option<NaiveDateTime>],
) -> PolarsResult<Series> {
    let millis: Vec<Option<i64>> = values
        .iter()
        .map(|v| v.map(|dt| dt.and_utc().timestamp_millis()))
        .collect();
    Series::new(name.into(), millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
}

/// Replaces (or appends) a column in place.
pub(crate) fn put_column(df: &mut DataFrame, series: Series) -> Result<(), DataError> {
    let name = series.name().to_string();
    df.with_column(series)
        .map_err(|source| DataError::ColumnOperation {
            column: name,
            source,
        })?;
    Ok(())
}
