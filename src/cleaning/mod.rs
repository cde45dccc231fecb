//! Turns raw hourly archive rows into a cleaned table: canonical column names,
//! weather codes mapped to condition labels, missing values imputed and
//! implausible values replaced. Rows are never dropped.

pub mod error;
pub mod imputation;
pub mod outliers;

use crate::cleaning::error::DataError;
use crate::cleaning::imputation::{constant_fill, ewma_fill, median_fill, mode_fill};
use crate::cleaning::outliers::{out_of_range, replace_outliers};
use crate::config::{CleaningConfig, ColumnBounds};
use crate::frame::{
    get_column, has_column, i64_values, put_column, str_values, timestamp_series,
    timestamp_values,
};
use crate::types::columns::*;
use crate::types::weather_condition::{condition_label, UNKNOWN_CONDITION, UNKNOWN_WEATHER_CODE};
use log::{debug, info, warn};
use polars::prelude::*;

/// Numeric columns every input table must carry (after renaming).
const REQUIRED_NUMERIC: [&str; 6] = [
    COL_TEMPERATURE,
    COL_HUMIDITY,
    COL_WIND_SPEED,
    COL_WIND_DIRECTION,
    COL_PRESSURE,
    COL_CLOUD_COVERAGE,
];

/// Canonical column order of a cleaned table.
const CLEANED_ORDER: [&str; 10] = [
    COL_DATE_TIME,
    COL_TEMPERATURE,
    COL_HUMIDITY,
    COL_WIND_SPEED,
    COL_WIND_DIRECTION,
    COL_PRESSURE,
    COL_PRECIPITATION,
    COL_CLOUD_COVERAGE,
    COL_WEATHER_CODE,
    COL_WEATHER_CONDITION,
];

const EWMA_COLUMNS: [&str; 3] = [COL_TEMPERATURE, COL_HUMIDITY, COL_PRESSURE];
const MEDIAN_FILL_COLUMNS: [&str; 2] = [COL_WIND_SPEED, COL_WIND_DIRECTION];

#[derive(Debug, Clone, Default)]
pub struct Cleaner {
    config: CleaningConfig,
}

impl Cleaner {
    /// Creates a cleaner with the given imputation and outlier settings.
    pub fn new(config: CleaningConfig) -> Self {
        Self { config }
    }

    /// Cleans a raw (or already cleaned) hourly table.
    ///
    /// Accepts both the archive field names (`temperature_2m`, `weathercode`, ...)
    /// and canonical names. Cleaning an already cleaned table changes nothing.
    pub fn clean(&self, raw: DataFrame) -> Result<DataFrame, DataError> {
        if raw.height() == 0 {
            return Err(DataError::EmptyTable);
        }
        let mut df = rename_raw_columns(raw)?;
        for column in std::iter::once(COL_DATE_TIME).chain(REQUIRED_NUMERIC) {
            if !has_column(&df, column) {
                return Err(DataError::MissingColumn(column.to_string()));
            }
        }

        normalize_timestamps(&mut df)?;
        map_weather_codes(&mut df)?;
        let df = self.handle_missing_values(df)?;
        let df = self.handle_outliers(df)?;

        let df = canonical_order(&df)?;
        info!("Cleaned {} hourly rows", df.height());
        Ok(df)
    }

    /// Casts the measured columns to `Float64` and fills their holes, each column
    /// with its own policy.
    fn handle_missing_values(&self, df: DataFrame) -> Result<DataFrame, DataError> {
        for column in std::iter::once(COL_CLOUD_COVERAGE)
            .chain(EWMA_COLUMNS)
            .chain(MEDIAN_FILL_COLUMNS)
        {
            if get_column(&df, column)?.null_count() == df.height() {
                return Err(all_missing(column));
            }
        }

        let measured: Vec<&str> = REQUIRED_NUMERIC
            .into_iter()
            .chain(std::iter::once(COL_PRECIPITATION))
            .filter(|c| has_column(&df, c))
            .collect();
        let casts: Vec<Expr> = measured
            .iter()
            .map(|c| col(*c).cast(DataType::Float64))
            .collect();

        let mut fills = vec![mode_fill(COL_CLOUD_COVERAGE)];
        if has_column(&df, COL_PRECIPITATION) {
            fills.push(constant_fill(COL_PRECIPITATION, 0.0));
        }
        fills.extend(EWMA_COLUMNS.iter().map(|c| ewma_fill(c, self.config.ewma_span)));
        fills.extend(MEDIAN_FILL_COLUMNS.iter().map(|c| median_fill(c)));

        Ok(df.lazy().with_columns(casts).with_columns(fills).collect()?)
    }

    fn handle_outliers(&self, df: DataFrame) -> Result<DataFrame, DataError> {
        let bounds: Vec<&ColumnBounds> = self
            .config
            .outlier_bounds
            .iter()
            .filter(|b| {
                let present = has_column(&df, &b.column);
                if !present {
                    debug!("Skipping outlier check for absent column '{}'", b.column);
                }
                present
            })
            .collect();
        if bounds.is_empty() {
            return Ok(df);
        }

        let counts = df
            .clone()
            .lazy()
            .select(bounds.iter().map(|b| out_of_range(b).sum()).collect::<Vec<_>>())
            .collect()?;
        let mut replacements = Vec::new();
        for b in bounds {
            let replaced = counts
                .column(&b.column)?
                .cast(&DataType::UInt64)?
                .u64()?
                .get(0)
                .unwrap_or(0);
            if replaced > 0 {
                warn!(
                    "Replaced {} out-of-range values in '{}' (valid {}..{})",
                    replaced, b.column, b.min, b.max
                );
                replacements.push(replace_outliers(b));
            }
        }
        if replacements.is_empty() {
            return Ok(df);
        }
        Ok(df.lazy().with_columns(replacements).collect()?)
    }
}

fn all_missing(column: &str) -> DataError {
    DataError::AllMissing {
        column: column.to_string(),
    }
}

fn rename_raw_columns(mut df: DataFrame) -> Result<DataFrame, DataError> {
    for (raw, canonical) in RAW_COLUMN_MAP {
        if raw == canonical || !has_column(&df, raw) {
            continue;
        }
        if has_column(&df, canonical) {
            warn!("Both '{raw}' and '{canonical}' present, dropping '{raw}'");
            df = df.drop(raw)?;
        } else {
            df.rename(raw, canonical.into())?;
        }
    }
    Ok(df)
}

fn normalize_timestamps(df: &mut DataFrame) -> Result<(), DataError> {
    let timestamps = timestamp_values(df, COL_DATE_TIME)?;
    if let Some(row) = timestamps.iter().position(Option::is_none) {
        return Err(DataError::InvalidTimestamp { row });
    }
    put_column(df, timestamp_series(COL_DATE_TIME, &timestamps)?)
}

/// Derives `weather_condition` from `weather_code`. Missing codes become
/// [`UNKNOWN_WEATHER_CODE`]. Tables without codes keep their labels, with
/// gaps labelled [`UNKNOWN_CONDITION`].
fn map_weather_codes(df: &mut DataFrame) -> Result<(), DataError> {
    let labels: Vec<String> = if has_column(df, COL_WEATHER_CODE) {
        let codes: Vec<i64> = i64_values(df, COL_WEATHER_CODE)?
            .into_iter()
            .map(|c| c.unwrap_or(UNKNOWN_WEATHER_CODE))
            .collect();
        let labels = codes
            .iter()
            .map(|code| condition_label(Some(*code)).to_string())
            .collect();
        put_column(df, Series::new(COL_WEATHER_CODE.into(), codes))?;
        labels
    } else if has_column(df, COL_WEATHER_CONDITION) {
        str_values(df, COL_WEATHER_CONDITION)?
            .into_iter()
            .map(|label| {
                label
                    .filter(|l| !l.is_empty())
                    .unwrap_or_else(|| UNKNOWN_CONDITION.to_string())
            })
            .collect()
    } else {
        return Err(DataError::MissingColumn(COL_WEATHER_CODE.to_string()));
    };
    put_column(df, Series::new(COL_WEATHER_CONDITION.into(), labels))
}

/// Canonical columns first, in fixed order, then any extra columns as they came.
fn canonical_order(df: &DataFrame) -> Result<DataFrame, DataError> {
    let mut order: Vec<String> = CLEANED_ORDER
        .iter()
        .filter(|c| has_column(df, c))
        .map(|c| c.to_string())
        .collect();
    for name in df.get_column_names() {
        if !CLEANED_ORDER.contains(&name.as_str()) {
            order.push(name.to_string());
        }
    }
    Ok(df.select(order)?)
}
