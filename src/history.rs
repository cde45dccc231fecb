//! CSV persistence of the history tables handed to downstream consumers.

use crate::cleaning::error::DataError;
use crate::frame::{has_column, put_column, timestamp_series, timestamp_values};
use crate::types::columns::COL_DATE_TIME;
use log::info;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

const CSV_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes `df` as CSV with a header row and `YYYY-MM-DD HH:MM:SS` timestamps.
pub fn write_csv(df: &DataFrame, path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| DataError::Io(parent.to_path_buf(), e))?;
    }
    let mut file = File::create(path).map_err(|e| DataError::Io(path.to_path_buf(), e))?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_datetime_format(Some(CSV_DATETIME_FORMAT.to_string()))
        .finish(&mut df)
        .map_err(|source| DataError::TableWrite {
            path: path.to_path_buf(),
            source,
        })?;
    info!("Wrote {} rows to {}", df.height(), path.display());
    Ok(())
}

/// Reads a history CSV and turns its `date_time` column back into timestamps.
/// Unparseable timestamps become null.
pub fn read_history_csv(path: &Path) -> Result<DataFrame, DataError> {
    let to_err = |source| DataError::HistoryRead {
        path: path.to_path_buf(),
        source,
    };
    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(to_err)?
        .finish()
        .map_err(to_err)?;

    if has_column(&df, COL_DATE_TIME) {
        let timestamps = timestamp_values(&df, COL_DATE_TIME)?;
        put_column(&mut df, timestamp_series(COL_DATE_TIME, &timestamps)?)?;
    }
    Ok(df)
}
