use polars::error::PolarsError;
use thiserror::Error;

/// Missing or malformed input data. Aborts the whole run.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Required column '{0}' not found in table")]
    MissingColumn(String),

    #[error("Table contains no rows")]
    EmptyTable,

    #[error("Column '{column}' has no observed values to impute from")]
    AllMissing { column: String },

    #[error("Column '{column}' has an unparseable value at row {row}")]
    InvalidValue { column: String, row: usize },

    #[error("Timestamp at row {row} does not parse")]
    InvalidTimestamp { row: usize },

    #[error("Table is not an hourly history: column '{0}' is missing (forecast output tables cannot be forecast from)")]
    NotHistory(String),

    #[error("Timestamps are not strictly increasing at row {row}")]
    NotChronological { row: usize },

    #[error("Polars operation failed on column '{column}': {source}")]
    ColumnOperation {
        column: String,
        #[source]
        source: PolarsError,
    },

    #[error("Failed processing DataFrame: {0}")]
    DataFrameProcessing(#[from] PolarsError),

    #[error("Failed to read history file '{path}'")]
    HistoryRead {
        path: std::path::PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("Failed to write table to '{path}'")]
    TableWrite {
        path: std::path::PathBuf,
        #[source]
        source: PolarsError,
    },

    #[error("I/O error on '{0}'")]
    Io(std::path::PathBuf, #[source] std::io::Error),
}
