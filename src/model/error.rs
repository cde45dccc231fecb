use polars::error::PolarsError;
use thiserror::Error;

/// Degenerate training data. Never silently worked around.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("Training set has no rows")]
    EmptyFeatures,

    #[error("Training set has no feature columns")]
    NoFeatureColumns,

    #[error("Feature matrix has {rows} rows but target has {targets} values")]
    LengthMismatch { rows: usize, targets: usize },

    #[error("Feature row {row} has {found} values, schema has {expected} columns")]
    RowWidth {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Non-finite value in feature '{feature}' at row {row}")]
    NonFiniteFeature { feature: String, row: usize },

    #[error("Target column '{0}' contains a missing or non-finite value")]
    InvalidTarget(String),

    #[error("Classification target needs at least 2 distinct classes, found {0}")]
    TooFewClasses(usize),

    #[error("Class code {code} is not known to the label encoder ({classes} classes)")]
    UnknownClass { code: i64, classes: usize },

    #[error("Target column '{0}' not found in training table")]
    MissingTarget(String),

    #[error("Failed preparing training table: {0}")]
    DataFrameProcessing(#[from] PolarsError),
}
