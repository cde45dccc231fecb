use thiserror::Error;

/// The feature vector presented to a model does not match its schema.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaMismatchError {
    #[error("Feature schema of '{model}' references column '{column}' that is absent from the history")]
    MissingColumn { model: String, column: String },

    #[error("Feature schema of '{0}' is empty")]
    EmptySchema(String),

    #[error("Model expects {expected} features but received {found}")]
    FeatureCount { expected: usize, found: usize },
}
