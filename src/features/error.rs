use thiserror::Error;

/// A label or code outside the fitted label encoder's vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Label '{0}' was not seen when the encoder was fitted")]
    UnseenLabel(String),

    #[error("Code {code} is outside the encoder vocabulary of {classes} classes")]
    UnknownCode { code: i64, classes: usize },

    #[error("Cannot fit a label encoder on an empty column")]
    EmptyVocabulary,
}
