use crate::artifacts::error::ArtifactError;
use crate::cleaning::error::DataError;
use crate::features::error::EncodingError;
use crate::fetch::error::FetchError;
use crate::forecast::error::SchemaMismatchError;
use crate::model::error::TrainingError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HourcastError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatchError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Failed to read config file '{0}'")]
    ConfigRead(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse config file '{0}'")]
    ConfigParse(PathBuf, #[source] serde_json::Error),

    #[error("Failed to create output directory '{0}'")]
    OutputDirCreation(PathBuf, #[source] std::io::Error),
}
