use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("Failed to create artifact directory '{0}'")]
    DirCreation(PathBuf, #[source] std::io::Error),

    #[error("Failed to determine default artifact directory")]
    DirResolution,

    #[error("Artifact '{0}' not found")]
    NotFound(String),

    #[error("Failed to read artifact file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write artifact file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to decode artifact '{0}'")]
    Decode(PathBuf, #[source] Box<bincode::error::DecodeError>),

    #[error("Failed to encode artifact '{0}'")]
    Encode(String, #[source] Box<bincode::error::EncodeError>),

    #[error("Artifact '{name}' has format version {found}, expected {expected}")]
    FormatVersion {
        name: String,
        found: u32,
        expected: u32,
    },

    #[error("Artifact '{name}' holds a {found}, expected a {expected}")]
    KindMismatch {
        name: String,
        found: String,
        expected: String,
    },

    #[error("Artifact target '{0}' is a directory and cannot be replaced")]
    TargetBlocked(PathBuf),

    #[error("Failed to commit artifact '{failed}' after replacing {committed:?}")]
    PartialCommit {
        failed: String,
        committed: Vec<String>,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid artifact name '{0}'")]
    InvalidName(String),
}
