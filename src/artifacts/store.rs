//! Durable storage of trained models paired with their feature schemas.
//!
//! Each artifact is one bincode file `<dir>/<name>.bin` holding a header
//! (format version, kind, name, save time), the ordered feature schema and the
//! model itself. Files are written to a temporary file in the same directory and
//! renamed into place, so readers never observe a half-written artifact.

use crate::artifacts::error::ArtifactError;
use crate::features::label_encoder::LabelEncoder;
use crate::model::booster::{GradientBoostedClassifier, GradientBoostedRegressor};
use crate::types::feature_schema::FeatureSchema;
use bincode::config::{Configuration, Fixint, LittleEndian};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const FORMAT_VERSION: u32 = 1;
const FILE_EXTENSION: &str = "bin";
const BINCODE_CONFIG: Configuration<LittleEndian, Fixint> =
    bincode::config::standard().with_fixed_int_encoding();

pub const TEMPERATURE_MODEL: &str = "temperature_model";
pub const CONDITION_MODEL: &str = "condition_model";
pub const LABEL_ENCODER: &str = "label_encoder";

/// Anything the store can persist. `KIND` is recorded in the file header and
/// checked on load.
pub trait ArtifactKind: Serialize + DeserializeOwned {
    const KIND: &'static str;
}

impl ArtifactKind for GradientBoostedRegressor {
    const KIND: &'static str = "regressor";
}

impl ArtifactKind for GradientBoostedClassifier {
    const KIND: &'static str = "classifier";
}

impl ArtifactKind for LabelEncoder {
    const KIND: &'static str = "label_encoder";
}

/// A model together with the exact ordered feature list it was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact<M> {
    pub model: M,
    pub schema: FeatureSchema,
}

impl<M> Artifact<M> {
    pub fn new(model: M, schema: FeatureSchema) -> Self {
        Self { model, schema }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    format_version: u32,
    kind: String,
    name: String,
    saved_at: DateTime<Utc>,
}

#[derive(Serialize)]
struct EnvelopeRef<'a, M> {
    header: Header,
    schema: &'a FeatureSchema,
    model: &'a M,
}

#[derive(Deserialize)]
struct Envelope<M> {
    #[allow(dead_code)]
    header: Header,
    schema: FeatureSchema,
    model: M,
}

/// An encoded artifact written to a temporary file but not yet visible under its name.
#[derive(Debug)]
pub struct StagedArtifact {
    name: String,
    file: NamedTempFile,
    target: PathBuf,
}

impl StagedArtifact {
    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// Opens (and creates if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, ArtifactError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|e| ArtifactError::DirCreation(dir.clone(), e))?;
        Ok(Self { dir })
    }

    /// The directory artifacts are stored in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Saves a model and its schema under `name`, replacing any previous artifact.
    pub fn save<M: ArtifactKind>(
        &self,
        name: &str,
        model: &M,
        schema: &FeatureSchema,
    ) -> Result<(), ArtifactError> {
        let staged = self.stage(name, model, schema)?;
        self.commit(vec![staged])
    }

    /// Loads a model and its schema. Both always come back together.
    pub fn load<M: ArtifactKind>(&self, name: &str) -> Result<Artifact<M>, ArtifactError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Err(ArtifactError::NotFound(name.to_string()));
        }
        let bytes = std::fs::read(&path).map_err(|e| ArtifactError::Read(path.clone(), e))?;

        let (header, _) = bincode::serde::decode_from_slice::<Header, _>(&bytes, BINCODE_CONFIG)
            .map_err(|e| ArtifactError::Decode(path.clone(), Box::new(e)))?;
        if header.format_version != FORMAT_VERSION {
            return Err(ArtifactError::FormatVersion {
                name: name.to_string(),
                found: header.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if header.kind != M::KIND {
            return Err(ArtifactError::KindMismatch {
                name: name.to_string(),
                found: header.kind,
                expected: M::KIND.to_string(),
            });
        }

        let (envelope, _) = bincode::serde::decode_from_slice::<Envelope<M>, _>(&bytes, BINCODE_CONFIG)
            .map_err(|e| ArtifactError::Decode(path.clone(), Box::new(e)))?;
        debug!(
            "Loaded {} '{}' saved at {} ({} bytes)",
            M::KIND,
            name,
            header.saved_at,
            bytes.len()
        );
        Ok(Artifact::new(envelope.model, envelope.schema))
    }

    pub fn save_encoder(&self, encoder: &LabelEncoder) -> Result<(), ArtifactError> {
        self.save(LABEL_ENCODER, encoder, &FeatureSchema::default())
    }

    pub fn load_encoder(&self) -> Result<LabelEncoder, ArtifactError> {
        Ok(self.load::<LabelEncoder>(LABEL_ENCODER)?.model)
    }

    /// Encodes an artifact into a temporary file next to its final location.
    /// Nothing is visible under `name` until [`commit`](Self::commit).
    pub fn stage<M: ArtifactKind>(
        &self,
        name: &str,
        model: &M,
        schema: &FeatureSchema,
    ) -> Result<StagedArtifact, ArtifactError> {
        let target = self.path_for(name)?;
        let envelope = EnvelopeRef {
            header: Header {
                format_version: FORMAT_VERSION,
                kind: M::KIND.to_string(),
                name: name.to_string(),
                saved_at: Utc::now(),
            },
            schema,
            model,
        };
        let bytes = bincode::serde::encode_to_vec(&envelope, BINCODE_CONFIG)
            .map_err(|e| ArtifactError::Encode(name.to_string(), Box::new(e)))?;

        let mut file =
            NamedTempFile::new_in(&self.dir).map_err(|e| ArtifactError::Write(target.clone(), e))?;
        file.write_all(&bytes)
            .and_then(|_| file.flush())
            .map_err(|e| ArtifactError::Write(target.clone(), e))?;
        debug!("Staged {} '{}' ({} bytes)", M::KIND, name, bytes.len());

        Ok(StagedArtifact {
            name: name.to_string(),
            file,
            target,
        })
    }

    /// Renames every staged artifact into place. Stage the whole batch first so an
    /// encode failure leaves all previous artifacts untouched.
    ///
    /// Targets are checked before the first rename; a target that cannot be
    /// replaced fails the batch with nothing committed. A rename failing after
    /// that is reported as [`ArtifactError::PartialCommit`] naming what was
    /// already replaced.
    pub fn commit(&self, staged: Vec<StagedArtifact>) -> Result<(), ArtifactError> {
        if let Some(blocked) = staged.iter().find(|artifact| artifact.target.is_dir()) {
            return Err(ArtifactError::TargetBlocked(blocked.target.clone()));
        }

        let mut committed: Vec<String> = Vec::with_capacity(staged.len());
        for artifact in staged {
            if let Err(e) = artifact.file.persist(&artifact.target) {
                if committed.is_empty() {
                    return Err(ArtifactError::Write(artifact.target, e.error));
                }
                error!(
                    "Committing '{}' failed after {:?} were already replaced",
                    artifact.name, committed
                );
                return Err(ArtifactError::PartialCommit {
                    failed: artifact.name,
                    committed,
                    source: e.error,
                });
            }
            info!(
                "Saved artifact '{}' to {}",
                artifact.name,
                artifact.target.display()
            );
            committed.push(artifact.name);
        }
        Ok(())
    }

    pub fn exists(&self, name: &str) -> bool {
        self.path_for(name).is_ok_and(|path| path.exists())
    }

    /// Deletes an artifact. Returns whether it existed.
    pub fn remove(&self, name: &str) -> Result<bool, ArtifactError> {
        let path = self.path_for(name)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path).map_err(|e| ArtifactError::Write(path, e))?;
        Ok(true)
    }

    /// Names of all stored artifacts, sorted.
    pub fn names(&self) -> Result<Vec<String>, ArtifactError> {
        let entries =
            std::fs::read_dir(&self.dir).map_err(|e| ArtifactError::Read(self.dir.clone(), e))?;
        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|e| ArtifactError::Read(self.dir.clone(), e))?
                .path();
            if path.extension().is_some_and(|ext| ext == FILE_EXTENSION) {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn path_for(&self, name: &str) -> Result<PathBuf, ArtifactError> {
        let valid = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(ArtifactError::InvalidName(name.to_string()));
        }
        Ok(self.dir.join(format!("{name}.{FILE_EXTENSION}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::booster::BoostingParams;
    use crate::model::matrix::FeatureMatrix;
    use tempfile::tempdir;

    fn regressor(schema: &FeatureSchema, offset: f64) -> GradientBoostedRegressor {
        let rows: Vec<Vec<f64>> = (0..20).map(|i| vec![i as f64, (i % 4) as f64]).collect();
        let y: Vec<f64> = rows.iter().map(|r| r[0] + offset).collect();
        let x = FeatureMatrix::from_rows(schema.clone(), rows).unwrap();
        let params = BoostingParams {
            n_estimators: 5,
            ..BoostingParams::default()
        };
        GradientBoostedRegressor::fit(&x, &y, &params).unwrap()
    }

    #[test]
    fn save_then_load_keeps_schema_order() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = ArtifactStore::open(dir.path())?;
        let schema = FeatureSchema::new(["temperature_lag_1", "hour_sin"]);
        let model = regressor(&schema, 0.0);

        store.save(TEMPERATURE_MODEL, &model, &schema)?;
        let loaded: Artifact<GradientBoostedRegressor> = store.load(TEMPERATURE_MODEL)?;
        assert_eq!(loaded.schema, schema);
        assert_eq!(loaded.model, model);
        Ok(())
    }

    #[test]
    fn saving_again_replaces_the_artifact() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = ArtifactStore::open(dir.path())?;
        let schema = FeatureSchema::new(["a", "b"]);
        store.save(TEMPERATURE_MODEL, &regressor(&schema, 0.0), &schema)?;
        let newer = regressor(&schema, 100.0);
        store.save(TEMPERATURE_MODEL, &newer, &schema)?;

        let loaded: Artifact<GradientBoostedRegressor> = store.load(TEMPERATURE_MODEL)?;
        assert_eq!(loaded.model, newer);
        assert_eq!(store.names()?, vec![TEMPERATURE_MODEL.to_string()]);
        Ok(())
    }

    #[test]
    fn uncommitted_stage_leaves_previous_artifact() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = ArtifactStore::open(dir.path())?;
        let schema = FeatureSchema::new(["a", "b"]);
        let original = regressor(&schema, 0.0);
        store.save(TEMPERATURE_MODEL, &original, &schema)?;

        let staged = store.stage(TEMPERATURE_MODEL, &regressor(&schema, 50.0), &schema)?;
        assert_eq!(staged.name(), TEMPERATURE_MODEL);
        drop(staged);

        let loaded: Artifact<GradientBoostedRegressor> = store.load(TEMPERATURE_MODEL)?;
        assert_eq!(loaded.model, original);
        assert_eq!(store.names()?, vec![TEMPERATURE_MODEL.to_string()]);
        Ok(())
    }

    #[test]
    fn blocked_target_commits_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = ArtifactStore::open(dir.path())?;
        let schema = FeatureSchema::new(["a", "b"]);
        let original = regressor(&schema, 0.0);
        store.save(TEMPERATURE_MODEL, &original, &schema)?;
        std::fs::create_dir(store.dir().join(format!("{CONDITION_MODEL}.{FILE_EXTENSION}")))?;

        let staged = vec![
            store.stage(TEMPERATURE_MODEL, &regressor(&schema, 50.0), &schema)?,
            store.stage(CONDITION_MODEL, &regressor(&schema, 60.0), &schema)?,
        ];
        let err = store.commit(staged).unwrap_err();
        assert!(matches!(err, ArtifactError::TargetBlocked(_)));

        let loaded: Artifact<GradientBoostedRegressor> = store.load(TEMPERATURE_MODEL)?;
        assert_eq!(loaded.model, original);
        Ok(())
    }

    #[test]
    fn loading_the_wrong_kind_fails() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = ArtifactStore::open(dir.path())?;
        let encoder = LabelEncoder::fit(["Clear sky", "Fog"])?;
        store.save_encoder(&encoder)?;
        assert_eq!(store.load_encoder()?, encoder);

        let err = store
            .load::<GradientBoostedRegressor>(LABEL_ENCODER)
            .unwrap_err();
        assert!(matches!(err, ArtifactError::KindMismatch { .. }));
        Ok(())
    }

    #[test]
    fn missing_and_invalid_names() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = ArtifactStore::open(dir.path().join("nested"))?;
        assert!(matches!(
            store.load::<LabelEncoder>(CONDITION_MODEL),
            Err(ArtifactError::NotFound(_))
        ));
        assert!(matches!(
            store.load::<LabelEncoder>("../escape"),
            Err(ArtifactError::InvalidName(_))
        ));
        assert!(!store.exists(CONDITION_MODEL));
        assert!(!store.remove(CONDITION_MODEL)?);
        Ok(())
    }

    #[test]
    fn remove_deletes_artifact() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let store = ArtifactStore::open(dir.path())?;
        store.save_encoder(&LabelEncoder::fit(["Fog"])?)?;
        assert!(store.exists(LABEL_ENCODER));
        assert!(store.remove(LABEL_ENCODER)?);
        assert!(store.names()?.is_empty());
        Ok(())
    }
}
