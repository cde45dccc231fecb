mod artifacts;
mod cleaning;
mod config;
mod error;
mod features;
mod fetch;
mod forecast;
mod frame;
mod history;
mod lagged;
mod model;
mod pipeline;
mod types;

#[cfg(test)]
mod test_support;

pub use error::HourcastError;

pub use config::*;
pub use pipeline::*;

pub use cleaning::Cleaner;
pub use features::cyclical::cyclical_encode;
pub use features::label_encoder::{LabelDecoder, LabelEncoder};
pub use features::FeatureEngineer;
pub use lagged::LaggedDatasetBuilder;
pub use model::booster::*;
pub use model::matrix::FeatureMatrix;
pub use model::trainer::ModelTrainer;
pub use artifacts::store::*;
pub use forecast::forecaster::*;
pub use fetch::open_meteo::*;
pub use history::{read_history_csv, write_csv};

pub use types::columns::*;
pub use types::feature_schema::FeatureSchema;
pub use types::observation::*;
pub use types::weather_condition::*;

pub use artifacts::error::ArtifactError;
pub use cleaning::error::DataError;
pub use features::error::EncodingError;
pub use fetch::error::FetchError;
pub use forecast::error::SchemaMismatchError;
pub use model::error::TrainingError;
