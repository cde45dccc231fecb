//! Run configuration: location, window sizes, plausibility bounds, model
//! parameters and the directories artifacts and tables are written to.
//!
//! Every field has a default, so a JSON override file only needs the keys it
//! changes.

use crate::error::HourcastError;
use crate::model::booster::BoostingParams;
use crate::types::columns::{
    COL_CLOUD_COVERAGE, COL_HUMIDITY, COL_PRECIPITATION, COL_PRESSURE, COL_TEMPERATURE,
    COL_WIND_SPEED,
};
use bon::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Represents a geographical coordinate using latitude and longitude.
///
/// Latitude is the first element (index 0), and longitude is the second (index 1).
///
/// ```
/// use hourcast::LatLon;
///
/// let hyderabad = LatLon(17.3850, 78.4867);
/// assert_eq!(hyderabad.0, 17.3850);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon(pub f64, pub f64);

/// Plausibility range of one numeric column. Values outside it are outliers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnBounds {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

impl ColumnBounds {
    pub fn new(column: &str, min: f64, max: f64) -> Self {
        Self {
            column: column.to_string(),
            min,
            max,
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Span of the exponential moving average used to impute
    /// temperature, humidity and pressure.
    #[serde(default = "default_ewma_span")]
    pub ewma_span: usize,
    #[serde(default = "default_outlier_bounds")]
    pub outlier_bounds: Vec<ColumnBounds>,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            ewma_span: default_ewma_span(),
            outlier_bounds: default_outlier_bounds(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureConfig {
    #[serde(default = "default_rolling_window")]
    pub rolling_window: usize,
    #[serde(default = "default_lags")]
    pub lags: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            rolling_window: default_rolling_window(),
            lags: default_lags(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
pub struct ForecastConfig {
    #[serde(default = "default_location")]
    #[builder(default = default_location())]
    pub location: LatLon,

    /// IANA timezone the archive reports local hours in.
    #[serde(default = "default_timezone")]
    #[builder(into, default = default_timezone())]
    pub timezone: String,

    /// Length of the rolling history window used for retraining.
    #[serde(default = "default_history_years")]
    #[builder(default = default_history_years())]
    pub history_years: u32,

    #[serde(default)]
    #[builder(default)]
    pub cleaning: CleaningConfig,

    #[serde(default)]
    #[builder(default)]
    pub features: FeatureConfig,

    #[serde(default)]
    #[builder(default)]
    pub boosting: BoostingParams,

    /// Decimal places float columns are rounded to in the forecast table.
    #[serde(default = "default_round_decimals")]
    #[builder(default = default_round_decimals())]
    pub round_decimals: u32,

    #[serde(default = "default_artifact_dir")]
    #[builder(into, default = default_artifact_dir())]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_output_dir")]
    #[builder(into, default = default_output_dir())]
    pub output_dir: PathBuf,

    /// Where fetched archive ranges are cached. `None` uses the system cache directory.
    #[serde(default)]
    #[builder(into)]
    pub cache_dir: Option<PathBuf>,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            location: default_location(),
            timezone: default_timezone(),
            history_years: default_history_years(),
            cleaning: CleaningConfig::default(),
            features: FeatureConfig::default(),
            boosting: BoostingParams::default(),
            round_decimals: default_round_decimals(),
            artifact_dir: default_artifact_dir(),
            output_dir: default_output_dir(),
            cache_dir: None,
        }
    }
}

impl ForecastConfig {
    /// Loads a config from a JSON file. Missing keys fall back to their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, HourcastError> {
        let bytes = std::fs::read(path)
            .map_err(|e| HourcastError::ConfigRead(path.to_path_buf(), e))?;
        serde_json::from_slice(&bytes).map_err(|e| HourcastError::ConfigParse(path.to_path_buf(), e))
    }
}

fn default_location() -> LatLon {
    LatLon(17.3850, 78.4867)
}
fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}
fn default_history_years() -> u32 {
    3
}
fn default_ewma_span() -> usize {
    5
}
fn default_rolling_window() -> usize {
    3
}
fn default_lags() -> usize {
    24
}
fn default_round_decimals() -> u32 {
    4
}
fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}
fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_outlier_bounds() -> Vec<ColumnBounds> {
    vec![
        ColumnBounds::new(COL_TEMPERATURE, -6.1, 49.5),
        ColumnBounds::new(COL_HUMIDITY, 0.0, 100.0),
        ColumnBounds::new(COL_WIND_SPEED, 0.0, 145.0),
        ColumnBounds::new(COL_CLOUD_COVERAGE, 0.0, 100.0),
        ColumnBounds::new(COL_PRESSURE, 900.0, 1045.0),
        ColumnBounds::new(COL_PRECIPITATION, 0.0, 500.0),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_domain_constants() {
        let config = ForecastConfig::default();
        assert_eq!(config.features.lags, 24);
        assert_eq!(config.features.rolling_window, 3);
        assert_eq!(config.cleaning.ewma_span, 5);
        assert_eq!(config.round_decimals, 4);
        assert_eq!(config.boosting.n_estimators, 100);
        let temperature = config
            .cleaning
            .outlier_bounds
            .iter()
            .find(|b| b.column == COL_TEMPERATURE)
            .unwrap();
        assert_eq!((temperature.min, temperature.max), (-6.1, 49.5));
    }

    #[test]
    fn builder_fills_defaults() {
        let config = ForecastConfig::builder()
            .artifact_dir("/tmp/models")
            .history_years(1)
            .build();
        assert_eq!(config.artifact_dir, PathBuf::from("/tmp/models"));
        assert_eq!(config.history_years, 1);
        assert_eq!(config.timezone, "Asia/Kolkata");
        assert_eq!(config.features, FeatureConfig::default());
    }

    #[test]
    fn json_override_keeps_other_defaults() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "features": { "lags": 6 }, "round_decimals": 2 }"#)?;

        let config = ForecastConfig::from_json_file(&path)?;
        assert_eq!(config.features.lags, 6);
        assert_eq!(config.features.rolling_window, 3);
        assert_eq!(config.round_decimals, 2);
        assert_eq!(config.cleaning, CleaningConfig::default());
        Ok(())
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = ForecastConfig::from_json_file(Path::new("/nonexistent/hourcast.json"))
            .unwrap_err();
        assert!(matches!(err, HourcastError::ConfigRead(..)));
    }
}
