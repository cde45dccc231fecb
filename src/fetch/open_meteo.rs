use crate::config::LatLon;
use crate::fetch::error::FetchError;
use chrono::{Duration, NaiveDate, Utc};
use log::{debug, info, warn};
use polars::prelude::*;
use reqwest::Client;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::{fs, task};

const ARCHIVE_URL: &str = "https://archive-api.open-meteo.com/v1/archive";
const CACHE_DIR_NAME: &str = "hourcast_cache";
const HOURLY_VARIABLES: [&str; 8] = [
    "temperature_2m",
    "relative_humidity_2m",
    "wind_speed_10m",
    "wind_direction_10m",
    "pressure_msl",
    "precipitation",
    "cloudcover",
    "weathercode",
];

/// The system cache directory for fetched archive ranges.
pub fn default_cache_dir() -> Result<PathBuf, FetchError> {
    dirs::cache_dir()
        .ok_or(FetchError::CacheDirResolution)
        .map(|p| p.join(CACHE_DIR_NAME))
}

/// Window of `years` years ending on `today`.
pub fn recent_window(today: NaiveDate, years: u32) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(365 * i64::from(years)), today)
}

/// Window from the day after `last_end` up to `today`, or `None` when there is
/// nothing new to fetch.
pub fn since_window(last_end: NaiveDate, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let start = last_end + Duration::days(1);
    (start < today).then_some((start, today))
}

#[derive(Debug, Deserialize)]
struct ArchiveResponse {
    hourly: HourlyBlock,
}

#[derive(Debug, Deserialize)]
struct HourlyBlock {
    time: Vec<String>,
    temperature_2m: Vec<Option<f64>>,
    relative_humidity_2m: Vec<Option<f64>>,
    wind_speed_10m: Vec<Option<f64>>,
    wind_direction_10m: Vec<Option<f64>>,
    pressure_msl: Vec<Option<f64>>,
    precipitation: Vec<Option<f64>>,
    cloudcover: Vec<Option<f64>>,
    weathercode: Vec<Option<i64>>,
}

impl HourlyBlock {
    /// Builds a table with the archive's own field names; the cleaner maps them.
    fn into_frame(self) -> Result<DataFrame, FetchError> {
        let expected = self.time.len();
        let check = |field: &'static str, found: usize| {
            if found == expected {
                Ok(())
            } else {
                Err(FetchError::MalformedResponse {
                    field,
                    expected,
                    found,
                })
            }
        };
        check("temperature_2m", self.temperature_2m.len())?;
        check("relative_humidity_2m", self.relative_humidity_2m.len())?;
        check("wind_speed_10m", self.wind_speed_10m.len())?;
        check("wind_direction_10m", self.wind_direction_10m.len())?;
        check("pressure_msl", self.pressure_msl.len())?;
        check("precipitation", self.precipitation.len())?;
        check("cloudcover", self.cloudcover.len())?;
        check("weathercode", self.weathercode.len())?;

        Ok(DataFrame::new(vec![
            Series::new("time".into(), self.time).into(),
            Series::new("temperature_2m".into(), self.temperature_2m).into(),
            Series::new("relative_humidity_2m".into(), self.relative_humidity_2m).into(),
            Series::new("wind_speed_10m".into(), self.wind_speed_10m).into(),
            Series::new("wind_direction_10m".into(), self.wind_direction_10m).into(),
            Series::new("pressure_msl".into(), self.pressure_msl).into(),
            Series::new("precipitation".into(), self.precipitation).into(),
            Series::new("cloudcover".into(), self.cloudcover).into(),
            Series::new("weathercode".into(), self.weathercode).into(),
        ])?)
    }
}

/// Fetches raw hourly observations for one location from the Open-Meteo archive.
///
/// Ranges that end before today are cached as parquet, since archive days no
/// longer change once past.
pub struct OpenMeteoFetcher {
    client: Client,
    cache_dir: PathBuf,
    location: LatLon,
    timezone: String,
}

impl OpenMeteoFetcher {
    pub fn new(location: LatLon, timezone: impl Into<String>, cache_dir: &Path) -> Self {
        Self {
            client: Client::new(),
            cache_dir: cache_dir.to_path_buf(),
            location,
            timezone: timezone.into(),
        }
    }

    /// Uses the system cache directory.
    pub fn with_default_cache(location: LatLon, timezone: impl Into<String>) -> Result<Self, FetchError> {
        Ok(Self::new(location, timezone, &default_cache_dir()?))
    }

    /// Observations from `years` years ago up to today.
    pub async fn fetch_recent(&self, years: u32) -> Result<DataFrame, FetchError> {
        let (start, end) = recent_window(Utc::now().date_naive(), years);
        self.fetch_range(start, end).await
    }

    /// Observations from the day after `last_end` up to today, or `None` if
    /// `last_end` is already up to date.
    pub async fn fetch_since(&self, last_end: NaiveDate) -> Result<Option<DataFrame>, FetchError> {
        match since_window(last_end, Utc::now().date_naive()) {
            Some((start, end)) => self.fetch_range(start, end).await.map(Some),
            None => {
                info!("No new archive data after {}", last_end);
                Ok(None)
            }
        }
    }

    /// Raw hourly observations for `start..=end` with the archive's field names.
    pub async fn fetch_range(&self, start: NaiveDate, end: NaiveDate) -> Result<DataFrame, FetchError> {
        if start > end {
            return Err(FetchError::InvalidRange { start, end });
        }
        let cacheable = end < Utc::now().date_naive();
        let parquet_path = self.cache_dir.join(self.cache_file_name(start, end));

        if cacheable && fs::metadata(&parquet_path).await.is_ok() {
            info!("Cache hit for {} to {} at {:?}", start, end, parquet_path);
            return Self::read_cached(parquet_path).await;
        }
        if cacheable {
            warn!("Cache miss for {} to {}. Downloading.", start, end);
        }

        let df = self.download(start, end).await?;
        if cacheable {
            fs::create_dir_all(&self.cache_dir)
                .await
                .map_err(|e| FetchError::CacheDirCreation(self.cache_dir.clone(), e))?;
            Self::cache_dataframe(df.clone(), &parquet_path).await?;
            info!("Cached {} rows to {:?}", df.height(), parquet_path);
        }
        Ok(df)
    }

    fn cache_file_name(&self, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "open_meteo_{:.4}_{:.4}_{}_{}.parquet",
            self.location.0, self.location.1, start, end
        )
    }

    async fn download(&self, start: NaiveDate, end: NaiveDate) -> Result<DataFrame, FetchError> {
        let url = ARCHIVE_URL.to_string();
        info!(
            "Downloading hourly archive for ({}, {}) from {} to {}",
            self.location.0, self.location.1, start, end
        );

        let response = self
            .client
            .get(&url)
            .query(&[
                ("latitude", self.location.0.to_string()),
                ("longitude", self.location.1.to_string()),
                ("start_date", start.to_string()),
                ("end_date", end.to_string()),
                ("hourly", HOURLY_VARIABLES.join(",")),
                ("timezone", self.timezone.clone()),
            ])
            .send()
            .await
            .map_err(|e| FetchError::NetworkRequest(url.clone(), e))?;

        let response = match response.error_for_status() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("HTTP error for {}: {:?}", url, e);
                return Err(if let Some(status) = e.status() {
                    FetchError::HttpStatus {
                        url,
                        status,
                        source: e,
                    }
                } else {
                    FetchError::NetworkRequest(url, e)
                });
            }
        };

        let archive: ArchiveResponse = response
            .json()
            .await
            .map_err(|e| FetchError::ResponseParse(url.clone(), e))?;
        debug!("Archive returned {} hourly rows", archive.hourly.time.len());
        archive.hourly.into_frame()
    }

    async fn read_cached(path: PathBuf) -> Result<DataFrame, FetchError> {
        task::spawn_blocking(move || {
            LazyFrame::scan_parquet(&path, Default::default())
                .and_then(|lf| lf.collect())
                .map_err(|e| FetchError::ParquetScan(path, e))
        })
        .await?
    }

    async fn cache_dataframe(mut df: DataFrame, path: &Path) -> Result<(), FetchError> {
        let path_buf = path.to_path_buf();
        task::spawn_blocking(move || {
            let file = std::fs::File::create(&path_buf)
                .map_err(|e| FetchError::ParquetWriteIo(path_buf.clone(), e))?;
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(&mut df)
                .map_err(|e| FetchError::ParquetWritePolars(path_buf, e))?;
            Ok::<(), FetchError>(())
        })
        .await??;
        Ok(())
    }
}
