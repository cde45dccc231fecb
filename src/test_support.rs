//! Synthetic hourly history shared by unit tests.

use crate::types::observation::{observations_to_frame, RawObservation};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use polars::prelude::DataFrame;

pub(crate) fn hour(i: i64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
        + Duration::hours(i)
}

/// A daily temperature cycle with humid, overcast nights and rainy afternoons.
pub(crate) fn synthetic_observations(hours: usize) -> Vec<RawObservation> {
    (0..hours as i64)
        .map(|i| {
            let hour_of_day = i % 24;
            let phase = 2.0 * std::f64::consts::PI * hour_of_day as f64 / 24.0;
            let temperature = 25.0 + 5.0 * phase.sin() + 0.1 * (i % 7) as f64;
            let code = match hour_of_day {
                0..=5 => 3,
                13..=15 => 61,
                _ => 0,
            };
            RawObservation {
                timestamp: hour(i),
                temperature: Some(temperature),
                humidity: Some(90.0 - 2.0 * temperature),
                wind_speed: Some(5.0 + (i % 5) as f64),
                wind_direction: Some(180.0 + 10.0 * (i % 3) as f64),
                pressure: Some(1010.0 - 0.2 * (i % 11) as f64),
                cloud_coverage: Some(if code == 0 { 10.0 } else { 80.0 }),
                precipitation: Some(if code == 61 { 1.2 } else { 0.0 }),
                weather_code: Some(code),
            }
        })
        .collect()
}

pub(crate) fn synthetic_raw(hours: usize) -> DataFrame {
    observations_to_frame(&synthetic_observations(hours)).unwrap()
}
