//! Canonical column names shared by every stage of the pipeline.

pub const COL_DATE_TIME: &str = "date_time";
pub const COL_TEMPERATURE: &str = "temperature";
pub const COL_HUMIDITY: &str = "humidity";
pub const COL_WIND_SPEED: &str = "wind_speed";
pub const COL_WIND_DIRECTION: &str = "wind_direction";
pub const COL_PRESSURE: &str = "pressure";
pub const COL_PRECIPITATION: &str = "precipitation";
pub const COL_CLOUD_COVERAGE: &str = "cloud_coverage";
pub const COL_WEATHER_CODE: &str = "weather_code";
pub const COL_WEATHER_CONDITION: &str = "weather_condition";

// Engineered
pub const COL_WEATHER_CONDITION_ENCODED: &str = "weather_condition_encoded";
pub const COL_HOUR: &str = "hour";
pub const COL_DAY_OF_WEEK: &str = "dayofweek";
pub const COL_HOUR_SIN: &str = "hour_sin";
pub const COL_HOUR_COS: &str = "hour_cos";
pub const COL_DAY_OF_WEEK_SIN: &str = "dayofweek_sin";
pub const COL_DAY_OF_WEEK_COS: &str = "dayofweek_cos";

/// Columns smoothed with a trailing rolling mean.
pub const ROLLING_COLUMNS: [&str; 4] = [COL_TEMPERATURE, COL_HUMIDITY, COL_PRESSURE, COL_WIND_SPEED];

/// Columns that get lag predictors.
pub const LAGGED_COLUMNS: [&str; 2] = [COL_TEMPERATURE, COL_WEATHER_CODE];

/// Column order of the history-plus-forecast output table.
pub const FORECAST_OUTPUT_COLUMNS: [&str; 8] = [
    COL_DATE_TIME,
    COL_TEMPERATURE,
    COL_HUMIDITY,
    COL_WIND_SPEED,
    COL_WIND_DIRECTION,
    COL_PRESSURE,
    COL_CLOUD_COVERAGE,
    COL_WEATHER_CONDITION,
];

/// Raw archive field names and the canonical name each one maps to.
pub const RAW_COLUMN_MAP: [(&str, &str); 9] = [
    ("time", COL_DATE_TIME),
    ("temperature_2m", COL_TEMPERATURE),
    ("relative_humidity_2m", COL_HUMIDITY),
    ("wind_speed_10m", COL_WIND_SPEED),
    ("wind_direction_10m", COL_WIND_DIRECTION),
    ("pressure_msl", COL_PRESSURE),
    ("precipitation", COL_PRECIPITATION),
    ("cloudcover", COL_CLOUD_COVERAGE),
    ("weathercode", COL_WEATHER_CODE),
];

pub fn rolling_mean_column(column: &str, window: usize) -> String {
    format!("{column}_rolling_mean_{window}")
}

pub fn lag_column(column: &str, step: usize) -> String {
    format!("{column}_lag_{step}")
}

/// Returns the source column and step if `name` is a lag predictor
/// produced by [`lag_column`].
pub fn parse_lag_column(name: &str) -> Option<(&'static str, usize)> {
    LAGGED_COLUMNS.iter().find_map(|source| {
        name.strip_prefix(source)
            .and_then(|rest| rest.strip_prefix("_lag_"))
            .and_then(|step| step.parse::<usize>().ok())
            .filter(|step| *step > 0)
            .map(|step| (*source, step))
    })
}
