//! Defines the `WeatherCondition` enum, mapping WMO weather interpretation codes
//! (the `weathercode` field of the Open-Meteo archive) to descriptive labels.

/// Label used for codes that are missing or not part of the WMO table.
pub const UNKNOWN_CONDITION: &str = "Unknown";

/// Code stored in `weather_code` when the archive reported no code for an hour.
/// It is not a WMO code, so it always maps to [`UNKNOWN_CONDITION`].
pub const UNKNOWN_WEATHER_CODE: i64 = -1;

/// Represents a WMO weather interpretation code.
///
/// You can convert an integer code (e.g., from a Polars DataFrame) into this enum
/// using [`WeatherCondition::from_i64`], and get the human readable label used in
/// the `weather_condition` column with [`WeatherCondition::label`].
///
/// # Examples
///
/// ```rust
/// use hourcast::WeatherCondition;
///
/// let rain = WeatherCondition::from_i64(61);
/// assert_eq!(rain, Some(WeatherCondition::SlightRain));
/// assert_eq!(rain.map(|c| c.label()), Some("Slight rain"));
///
/// assert_eq!(WeatherCondition::from_i64(999), None);
/// assert_eq!(hourcast::condition_label(Some(999)), "Unknown");
/// ```
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub enum WeatherCondition {
    /// Code 0
    ClearSky = 0,
    /// Code 1
    MainlyClear = 1,
    /// Code 2
    PartlyCloudy = 2,
    /// Code 3
    Overcast = 3,
    /// Code 45
    Fog = 45,
    /// Code 48
    DepositingRimeFog = 48,
    /// Code 51
    LightDrizzle = 51,
    /// Code 53
    ModerateDrizzle = 53,
    /// Code 55
    DenseDrizzle = 55,
    /// Code 56
    LightFreezingDrizzle = 56,
    /// Code 57
    DenseFreezingDrizzle = 57,
    /// Code 61
    SlightRain = 61,
    /// Code 63
    ModerateRain = 63,
    /// Code 65
    HeavyRain = 65,
    /// Code 66
    LightFreezingRain = 66,
    /// Code 67
    HeavyFreezingRain = 67,
    /// Code 71
    SlightSnowFall = 71,
    /// Code 73
    ModerateSnowFall = 73,
    /// Code 75
    HeavySnowFall = 75,
    /// Code 77
    SnowGrains = 77,
    /// Code 80
    SlightRainShowers = 80,
    /// Code 81
    ModerateRainShowers = 81,
    /// Code 82
    ViolentRainShowers = 82,
    /// Code 85
    SlightSnowShowers = 85,
    /// Code 86
    HeavySnowShowers = 86,
    /// Code 95
    Thunderstorm = 95,
    /// Code 96
    ThunderstormWithSlightHail = 96,
    /// Code 99
    ThunderstormWithHeavyHail = 99,
}

impl WeatherCondition {
    /// Attempts to convert a WMO weather code into a `WeatherCondition` variant.
    ///
    /// Returns `None` for codes outside the WMO table (including
    /// [`UNKNOWN_WEATHER_CODE`]).
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            0 => Some(WeatherCondition::ClearSky),
            1 => Some(WeatherCondition::MainlyClear),
            2 => Some(WeatherCondition::PartlyCloudy),
            3 => Some(WeatherCondition::Overcast),
            45 => Some(WeatherCondition::Fog),
            48 => Some(WeatherCondition::DepositingRimeFog),
            51 => Some(WeatherCondition::LightDrizzle),
            53 => Some(WeatherCondition::ModerateDrizzle),
            55 => Some(WeatherCondition::DenseDrizzle),
            56 => Some(WeatherCondition::LightFreezingDrizzle),
            57 => Some(WeatherCondition::DenseFreezingDrizzle),
            61 => Some(WeatherCondition::SlightRain),
            63 => Some(WeatherCondition::ModerateRain),
            65 => Some(WeatherCondition::HeavyRain),
            66 => Some(WeatherCondition::LightFreezingRain),
            67 => Some(WeatherCondition::HeavyFreezingRain),
            71 => Some(WeatherCondition::SlightSnowFall),
            73 => Some(WeatherCondition::ModerateSnowFall),
            75 => Some(WeatherCondition::HeavySnowFall),
            77 => Some(WeatherCondition::SnowGrains),
            80 => Some(WeatherCondition::SlightRainShowers),
            81 => Some(WeatherCondition::ModerateRainShowers),
            82 => Some(WeatherCondition::ViolentRainShowers),
            85 => Some(WeatherCondition::SlightSnowShowers),
            86 => Some(WeatherCondition::HeavySnowShowers),
            95 => Some(WeatherCondition::Thunderstorm),
            96 => Some(WeatherCondition::ThunderstormWithSlightHail),
            99 => Some(WeatherCondition::ThunderstormWithHeavyHail),
            _ => None,
        }
    }

    /// The label written to the `weather_condition` column.
    pub fn label(self) -> &'static str {
        match self {
            WeatherCondition::ClearSky => "Clear sky",
            WeatherCondition::MainlyClear => "Mainly clear",
            WeatherCondition::PartlyCloudy => "Partly cloudy",
            WeatherCondition::Overcast => "Overcast",
            WeatherCondition::Fog => "Fog",
            WeatherCondition::DepositingRimeFog => "Depositing rime fog",
            WeatherCondition::LightDrizzle => "Light drizzle",
            WeatherCondition::ModerateDrizzle => "Moderate drizzle",
            WeatherCondition::DenseDrizzle => "Dense drizzle",
            WeatherCondition::LightFreezingDrizzle => "Light freezing drizzle",
            WeatherCondition::DenseFreezingDrizzle => "Dense freezing drizzle",
            WeatherCondition::SlightRain => "Slight rain",
            WeatherCondition::ModerateRain => "Moderate rain",
            WeatherCondition::HeavyRain => "Heavy rain",
            WeatherCondition::LightFreezingRain => "Light freezing rain",
            WeatherCondition::HeavyFreezingRain => "Heavy freezing rain",
            WeatherCondition::SlightSnowFall => "Slight snow fall",
            WeatherCondition::ModerateSnowFall => "Moderate snow fall",
            WeatherCondition::HeavySnowFall => "Heavy snow fall",
            WeatherCondition::SnowGrains => "Snow grains",
            WeatherCondition::SlightRainShowers => "Slight rain showers",
            WeatherCondition::ModerateRainShowers => "Moderate rain showers",
            WeatherCondition::ViolentRainShowers => "Violent rain showers",
            WeatherCondition::SlightSnowShowers => "Slight snow showers",
            WeatherCondition::HeavySnowShowers => "Heavy snow showers",
            WeatherCondition::Thunderstorm => "Thunderstorm",
            WeatherCondition::ThunderstormWithSlightHail => "Thunderstorm with slight hail",
            WeatherCondition::ThunderstormWithHeavyHail => "Thunderstorm with heavy hail",
        }
    }
}

/// Maps an optional weather code to its label, falling back to [`UNKNOWN_CONDITION`].
pub fn condition_label(code: Option<i64>) -> &'static str {
    code.and_then(WeatherCondition::from_i64)
        .map(WeatherCondition::label)
        .unwrap_or(UNKNOWN_CONDITION)
}
