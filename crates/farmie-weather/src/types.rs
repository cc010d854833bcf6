use chrono::NaiveDate;
use farmie_core::{ErrorKind, FarmieError};
use serde::{Deserialize, Serialize};

/// First day of the fixed observation window
pub const WINDOW_START: &str = "2024-01-01";
/// Last day of the fixed observation window (inclusive)
pub const WINDOW_END: &str = "2024-12-31";

/// Daily variables requested from the archive, in request order
pub const DAILY_VARIABLES: &str = "temperature_2m_mean,precipitation_sum,relative_humidity_2m_mean";

/// Number of days in the observation window (366, 2024 is a leap year).
pub fn window_days() -> Option<usize> {
    let start = NaiveDate::parse_from_str(WINDOW_START, "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(WINDOW_END, "%Y-%m-%d").ok()?;
    usize::try_from((end - start).num_days() + 1).ok()
}

/// Geographic location of a farm. Values are passed through unvalidated;
/// the archive is authoritative on range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// Three parallel daily series for the observation window.
///
/// `None` marks a day the archive has no sample for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyWeatherSeries {
    pub temperature: Vec<Option<f64>>,
    pub humidity: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
}

impl DailyWeatherSeries {
    /// Build a series with no gaps.
    pub fn from_values(temperature: Vec<f64>, humidity: Vec<f64>, precipitation: Vec<f64>) -> Self {
        Self {
            temperature: temperature.into_iter().map(Some).collect(),
            humidity: humidity.into_iter().map(Some).collect(),
            precipitation: precipitation.into_iter().map(Some).collect(),
        }
    }

    /// Length shared by all three series, or `None` if they disagree.
    pub fn common_len(&self) -> Option<usize> {
        let len = self.temperature.len();
        (self.humidity.len() == len && self.precipitation.len() == len).then_some(len)
    }
}

/// Summary of one year of daily weather, each value rounded to 2 decimals.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherStats {
    /// Mean daily temperature, °C
    pub avg_temperature: f64,
    /// Mean daily relative humidity, %
    pub avg_humidity: f64,
    /// Precipitation summed over the window, mm
    pub total_rainfall: f64,
}

/// Archive payload. Every field is optional so a missing series is reported
/// as a malformed response rather than a decode error.
#[derive(Debug, Deserialize)]
pub(crate) struct ArchiveResponse {
    pub daily: Option<ArchiveDaily>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ArchiveDaily {
    pub temperature_2m_mean: Option<Vec<Option<f64>>>,
    pub relative_humidity_2m_mean: Option<Vec<Option<f64>>>,
    pub precipitation_sum: Option<Vec<Option<f64>>>,
}

impl ArchiveDaily {
    pub fn into_series(self) -> Result<DailyWeatherSeries, FarmieError> {
        let missing = |name: &str| FarmieError::MalformedResponse(format!("missing daily.{}", name));
        Ok(DailyWeatherSeries {
            temperature: self
                .temperature_2m_mean
                .ok_or_else(|| missing("temperature_2m_mean"))?,
            humidity: self
                .relative_humidity_2m_mean
                .ok_or_else(|| missing("relative_humidity_2m_mean"))?,
            precipitation: self
                .precipitation_sum
                .ok_or_else(|| missing("precipitation_sum"))?,
        })
    }
}

/// The single weather failure exposed to the farm view.
///
/// The UI only distinguishes "stats available" from "not available";
/// [`WeatherError::reason`] keeps the underlying kind for logs and tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeatherError {
    #[error("Weather unavailable: {0}")]
    Unavailable(#[from] FarmieError),
}

impl WeatherError {
    pub fn reason(&self) -> &FarmieError {
        match self {
            WeatherError::Unavailable(reason) => reason,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.reason().kind()
    }

    pub fn user_message(&self) -> &'static str {
        "Could not fetch weather data."
    }
}
