use async_trait::async_trait;
use farmie_core::{FarmieError, ReqwestErrorExt, WeatherConfig};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use crate::aggregate::aggregate;
use crate::types::{
    window_days, ArchiveResponse, Coordinate, DailyWeatherSeries, WeatherError, WeatherStats,
    DAILY_VARIABLES, WINDOW_END, WINDOW_START,
};

/// Anything that can produce yearly stats for a coordinate.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_yearly_stats(&self, coordinate: Coordinate)
        -> Result<WeatherStats, WeatherError>;
}

/// Open-Meteo archive client. No caching: every call re-fetches.
#[derive(Debug, Clone)]
pub struct WeatherAggregator {
    client: Arc<Client>,
    archive_url: String,
    timezone: String,
}

impl WeatherAggregator {
    pub fn new(
        archive_url: impl Into<String>,
        timezone: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FarmieError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ReqwestErrorExt::into_farmie_error)?;

        Ok(Self {
            client: Arc::new(client),
            archive_url: archive_url.into(),
            timezone: timezone.into(),
        })
    }

    pub fn from_config(config: &WeatherConfig, timeout: Duration) -> Result<Self, FarmieError> {
        Self::new(&config.archive_url, &config.timezone, timeout)
    }

    /// Fetch the raw daily series for the fixed window.
    #[instrument(skip(self), level = "debug")]
    pub async fn fetch_series(
        &self,
        coordinate: Coordinate,
    ) -> Result<DailyWeatherSeries, FarmieError> {
        if !coordinate.is_finite() {
            return Err(FarmieError::MissingContext("coordinate must be finite"));
        }

        let latitude = coordinate.latitude.to_string();
        let longitude = coordinate.longitude.to_string();

        let response = self
            .client
            .get(&self.archive_url)
            .query(&[
                ("latitude", latitude.as_str()),
                ("longitude", longitude.as_str()),
                ("start_date", WINDOW_START),
                ("end_date", WINDOW_END),
                ("daily", DAILY_VARIABLES),
                ("timezone", self.timezone.as_str()),
            ])
            .send()
            .await
            .map_err(ReqwestErrorExt::into_farmie_error)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Weather archive returned {}: {}", status, text);
            return Err(FarmieError::Upstream {
                status: status.as_u16(),
                message: text,
            });
        }

        let body: ArchiveResponse = response
            .json()
            .await
            .map_err(|e| FarmieError::MalformedResponse(format!("JSON parse error: {}", e)))?;

        let series = body
            .daily
            .ok_or_else(|| FarmieError::MalformedResponse("missing daily block".to_string()))?
            .into_series()?;

        if let (Some(len), Some(expected)) = (series.common_len(), window_days()) {
            if len != expected {
                tracing::debug!("Archive returned {} days, window has {}", len, expected);
            }
        }

        Ok(series)
    }
}

#[async_trait]
impl WeatherSource for WeatherAggregator {
    #[instrument(skip(self), level = "info")]
    async fn fetch_yearly_stats(
        &self,
        coordinate: Coordinate,
    ) -> Result<WeatherStats, WeatherError> {
        let result = self
            .fetch_series(coordinate)
            .await
            .and_then(|series| aggregate(&series));

        match result {
            Ok(stats) => {
                tracing::info!(
                    "Yearly weather: avg {}°C, {}% humidity, {} mm rain",
                    stats.avg_temperature,
                    stats.avg_humidity,
                    stats.total_rainfall
                );
                Ok(stats)
            }
            Err(e) => {
                tracing::warn!("Weather unavailable: {}", e);
                Err(WeatherError::Unavailable(e))
            }
        }
    }
}
