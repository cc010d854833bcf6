//! Reduction of a daily series to yearly statistics.

use farmie_core::FarmieError;

use crate::types::{DailyWeatherSeries, WeatherStats};

/// Round half away from zero to 2 decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Compensated (Neumaier) sum of the present samples, with their count.
fn sum_present(samples: &[Option<f64>]) -> (f64, usize) {
    let mut sum = 0.0_f64;
    let mut compensation = 0.0_f64;
    let mut count = 0;

    for value in samples.iter().flatten() {
        let t = sum + value;
        if sum.abs() >= value.abs() {
            compensation += (sum - t) + value;
        } else {
            compensation += (value - t) + sum;
        }
        sum = t;
        count += 1;
    }

    (sum + compensation, count)
}

/// Arithmetic mean of the present samples. Zero samples is an error, never 0 or NaN.
pub fn mean(samples: &[Option<f64>]) -> Result<f64, FarmieError> {
    match sum_present(samples) {
        (_, 0) => Err(FarmieError::EmptySeries),
        (sum, count) => Ok(sum / count as f64),
    }
}

/// Sum of the present samples. A series with no samples sums to 0.
pub fn total(samples: &[Option<f64>]) -> f64 {
    sum_present(samples).0
}

/// Reduce a year of daily samples to [`WeatherStats`].
///
/// Unequal series lengths are checked first (`MalformedResponse`), then
/// emptiness (`EmptySeries`).
pub fn aggregate(series: &DailyWeatherSeries) -> Result<WeatherStats, FarmieError> {
    let len = series.common_len().ok_or_else(|| {
        FarmieError::MalformedResponse(format!(
            "daily series lengths differ: temperature={}, humidity={}, precipitation={}",
            series.temperature.len(),
            series.humidity.len(),
            series.precipitation.len()
        ))
    })?;

    if len == 0 {
        return Err(FarmieError::EmptySeries);
    }

    Ok(WeatherStats {
        avg_temperature: round2(mean(&series.temperature)?),
        avg_humidity: round2(mean(&series.humidity)?),
        total_rainfall: round2(total(&series.precipitation)),
    })
}
