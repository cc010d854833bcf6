//! Yearly environmental profile for a farm.
//!
//! Fetches one calendar year of daily observations from the Open-Meteo
//! historical archive and reduces them to [`WeatherStats`].

pub mod aggregate;
pub mod provider;
pub mod types;

pub use aggregate::aggregate;
pub use provider::{WeatherAggregator, WeatherSource};
pub use types::*;
