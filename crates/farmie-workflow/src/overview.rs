//! Farm-detail view: yearly weather profile plus the crop listing.
//!
//! Weather and crops load concurrently and settle independently, so a failed
//! weather fetch never hides the crop list (or the other way round).

use std::sync::Arc;

use farmie_core::FarmieError;
use farmie_services::{CropCatalog, CultivatedCrop, FarmRecord};
use farmie_weather::{Coordinate, WeatherError, WeatherSource, WeatherStats};
use parking_lot::Mutex;
use tracing::instrument;

/// The farm shown by the view.
#[derive(Debug, Clone, PartialEq)]
pub struct Farm {
    pub id: String,
    pub name: String,
    pub coordinate: Option<Coordinate>,
}

impl From<FarmRecord> for Farm {
    fn from(record: FarmRecord) -> Self {
        Self {
            coordinate: record.coordinate(),
            id: record.id.to_string(),
            name: record.name,
        }
    }
}

/// Progress of one independently loaded section of the view.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T, E> {
    Idle,
    Loading,
    Loaded(T),
    Failed(E),
}

impl<T, E> Default for LoadState<T, E> {
    fn default() -> Self {
        LoadState::Idle
    }
}

impl<T, E> From<Result<T, E>> for LoadState<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => LoadState::Loaded(value),
            Err(e) => LoadState::Failed(e),
        }
    }
}

impl<T, E> LoadState<T, E> {
    pub fn value(&self) -> Option<&T> {
        match self {
            LoadState::Loaded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&E> {
        match self {
            LoadState::Failed(e) => Some(e),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading)
    }
}

#[derive(Debug, Default)]
struct View {
    generation: u64,
    farm: Option<Farm>,
    weather: LoadState<WeatherStats, WeatherError>,
    crops: LoadState<Vec<CultivatedCrop>, FarmieError>,
}

impl View {
    fn bump(&mut self) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.generation
    }
}

/// Returns sections still `Loading` to `Idle` when a reload is dropped
/// before both of them settle.
struct ReloadGuard<'a> {
    view: &'a Mutex<View>,
    generation: u64,
}

impl Drop for ReloadGuard<'_> {
    fn drop(&mut self) {
        let mut view = self.view.lock();
        if view.generation != self.generation {
            return;
        }
        if view.weather.is_loading() {
            view.weather = LoadState::Idle;
        }
        if view.crops.is_loading() {
            view.crops = LoadState::Idle;
        }
    }
}

pub struct FarmOverview {
    weather: Arc<dyn WeatherSource>,
    catalog: Arc<dyn CropCatalog>,
    view: Mutex<View>,
}

impl FarmOverview {
    pub fn new(weather: Arc<dyn WeatherSource>, catalog: Arc<dyn CropCatalog>) -> Self {
        Self {
            weather,
            catalog,
            view: Mutex::new(View::default()),
        }
    }

    /// Show `farm`. Derived data from a previous farm is discarded.
    pub fn open(&self, farm: Farm) {
        let mut view = self.view.lock();
        let generation = view.bump();
        tracing::info!("Opened farm {} (generation {})", farm.id, generation);
        *view = View {
            generation,
            farm: Some(farm),
            ..View::default()
        };
    }

    /// Leave the view. Results still in flight are dropped.
    pub fn close(&self) {
        let mut view = self.view.lock();
        let generation = view.bump();
        *view = View {
            generation,
            ..View::default()
        };
    }

    /// Re-fetch weather and crops for the open farm.
    ///
    /// Weather is skipped when the farm has no coordinate. Per-section
    /// failures land in that section's [`LoadState`]; only a missing farm is
    /// returned as an error.
    #[instrument(skip(self), level = "info")]
    pub async fn reload(&self) -> Result<(), FarmieError> {
        let (generation, farm) = {
            let mut view = self.view.lock();
            let farm = view
                .farm
                .clone()
                .ok_or(FarmieError::MissingContext("no farm open"))?;
            let generation = view.bump();
            view.weather = match farm.coordinate {
                Some(_) => LoadState::Loading,
                None => LoadState::Idle,
            };
            view.crops = LoadState::Loading;
            (generation, farm)
        };
        let _guard = ReloadGuard {
            view: &self.view,
            generation,
        };

        let weather = async {
            let Some(coordinate) = farm.coordinate else {
                tracing::debug!("Farm {} has no coordinate, skipping weather", farm.id);
                return;
            };
            let result = self.weather.fetch_yearly_stats(coordinate).await;
            self.apply(generation, |view| view.weather = result.into());
        };

        let crops = async {
            let result = self.catalog.crops_for_farm(&farm.id).await;
            if let Err(e) = &result {
                tracing::warn!("Crop listing for farm {} failed: {}", farm.id, e);
            }
            self.apply(generation, |view| view.crops = result.into());
        };

        tokio::join!(weather, crops);
        Ok(())
    }

    fn apply(&self, generation: u64, update: impl FnOnce(&mut View)) {
        let mut view = self.view.lock();
        if view.generation == generation {
            update(&mut view);
        } else {
            tracing::debug!("Dropping farm view result for generation {}", generation);
        }
    }

    pub fn farm(&self) -> Option<Farm> {
        self.view.lock().farm.clone()
    }

    pub fn weather(&self) -> LoadState<WeatherStats, WeatherError> {
        self.view.lock().weather.clone()
    }

    pub fn weather_stats(&self) -> Option<WeatherStats> {
        self.view.lock().weather.value().copied()
    }

    pub fn crops(&self) -> LoadState<Vec<CultivatedCrop>, FarmieError> {
        self.view.lock().crops.clone()
    }
}
