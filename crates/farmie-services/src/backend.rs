//! Seams between the workflow layer and the backend.
//!
//! The workflow and farm overview only see these traits, so tests can swap in
//! recording fakes and the host can swap transports.

use async_trait::async_trait;
use farmie_core::FarmieError;

use crate::client::FarmieClient;
use crate::types::{Classification, CultivatedCrop, ImageRef};

/// Classification, family lookup and recommendation endpoints.
#[async_trait]
pub trait CropBackend: Send + Sync {
    async fn predict_crop(&self, image: &ImageRef) -> Result<Classification, FarmieError>;

    async fn crop_family(&self, species: &str) -> Result<String, FarmieError>;

    async fn crop_recommendations(
        &self,
        species: &str,
        farm_id: &str,
    ) -> Result<Vec<String>, FarmieError>;
}

/// Crop listing for the farm-detail view.
#[async_trait]
pub trait CropCatalog: Send + Sync {
    async fn crops_for_farm(&self, farm_id: &str) -> Result<Vec<CultivatedCrop>, FarmieError>;
}

#[async_trait]
impl CropBackend for FarmieClient {
    async fn predict_crop(&self, image: &ImageRef) -> Result<Classification, FarmieError> {
        FarmieClient::predict_crop(self, image).await
    }

    async fn crop_family(&self, species: &str) -> Result<String, FarmieError> {
        FarmieClient::crop_family(self, species).await
    }

    async fn crop_recommendations(
        &self,
        species: &str,
        farm_id: &str,
    ) -> Result<Vec<String>, FarmieError> {
        FarmieClient::crop_recommendations(self, species, farm_id).await
    }
}

#[async_trait]
impl CropCatalog for FarmieClient {
    async fn crops_for_farm(&self, farm_id: &str) -> Result<Vec<CultivatedCrop>, FarmieError> {
        FarmieClient::crops_for_farm(self, farm_id).await
    }
}
