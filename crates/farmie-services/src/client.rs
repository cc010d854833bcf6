//! Farmie backend API client.
//!
//! Every endpoint except `/login` is bearer-token authenticated. The token is
//! resolved before the request is built, so a missing session never reaches
//! the network.

use farmie_auth::{TokenProvider, TokenSet};
use farmie_core::{FarmieError, ReqwestErrorExt, ServiceConfig};
use reqwest::multipart::{Form, Part};
use reqwest::{header, Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::types::*;

pub struct FarmieClient {
    client: Arc<Client>,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl FarmieClient {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, FarmieError> {
        // Url::join drops the last path segment unless it ends with '/'
        let normalized = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{}/", base_url)
        };
        let base_url = Url::parse(&normalized).map_err(|e| {
            FarmieError::MissingContext(match e {
                url::ParseError::RelativeUrlWithoutBase => "API base URL must be absolute",
                _ => "API base URL is invalid",
            })
        })?;

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ReqwestErrorExt::into_farmie_error)?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            tokens,
        })
    }

    pub fn from_config(
        config: &ServiceConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, FarmieError> {
        Self::new(&config.api_base_url, config.request_timeout(), tokens)
    }

    fn endpoint(&self, path: &str) -> Result<Url, FarmieError> {
        self.base_url
            .join(path)
            .map_err(|_| FarmieError::MissingContext("endpoint path is invalid"))
    }

    /// Attach the bearer token, or fail before anything is sent.
    fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, FarmieError> {
        let token = self.tokens.bearer_token()?;
        Ok(request.header(header::AUTHORIZATION, format!("Bearer {}", token)))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FarmieError> {
        let response = request
            .send()
            .await
            .map_err(ReqwestErrorExt::into_farmie_error)?;
        self.handle_response(response).await
    }

    /// Exchange credentials for a session token. Sends no bearer token.
    #[instrument(skip(self, password), level = "info")]
    pub async fn login(&self, user_name: &str, password: &str) -> Result<TokenSet, FarmieError> {
        let user_name = user_name.trim();
        if user_name.is_empty() || password.is_empty() {
            return Err(FarmieError::MissingContext(
                "user name and password are required",
            ));
        }

        let request = self
            .client
            .post(self.endpoint("login")?)
            .json(&LoginRequest {
                user_name,
                password,
            });

        let response: LoginResponse = self.send(request).await?;
        let token = response
            .access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| FarmieError::MalformedResponse("missing access_token".to_string()))?;

        tracing::info!("Signed in as {}", user_name);
        Ok(TokenSet::new(token))
    }

    /// Classify a crop image. Returns the species and classifier confidence.
    #[instrument(skip(self), level = "info")]
    pub async fn predict_crop(&self, image: &ImageRef) -> Result<Classification, FarmieError> {
        let request = self.authorized(self.client.post(self.endpoint("predict_crop")?))?;

        let bytes = tokio::fs::read(image.path())
            .await
            .map_err(|e| FarmieError::ImageUnreadable(format!("{}: {}", image.path.display(), e)))?;
        tracing::debug!("Uploading {} bytes as {}", bytes.len(), image.mime_type);

        let part = Part::bytes(bytes)
            .file_name(image.upload_name())
            .mime_str(&image.mime_type)
            .map_err(|_| {
                FarmieError::ImageUnreadable(format!("invalid MIME type: {}", image.mime_type))
            })?;

        let response: PredictResponse = self
            .send(request.multipart(Form::new().part("image", part)))
            .await?;
        let classification = Classification::try_from(response)?;

        tracing::info!(
            "Classified as {} ({:.2})",
            classification.species,
            classification.confidence
        );
        Ok(classification)
    }

    /// Resolve the taxonomic family of a species.
    #[instrument(skip(self), level = "info")]
    pub async fn crop_family(&self, species: &str) -> Result<String, FarmieError> {
        let request = self.authorized(
            self.client
                .get(self.endpoint("crop_family")?)
                .query(&[("crop_name", species)]),
        )?;

        let response: CropFamilyResponse = self.send(request).await?;
        response
            .crop_family
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .ok_or_else(|| FarmieError::MalformedResponse("missing crop_family".to_string()))
    }

    /// Companion crops for `species` on `farm_id`, in server relevance order.
    #[instrument(skip(self), level = "info")]
    pub async fn crop_recommendations(
        &self,
        species: &str,
        farm_id: &str,
    ) -> Result<Vec<String>, FarmieError> {
        let request = self.authorized(
            self.client
                .get(self.endpoint("crop_recommendation")?)
                .query(&[("crop_name", species), ("farm_id", farm_id)]),
        )?;

        let response: RecommendationResponse = self.send(request).await?;
        let recommendations = response
            .recommendations
            .ok_or_else(|| FarmieError::MalformedResponse("missing recommendations".to_string()))?;

        tracing::info!("Received {} recommendations", recommendations.len());
        Ok(recommendations)
    }

    /// Crops currently cultivated on a farm.
    #[instrument(skip(self), level = "info")]
    pub async fn crops_for_farm(&self, farm_id: &str) -> Result<Vec<CultivatedCrop>, FarmieError> {
        let request = self.authorized(
            self.client
                .get(self.endpoint("get_crops_for_farm")?)
                .query(&[("farm_id", farm_id)]),
        )?;

        let crops: Vec<CultivatedCrop> = self.send(request).await?;
        tracing::info!("Fetched {} crops for farm {}", crops.len(), farm_id);
        Ok(crops)
    }

    /// Farms owned by the signed-in user.
    #[instrument(skip(self), level = "info")]
    pub async fn list_farms(&self) -> Result<Vec<FarmRecord>, FarmieError> {
        let request = self.authorized(self.client.get(self.endpoint("get_farms_by_user")?))?;

        let farms: Vec<FarmRecord> = self.send(request).await?;
        tracing::info!("Fetched {} farms", farms.len());
        Ok(farms)
    }

    /// Map status codes to the error taxonomy. Upstream text is logged only.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, FarmieError> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| FarmieError::MalformedResponse(format!("JSON parse error: {}", e)))
        } else if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Backend rejected session token");
            Err(FarmieError::Unauthenticated)
        } else {
            let text = response.text().await.unwrap_or_default();
            tracing::warn!("Backend returned {}: {}", status, text);
            Err(FarmieError::Upstream {
                status: status.as_u16(),
                message: text,
            })
        }
    }
}
