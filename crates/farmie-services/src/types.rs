use farmie_core::FarmieError;
use farmie_weather::Coordinate;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::{Path, PathBuf};

/// A captured or picked image on local storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub path: PathBuf,
    pub mime_type: String,
}

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>, mime_type: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Camera captures are JPEG.
    pub fn jpeg(path: impl Into<PathBuf>) -> Self {
        Self::new(path, "image/jpeg")
    }

    /// File name sent in the multipart upload.
    pub fn upload_name(&self) -> String {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .unwrap_or("crop.jpg")
            .to_string()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Species and confidence returned by the classifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Classification {
    pub species: String,
    pub confidence: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PredictResponse {
    pub predicted_crop: Option<String>,
    pub confidence: Option<f64>,
}

impl TryFrom<PredictResponse> for Classification {
    type Error = FarmieError;

    fn try_from(response: PredictResponse) -> Result<Self, Self::Error> {
        let species = response
            .predicted_crop
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| FarmieError::MalformedResponse("missing predicted_crop".to_string()))?;

        let confidence = response
            .confidence
            .ok_or_else(|| FarmieError::MalformedResponse("missing confidence".to_string()))?;

        if !(0.0..=1.0).contains(&confidence) {
            return Err(FarmieError::MalformedResponse(format!(
                "confidence out of range: {}",
                confidence
            )));
        }

        Ok(Self {
            species,
            confidence,
        })
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CropFamilyResponse {
    pub crop_family: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RecommendationResponse {
    pub recommendations: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub user_name: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginResponse {
    pub access_token: Option<String>,
}

/// A crop grown on a farm, as listed on the farm-detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CultivatedCrop {
    pub crop_name: String,
    #[serde(alias = "crop_family", default)]
    pub family: Option<String>,
    #[serde(default)]
    pub quantity: i64,
}

/// A farm owned by the signed-in user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FarmRecord {
    pub id: i64,
    pub name: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub longitude: Option<f64>,
}

impl FarmRecord {
    pub fn coordinate(&self) -> Option<Coordinate> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coordinate::new(lat, lon)),
            _ => None,
        }
    }
}

/// Coordinates come back as numbers or, for DECIMAL columns, as strings.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        String(String),
    }

    match Option::<NumberOrString>::deserialize(deserializer)? {
        None => Ok(None),
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}
