use crate::config::PredictionServiceConfig;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

const PREDICT_PATH: &str = "/predict";
const HEALTH_PATH: &str = "/health";
const FALLBACK_MIME_TYPE: &str = "application/octet-stream";

#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("{0}")]
    Connection(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Coordinates {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub file_name: String,
    pub mime_type: String,
    pub image_data: Bytes,
    pub model: String,
}

#[derive(Deserialize)]
struct RawPredictResponse {
    #[serde(default)]
    success: bool,
    result_image: Option<String>,
    coordinates: Option<Coordinates>,
    error: Option<String>,
}

/// Body of a `/predict` reply, keyed on its `success` flag.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawPredictResponse")]
pub enum PredictResponse {
    Ok {
        result_image: String,
        coordinates: Coordinates,
    },
    Failed {
        error: Option<String>,
    },
}

impl TryFrom<RawPredictResponse> for PredictResponse {
    type Error = String;

    fn try_from(raw: RawPredictResponse) -> Result<Self, Self::Error> {
        if !raw.success {
            return Ok(Self::Failed { error: raw.error });
        }
        match (raw.result_image, raw.coordinates) {
            (Some(result_image), Some(coordinates)) => Ok(Self::Ok {
                result_image,
                coordinates,
            }),
            (None, _) => Err("successful response without `result_image`".to_string()),
            (_, None) => Err("successful response without `coordinates`".to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct HealthStatus {
    status: String,
}

/// Builds the `image` form part. A type the multipart encoder cannot parse is
/// sent as a plain binary part instead.
fn image_part(data: &Bytes, file_name: &str, mime_type: &str) -> Result<Part, PredictionError> {
    let part = || Part::bytes(data.to_vec()).file_name(file_name.to_string());
    match part().mime_str(mime_type) {
        Ok(part) => Ok(part),
        Err(e) => {
            tracing::warn!("Unusable MIME type {:?} ({}), sending as binary", mime_type, e);
            part()
                .mime_str(FALLBACK_MIME_TYPE)
                .map_err(|e| PredictionError::InvalidRequest(e.to_string()))
        }
    }
}

#[async_trait]
pub trait PredictionClient: Send + Sync {
    async fn predict(&self, request: PredictRequest) -> Result<PredictResponse, PredictionError>;
}

pub struct HttpPredictionClient {
    client: reqwest::Client,
    address: String,
}

impl HttpPredictionClient {
    pub fn new(config: &PredictionServiceConfig) -> Self {
        Self::with_address(config.get_address())
    }

    pub fn with_address(address: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            address: address.into().trim_end_matches('/').to_string(),
        }
    }

    /// Probes `/health`; true when the service reports itself healthy.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<bool, PredictionError> {
        let url = format!("{}{}", self.address, HEALTH_PATH);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| PredictionError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            tracing::warn!("Health check returned {}", response.status());
            return Ok(false);
        }

        let health: HealthStatus = response
            .json()
            .await
            .map_err(|e| PredictionError::InvalidResponse(e.to_string()))?;

        Ok(health.status == "healthy")
    }
}

#[async_trait]
impl PredictionClient for HttpPredictionClient {
    #[instrument(skip(self, request), fields(model = %request.model, file = %request.file_name))]
    async fn predict(&self, request: PredictRequest) -> Result<PredictResponse, PredictionError> {
        let url = format!("{}{}", self.address, PREDICT_PATH);

        let part = image_part(&request.image_data, &request.file_name, &request.mime_type)?;
        let form = Form::new()
            .part("image", part)
            .text("model", request.model);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| PredictionError::Connection(e.to_string()))?;

        // Failures come back as JSON too, so the status only goes to the log.
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| PredictionError::Connection(e.to_string()))?;
        tracing::debug!("Prediction service answered {} ({} bytes)", status, body.len());

        serde_json::from_slice(&body).map_err(|e| PredictionError::InvalidResponse(e.to_string()))
    }
}
