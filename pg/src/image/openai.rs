//! OpenAI Images API client

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use super::{ImageClient, ImageError, ImageRequest};
use crate::config::ImageConfig;

/// Maximum number of retries for transient errors
const MAX_RETRIES: u32 = 3;

/// Initial backoff delay for retries
const INITIAL_BACKOFF_MS: u64 = 1000;

/// OpenAI Images API client
pub struct OpenAIImageClient {
    model: String,
    api_key: String,
    base_url: String,
    size: String,
    quality: String,
    http: Client,
}

impl OpenAIImageClient {
    /// Create a new client from configuration
    pub fn from_config(config: &ImageConfig) -> Result<Self, ImageError> {
        debug!(model = %config.model, "OpenAIImageClient::from_config: called");
        let api_key = config
            .api_key()
            .ok_or_else(|| ImageError::MissingApiKey(config.api_key_env.clone()))?;

        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(ImageError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            size: config.size.clone(),
            quality: config.quality.clone(),
            http,
        })
    }

    fn build_request_body(&self, request: &ImageRequest) -> serde_json::Value {
        debug!(%self.model, transparent = request.transparent_background, "build_request_body: called");
        let mut body = serde_json::json!({
            "model": self.model,
            "prompt": request.prompt,
            "size": self.size,
            "quality": self.quality,
            "n": 1,
        });
        if request.transparent_background {
            body["background"] = serde_json::json!("transparent");
        }
        body
    }

    /// Turn the first result into bytes, downloading it if only a URL came back
    async fn resolve_payload(&self, api_response: ImagesResponse) -> Result<Vec<u8>, ImageError> {
        debug!(count = api_response.data.len(), "resolve_payload: called");
        let first = api_response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ImageError::InvalidResponse("Response contained no images".to_string()))?;

        let bytes = match (first.b64_json, first.url) {
            (Some(b64), _) => BASE64.decode(b64.trim())?,
            (None, Some(url)) => {
                debug!(%url, "resolve_payload: downloading image url");
                self.http.get(url).send().await?.error_for_status()?.bytes().await?.to_vec()
            }
            (None, None) => return Err(ImageError::EmptyPayload),
        };

        if bytes.is_empty() {
            return Err(ImageError::EmptyPayload);
        }
        Ok(bytes)
    }
}

#[async_trait]
impl ImageClient for OpenAIImageClient {
    async fn generate(&self, request: ImageRequest) -> Result<Vec<u8>, ImageError> {
        debug!(%self.model, "OpenAIImageClient::generate: called");
        let url = format!("{}/v1/images/generations", self.base_url);
        let body = self.build_request_body(&request);

        let mut last_error = None;
        for attempt in 0..=MAX_RETRIES {
            if attempt > 0 {
                let backoff = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                warn!(attempt, backoff_ms = backoff, "generate: retrying after transient error");
                tokio::time::sleep(Duration::from_millis(backoff)).await;
            }

            let response = match self
                .http
                .post(url.clone())
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    debug!(attempt, error = %e, "generate: network error");
                    last_error = Some(ImageError::Network(e));
                    continue;
                }
            };

            let status = response.status().as_u16();
            if !response.status().is_success() {
                let message = response.text().await.unwrap_or_default();
                let err = ImageError::ApiError { status, message };
                if err.is_retryable() && attempt < MAX_RETRIES {
                    debug!(attempt, status, "generate: retryable error");
                    last_error = Some(err);
                    continue;
                }
                return Err(err);
            }

            let api_response: ImagesResponse = response
                .json()
                .await
                .map_err(|e| ImageError::InvalidResponse(e.to_string()))?;
            return self.resolve_payload(api_response).await;
        }

        Err(last_error.unwrap_or_else(|| ImageError::InvalidResponse("Max retries exceeded".to_string())))
    }
}

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    b64_json: Option<String>,
    url: Option<String>,
}
