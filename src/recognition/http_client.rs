//! HTTP recognition client for the provider's detect endpoint
//!
//! Each call POSTs the raw image bytes with the orientation, rotation and
//! demographics flags enabled, and keeps the response body verbatim.

use super::{RecognitionClient, RecognitionError, RecognitionOutcome, RecognitionRateLimiter};
use crate::config::RecognitionConfig;
use crate::constants::provider;
use crate::models::RecognitionResult;
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone)]
pub struct HttpRecognitionClient {
    http_client: reqwest::Client,
    endpoint: Url,
    authorization: String,
    mime_type: String,
    rate_limiter: Arc<RecognitionRateLimiter>,
}

impl HttpRecognitionClient {
    /// Build a client with its own limiter from configuration
    pub fn from_config(config: &RecognitionConfig) -> Result<Self, RecognitionError> {
        let rate_limiter = Arc::new(RecognitionRateLimiter::from_config(config)?);
        Self::with_rate_limiter(config, rate_limiter)
    }

    /// Build a client that shares an existing limiter
    pub fn with_rate_limiter(
        config: &RecognitionConfig,
        rate_limiter: Arc<RecognitionRateLimiter>,
    ) -> Result<Self, RecognitionError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| RecognitionError::Transport(e.to_string()))?;

        Ok(Self {
            http_client,
            endpoint: Self::build_endpoint(&config.url)?,
            authorization: config.authorization.clone(),
            mime_type: config.mime_type.clone(),
            rate_limiter,
        })
    }

    /// Provider URL with every recognition flag enabled
    pub fn build_endpoint(base_url: &str) -> Result<Url, RecognitionError> {
        let mut url = Url::parse(base_url).map_err(|e| {
            RecognitionError::Transport(format!("invalid recognition url '{base_url}': {e}"))
        })?;

        url.query_pairs_mut()
            .clear()
            .extend_pairs(provider::ENABLED_FLAGS.iter().map(|flag| (*flag, "true")));

        Ok(url)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn rate_limiter(&self) -> &Arc<RecognitionRateLimiter> {
        &self.rate_limiter
    }
}

#[async_trait]
impl RecognitionClient for HttpRecognitionClient {
    async fn recognize(&self, image: Bytes) -> RecognitionOutcome {
        self.rate_limiter.acquire().await;

        let image_len = image.len();
        let response = self
            .http_client
            .post(self.endpoint.clone())
            .header(AUTHORIZATION, &self.authorization)
            .header(ACCEPT, &self.mime_type)
            .header(CONTENT_TYPE, &self.mime_type)
            .body(image)
            .send()
            .await
            .map_err(|e| RecognitionError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RecognitionError::Transport(e.to_string()))?;

        if status != StatusCode::OK {
            warn!(status = status.as_u16(), "Recognition provider returned non-200 status");
            return Err(RecognitionError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }

        let result = RecognitionResult::from_raw(body)
            .map_err(|e| RecognitionError::MalformedResponse(e.to_string()))?;

        debug!(
            image_bytes = image_len,
            faces = result.face_count(),
            "Recognition call completed"
        );

        Ok(result)
    }
}
