//! # Recognition Provider
//!
//! Outbound face recognition. `RecognitionClient` is the seam the
//! orchestrator calls once per image; `HttpRecognitionClient` talks to the
//! provider's detect endpoint behind a process-wide `RecognitionRateLimiter`.

pub mod http_client;
pub mod rate_limiter;

use crate::models::RecognitionResult;
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use http_client::HttpRecognitionClient;
pub use rate_limiter::RecognitionRateLimiter;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RecognitionError {
    #[error("Rate limiter rejected request: {0}")]
    RateLimiter(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    #[error("Recognition call cancelled")]
    Cancelled,
}

pub type RecognitionOutcome = Result<RecognitionResult, RecognitionError>;

/// Face recognition for a single image
///
/// Implementations must be safe to call concurrently; any outbound rate
/// limiting happens inside the implementation.
#[async_trait]
pub trait RecognitionClient: Send + Sync {
    async fn recognize(&self, image: Bytes) -> RecognitionOutcome;
}
