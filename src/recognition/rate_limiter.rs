//! Shared outbound rate limiter for recognition calls
//!
//! A token bucket admitting `requests_per_second` calls with a capacity of
//! `burst`. Every task's recognition units draw from the same bucket.

use super::RecognitionError;
use crate::config::RecognitionConfig;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::fmt;
use std::num::NonZeroU32;

pub struct RecognitionRateLimiter {
    limiter: DefaultDirectRateLimiter,
    requests_per_second: u32,
    burst: u32,
}

impl fmt::Debug for RecognitionRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecognitionRateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .field("burst", &self.burst)
            .finish_non_exhaustive()
    }
}

impl RecognitionRateLimiter {
    pub fn new(requests_per_second: u32, burst: u32) -> Result<Self, RecognitionError> {
        let rate = NonZeroU32::new(requests_per_second).ok_or_else(|| {
            RecognitionError::RateLimiter("requests_per_second must be positive".to_string())
        })?;
        let capacity = NonZeroU32::new(burst)
            .ok_or_else(|| RecognitionError::RateLimiter("burst must be positive".to_string()))?;

        Ok(Self {
            limiter: RateLimiter::direct(Quota::per_second(rate).allow_burst(capacity)),
            requests_per_second,
            burst,
        })
    }

    pub fn from_config(config: &RecognitionConfig) -> Result<Self, RecognitionError> {
        Self::new(config.requests_per_second, config.burst)
    }

    /// Wait until a token is available
    ///
    /// Dropping the returned future abandons the wait without consuming a token.
    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a token only if one is available right now
    pub fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }
}
