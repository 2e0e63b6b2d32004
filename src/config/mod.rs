//! # Face Scan Configuration
//!
//! Typed configuration for the task store, the recognition provider client,
//! blob storage and the orchestrator.
//!
//! Values come from `config/face-scan.yaml` (optional) and are overridden by
//! `FACE_SCAN__<SECTION>__<KEY>` environment variables; every field has a
//! default so a partial file is valid.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use face_scan_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let rate = manager.config().recognition.requests_per_second;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::defaults;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring face-scan.yaml
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FaceScanConfig {
    /// Database connection and pooling configuration
    pub database: DatabaseConfig,

    /// External recognition provider settings
    pub recognition: RecognitionConfig,

    /// Where raw images are written
    pub blob_storage: BlobStorageConfig,

    /// Recognition run behavior
    pub orchestration: OrchestrationConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: defaults::DATABASE_URL.to_string(),
            max_connections: defaults::DATABASE_MAX_CONNECTIONS,
            acquire_timeout_seconds: defaults::DATABASE_ACQUIRE_TIMEOUT_SECONDS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RecognitionConfig {
    /// Detection endpoint; query flags are appended per request
    pub url: String,
    /// Sent verbatim as the `Authorization` header
    pub authorization: String,
    /// Used for both `Content-Type` and `Accept`
    pub mime_type: String,
    /// Token refill rate of the shared outbound limiter
    pub requests_per_second: u32,
    /// Bucket capacity of the shared outbound limiter
    pub burst: u32,
    pub request_timeout_seconds: u64,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            url: defaults::RECOGNITION_URL.to_string(),
            authorization: String::new(),
            mime_type: defaults::RECOGNITION_MIME_TYPE.to_string(),
            requests_per_second: defaults::RECOGNITION_REQUESTS_PER_SECOND,
            burst: defaults::RECOGNITION_BURST,
            request_timeout_seconds: defaults::RECOGNITION_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl RecognitionConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BlobStorageConfig {
    pub root_dir: PathBuf,
    pub file_extension: String,
}

impl Default for BlobStorageConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from(defaults::BLOB_ROOT_DIR),
            file_extension: defaults::BLOB_FILE_EXTENSION.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OrchestrationConfig {
    /// Return from `start_task` as soon as the task is Pending and let the
    /// recognition run finish in the background
    pub detach_runs: bool,
}

impl FaceScanConfig {
    /// Validate cross-field and range constraints
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "url",
                "database",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool must allow at least one connection",
            ));
        }

        if self.recognition.url.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "url",
                "recognition",
            ));
        }

        url::Url::parse(&self.recognition.url).map_err(|e| {
            ConfigurationError::invalid_value(
                "recognition.url",
                self.recognition.url.clone(),
                e.to_string(),
            )
        })?;

        if self.recognition.requests_per_second == 0 {
            return Err(ConfigurationError::invalid_value(
                "recognition.requests_per_second",
                "0",
                "rate limit must admit at least one request per second",
            ));
        }

        if self.recognition.burst == 0 {
            return Err(ConfigurationError::invalid_value(
                "recognition.burst",
                "0",
                "burst must be at least 1",
            ));
        }

        if self.blob_storage.file_extension.trim().is_empty() {
            return Err(ConfigurationError::missing_required_field(
                "file_extension",
                "blob_storage",
            ));
        }

        Ok(())
    }
}
