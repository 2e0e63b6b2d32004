//! # Image Record Model
//!
//! One image within a task together with its recognition outcome.
//!
//! The outcome is a tagged variant rather than a nullable result column so
//! that "not yet run" and "call failed" stay distinguishable after a task
//! reaches a terminal status. An outcome leaves `Pending` at most once.

use super::recognition::RecognitionResult;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Recognition outcome for a single image
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ImageOutcome {
    /// No recognition call has completed for this image
    Pending,
    /// The provider returned a parsed result
    Succeeded(RecognitionResult),
    /// The call failed; the reason is kept for inspection and retry tooling
    Failed { reason: String },
}

impl ImageOutcome {
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    /// Whether a recognition attempt has been recorded
    pub fn is_resolved(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded(_))
    }

    pub fn result(&self) -> Option<&RecognitionResult> {
        match self {
            Self::Succeeded(result) => Some(result),
            _ => None,
        }
    }

    pub fn failure_reason(&self) -> Option<&str> {
        match self {
            Self::Failed { reason } => Some(reason),
            _ => None,
        }
    }
}

impl Default for ImageOutcome {
    fn default() -> Self {
        Self::Pending
    }
}

/// Stored image belonging to a task
#[derive(Debug, Clone, PartialEq)]
pub struct ImageRecord {
    pub image_uuid: Uuid,
    /// Handle returned by the blob store for the raw file
    pub file_name: String,
    /// Original bytes, never mutated after creation
    pub raw_image: Bytes,
    pub outcome: ImageOutcome,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    pub fn from_new(image: NewImage) -> Self {
        Self {
            image_uuid: image.image_uuid,
            file_name: image.file_name,
            raw_image: image.raw_image,
            outcome: ImageOutcome::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Image about to be inserted into a task
#[derive(Debug, Clone, PartialEq)]
pub struct NewImage {
    pub image_uuid: Uuid,
    pub file_name: String,
    pub raw_image: Bytes,
}

impl NewImage {
    pub fn new(image_uuid: Uuid, file_name: impl Into<String>, raw_image: impl Into<Bytes>) -> Self {
        Self {
            image_uuid,
            file_name: file_name.into(),
            raw_image: raw_image.into(),
        }
    }
}
