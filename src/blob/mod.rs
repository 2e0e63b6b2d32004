//! # Blob Storage
//!
//! Raw image bytes are kept outside the task store, addressed by image UUID.
//! `FsBlobStore` writes one file per image under a root directory;
//! `InMemoryBlobStore` backs tests and embedded use.

pub mod filesystem;
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use uuid::Uuid;

pub use filesystem::FsBlobStore;
pub use memory::InMemoryBlobStore;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("Blob for image {image_uuid} not found")]
    NotFound { image_uuid: Uuid },

    #[error("Blob for image {image_uuid} already exists")]
    AlreadyExists { image_uuid: Uuid },

    #[error("I/O error for image {image_uuid}: {source}")]
    Io {
        image_uuid: Uuid,
        #[source]
        source: std::io::Error,
    },
}

impl BlobError {
    pub fn image_uuid(&self) -> Uuid {
        match self {
            Self::NotFound { image_uuid }
            | Self::AlreadyExists { image_uuid }
            | Self::Io { image_uuid, .. } => *image_uuid,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type BlobResult<T> = Result<T, BlobError>;

/// Storage for raw image bytes keyed by image UUID
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes for an image that has none yet, returning the file reference
    async fn save(&self, image_uuid: Uuid, data: Bytes) -> BlobResult<String>;

    async fn load(&self, image_uuid: Uuid) -> BlobResult<Bytes>;

    /// Remove the blob; removing a missing blob is `NotFound`
    async fn delete(&self, image_uuid: Uuid) -> BlobResult<()>;

    async fn exists(&self, image_uuid: Uuid) -> BlobResult<bool>;
}
