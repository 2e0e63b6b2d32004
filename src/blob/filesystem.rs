//! Filesystem blob store: one `<root>/<image_uuid>.<ext>` file per image

use super::{BlobError, BlobResult, BlobStore};
use crate::config::BlobStorageConfig;
use async_trait::async_trait;
use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FsBlobStore {
    root_dir: PathBuf,
    file_extension: String,
}

impl FsBlobStore {
    pub fn new(root_dir: impl Into<PathBuf>, file_extension: impl Into<String>) -> Self {
        Self {
            root_dir: root_dir.into(),
            file_extension: file_extension.into(),
        }
    }

    pub fn from_config(config: &BlobStorageConfig) -> Self {
        Self::new(config.root_dir.clone(), config.file_extension.clone())
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn path_for(&self, image_uuid: Uuid) -> PathBuf {
        self.root_dir
            .join(format!("{image_uuid}.{}", self.file_extension))
    }

    fn io_error(image_uuid: Uuid, source: std::io::Error) -> BlobError {
        match source.kind() {
            ErrorKind::NotFound => BlobError::NotFound { image_uuid },
            ErrorKind::AlreadyExists => BlobError::AlreadyExists { image_uuid },
            _ => BlobError::Io { image_uuid, source },
        }
    }

    /// Write a freshly created blob file, removing it again if the write fails
    async fn write_or_remove<W>(
        image_uuid: Uuid,
        path: &Path,
        file: &mut W,
        data: &[u8],
    ) -> BlobResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let written = match file.write_all(data).await {
            Ok(()) => file.flush().await,
            Err(e) => Err(e),
        };

        if let Err(source) = written {
            if let Err(cleanup) = fs::remove_file(path).await {
                warn!(image_uuid = %image_uuid, path = %path.display(), error = %cleanup, "Failed to remove partial blob");
            }
            return Err(BlobError::Io { image_uuid, source });
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn save(&self, image_uuid: Uuid, data: Bytes) -> BlobResult<String> {
        fs::create_dir_all(&self.root_dir)
            .await
            .map_err(|e| BlobError::Io {
                image_uuid,
                source: e,
            })?;

        let path = self.path_for(image_uuid);
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| Self::io_error(image_uuid, e))?;

        Self::write_or_remove(image_uuid, &path, &mut file, &data).await?;

        debug!(image_uuid = %image_uuid, path = %path.display(), bytes = data.len(), "Blob saved");
        Ok(path.display().to_string())
    }

    async fn load(&self, image_uuid: Uuid) -> BlobResult<Bytes> {
        fs::read(self.path_for(image_uuid))
            .await
            .map(Bytes::from)
            .map_err(|e| Self::io_error(image_uuid, e))
    }

    async fn delete(&self, image_uuid: Uuid) -> BlobResult<()> {
        fs::remove_file(self.path_for(image_uuid))
            .await
            .map_err(|e| Self::io_error(image_uuid, e))?;
        debug!(image_uuid = %image_uuid, "Blob deleted");
        Ok(())
    }

    async fn exists(&self, image_uuid: Uuid) -> BlobResult<bool> {
        fs::try_exists(self.path_for(image_uuid))
            .await
            .map_err(|e| Self::io_error(image_uuid, e))
    }
}
