//! In-memory blob store

use super::{BlobError, BlobResult, BlobStore};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<Uuid, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.read().is_empty()
    }
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn save(&self, image_uuid: Uuid, data: Bytes) -> BlobResult<String> {
        let mut blobs = self.blobs.write();
        if blobs.contains_key(&image_uuid) {
            return Err(BlobError::AlreadyExists { image_uuid });
        }
        blobs.insert(image_uuid, data);
        Ok(format!("memory://{image_uuid}"))
    }

    async fn load(&self, image_uuid: Uuid) -> BlobResult<Bytes> {
        self.blobs
            .read()
            .get(&image_uuid)
            .cloned()
            .ok_or(BlobError::NotFound { image_uuid })
    }

    async fn delete(&self, image_uuid: Uuid) -> BlobResult<()> {
        self.blobs
            .write()
            .remove(&image_uuid)
            .map(|_| ())
            .ok_or(BlobError::NotFound { image_uuid })
    }

    async fn exists(&self, image_uuid: Uuid) -> BlobResult<bool> {
        Ok(self.blobs.read().contains_key(&image_uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_delete() {
        let store = InMemoryBlobStore::new();
        let id = Uuid::new_v4();

        let file_ref = store.save(id, Bytes::from_static(b"jpeg")).await.unwrap();
        assert_eq!(file_ref, format!("memory://{id}"));
        assert_eq!(store.load(id).await.unwrap(), Bytes::from_static(b"jpeg"));
        assert!(store.exists(id).await.unwrap());

        store.delete(id).await.unwrap();
        assert!(store.is_empty());
        assert!(store.delete(id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_duplicate_save_rejected() {
        let store = InMemoryBlobStore::new();
        let id = Uuid::new_v4();
        store.save(id, Bytes::from_static(b"a")).await.unwrap();

        let err = store.save(id, Bytes::from_static(b"b")).await.unwrap_err();
        assert!(matches!(err, BlobError::AlreadyExists { .. }));
        assert_eq!(store.load(id).await.unwrap(), Bytes::from_static(b"a"));
    }
}
