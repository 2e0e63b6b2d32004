//! Test harness builders wiring the service over in-memory collaborators

use super::mock_recognition::ScriptedRecognitionClient;
use async_trait::async_trait;
use face_scan_core::blob::InMemoryBlobStore;
use face_scan_core::models::{ImageOutcome, NewImage, Task};
use face_scan_core::orchestration::{FaceScanService, NewTaskImage};
use face_scan_core::state_machine::TaskState;
use face_scan_core::store::{InMemoryTaskStore, StoreError, StoreResult, TaskStore};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub struct TestHarness {
    pub service: FaceScanService,
    pub store: Arc<dyn TaskStore>,
    pub blobs: Arc<InMemoryBlobStore>,
    pub client: Arc<ScriptedRecognitionClient>,
}

impl TestHarness {
    pub fn new(client: ScriptedRecognitionClient) -> Self {
        Self::with_store(Arc::new(InMemoryTaskStore::new()), client)
    }

    pub fn with_store(store: Arc<dyn TaskStore>, client: ScriptedRecognitionClient) -> Self {
        let blobs = Arc::new(InMemoryBlobStore::new());
        let client = Arc::new(client);
        let service = FaceScanService::new(store.clone(), blobs.clone(), client.clone());
        Self {
            service,
            store,
            blobs,
            client,
        }
    }

    pub fn detached(mut self) -> Self {
        self.service = self.service.with_detached_runs(true);
        self
    }

    /// Create a task from the first image and extend it with the rest
    ///
    /// Image bytes are the given strings, matching `with_response` keys.
    pub async fn create_task(&self, images: &[&str]) -> (Uuid, Vec<Uuid>) {
        let (first, rest) = images.split_first().expect("at least one image");
        let first_image = NewTaskImage::new(first.as_bytes().to_vec());
        let mut image_uuids = vec![first_image.image_uuid];

        let task_uuid = self.service.create_task(first_image).await.unwrap();
        for image in rest {
            let image_uuid = self
                .service
                .extend_task(task_uuid, NewTaskImage::new(image.as_bytes().to_vec()))
                .await
                .unwrap();
            image_uuids.push(image_uuid);
        }

        (task_uuid, image_uuids)
    }
}

/// Task store with injectable read and outcome-write failures
pub struct FlakyTaskStore {
    inner: InMemoryTaskStore,
    failing_images: Mutex<HashSet<Uuid>>,
    reads_before_failure: Mutex<Option<usize>>,
    panic_on_outcome_writes: AtomicBool,
}

impl FlakyTaskStore {
    pub fn new() -> Self {
        Self {
            inner: InMemoryTaskStore::new(),
            failing_images: Mutex::new(HashSet::new()),
            reads_before_failure: Mutex::new(None),
            panic_on_outcome_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_outcome_writes_for(&self, image_uuid: Uuid) {
        self.failing_images.lock().insert(image_uuid);
    }

    /// Let `reads` task loads succeed, then fail the next one once
    pub fn fail_read_after(&self, reads: usize) {
        *self.reads_before_failure.lock() = Some(reads);
    }

    pub fn panic_on_outcome_writes(&self) {
        self.panic_on_outcome_writes.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TaskStore for FlakyTaskStore {
    async fn get_task(&self, task_uuid: Uuid) -> StoreResult<Task> {
        let fail = {
            let mut remaining = self.reads_before_failure.lock();
            match *remaining {
                Some(0) => {
                    *remaining = None;
                    true
                }
                Some(n) => {
                    *remaining = Some(n - 1);
                    false
                }
                None => false,
            }
        };
        if fail {
            return Err(StoreError::CorruptRecord {
                reason: "injected read failure".to_string(),
            });
        }
        self.inner.get_task(task_uuid).await
    }

    async fn get_status(&self, task_uuid: Uuid) -> StoreResult<TaskState> {
        self.inner.get_status(task_uuid).await
    }

    async fn create_task(&self, task_uuid: Uuid, first_image: NewImage) -> StoreResult<()> {
        self.inner.create_task(task_uuid, first_image).await
    }

    async fn extend_task(&self, task_uuid: Uuid, image: NewImage) -> StoreResult<()> {
        self.inner.extend_task(task_uuid, image).await
    }

    async fn set_status(
        &self,
        task_uuid: Uuid,
        expected: TaskState,
        new_status: TaskState,
    ) -> StoreResult<()> {
        self.inner.set_status(task_uuid, expected, new_status).await
    }

    async fn set_image_outcome(
        &self,
        task_uuid: Uuid,
        image_uuid: Uuid,
        outcome: &ImageOutcome,
    ) -> StoreResult<()> {
        if self.panic_on_outcome_writes.load(Ordering::SeqCst) {
            panic!("injected outcome write panic");
        }
        if self.failing_images.lock().contains(&image_uuid) {
            return Err(StoreError::CorruptRecord {
                reason: "injected write failure".to_string(),
            });
        }
        self.inner
            .set_image_outcome(task_uuid, image_uuid, outcome)
            .await
    }

    async fn delete_task(&self, task_uuid: Uuid) -> StoreResult<Vec<Uuid>> {
        self.inner.delete_task(task_uuid).await
    }
}
