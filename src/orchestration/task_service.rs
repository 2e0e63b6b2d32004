//! # Face Scan Service
//!
//! The operations exposed to callers: create, extend, start, read and
//! delete tasks. Raw bytes go to the blob store, records to the task store,
//! and starts are delegated to the [`RecognitionOrchestrator`].
//!
//! ## Consistency
//!
//! Create and extend save the blob first and remove it again if the store
//! write fails. Delete commits the store delete first; blob removal failures
//! after that are reported as `BlobStorageFailed` while the task is already
//! gone.

use super::orchestrator::RecognitionOrchestrator;
use super::types::{NewTaskImage, TaskStart, TaskView};
use crate::blob::{BlobStore, FsBlobStore};
use crate::config::FaceScanConfig;
use crate::constants::operations;
use crate::database::DatabaseConnection;
use crate::error::{FaceScanError, FaceScanResult};
use crate::logging::{log_error, log_task_operation};
use crate::models::NewImage;
use crate::recognition::{HttpRecognitionClient, RecognitionClient};
use crate::state_machine::TaskState;
use crate::store::{PgTaskStore, TaskStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

pub struct FaceScanService {
    store: Arc<dyn TaskStore>,
    blobs: Arc<dyn BlobStore>,
    orchestrator: RecognitionOrchestrator,
    detach_runs: bool,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for FaceScanService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaceScanService")
            .field("detach_runs", &self.detach_runs)
            .finish_non_exhaustive()
    }
}

impl FaceScanService {
    pub fn new(
        store: Arc<dyn TaskStore>,
        blobs: Arc<dyn BlobStore>,
        recognition_client: Arc<dyn RecognitionClient>,
    ) -> Self {
        let orchestrator = RecognitionOrchestrator::new(store.clone(), recognition_client);
        Self {
            store,
            blobs,
            orchestrator,
            detach_runs: false,
            shutdown: CancellationToken::new(),
        }
    }

    /// Return from `start_task` once the task is Pending instead of waiting
    /// for the run
    pub fn with_detached_runs(mut self, detach_runs: bool) -> Self {
        self.detach_runs = detach_runs;
        self
    }

    /// Wire the PostgreSQL store, filesystem blobs and HTTP client from configuration
    pub async fn from_config(config: &FaceScanConfig) -> FaceScanResult<Self> {
        config.validate()?;

        let connection = DatabaseConnection::new(&config.database)
            .await
            .map_err(|e| FaceScanError::persistence("connect", e))?;
        connection
            .migrate()
            .await
            .map_err(|e| FaceScanError::persistence("migrate", e))?;

        let store: Arc<dyn TaskStore> = Arc::new(PgTaskStore::new(connection.pool().clone()));
        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::from_config(&config.blob_storage));
        let client: Arc<dyn RecognitionClient> = Arc::new(
            HttpRecognitionClient::from_config(&config.recognition)
                .map_err(|e| FaceScanError::Configuration(e.to_string()))?,
        );

        Ok(Self::new(store, blobs, client).with_detached_runs(config.orchestration.detach_runs))
    }

    pub fn orchestrator(&self) -> &RecognitionOrchestrator {
        &self.orchestrator
    }

    /// Cancels every recognition run started through this service
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Create a task with one image under a fresh id
    pub async fn create_task(&self, image: NewTaskImage) -> FaceScanResult<Uuid> {
        let task_uuid = Uuid::new_v4();
        self.create_task_with_id(task_uuid, image).await?;
        Ok(task_uuid)
    }

    /// Create a task under a caller-chosen id
    pub async fn create_task_with_id(
        &self,
        task_uuid: Uuid,
        image: NewTaskImage,
    ) -> FaceScanResult<()> {
        ensure_image_payload(&image)?;
        let image_uuid = image.image_uuid;
        let file_ref = self.blobs.save(image_uuid, image.raw_image.clone()).await?;

        let created = self
            .store
            .create_task(task_uuid, NewImage::new(image_uuid, file_ref, image.raw_image))
            .await;

        if let Err(err) = created {
            self.discard_blob(image_uuid).await;
            return Err(err.into());
        }

        log_task_operation(
            operations::CREATE_TASK,
            Some(task_uuid),
            TaskState::New.as_str(),
            None,
        );
        Ok(())
    }

    /// Add an image to a task that has not been started, returning the image id
    pub async fn extend_task(&self, task_uuid: Uuid, image: NewTaskImage) -> FaceScanResult<Uuid> {
        ensure_image_payload(&image)?;
        let status = self.store.get_status(task_uuid).await?;
        if !status.accepts_images() {
            return Err(FaceScanError::TaskAlreadyStarted { task_uuid, status });
        }

        let image_uuid = image.image_uuid;
        let file_ref = self.blobs.save(image_uuid, image.raw_image.clone()).await?;

        // The store re-checks the status under its own lock
        let extended = self
            .store
            .extend_task(task_uuid, NewImage::new(image_uuid, file_ref, image.raw_image))
            .await;

        if let Err(err) = extended {
            self.discard_blob(image_uuid).await;
            return Err(err.into());
        }

        log_task_operation(
            operations::EXTEND_TASK,
            Some(task_uuid),
            status.as_str(),
            Some(&format!("image {image_uuid}")),
        );
        Ok(image_uuid)
    }

    /// Start the recognition run for a task
    pub async fn start_task(&self, task_uuid: Uuid) -> FaceScanResult<TaskStart> {
        let cancel = self.shutdown.child_token();
        if self.detach_runs {
            let handle = self
                .orchestrator
                .start_task_detached(task_uuid, cancel)
                .await?;
            Ok(TaskStart::Detached { task_uuid, handle })
        } else {
            let summary = self.orchestrator.start_task(task_uuid, cancel).await?;
            Ok(TaskStart::Completed(summary))
        }
    }

    /// Current status, per-image outcomes and freshly aggregated statistics
    pub async fn get_task(&self, task_uuid: Uuid) -> FaceScanResult<TaskView> {
        let task = self.store.get_task(task_uuid).await?;
        debug!(task_uuid = %task_uuid, status = %task.status, "Task loaded");
        Ok(TaskView::from(&task))
    }

    /// Delete a task and its images in any status
    pub async fn delete_task(&self, task_uuid: Uuid) -> FaceScanResult<()> {
        let image_uuids = self.store.delete_task(task_uuid).await?;

        let mut first_failure = None;
        for image_uuid in image_uuids {
            match self.blobs.delete(image_uuid).await {
                Ok(()) => {}
                Err(err) if err.is_not_found() => {
                    warn!(task_uuid = %task_uuid, image_uuid = %image_uuid, "Blob already missing");
                }
                Err(err) => {
                    log_error(
                        "task_service",
                        operations::DELETE_TASK,
                        &err.to_string(),
                        Some(&format!("task {task_uuid}")),
                    );
                    first_failure.get_or_insert(err);
                }
            }
        }

        log_task_operation(operations::DELETE_TASK, Some(task_uuid), "deleted", None);

        match first_failure {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    async fn discard_blob(&self, image_uuid: Uuid) {
        if let Err(err) = self.blobs.delete(image_uuid).await {
            warn!(image_uuid = %image_uuid, error = %err, "Failed to discard blob after store error");
        }
    }
}

fn ensure_image_payload(image: &NewTaskImage) -> FaceScanResult<()> {
    if image.raw_image.is_empty() {
        return Err(FaceScanError::Validation(format!(
            "image {} has an empty payload",
            image.image_uuid
        )));
    }
    Ok(())
}
