//! # Task Store
//!
//! Persistence contract consumed by the state machine, the orchestrator and
//! the service layer, plus two implementations:
//!
//! - [`PgTaskStore`] - PostgreSQL via SQLx (production)
//! - [`InMemoryTaskStore`] - lock-sharded in-process map (tests, embedding)
//!
//! ## Atomicity Requirements
//!
//! - `create_task` and `delete_task` commit the task row and its image rows together.
//! - `set_status` is a single conditional write: it succeeds only when the
//!   stored status equals `expected`, which is what makes `New -> Pending`
//!   safe against concurrent starts.
//! - `extend_task` refuses to add images unless the task is `New` at the
//!   moment of insertion.
//! - `set_image_outcome` is write-once per image.

pub mod memory;
pub mod postgres;

pub use memory::InMemoryTaskStore;
pub use postgres::PgTaskStore;

use crate::models::{ImageOutcome, NewImage, Task};
use crate::state_machine::TaskState;
use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Task {task_uuid} not found")]
    NotFound { task_uuid: Uuid },

    #[error("Task {task_uuid} already exists")]
    DuplicateTask { task_uuid: Uuid },

    #[error("Image {image_uuid} already exists")]
    DuplicateImage { image_uuid: Uuid },

    #[error("Status conflict for task {task_uuid}: expected {expected}, found {actual:?}")]
    StatusConflict {
        task_uuid: Uuid,
        expected: TaskState,
        actual: Option<TaskState>,
    },

    #[error("Task {task_uuid} does not accept images in status {status}")]
    NotAcceptingImages { task_uuid: Uuid, status: TaskState },

    #[error("Image {image_uuid} not found in task {task_uuid}")]
    ImageNotFound { task_uuid: Uuid, image_uuid: Uuid },

    #[error("Outcome already recorded for image {image_uuid}")]
    OutcomeAlreadyRecorded { image_uuid: Uuid },

    #[error("Refusing to record a pending outcome for image {image_uuid}")]
    InvalidOutcome { image_uuid: Uuid },

    #[error("Corrupt record: {reason}")]
    CorruptRecord { reason: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence operations required by the task lifecycle
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Load a task with all of its images
    async fn get_task(&self, task_uuid: Uuid) -> StoreResult<Task>;

    /// Read only the stored status
    async fn get_status(&self, task_uuid: Uuid) -> StoreResult<TaskState>;

    /// Insert a new task in status `New` together with its first image
    async fn create_task(&self, task_uuid: Uuid, first_image: NewImage) -> StoreResult<()>;

    /// Append an image to a task that is still `New`
    async fn extend_task(&self, task_uuid: Uuid, image: NewImage) -> StoreResult<()>;

    /// Compare-and-swap the task status
    async fn set_status(
        &self,
        task_uuid: Uuid,
        expected: TaskState,
        new_status: TaskState,
    ) -> StoreResult<()>;

    /// Record the recognition outcome of one image (write-once)
    async fn set_image_outcome(
        &self,
        task_uuid: Uuid,
        image_uuid: Uuid,
        outcome: &ImageOutcome,
    ) -> StoreResult<()>;

    /// Delete a task and all of its images, returning the removed image ids
    async fn delete_task(&self, task_uuid: Uuid) -> StoreResult<Vec<Uuid>>;
}
