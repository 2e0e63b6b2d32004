//! In-process [`TaskStore`] backed by a `DashMap`.
//!
//! Every mutating operation runs under the shard lock of the task's entry,
//! so each one is atomic with respect to the others on the same task.

use super::{StoreError, StoreResult, TaskStore};
use crate::models::{ImageOutcome, ImageRecord, NewImage, Task};
use crate::state_machine::TaskState;
use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    tasks: DashMap<Uuid, Task>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, task_uuid: Uuid) -> bool {
        self.tasks.contains_key(&task_uuid)
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn get_task(&self, task_uuid: Uuid) -> StoreResult<Task> {
        self.tasks
            .get(&task_uuid)
            .map(|task| task.clone())
            .ok_or(StoreError::NotFound { task_uuid })
    }

    async fn get_status(&self, task_uuid: Uuid) -> StoreResult<TaskState> {
        self.tasks
            .get(&task_uuid)
            .map(|task| task.status)
            .ok_or(StoreError::NotFound { task_uuid })
    }

    async fn create_task(&self, task_uuid: Uuid, first_image: NewImage) -> StoreResult<()> {
        match self.tasks.entry(task_uuid) {
            Entry::Occupied(_) => Err(StoreError::DuplicateTask { task_uuid }),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                slot.insert(Task {
                    task_uuid,
                    status: TaskState::New,
                    images: vec![ImageRecord::from_new(first_image)],
                    created_at: now,
                    updated_at: now,
                });
                Ok(())
            }
        }
    }

    async fn extend_task(&self, task_uuid: Uuid, image: NewImage) -> StoreResult<()> {
        let mut task = self
            .tasks
            .get_mut(&task_uuid)
            .ok_or(StoreError::NotFound { task_uuid })?;

        if !task.status.accepts_images() {
            return Err(StoreError::NotAcceptingImages {
                task_uuid,
                status: task.status,
            });
        }

        if task.image(image.image_uuid).is_some() {
            return Err(StoreError::DuplicateImage {
                image_uuid: image.image_uuid,
            });
        }

        task.images.push(ImageRecord::from_new(image));
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn set_status(
        &self,
        task_uuid: Uuid,
        expected: TaskState,
        new_status: TaskState,
    ) -> StoreResult<()> {
        let mut task = self
            .tasks
            .get_mut(&task_uuid)
            .ok_or(StoreError::NotFound { task_uuid })?;

        if task.status != expected {
            return Err(StoreError::StatusConflict {
                task_uuid,
                expected,
                actual: Some(task.status),
            });
        }

        task.status = new_status;
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn set_image_outcome(
        &self,
        task_uuid: Uuid,
        image_uuid: Uuid,
        outcome: &ImageOutcome,
    ) -> StoreResult<()> {
        if !outcome.is_resolved() {
            return Err(StoreError::InvalidOutcome { image_uuid });
        }

        let mut task = self
            .tasks
            .get_mut(&task_uuid)
            .ok_or(StoreError::NotFound { task_uuid })?;

        let image = task
            .images
            .iter_mut()
            .find(|image| image.image_uuid == image_uuid)
            .ok_or(StoreError::ImageNotFound {
                task_uuid,
                image_uuid,
            })?;

        if image.outcome.is_resolved() {
            return Err(StoreError::OutcomeAlreadyRecorded { image_uuid });
        }

        image.outcome = outcome.clone();
        task.updated_at = Utc::now();
        Ok(())
    }

    async fn delete_task(&self, task_uuid: Uuid) -> StoreResult<Vec<Uuid>> {
        let (_, task) = self
            .tasks
            .remove(&task_uuid)
            .ok_or(StoreError::NotFound { task_uuid })?;

        Ok(task.images.iter().map(|image| image.image_uuid).collect())
    }
}
