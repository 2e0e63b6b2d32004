//! Request and response types for the face scan service

use super::aggregator::{self, TaskStats};
use crate::constants::operations;
use crate::error::{FaceScanError, FaceScanResult};
use crate::logging::log_error;
use crate::models::{DetectedFace, ImageOutcome, ImageRecord, Task};
use crate::state_machine::TaskState;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Image submitted to create or extend a task
#[derive(Debug, Clone, PartialEq)]
pub struct NewTaskImage {
    pub image_uuid: Uuid,
    pub raw_image: Bytes,
}

impl NewTaskImage {
    /// New image with a freshly generated id
    pub fn new(raw_image: impl Into<Bytes>) -> Self {
        Self::with_id(Uuid::new_v4(), raw_image)
    }

    pub fn with_id(image_uuid: Uuid, raw_image: impl Into<Bytes>) -> Self {
        Self {
            image_uuid,
            raw_image: raw_image.into(),
        }
    }
}

/// Result of one recognition run over a task
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRunSummary {
    pub task_uuid: Uuid,
    pub final_status: TaskState,
    pub succeeded: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

/// How `start_task` handed off the recognition run
#[derive(Debug)]
pub enum TaskStart {
    /// The run finished before `start_task` returned
    Completed(TaskRunSummary),
    /// The task is Pending and the run continues in the background
    Detached {
        task_uuid: Uuid,
        handle: JoinHandle<FaceScanResult<TaskRunSummary>>,
    },
}

impl TaskStart {
    /// Wait for the run to finish regardless of how it was started
    pub async fn wait(self) -> FaceScanResult<TaskRunSummary> {
        match self {
            Self::Completed(summary) => Ok(summary),
            Self::Detached { task_uuid, handle } => match handle.await {
                Ok(result) => result,
                Err(join_error) => {
                    let err = FaceScanError::RunAborted {
                        task_uuid,
                        reason: join_error.to_string(),
                    };
                    log_error(
                        "task_start",
                        operations::START_TASK,
                        &err.to_string(),
                        Some(&task_uuid.to_string()),
                    );
                    Err(err)
                }
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageStatus {
    Pending,
    Succeeded,
    Failed,
}

/// Read view of one image and its recognition outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageView {
    pub image_uuid: Uuid,
    pub file_name: String,
    pub status: ImageStatus,
    pub faces: Vec<DetectedFace>,
    pub raw_response: Option<String>,
    pub error: Option<String>,
}

impl From<&ImageRecord> for ImageView {
    fn from(image: &ImageRecord) -> Self {
        let (status, faces, raw_response, error) = match &image.outcome {
            ImageOutcome::Pending => (ImageStatus::Pending, Vec::new(), None, None),
            ImageOutcome::Succeeded(result) => (
                ImageStatus::Succeeded,
                result.detections.clone(),
                Some(result.raw_response.clone()),
                None,
            ),
            ImageOutcome::Failed { reason } => {
                (ImageStatus::Failed, Vec::new(), None, Some(reason.clone()))
            }
        };

        Self {
            image_uuid: image.image_uuid,
            file_name: image.file_name.clone(),
            status,
            faces,
            raw_response,
            error,
        }
    }
}

/// Read view of a task with freshly computed statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskView {
    pub task_uuid: Uuid,
    pub status: TaskState,
    pub images: Vec<ImageView>,
    pub stats: TaskStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&Task> for TaskView {
    fn from(task: &Task) -> Self {
        Self {
            task_uuid: task.task_uuid,
            status: task.status,
            images: task.images.iter().map(ImageView::from).collect(),
            stats: aggregator::aggregate(task.results()),
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

impl TaskView {
    pub fn image(&self, image_uuid: Uuid) -> Option<&ImageView> {
        self.images.iter().find(|image| image.image_uuid == image_uuid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewImage, RecognitionResult};

    #[test]
    fn test_task_view_reflects_outcomes() {
        let mut ok = ImageRecord::from_new(NewImage::new(Uuid::new_v4(), "a.jpeg", vec![1]));
        ok.outcome = ImageOutcome::Succeeded(
            RecognitionResult::from_raw(
                r#"{"data": [{"bbox": {"height": 1, "width": 1, "x": 0, "y": 0},
                    "demographics": {"age": {"mean": 30.0}, "gender": "male"}}]}"#,
            )
            .unwrap(),
        );
        let mut failed = ImageRecord::from_new(NewImage::new(Uuid::new_v4(), "b.jpeg", vec![2]));
        failed.outcome = ImageOutcome::failed("timeout");

        let task = Task {
            task_uuid: Uuid::new_v4(),
            status: TaskState::PartiallySuccess,
            images: vec![ok.clone(), failed.clone()],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let view = TaskView::from(&task);
        assert_eq!(view.stats.male_count, 1);
        assert_eq!(view.stats.average_male_age, Some(30.0));

        let ok_view = view.image(ok.image_uuid).unwrap();
        assert_eq!(ok_view.status, ImageStatus::Succeeded);
        assert_eq!(ok_view.faces.len(), 1);
        assert!(ok_view.raw_response.is_some());

        let failed_view = view.image(failed.image_uuid).unwrap();
        assert_eq!(failed_view.status, ImageStatus::Failed);
        assert_eq!(failed_view.error.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_completed_start_waits_immediately() {
        let summary = TaskRunSummary {
            task_uuid: Uuid::new_v4(),
            final_status: TaskState::Success,
            succeeded: 1,
            failed: 0,
            elapsed: Duration::from_millis(5),
        };
        let start = TaskStart::Completed(summary.clone());
        assert_eq!(start.wait().await.unwrap(), summary);
    }

    #[tokio::test]
    async fn test_aborted_detached_run_is_reported_as_run_aborted() {
        let task_uuid = Uuid::new_v4();
        let handle = tokio::spawn(async {
            std::future::pending::<FaceScanResult<TaskRunSummary>>().await
        });
        handle.abort();

        let err = TaskStart::Detached { task_uuid, handle }
            .wait()
            .await
            .unwrap_err();
        assert!(matches!(err, FaceScanError::RunAborted { task_uuid: id, .. } if id == task_uuid));
    }
}
