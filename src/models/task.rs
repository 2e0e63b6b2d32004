//! # Task Model
//!
//! A task groups one or more images submitted for recognition. It owns its
//! image records exclusively; deleting the task deletes them.
//!
//! ## Invariants
//!
//! - The image set only grows, and only while `status == New`.
//! - `status` moves forward only (see [`crate::state_machine::TaskState`]).

use super::image::{ImageOutcome, ImageRecord};
use super::recognition::RecognitionResult;
use crate::state_machine::{OutcomeTally, TaskState};
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub task_uuid: Uuid,
    pub status: TaskState,
    pub images: Vec<ImageRecord>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn image(&self, image_uuid: Uuid) -> Option<&ImageRecord> {
        self.images.iter().find(|image| image.image_uuid == image_uuid)
    }

    /// Images that still need a recognition call
    pub fn unresolved_images(&self) -> impl Iterator<Item = &ImageRecord> {
        self.images
            .iter()
            .filter(|image| !image.outcome.is_resolved())
    }

    /// Successful recognition results currently stored
    pub fn results(&self) -> impl Iterator<Item = &RecognitionResult> {
        self.images.iter().filter_map(|image| image.outcome.result())
    }

    /// Success/failure counts over the recorded outcomes
    pub fn outcome_tally(&self) -> OutcomeTally {
        let mut tally = OutcomeTally::default();
        for image in &self.images {
            match image.outcome {
                ImageOutcome::Succeeded(_) => tally.record_success(),
                ImageOutcome::Failed { .. } => tally.record_failure(),
                ImageOutcome::Pending => {}
            }
        }
        tally
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewImage;

    fn task_with_outcomes(outcomes: Vec<ImageOutcome>) -> Task {
        let images = outcomes
            .into_iter()
            .map(|outcome| {
                let mut record =
                    ImageRecord::from_new(NewImage::new(Uuid::new_v4(), "f.jpeg", vec![1]));
                record.outcome = outcome;
                record
            })
            .collect();

        Task {
            task_uuid: Uuid::new_v4(),
            status: TaskState::Pending,
            images,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_partial_views() {
        let result = RecognitionResult::from_raw(r#"{"data": []}"#).unwrap();
        let task = task_with_outcomes(vec![
            ImageOutcome::Pending,
            ImageOutcome::Succeeded(result),
            ImageOutcome::failed("timeout"),
        ]);

        assert_eq!(task.unresolved_images().count(), 1);
        assert_eq!(task.results().count(), 1);
        assert_eq!(task.outcome_tally(), OutcomeTally::new(1, 1));
    }

    #[test]
    fn test_image_lookup() {
        let task = task_with_outcomes(vec![ImageOutcome::Pending]);
        let image_uuid = task.images[0].image_uuid;
        assert!(task.image(image_uuid).is_some());
        assert!(task.image(Uuid::new_v4()).is_none());
    }
}
