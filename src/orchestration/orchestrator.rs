//! # Recognition Orchestrator
//!
//! Drives a task from New through Pending to a terminal status.
//!
//! ## Run Lifecycle
//!
//! 1. Load the task and require `New`.
//! 2. Compare-and-swap `New -> Pending`; a concurrent start loses here and
//!    sees `TaskAlreadyStarted`, so at most one fan-out runs per task.
//! 3. Re-load the task and spawn one unit per unresolved image into a
//!    `JoinSet`. Units are throttled only by the recognition client's own
//!    rate limiter. If the re-load fails the claimed task is aborted to
//!    `Failed` so it never stays Pending without a run.
//! 4. Collect outcomes in arrival order, persisting each as soon as it
//!    arrives. Per-image persistence failures are logged, not propagated.
//! 5. Once every unit has reported, classify the tally and compare-and-swap
//!    `Pending -> terminal`.
//!
//! Cancellation is pushed into the units: each one races its recognition
//! call against the token and reports `Failed { reason: "cancelled" }` when
//! the token wins. The collector still joins every unit, so a cancelled run
//! ends in a terminal status and leaves no writes behind it.

use super::types::TaskRunSummary;
use crate::constants::{operations, CANCELLED_REASON};
use crate::error::{FaceScanError, FaceScanResult};
use crate::logging::{log_error, log_image_operation, log_task_operation};
use crate::models::{ImageOutcome, RecognitionResult};
use crate::recognition::{RecognitionClient, RecognitionError};
use crate::state_machine::{OutcomeTally, TaskEvent, TaskState, TaskStateMachine};
use crate::store::TaskStore;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// One image handed to a recognition unit
#[derive(Debug, Clone)]
struct RecognitionWork {
    image_uuid: Uuid,
    raw_image: Bytes,
}

type UnitReport = (Uuid, Result<RecognitionResult, RecognitionError>);

#[derive(Clone)]
pub struct RecognitionOrchestrator {
    store: Arc<dyn TaskStore>,
    recognition_client: Arc<dyn RecognitionClient>,
}

impl std::fmt::Debug for RecognitionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionOrchestrator").finish_non_exhaustive()
    }
}

impl RecognitionOrchestrator {
    pub fn new(store: Arc<dyn TaskStore>, recognition_client: Arc<dyn RecognitionClient>) -> Self {
        Self {
            store,
            recognition_client,
        }
    }

    /// Start a task and wait for its recognition run to finish
    ///
    /// The run is supervised on its own task, so dropping this future does
    /// not strand the task in Pending.
    pub async fn start_task(
        &self,
        task_uuid: Uuid,
        cancel: CancellationToken,
    ) -> FaceScanResult<TaskRunSummary> {
        let handle = self.start_task_detached(task_uuid, cancel).await?;
        handle.await.map_err(|join_error| FaceScanError::RunAborted {
            task_uuid,
            reason: join_error.to_string(),
        })?
    }

    /// Start a task and return once it is Pending
    ///
    /// Guard failures are returned directly; the run itself continues on the
    /// returned handle.
    pub async fn start_task_detached(
        &self,
        task_uuid: Uuid,
        cancel: CancellationToken,
    ) -> FaceScanResult<JoinHandle<FaceScanResult<TaskRunSummary>>> {
        let (state_machine, work) = self.begin(task_uuid).await?;
        let orchestrator = self.clone();
        Ok(tokio::spawn(async move {
            let runner = orchestrator.clone();
            let run = tokio::spawn(async move { runner.run(state_machine, work, cancel).await });
            match run.await {
                Ok(result) => result,
                Err(join_error) => {
                    let err = FaceScanError::RunAborted {
                        task_uuid,
                        reason: join_error.to_string(),
                    };
                    let mut state_machine = TaskStateMachine::new(
                        task_uuid,
                        TaskState::Pending,
                        orchestrator.store.clone(),
                    );
                    orchestrator.abort_claimed(&mut state_machine, &err).await;
                    Err(err)
                }
            }
        }))
    }

    /// Check the start guard, claim the task and snapshot its images
    async fn begin(
        &self,
        task_uuid: Uuid,
    ) -> FaceScanResult<(TaskStateMachine, Vec<RecognitionWork>)> {
        let task = self.store.get_task(task_uuid).await?;
        if task.status != TaskState::New {
            return Err(FaceScanError::TaskAlreadyStarted {
                task_uuid,
                status: task.status,
            });
        }

        let mut state_machine = TaskStateMachine::new(task_uuid, task.status, self.store.clone());
        state_machine.transition(TaskEvent::Start).await?;

        // Images committed before the claim; none can be added after it
        let task = match self.store.get_task(task_uuid).await {
            Ok(task) => task,
            Err(err) => {
                let err = FaceScanError::from(err);
                self.abort_claimed(&mut state_machine, &err).await;
                return Err(err);
            }
        };
        let work: Vec<RecognitionWork> = task
            .unresolved_images()
            .map(|image| RecognitionWork {
                image_uuid: image.image_uuid,
                raw_image: image.raw_image.clone(),
            })
            .collect();

        log_task_operation(
            operations::START_TASK,
            Some(task_uuid),
            TaskState::Pending.as_str(),
            Some(&format!("{} images", work.len())),
        );

        Ok((state_machine, work))
    }

    async fn run(
        &self,
        mut state_machine: TaskStateMachine,
        work: Vec<RecognitionWork>,
        cancel: CancellationToken,
    ) -> FaceScanResult<TaskRunSummary> {
        let started = Instant::now();
        let task_uuid = state_machine.task_uuid();

        let mut units: JoinSet<UnitReport> = JoinSet::new();
        let mut unit_images = HashMap::with_capacity(work.len());

        for RecognitionWork {
            image_uuid,
            raw_image,
        } in work
        {
            let client = self.recognition_client.clone();
            let cancel = cancel.clone();
            let handle = units.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(RecognitionError::Cancelled),
                    result = client.recognize(raw_image) => result,
                };
                (image_uuid, outcome)
            });
            unit_images.insert(handle.id(), image_uuid);
        }

        debug!(task_uuid = %task_uuid, units = units.len(), "Recognition fan-out started");

        let mut tally = OutcomeTally::default();
        while let Some(joined) = units.join_next().await {
            let (image_uuid, outcome) = match joined {
                Ok((image_uuid, Ok(result))) => (image_uuid, ImageOutcome::Succeeded(result)),
                Ok((image_uuid, Err(err))) => {
                    let reason = match err {
                        RecognitionError::Cancelled => CANCELLED_REASON.to_string(),
                        other => FaceScanError::recognition(image_uuid, &other).to_string(),
                    };
                    (image_uuid, ImageOutcome::failed(reason))
                }
                Err(join_error) => {
                    tally.record_failure();
                    match unit_images.get(&join_error.id()).copied() {
                        Some(image_uuid) => {
                            warn!(task_uuid = %task_uuid, image_uuid = %image_uuid, error = %join_error, "Recognition unit aborted");
                            self.record_outcome(
                                task_uuid,
                                image_uuid,
                                &ImageOutcome::failed(format!("recognition unit aborted: {join_error}")),
                            )
                            .await;
                        }
                        None => {
                            warn!(task_uuid = %task_uuid, error = %join_error, "Unidentified recognition unit aborted");
                        }
                    }
                    continue;
                }
            };

            if outcome.is_success() {
                tally.record_success();
            } else {
                tally.record_failure();
            }
            self.record_outcome(task_uuid, image_uuid, &outcome).await;
        }

        let final_status = match state_machine.transition(TaskEvent::Finish(tally)).await {
            Ok(status) => status,
            Err(err) => {
                let err = FaceScanError::from(err);
                log_error(
                    "orchestrator",
                    operations::FINALIZE_TASK,
                    &err.to_string(),
                    Some(&task_uuid.to_string()),
                );
                return Err(err);
            }
        };

        let summary = TaskRunSummary {
            task_uuid,
            final_status,
            succeeded: tally.succeeded,
            failed: tally.failed,
            elapsed: started.elapsed(),
        };

        info!(
            task_uuid = %task_uuid,
            final_status = %final_status,
            succeeded = summary.succeeded,
            failed = summary.failed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            cancelled = cancel.is_cancelled(),
            "Recognition run finished"
        );

        Ok(summary)
    }

    /// Move a claimed task from Pending to Failed after its run could not proceed
    ///
    /// The original error is what the caller sees; a failed abort is only logged.
    async fn abort_claimed(&self, state_machine: &mut TaskStateMachine, cause: &FaceScanError) {
        let task_uuid = state_machine.task_uuid();
        log_error(
            "orchestrator",
            operations::START_TASK,
            &cause.to_string(),
            Some(&task_uuid.to_string()),
        );

        match state_machine.transition(TaskEvent::Abort).await {
            Ok(status) => warn!(task_uuid = %task_uuid, status = %status, "Recognition run aborted"),
            Err(err) => log_error(
                "orchestrator",
                operations::FINALIZE_TASK,
                &FaceScanError::from(err).to_string(),
                Some(&task_uuid.to_string()),
            ),
        }
    }

    /// Persist one image outcome; failures are logged and swallowed
    async fn record_outcome(&self, task_uuid: Uuid, image_uuid: Uuid, outcome: &ImageOutcome) {
        match self
            .store
            .set_image_outcome(task_uuid, image_uuid, outcome)
            .await
        {
            Ok(()) => log_image_operation(
                operations::RECORD_IMAGE_OUTCOME,
                task_uuid,
                image_uuid,
                if outcome.is_success() {
                    "succeeded"
                } else {
                    "failed"
                },
                outcome.failure_reason(),
            ),
            Err(err) => log_error(
                "orchestrator",
                operations::RECORD_IMAGE_OUTCOME,
                &err.to_string(),
                Some(&format!("task {task_uuid} image {image_uuid}")),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewImage;
    use crate::store::InMemoryTaskStore;
    use async_trait::async_trait;

    /// Succeeds for every image whose first byte is non-zero
    struct FirstByteClient;

    #[async_trait]
    impl RecognitionClient for FirstByteClient {
        async fn recognize(&self, image: Bytes) -> Result<RecognitionResult, RecognitionError> {
            match image.first() {
                Some(0) | None => Err(RecognitionError::UnexpectedStatus {
                    status: 500,
                    body: "boom".to_string(),
                }),
                Some(_) => Ok(RecognitionResult::from_raw(r#"{"data": []}"#).unwrap()),
            }
        }
    }

    async fn task_with(store: &Arc<dyn TaskStore>, images: &[u8]) -> Uuid {
        let task_uuid = Uuid::new_v4();
        let mut iter = images.iter();
        let first = *iter.next().unwrap();
        store
            .create_task(task_uuid, NewImage::new(Uuid::new_v4(), "0.jpeg", vec![first]))
            .await
            .unwrap();
        for byte in iter {
            store
                .extend_task(task_uuid, NewImage::new(Uuid::new_v4(), "n.jpeg", vec![*byte]))
                .await
                .unwrap();
        }
        task_uuid
    }

    fn orchestrator(store: &Arc<dyn TaskStore>) -> RecognitionOrchestrator {
        RecognitionOrchestrator::new(store.clone(), Arc::new(FirstByteClient))
    }

    #[tokio::test]
    async fn test_mixed_outcomes_partially_succeed() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let task_uuid = task_with(&store, &[1, 0, 1]).await;

        let summary = orchestrator(&store)
            .start_task(task_uuid, CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(summary.final_status, TaskState::PartiallySuccess);
        assert_eq!((summary.succeeded, summary.failed), (2, 1));

        let task = store.get_task(task_uuid).await.unwrap();
        assert_eq!(task.results().count(), 2);
        assert!(task.unresolved_images().next().is_none());
    }

    #[tokio::test]
    async fn test_start_requires_new() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let task_uuid = task_with(&store, &[1]).await;
        let orchestrator = orchestrator(&store);

        orchestrator
            .start_task(task_uuid, CancellationToken::new())
            .await
            .unwrap();
        let err = orchestrator
            .start_task(task_uuid, CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(
            err,
            FaceScanError::TaskAlreadyStarted {
                task_uuid,
                status: TaskState::Success
            }
        );
    }

    #[tokio::test]
    async fn test_missing_task() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let task_uuid = Uuid::new_v4();
        let err = orchestrator(&store)
            .start_task(task_uuid, CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, FaceScanError::TaskNotFound { task_uuid });
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_still_terminates() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let task_uuid = task_with(&store, &[1, 1]).await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let summary = orchestrator(&store)
            .start_task(task_uuid, cancel)
            .await
            .unwrap();

        assert_eq!(summary.final_status, TaskState::Failed);
        let task = store.get_task(task_uuid).await.unwrap();
        assert!(task
            .images
            .iter()
            .all(|image| image.outcome.failure_reason() == Some(CANCELLED_REASON)));
    }

    #[tokio::test]
    async fn test_detached_run_completes() {
        let store: Arc<dyn TaskStore> = Arc::new(InMemoryTaskStore::new());
        let task_uuid = task_with(&store, &[1]).await;

        let handle = orchestrator(&store)
            .start_task_detached(task_uuid, CancellationToken::new())
            .await
            .unwrap();
        let summary = handle.await.unwrap().unwrap();

        assert_eq!(summary.final_status, TaskState::Success);
        assert_eq!(
            store.get_status(task_uuid).await.unwrap(),
            TaskState::Success
        );
    }
}
