//! Error types for the face scan task system.
//!
//! `FaceScanError` is the only error surfaced to callers of the service
//! layer. Subsystem errors (store, blob, recognition, state machine,
//! configuration) convert into it so that the conditions callers branch on
//! (`TaskNotFound`, `DuplicateTask`, `TaskAlreadyStarted`) stay typed.

use crate::blob::BlobError;
use crate::config::ConfigurationError;
use crate::recognition::RecognitionError;
use crate::state_machine::{StateMachineError, TaskState};
use crate::store::StoreError;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FaceScanError {
    #[error("Task {task_uuid} not found")]
    TaskNotFound { task_uuid: Uuid },
    #[error("Task {task_uuid} already exists")]
    DuplicateTask { task_uuid: Uuid },
    #[error("Task {task_uuid} already started (status: {status})")]
    TaskAlreadyStarted { task_uuid: Uuid, status: TaskState },
    #[error("Recognition call failed for image {image_uuid}: {reason}")]
    RecognitionCallFailed { image_uuid: Uuid, reason: String },
    #[error("Persistence failed during {operation}: {reason}")]
    PersistenceFailed { operation: String, reason: String },
    #[error("Blob storage failed for image {image_uuid}: {reason}")]
    BlobStorageFailed { image_uuid: Uuid, reason: String },
    #[error("Recognition run for task {task_uuid} aborted: {reason}")]
    RunAborted { task_uuid: Uuid, reason: String },
    #[error("State machine error: {0}")]
    StateMachine(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Validation error: {0}")]
    Validation(String),
}

pub type FaceScanResult<T> = Result<T, FaceScanError>;

impl FaceScanError {
    pub fn persistence(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::PersistenceFailed {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the caller can distinguish this as a task-identity problem
    /// rather than an infrastructure failure
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::TaskNotFound { .. }
                | Self::DuplicateTask { .. }
                | Self::TaskAlreadyStarted { .. }
                | Self::Validation(_)
        )
    }
}

impl From<StoreError> for FaceScanError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { task_uuid } => Self::TaskNotFound { task_uuid },
            StoreError::DuplicateTask { task_uuid } => Self::DuplicateTask { task_uuid },
            StoreError::NotAcceptingImages { task_uuid, status } => {
                Self::TaskAlreadyStarted { task_uuid, status }
            }
            StoreError::StatusConflict {
                task_uuid,
                actual: Some(status),
                ..
            } => Self::TaskAlreadyStarted { task_uuid, status },
            StoreError::StatusConflict {
                task_uuid,
                actual: None,
                ..
            } => Self::TaskNotFound { task_uuid },
            other => Self::persistence("store", other),
        }
    }
}

impl From<BlobError> for FaceScanError {
    fn from(err: BlobError) -> Self {
        let image_uuid = err.image_uuid();
        Self::BlobStorageFailed {
            image_uuid,
            reason: err.to_string(),
        }
    }
}

impl From<StateMachineError> for FaceScanError {
    fn from(err: StateMachineError) -> Self {
        match err {
            StateMachineError::Store(store_err) => store_err.into(),
            other => Self::StateMachine(other.to_string()),
        }
    }
}

impl From<ConfigurationError> for FaceScanError {
    fn from(err: ConfigurationError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl FaceScanError {
    pub fn recognition(image_uuid: Uuid, err: &RecognitionError) -> Self {
        Self::RecognitionCallFailed {
            image_uuid,
            reason: err.to_string(),
        }
    }
}
