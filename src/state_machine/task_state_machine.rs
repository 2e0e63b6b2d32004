use super::{
    errors::{StateMachineError, StateMachineResult},
    events::TaskEvent,
    guards::TransitionGuard,
    states::TaskState,
};
use crate::store::TaskStore;
use std::fmt;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Task state machine for lifecycle management
///
/// The cached `current_state` is only a hint for choosing the target state;
/// the store's conditional write is what decides whether a transition wins.
#[derive(Clone)]
pub struct TaskStateMachine {
    task_uuid: Uuid,
    current_state: TaskState,
    store: Arc<dyn TaskStore>,
}

impl fmt::Debug for TaskStateMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskStateMachine")
            .field("task_uuid", &self.task_uuid)
            .field("current_state", &self.current_state)
            .finish_non_exhaustive()
    }
}

impl TaskStateMachine {
    /// Create a state machine for a task whose status is already known
    pub fn new(task_uuid: Uuid, current_state: TaskState, store: Arc<dyn TaskStore>) -> Self {
        Self {
            task_uuid,
            current_state,
            store,
        }
    }

    /// Create a state machine for an existing task, resolving its status from the store
    pub async fn for_task(task_uuid: Uuid, store: Arc<dyn TaskStore>) -> StateMachineResult<Self> {
        let current_state = store.get_status(task_uuid).await?;
        Ok(Self::new(task_uuid, current_state, store))
    }

    pub fn current_state(&self) -> TaskState {
        self.current_state
    }

    pub fn task_uuid(&self) -> Uuid {
        self.task_uuid
    }

    pub fn is_terminal(&self) -> bool {
        self.current_state.is_terminal()
    }

    /// Attempt to transition the task state
    ///
    /// Fails with a store `StatusConflict` when another writer moved the task
    /// away from the cached state first.
    pub async fn transition(&mut self, event: TaskEvent) -> StateMachineResult<TaskState> {
        let current_state = self.current_state;
        let target_state = Self::determine_target_state(current_state, &event)?;

        TransitionGuard::can_transition(current_state, target_state, &event)?;

        self.store
            .set_status(self.task_uuid, current_state, target_state)
            .await?;

        debug!(
            task_uuid = %self.task_uuid,
            from = %current_state,
            to = %target_state,
            event = event.event_type(),
            "Task transition committed"
        );

        self.current_state = target_state;
        Ok(target_state)
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        current_state: TaskState,
        event: &TaskEvent,
    ) -> StateMachineResult<TaskState> {
        let target = match (current_state, event) {
            (TaskState::New, TaskEvent::Start) => TaskState::Pending,
            (TaskState::Pending, TaskEvent::Finish(tally)) => tally.classify(),
            (TaskState::Pending, TaskEvent::Abort) => TaskState::Failed,

            (from, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from,
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }
}
