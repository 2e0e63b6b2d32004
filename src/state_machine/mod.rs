// State machine module for the task lifecycle
//
// Legal transitions are New -> Pending -> {Success | PartiallySuccess | Failed}.
// Every transition is committed through the task store as a compare-and-swap
// on the stored status.

pub mod errors;
pub mod events;
pub mod guards;
pub mod states;
pub mod task_state_machine;

// Re-export main types for convenient access
pub use errors::{GuardError, StateMachineError, StateMachineResult};
pub use events::{OutcomeTally, TaskEvent};
pub use guards::TransitionGuard;
pub use states::TaskState;
pub use task_state_machine::TaskStateMachine;
