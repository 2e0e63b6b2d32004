use super::states::TaskState;
use serde::{Deserialize, Serialize};

/// Success/failure counts of a completed recognition fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeTally {
    pub succeeded: usize,
    pub failed: usize,
}

impl OutcomeTally {
    pub fn new(succeeded: usize, failed: usize) -> Self {
        Self { succeeded, failed }
    }

    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_failure(&mut self) {
        self.failed += 1;
    }

    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }

    /// Terminal status dictated by the counts alone.
    ///
    /// Zero failures is `Success`, zero successes with at least one failure
    /// is `Failed`, anything else is `PartiallySuccess`.
    pub fn classify(&self) -> TaskState {
        match (self.succeeded, self.failed) {
            (_, 0) => TaskState::Success,
            (0, _) => TaskState::Failed,
            _ => TaskState::PartiallySuccess,
        }
    }
}

/// Events that can trigger task state transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TaskEvent {
    /// Begin the recognition fan-out
    Start,
    /// All fan-out outcomes are known
    Finish(OutcomeTally),
    /// The run could not proceed after the task was claimed
    Abort,
}

impl TaskEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Finish(_) => "finish",
            Self::Abort => "abort",
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finish(_) | Self::Abort)
    }
}
