use serde::{Deserialize, Serialize};
use std::fmt;

/// Task status definitions
///
/// `New` and `Pending` are transient; `Success`, `PartiallySuccess` and
/// `Failed` are terminal. Status only ever moves forward along
/// `New -> Pending -> terminal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Task was created and may still receive images
    New,
    /// Recognition fan-out is in flight
    Pending,
    /// Every recognition call succeeded
    Success,
    /// Some recognition calls succeeded and some failed
    PartiallySuccess,
    /// Every recognition call failed
    Failed,
}

impl TaskState {
    /// Check if this is a terminal state (no further transitions allowed)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::PartiallySuccess | Self::Failed)
    }

    /// Check if this is an active state (recognition is in flight)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Images may only be added while the task has not been started
    pub fn accepts_images(&self) -> bool {
        matches!(self, Self::New)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Pending => "pending",
            Self::Success => "success",
            Self::PartiallySuccess => "partially_success",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::New),
            "pending" => Ok(Self::Pending),
            "success" => Ok(Self::Success),
            "partially_success" => Ok(Self::PartiallySuccess),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid task state: {s}")),
        }
    }
}

/// Default state for new tasks
impl Default for TaskState {
    fn default() -> Self {
        Self::New
    }
}
