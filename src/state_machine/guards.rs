use super::errors::{business_rule_violation, GuardError, GuardResult};
use super::events::TaskEvent;
use super::states::TaskState;

/// Guard conditions evaluated before every task transition
#[derive(Debug)]
pub struct TransitionGuard;

impl TransitionGuard {
    /// Check if a transition is valid
    pub fn can_transition(from: TaskState, to: TaskState, event: &TaskEvent) -> GuardResult<()> {
        use TaskState::*;

        if from.is_terminal() {
            return Err(GuardError::TerminalState { state: from });
        }

        let valid = match (from, to, event) {
            (New, Pending, TaskEvent::Start) => true,

            (Pending, Success, TaskEvent::Finish(tally)) => tally.failed == 0,
            (Pending, Failed, TaskEvent::Finish(tally)) => {
                tally.succeeded == 0 && tally.failed > 0
            }
            (Pending, PartiallySuccess, TaskEvent::Finish(tally)) => {
                tally.succeeded > 0 && tally.failed > 0
            }
            (Pending, Failed, TaskEvent::Abort) => true,

            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(business_rule_violation(format!(
                "Invalid transition from {from:?} to {to:?} with event {event:?}"
            )))
        }
    }
}
