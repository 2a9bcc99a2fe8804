//! Dispatch state machine.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Error;

/// States of a single dispatch. Every terminal state ends the pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DispatchState {
    #[default]
    Idle,
    CheckingFreshness,
    Refreshing,
    Submitting,
    Added,
    NotFound,
    Unrecognized,
    Failed,
}

impl DispatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::CheckingFreshness => "CHECKING_FRESHNESS",
            Self::Refreshing => "REFRESHING",
            Self::Submitting => "SUBMITTING",
            Self::Added => "ADDED",
            Self::NotFound => "NOT_FOUND",
            Self::Unrecognized => "UNRECOGNIZED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Added | Self::NotFound | Self::Unrecognized | Self::Failed
        )
    }

    /// Validate a state transition.
    pub fn can_transition_to(&self, target: DispatchState) -> bool {
        use DispatchState::*;

        match (self, target) {
            (Idle, CheckingFreshness) => true,
            (CheckingFreshness, Refreshing | Submitting | Failed) => true,
            (Refreshing, Submitting | Failed) => true,
            (Submitting, Added | NotFound | Unrecognized | Failed) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for DispatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracks and logs the state of one dispatch.
#[derive(Debug)]
pub struct StateTracker {
    dispatch_id: u64,
    state: DispatchState,
}

impl StateTracker {
    pub fn new(dispatch_id: u64) -> Self {
        Self {
            dispatch_id,
            state: DispatchState::Idle,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Move to `to`, rejecting transitions the pipeline cannot take.
    pub fn transition(&mut self, to: DispatchState) -> Result<(), Error> {
        if !self.state.can_transition_to(to) {
            return Err(Error::InvalidStateTransition {
                from: self.state.to_string(),
                to: to.to_string(),
            });
        }

        debug!(
            dispatch_id = self.dispatch_id,
            from = %self.state,
            to = %to,
            "Dispatch state transition"
        );
        self.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_with_refresh() {
        let mut tracker = StateTracker::new(1);
        for state in [
            DispatchState::CheckingFreshness,
            DispatchState::Refreshing,
            DispatchState::Submitting,
            DispatchState::Added,
        ] {
            tracker.transition(state).unwrap();
        }
        assert!(tracker.state().is_terminal());
    }

    #[test]
    fn test_cannot_skip_freshness_check() {
        let mut tracker = StateTracker::new(1);
        let err = tracker.transition(DispatchState::Submitting).unwrap_err();
        assert!(matches!(err, Error::InvalidStateTransition { .. }));
        assert_eq!(tracker.state(), DispatchState::Idle);
    }

    #[test]
    fn test_terminal_states_are_final() {
        for terminal in [
            DispatchState::Added,
            DispatchState::NotFound,
            DispatchState::Unrecognized,
            DispatchState::Failed,
        ] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(DispatchState::CheckingFreshness));
            assert!(!terminal.can_transition_to(DispatchState::Failed));
        }
    }

    #[test]
    fn test_refresh_cannot_route_outcome() {
        assert!(!DispatchState::Refreshing.can_transition_to(DispatchState::Added));
        assert!(DispatchState::Refreshing.can_transition_to(DispatchState::Failed));
    }
}
