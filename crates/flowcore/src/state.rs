use crate::NodeError;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Orchestrator lifecycle state.
///
/// `Ready` is both the initial state and the state every run returns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunState {
    Ready,
    Running,
    Stopping,
    Terminating,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Ready => "READY",
            RunState::Running => "RUNNING",
            RunState::Stopping => "STOPPING",
            RunState::Terminating => "TERMINATING",
        };
        f.write_str(name)
    }
}

/// Shared, lock-guarded run state.
///
/// The orchestrator owns one and hands clones to every `NodeContext` so that
/// long-running nodes can probe for termination.
#[derive(Debug, Clone)]
pub struct StateHandle {
    inner: Arc<Mutex<RunState>>,
}

impl StateHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RunState::Ready)),
        }
    }

    pub fn get(&self) -> RunState {
        *self.inner.lock()
    }

    /// Unconditionally set the state, returning the previous one.
    pub fn set(&self, next: RunState) -> RunState {
        std::mem::replace(&mut *self.inner.lock(), next)
    }

    /// Move to `next` only if the current state satisfies `allowed`.
    ///
    /// Returns the state observed before the attempt and whether it moved.
    pub fn transition(&self, allowed: impl FnOnce(RunState) -> bool, next: RunState) -> (RunState, bool) {
        let mut state = self.inner.lock();
        let prev = *state;
        if allowed(prev) {
            *state = next;
            (prev, true)
        } else {
            (prev, false)
        }
    }

    pub fn is_running(&self) -> bool {
        self.get() == RunState::Running
    }

    /// Termination check-point for nodes.
    pub fn check_terminate(&self) -> Result<(), NodeError> {
        if self.get() == RunState::Terminating {
            Err(NodeError::Terminated)
        } else {
            Ok(())
        }
    }
}

impl Default for StateHandle {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_respects_guard() {
        let state = StateHandle::new();
        let (prev, moved) = state.transition(|s| s == RunState::Running, RunState::Stopping);
        assert_eq!(prev, RunState::Ready);
        assert!(!moved);
        assert_eq!(state.get(), RunState::Ready);

        state.set(RunState::Running);
        let (_, moved) = state.transition(|s| s == RunState::Running, RunState::Stopping);
        assert!(moved);
        assert_eq!(state.get(), RunState::Stopping);
    }

    #[test]
    fn probe_only_fires_when_terminating() {
        let state = StateHandle::new();
        state.set(RunState::Stopping);
        assert!(state.check_terminate().is_ok());
        state.set(RunState::Terminating);
        assert_eq!(state.check_terminate(), Err(NodeError::Terminated));
    }
}
