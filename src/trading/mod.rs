//! Live trading: run-state control, the decision loop and its session handle.
//!
//! A `TradingController` owns the portfolio and performs one decision
//! cycle at a time. `TradingController::spawn` moves it onto a single
//! worker task and returns a `TradingSession`, which is the only way to
//! start, stop and observe it.

pub mod config;
pub mod controller;
pub mod events;
pub mod session;

use std::sync::Arc;
use tokio::sync::watch;

pub use config::{ConfigError, TradingConfig};
pub use controller::{CycleDecision, CycleError, CycleReport, TradingController};
pub use events::{ControllerStatus, EventKind, EventLevel, TradingEvent};
pub use session::TradingSession;

/// Whether the trading loop should be executing cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub enum RunState {
    #[default]
    Stopped,
    Running,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Stopped => write!(f, "stopped"),
            RunState::Running => write!(f, "running"),
        }
    }
}

/// Shared, cloneable handle over the run state.
///
/// Transitions are idempotent: `start` on a running loop and `stop` on a
/// stopped one change nothing and return `false`.
#[derive(Debug, Clone)]
pub struct RunControl {
    tx: Arc<watch::Sender<RunState>>,
}

impl Default for RunControl {
    fn default() -> Self {
        Self::new()
    }
}

impl RunControl {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(RunState::Stopped);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> RunState {
        *self.tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == RunState::Running
    }

    /// Request `Running`. Returns `true` if the state changed.
    pub fn start(&self) -> bool {
        self.transition(RunState::Running)
    }

    /// Request `Stopped`. An in-flight cycle completes; the next one is
    /// not begun. Returns `true` if the state changed.
    pub fn stop(&self) -> bool {
        self.transition(RunState::Stopped)
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.tx.subscribe()
    }

    fn transition(&self, target: RunState) -> bool {
        self.tx.send_if_modified(|state| {
            if *state == target {
                false
            } else {
                *state = target;
                true
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_are_idempotent() {
        let control = RunControl::new();
        assert_eq!(control.state(), RunState::Stopped);

        assert!(!control.stop());
        assert!(control.start());
        assert!(!control.start());
        assert!(control.is_running());

        assert!(control.stop());
        assert!(!control.stop());
        assert_eq!(control.state(), RunState::Stopped);
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let control = RunControl::new();
        let other = control.clone();
        let mut rx = control.subscribe();

        other.start();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow(), RunState::Running);
        assert!(control.is_running());
    }
}
