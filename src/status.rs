//! Observable task status: Idle → Running → Completed | Failed | Canceled.
//! The store is the only place status is committed, and the supersession
//! check for a commit happens under the same lock that issues new generations.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::cancellation::{self, InvocationCounter, InvocationToken};
use crate::error::TaskError;

/// Lifecycle phase of the most recent visible invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TaskPhase {
    Idle,
    Running,
    Completed,
    Failed,
    Canceled,
}

impl std::fmt::Display for TaskPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskPhase::Idle => write!(f, "Idle"),
            TaskPhase::Running => write!(f, "Running"),
            TaskPhase::Completed => write!(f, "Completed"),
            TaskPhase::Failed => write!(f, "Failed"),
            TaskPhase::Canceled => write!(f, "Canceled"),
        }
    }
}

impl TaskPhase {
    /// Returns whether transitioning from `self` to `next` is valid.
    pub fn can_transition_to(self, next: TaskPhase) -> bool {
        matches!(
            (self, next),
            // a new run may start from anywhere, superseding whatever is in flight
            (_, TaskPhase::Running)
                | (TaskPhase::Running, TaskPhase::Completed)
                | (TaskPhase::Running, TaskPhase::Failed)
                | (TaskPhase::Running, TaskPhase::Canceled)
                | (TaskPhase::Completed, TaskPhase::Canceled)
                | (TaskPhase::Failed, TaskPhase::Canceled)
                | (TaskPhase::Canceled, TaskPhase::Canceled)
        )
    }
}

/// Snapshot of externally observable state.
#[derive(Debug, Clone)]
pub struct TaskStatus<T> {
    pub is_running: bool,
    pub result: Option<T>,
    pub error: Option<TaskError>,
    pub phase: TaskPhase,
}

impl<T> TaskStatus<T> {
    pub fn idle() -> Self {
        Self {
            is_running: false,
            result: None,
            error: None,
            phase: TaskPhase::Idle,
        }
    }

    fn running() -> Self {
        Self {
            is_running: true,
            result: None,
            error: None,
            phase: TaskPhase::Running,
        }
    }

    /// True when nothing is running and neither a result nor an error is held.
    pub fn is_clear(&self) -> bool {
        !self.is_running && self.result.is_none() && self.error.is_none()
    }
}

/// Settled outcome of one invocation, ready to be committed.
pub(crate) enum Outcome<T> {
    Completed { result: T, leave_running: bool },
    Failed(TaskError),
}

/// Holds the status and broadcasts every commit to subscribers.
pub struct StatusStore<T> {
    state: RwLock<TaskStatus<T>>,
    state_tx: watch::Sender<TaskStatus<T>>,
}

impl<T: Clone> StatusStore<T> {
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(TaskStatus::idle());
        Self {
            state: RwLock::new(TaskStatus::idle()),
            state_tx,
        }
    }

    /// Current status (non-blocking read).
    pub fn snapshot(&self) -> TaskStatus<T> {
        self.state.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.state.read().is_running
    }

    pub fn result(&self) -> Option<T> {
        self.state.read().result.clone()
    }

    pub fn error(&self) -> Option<TaskError> {
        self.state.read().error.clone()
    }

    pub fn phase(&self) -> TaskPhase {
        self.state.read().phase
    }

    /// Subscribe to status changes.
    pub fn subscribe(&self) -> watch::Receiver<TaskStatus<T>> {
        self.state_tx.subscribe()
    }

    /// Issue a new generation and mark it running, clearing any prior result or error.
    pub(crate) fn begin(&self, counter: &Arc<InvocationCounter>) -> InvocationToken {
        let mut state = self.state.write();
        let token = cancellation::issue(counter);
        *state = TaskStatus::running();
        self.state_tx.send_replace(state.clone());
        token
    }

    /// Commit `outcome` unless `token` has been superseded. Returns whether it was committed.
    pub(crate) fn commit(&self, token: &InvocationToken, outcome: &Outcome<T>) -> bool {
        let mut state = self.state.write();
        if token.is_superseded() {
            return false;
        }
        let next = match outcome {
            Outcome::Completed {
                result,
                leave_running,
            } => TaskStatus {
                is_running: *leave_running,
                result: Some(result.clone()),
                error: None,
                phase: TaskPhase::Completed,
            },
            Outcome::Failed(error) => TaskStatus {
                is_running: false,
                result: None,
                error: Some(error.clone()),
                phase: TaskPhase::Failed,
            },
        };
        if !state.phase.can_transition_to(next.phase) {
            warn!(from = %state.phase, to = %next.phase, "unexpected status transition");
        }
        debug!(generation = token.id(), from = %state.phase, to = %next.phase, "status_commit");
        *state = next;
        self.state_tx.send_replace(state.clone());
        true
    }

    /// Supersede every outstanding token and clear the status.
    /// An idle store keeps its phase so that cancelling when idle changes nothing.
    pub(crate) fn cancel(&self, counter: &InvocationCounter) -> TaskPhase {
        let mut state = self.state.write();
        counter.next();
        let prev = state.phase;
        if prev == TaskPhase::Idle {
            return prev;
        }
        *state = TaskStatus {
            phase: TaskPhase::Canceled,
            ..TaskStatus::idle()
        };
        self.state_tx.send_replace(state.clone());
        prev
    }
}

impl<T: Clone> Default for StatusStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completed(v: u32) -> Outcome<u32> {
        Outcome::Completed {
            result: v,
            leave_running: false,
        }
    }

    #[test]
    fn begin_clears_prior_outcome() {
        let counter = Arc::new(InvocationCounter::new());
        let store = StatusStore::<u32>::new();

        let token = store.begin(&counter);
        assert!(store.commit(&token, &completed(5)));
        assert_eq!(store.result(), Some(5));

        store.begin(&counter);
        let status = store.snapshot();
        assert!(status.is_running);
        assert_eq!(status.result, None);
        assert!(status.error.is_none());
        assert_eq!(status.phase, TaskPhase::Running);
    }

    #[test]
    fn superseded_commit_is_rejected() {
        let counter = Arc::new(InvocationCounter::new());
        let store = StatusStore::<u32>::new();

        let old = store.begin(&counter);
        let new = store.begin(&counter);
        assert!(!store.commit(&old, &completed(1)));
        assert!(store.is_running());
        assert_eq!(store.result(), None);

        assert!(store.commit(&new, &Outcome::Failed(TaskError::Abstained)));
        assert!(!store.is_running());
        assert!(store.error().is_some_and(|e| e.is_abstained()));
        assert_eq!(store.phase(), TaskPhase::Failed);
    }

    #[test]
    fn leave_running_keeps_flag_after_completion() {
        let counter = Arc::new(InvocationCounter::new());
        let store = StatusStore::<u32>::new();

        let token = store.begin(&counter);
        store.commit(
            &token,
            &Outcome::Completed {
                result: 3,
                leave_running: true,
            },
        );
        assert!(store.is_running());
        assert_eq!(store.phase(), TaskPhase::Completed);
    }

    #[test]
    fn cancel_when_idle_changes_nothing() {
        let counter = InvocationCounter::new();
        let store = StatusStore::<u32>::new();

        assert_eq!(store.cancel(&counter), TaskPhase::Idle);
        let status = store.snapshot();
        assert!(status.is_clear());
        assert_eq!(status.phase, TaskPhase::Idle);
        assert_eq!(counter.current(), 1);
    }

    #[test]
    fn cancel_resets_and_supersedes() {
        let counter = Arc::new(InvocationCounter::new());
        let store = StatusStore::<u32>::new();

        let token = store.begin(&counter);
        assert_eq!(store.cancel(&counter), TaskPhase::Running);
        assert!(store.snapshot().is_clear());
        assert_eq!(store.phase(), TaskPhase::Canceled);
        assert!(!store.commit(&token, &completed(9)));
        assert!(store.snapshot().is_clear());
    }

    #[tokio::test]
    async fn subscribers_see_commits() {
        let counter = Arc::new(InvocationCounter::new());
        let store = StatusStore::<u32>::new();
        let mut rx = store.subscribe();

        let token = store.begin(&counter);
        rx.changed().await.expect("sender alive");
        assert!(rx.borrow_and_update().is_running);

        store.commit(&token, &completed(11));
        rx.changed().await.expect("sender alive");
        assert_eq!(rx.borrow().result, Some(11));
    }

    #[test]
    fn phase_transitions() {
        assert!(TaskPhase::Idle.can_transition_to(TaskPhase::Running));
        assert!(TaskPhase::Completed.can_transition_to(TaskPhase::Running));
        assert!(TaskPhase::Running.can_transition_to(TaskPhase::Failed));
        assert!(!TaskPhase::Idle.can_transition_to(TaskPhase::Completed));
        assert!(!TaskPhase::Failed.can_transition_to(TaskPhase::Completed));
    }
}
