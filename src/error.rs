//! Failure outcomes of a task invocation.
//! Every fault a task function can produce is normalized into [`TaskError`].

use std::error::Error;
use std::sync::Arc;

/// Boxed error accepted from task futures.
pub type BoxError = Box<dyn Error + Send + Sync + 'static>;

/// Normalized failure of one invocation.
///
/// Cheap to clone: the status store, the error callback and subscribers all
/// observe the same underlying error.
#[derive(Debug, Clone)]
pub enum TaskError {
    /// The future resolved to `Err`.
    Failed { source: Arc<dyn Error + Send + Sync + 'static> },
    /// The task function or its future panicked.
    Panicked { message: String },
    /// The task function abstained instead of starting an operation.
    Abstained,
    /// `run` was called outside of a tokio runtime, so nothing could be spawned.
    NoRuntime,
}

impl TaskError {
    pub fn failed(err: impl Into<BoxError>) -> Self {
        let boxed: BoxError = err.into();
        TaskError::Failed {
            source: Arc::from(boxed),
        }
    }

    /// Build from a `catch_unwind` payload.
    pub(crate) fn from_panic(payload: Box<dyn std::any::Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        TaskError::Panicked { message }
    }

    /// Short stable label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            TaskError::Failed { .. } => "task_failed",
            TaskError::Panicked { .. } => "task_panicked",
            TaskError::Abstained => "task_abstained",
            TaskError::NoRuntime => "task_no_runtime",
        }
    }

    /// True for the programmer-misuse fault.
    pub fn is_abstained(&self) -> bool {
        matches!(self, TaskError::Abstained)
    }
}

impl std::fmt::Display for TaskError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskError::Failed { source } => write!(f, "task failed: {source}"),
            TaskError::Panicked { message } => write!(f, "task panicked: {message}"),
            TaskError::Abstained => write!(
                f,
                "task function abstained: it must return a pending operation, not an abstain marker"
            ),
            TaskError::NoRuntime => write!(f, "no tokio runtime to spawn the task on"),
        }
    }
}

impl Error for TaskError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            TaskError::Failed { source } => Some(&**source),
            _ => None,
        }
    }
}
