//! Always-current lifecycle callbacks.
//! Callbacks are looked up when an invocation settles, not when it starts,
//! so a host that reconfigures mid-flight gets its newest handlers called.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::TaskError;

pub type StartCallback = Arc<dyn Fn() + Send + Sync>;
pub type CompleteCallback<T> = Arc<dyn Fn(&T) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&TaskError) + Send + Sync>;
pub type FinallyCallback = Arc<dyn Fn() + Send + Sync>;

/// Error handling choice. There is no default: a callback set can only be
/// built by picking one of these explicitly.
#[derive(Clone)]
pub enum ErrorHandler {
    Handle(ErrorCallback),
    /// Deliberate opt-out. Failures are still logged and committed.
    Ignore,
}

impl ErrorHandler {
    pub fn handle(f: impl Fn(&TaskError) + Send + Sync + 'static) -> Self {
        ErrorHandler::Handle(Arc::new(f))
    }
}

impl std::fmt::Debug for ErrorHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorHandler::Handle(_) => write!(f, "Handle(..)"),
            ErrorHandler::Ignore => write!(f, "Ignore"),
        }
    }
}

/// The four lifecycle callbacks.
pub struct CallbackSet<T> {
    pub on_start: Option<StartCallback>,
    pub on_complete: Option<CompleteCallback<T>>,
    pub on_error: ErrorHandler,
    pub on_finally: Option<FinallyCallback>,
}

impl<T> CallbackSet<T> {
    pub fn new(on_error: ErrorHandler) -> Self {
        Self {
            on_start: None,
            on_complete: None,
            on_error,
            on_finally: None,
        }
    }

    pub fn on_start(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_start = Some(Arc::new(f));
        self
    }

    pub fn on_complete(mut self, f: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Arc::new(f));
        self
    }

    pub fn on_finally(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_finally = Some(Arc::new(f));
        self
    }

    pub(crate) fn fire_start(&self) {
        if let Some(cb) = &self.on_start {
            cb();
        }
    }

    pub(crate) fn fire_complete(&self, result: &T) {
        if let Some(cb) = &self.on_complete {
            cb(result);
        }
        self.fire_finally();
    }

    pub(crate) fn fire_error(&self, error: &TaskError) {
        if let ErrorHandler::Handle(cb) = &self.on_error {
            cb(error);
        }
        self.fire_finally();
    }

    fn fire_finally(&self) {
        if let Some(cb) = &self.on_finally {
            cb();
        }
    }
}

impl<T> Clone for CallbackSet<T> {
    fn clone(&self) -> Self {
        Self {
            on_start: self.on_start.clone(),
            on_complete: self.on_complete.clone(),
            on_error: self.on_error.clone(),
            on_finally: self.on_finally.clone(),
        }
    }
}

/// Holder of the latest callback set.
pub struct CallbackRegistry<T> {
    current: RwLock<Arc<CallbackSet<T>>>,
}

impl<T> CallbackRegistry<T> {
    pub fn new(set: CallbackSet<T>) -> Self {
        Self {
            current: RwLock::new(Arc::new(set)),
        }
    }

    /// Replace the visible set. In-flight invocations see it when they settle.
    pub fn update(&self, set: CallbackSet<T>) {
        *self.current.write() = Arc::new(set);
    }

    /// Snapshot of the latest set. The lock is released before any callback runs.
    pub fn current(&self) -> Arc<CallbackSet<T>> {
        self.current.read().clone()
    }
}
