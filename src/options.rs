//! Controller configuration and builder.
//!
//! The builder refuses to produce a controller until an error policy has
//! been chosen, either a handler via [`TaskBuilder::on_error`] or a
//! deliberate opt-out via [`TaskBuilder::ignore_errors`]. Forgetting both is
//! a compile error rather than a runtime surprise:
//!
//! ```compile_fail
//! use taskgen::{Launch, TaskBuilder};
//!
//! let controller = TaskBuilder::new(|_, ()| Launch::Run(async { Ok::<_, String>(1) }))
//!     .on_complete(|v| println!("{v}"))
//!     .build();
//! ```
//!
//! ```
//! use taskgen::{Launch, TaskBuilder};
//!
//! let controller = TaskBuilder::new(|_, ()| Launch::Run(async { Ok::<_, String>(1) }))
//!     .ignore_errors()
//!     .build();
//! assert!(!controller.is_running());
//! ```

use std::future::Future;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::callbacks::{
    CallbackSet, CompleteCallback, ErrorHandler, FinallyCallback, StartCallback,
};
use crate::cancellation::InvocationToken;
use crate::error::{BoxError, TaskError};
use crate::launch::{self, IntoLaunch, TaskFn};
use crate::lifecycle::MountedTask;
use crate::runner::TaskController;

/// Behavior flags, loadable from any serde format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskConfig {
    /// Run once with default arguments when mounted.
    pub run_on_mount: bool,
    /// Keep `is_running` set after a successful completion.
    pub leave_running: bool,
}

/// Builder state: no error policy chosen yet.
pub struct NoErrorHandler;

pub struct TaskBuilder<A, T, H = NoErrorHandler> {
    func: TaskFn<A, T>,
    config: TaskConfig,
    on_start: Option<StartCallback>,
    on_complete: Option<CompleteCallback<T>>,
    on_finally: Option<FinallyCallback>,
    on_error: H,
}

impl<A, T> TaskBuilder<A, T, NoErrorHandler>
where
    T: 'static,
{
    /// Start configuring a controller for `func`.
    ///
    /// `func` receives the invocation's token and the arguments given to
    /// `run`, and returns a [`Launch`](crate::Launch) (or an `Option` of a future).
    pub fn new<F, R, E>(func: F) -> Self
    where
        F: Fn(InvocationToken, A) -> R + Send + Sync + 'static,
        R: IntoLaunch,
        R::Future: Future<Output = Result<T, E>> + Send + 'static,
        E: Into<BoxError>,
    {
        Self {
            func: launch::erase(func),
            config: TaskConfig::default(),
            on_start: None,
            on_complete: None,
            on_finally: None,
            on_error: NoErrorHandler,
        }
    }
}

impl<A, T, H> TaskBuilder<A, T, H> {
    pub fn config(mut self, config: TaskConfig) -> Self {
        self.config = config;
        self
    }

    pub fn run_on_mount(mut self, yes: bool) -> Self {
        self.config.run_on_mount = yes;
        self
    }

    pub fn leave_running(mut self, yes: bool) -> Self {
        self.config.leave_running = yes;
        self
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

    fn with_error_handler(self, on_error: ErrorHandler) -> TaskBuilder<A, T, ErrorHandler> {
        TaskBuilder {
            func: self.func,
            config: self.config,
            on_start: self.on_start,
            on_complete: self.on_complete,
            on_finally: self.on_finally,
            on_error,
        }
    }

    /// Handle non-superseded failures.
    pub fn on_error(
        self,
        f: impl Fn(&TaskError) + Send + Sync + 'static,
    ) -> TaskBuilder<A, T, ErrorHandler> {
        self.with_error_handler(ErrorHandler::handle(f))
    }

    /// Explicitly opt out of error handling. Failures are still logged and
    /// visible through the controller's status.
    pub fn ignore_errors(self) -> TaskBuilder<A, T, ErrorHandler> {
        self.with_error_handler(ErrorHandler::Ignore)
    }
}

impl<A, T> TaskBuilder<A, T, ErrorHandler>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn callbacks(&self) -> CallbackSet<T> {
        CallbackSet {
            on_start: self.on_start.clone(),
            on_complete: self.on_complete.clone(),
            on_error: self.on_error.clone(),
            on_finally: self.on_finally.clone(),
        }
    }

    /// Build a detached controller. `run_on_mount` only takes effect through [`Self::mount`].
    pub fn build(self) -> TaskController<A, T> {
        let callbacks = self.callbacks();
        TaskController::new(self.func, callbacks, self.config)
    }

    /// Build and bind to the host lifecycle: runs immediately if
    /// `run_on_mount` is set, cancels when the returned handle is dropped.
    pub fn mount(self) -> MountedTask<A, T>
    where
        A: Default,
    {
        MountedTask::mount(self.build())
    }
}
