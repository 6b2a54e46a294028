//! Single-flight task controller.
//!
//! `run` starts a new invocation and supersedes whatever was in flight;
//! `cancel` supersedes without starting anything. Superseded invocations
//! keep running in the background (cancellation is cooperative), but their
//! outcome is discarded: no status write, no callbacks. Failures are logged
//! regardless.

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::callbacks::{CallbackRegistry, CallbackSet};
use crate::cancellation::{InvocationCounter, InvocationToken};
use crate::error::TaskError;
use crate::launch::{Launch, TaskFn};
use crate::metrics::{MetricSummary, RunMetric, RunMetrics};
use crate::options::TaskConfig;
use crate::status::{Outcome, StatusStore, TaskPhase, TaskStatus};

struct Inner<A, T> {
    func: TaskFn<A, T>,
    counter: Arc<InvocationCounter>,
    callbacks: CallbackRegistry<T>,
    status: StatusStore<T>,
    config: TaskConfig,
    metrics: RunMetrics,
}

/// Runs a task function on demand, exposing only the newest invocation's outcome.
///
/// Cheap to clone; clones share the same generation counter, status and callbacks.
pub struct TaskController<A, T> {
    inner: Arc<Inner<A, T>>,
}

impl<A, T> Clone for TaskController<A, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A, T> TaskController<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(func: TaskFn<A, T>, callbacks: CallbackSet<T>, config: TaskConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                func,
                counter: Arc::new(InvocationCounter::new()),
                callbacks: CallbackRegistry::new(callbacks),
                status: StatusStore::new(),
                config,
                metrics: RunMetrics::new(),
            }),
        }
    }

    /// Start a new invocation. Fire-and-forget: never panics because of the
    /// task function and never reports its outcome here.
    ///
    /// The operation is spawned onto the ambient tokio runtime. Called
    /// outside of one, the invocation fails with [`TaskError::NoRuntime`].
    pub fn run(&self, args: A) {
        let runtime = Handle::try_current();
        let inner = &self.inner;
        let token = inner.status.begin(&inner.counter);
        inner.metrics.record(RunMetric::Started);
        info!(generation = token.id(), "task_run_started");

        inner.callbacks.current().fire_start();

        let runtime = match runtime {
            Ok(handle) => handle,
            Err(_) => {
                inner.settle(&token, Err(TaskError::NoRuntime));
                return;
            }
        };

        let ctx = token.clone();
        let launched = panic::catch_unwind(AssertUnwindSafe(|| (inner.func)(ctx, args)));
        let fut = match launched {
            Ok(Launch::Run(fut)) => fut,
            Ok(Launch::Abstain) => {
                inner.settle(&token, Err(TaskError::Abstained));
                return;
            }
            Err(payload) => {
                inner.settle(&token, Err(TaskError::from_panic(payload)));
                return;
            }
        };

        let inner = Arc::clone(&self.inner);
        runtime.spawn(async move {
            let outcome = match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(res) => res,
                Err(payload) => Err(TaskError::from_panic(payload)),
            };
            inner.settle(&token, outcome);
        });
    }

    /// Supersede every outstanding invocation and clear the status.
    /// Safe at any time; fires no callbacks.
    pub fn cancel(&self) {
        let inner = &self.inner;
        let prev = inner.status.cancel(&inner.counter);
        inner.metrics.record(RunMetric::Canceled);
        info!(
            generation = inner.counter.current(),
            from = %prev,
            "task_canceled"
        );
    }

    /// Install the host's latest callbacks. In-flight invocations use them when they settle.
    pub fn update_callbacks(&self, callbacks: CallbackSet<T>) {
        self.inner.callbacks.update(callbacks);
    }

    pub fn status(&self) -> TaskStatus<T> {
        self.inner.status.snapshot()
    }

    pub fn is_running(&self) -> bool {
        self.inner.status.is_running()
    }

    pub fn result(&self) -> Option<T> {
        self.inner.status.result()
    }

    pub fn error(&self) -> Option<TaskError> {
        self.inner.status.error()
    }

    pub fn phase(&self) -> TaskPhase {
        self.inner.status.phase()
    }

    /// Receive every committed status change.
    pub fn subscribe(&self) -> watch::Receiver<TaskStatus<T>> {
        self.inner.status.subscribe()
    }

    /// Latest generation issued by `run` or `cancel`.
    pub fn generation(&self) -> u64 {
        self.inner.counter.current()
    }

    pub fn config(&self) -> TaskConfig {
        self.inner.config
    }

    pub fn metrics(&self) -> MetricSummary {
        self.inner.metrics.summary()
    }
}

impl<A, T> Inner<A, T>
where
    T: Clone,
{
    fn settle(&self, token: &InvocationToken, outcome: Result<T, TaskError>) {
        let outcome = match outcome {
            Ok(result) => Outcome::Completed {
                result,
                leave_running: self.config.leave_running,
            },
            Err(err) => {
                // logged even when superseded
                error!(
                    generation = token.id(),
                    superseded = token.is_superseded(),
                    kind = err.as_label(),
                    error = %err,
                    "task_failed"
                );
                Outcome::Failed(err)
            }
        };

        if !self.status.commit(token, &outcome) {
            self.metrics.record(RunMetric::Discarded);
            debug!(
                generation = token.id(),
                current = self.counter.current(),
                "task_settled_superseded"
            );
            return;
        }

        let callbacks = self.callbacks.current();
        match &outcome {
            Outcome::Completed { result, .. } => {
                self.metrics.record(RunMetric::Completed);
                info!(generation = token.id(), "task_completed");
                callbacks.fire_complete(result);
            }
            Outcome::Failed(err) => {
                self.metrics.record(RunMetric::Failed);
                callbacks.fire_error(err);
            }
        }
    }
}
