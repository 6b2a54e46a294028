//! Host lifecycle binding: optional run on mount, cancel on unmount.

use std::ops::Deref;

use tracing::debug;

use crate::runner::TaskController;

/// A controller bound to its host's lifetime.
///
/// Dropping it (or calling [`MountedTask::unmount`]) cancels exactly once,
/// superseding whatever is still in flight.
pub struct MountedTask<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    controller: TaskController<A, T>,
}

impl<A, T> MountedTask<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    /// Signal "created". Runs once with default arguments if `run_on_mount` is set.
    pub fn mount(controller: TaskController<A, T>) -> Self
    where
        A: Default,
    {
        let run_on_mount = controller.config().run_on_mount;
        debug!(run_on_mount, "task_mounted");
        if run_on_mount {
            controller.run(A::default());
        }
        Self { controller }
    }

    pub fn controller(&self) -> &TaskController<A, T> {
        &self.controller
    }

    /// Signal "about to be destroyed".
    pub fn unmount(self) {
        drop(self);
    }
}

impl<A, T> Deref for MountedTask<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    type Target = TaskController<A, T>;

    fn deref(&self) -> &Self::Target {
        &self.controller
    }
}

impl<A, T> Drop for MountedTask<A, T>
where
    A: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    fn drop(&mut self) {
        self.controller.cancel();
        debug!(generation = self.controller.generation(), "task_unmounted");
    }
}
