//! Cooperative background tasks.
//!
//! Suspension exists only at task boundaries: a background computation is
//! wrapped by [`supervised`], which pairs the future with a [`TaskHandle`]
//! carrying idempotent cancellation and a completion future. Cancellation
//! is safe to call from a scope finalizer; an aborted task simply stops
//! being polled and is dropped, so it can never re-notify listeners that
//! were already removed.

use std::future::Future;

use futures_channel::oneshot;
use futures_util::FutureExt;
use futures_util::future::{AbortHandle, Shared, abortable};

use crate::metrics::inc_metric;

/// Cancellable handle to a spawned background task.
#[derive(Clone)]
pub struct TaskHandle {
    abort: AbortHandle,
    completed: Shared<oneshot::Receiver<()>>,
}

impl TaskHandle {
    /// Request cancellation. Idempotent: cancelling twice is safe, and
    /// cancelling an already finished task is a no-op.
    pub fn cancel(&self) {
        if !self.abort.is_aborted() {
            inc_metric!(TASKS_CANCELLED);
        }
        self.abort.abort();
    }

    pub fn is_cancelled(&self) -> bool {
        self.abort.is_aborted()
    }

    /// Resolves when the task has finished or been cancelled.
    pub fn completed(&self) -> impl Future<Output = ()> + 'static {
        let completed = self.completed.clone();
        async move {
            let _ = completed.await;
        }
    }
}

impl std::fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskHandle")
            .field("cancelled", &self.abort.is_aborted())
            .finish()
    }
}

/// Wrap `future` for spawning, returning the instrumented future and its
/// handle. The caller spawns the returned future onto its single-threaded
/// executor.
pub fn supervised(future: impl Future<Output = ()> + 'static) -> (impl Future<Output = ()> + 'static, TaskHandle) {
    let (abortable_future, abort) = abortable(future);
    let (done_tx, done_rx) = oneshot::channel();
    let wrapped = async move {
        // Err(Aborted) on cancellation; completion is reported either way.
        let _ = abortable_future.await;
        let _ = done_tx.send(());
    };
    let handle = TaskHandle {
        abort,
        completed: done_rx.shared(),
    };
    (wrapped, handle)
}
