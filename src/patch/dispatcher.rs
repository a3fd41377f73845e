//! Cooperative executor for command tasks.
//!
//! All task invocations run on one `edge_executor::LocalExecutor`. The
//! [`Task`] handle returned by `spawn` doubles as the cancellation handle:
//! dropping it cancels the invocation, and `is_finished()` tells the
//! single-flight check whether a new one may start.
//!
//! ```text
//!  enqueue(func) ──▶ InFlight idle? ──no──▶ dropped (no backlog)
//!                        │ yes
//!                        ▼
//!                 spawn on LocalExecutor ──▶ handle stored in InFlight
//! ```
//!
//! Deadlines come from `embassy_time::with_timeout`; an expired deadline
//! drops the inner future, so any drop-guards it holds run their rollback.

use core::cell::RefCell;
use core::future::Future;

use edge_executor::{LocalExecutor, Task};
use embassy_time::Duration;
use log::{debug, warn};

use crate::error::TaskError;

use super::task::TaskFunc;

/// Capacity hint for the executor. The run queue itself is unbounded: a
/// cancelled invocation stays queued until the next tick.
pub const MAX_TASKS: usize = 16;

// ── Single-flight slot ───────────────────────────────────────

/// Holds the handle of a task kind's current background invocation.
#[derive(Default)]
pub struct InFlight {
    handle: RefCell<Option<Task<()>>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// No handle, or the last invocation already completed.
    pub fn is_idle(&self) -> bool {
        self.handle.borrow().as_ref().is_none_or(Task::is_finished)
    }

    /// Abort the current invocation. Returns `true` if one was running.
    pub fn cancel(&self) -> bool {
        let Some(task) = self.handle.borrow_mut().take() else {
            return false;
        };
        let running = !task.is_finished();
        drop(task);
        running
    }

    fn install(&self, task: Task<()>) {
        *self.handle.borrow_mut() = Some(task);
    }
}

// ── Dispatcher ───────────────────────────────────────────────

pub struct TaskDispatcher {
    executor: LocalExecutor<'static, MAX_TASKS>,
}

impl Default for TaskDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskDispatcher {
    pub fn new() -> Self {
        Self {
            executor: LocalExecutor::new(),
        }
    }

    /// Start `fut` in `slot` unless the slot's previous invocation is
    /// still running. Returns whether a new invocation was started.
    pub fn enqueue(
        &self,
        func: TaskFunc,
        slot: &InFlight,
        fut: impl Future<Output = ()> + 'static,
    ) -> bool {
        if !slot.is_idle() {
            debug!(target: "dispatch", "{func} already in flight, enqueue ignored");
            return false;
        }
        debug!(target: "dispatch", "{func} enqueued");
        slot.install(self.executor.spawn(fut));
        true
    }

    /// Poll every runnable invocation once. Returns `false` when nothing ran.
    pub fn try_run_pending(&self) -> bool {
        let mut ran = false;
        while self.executor.try_tick() {
            ran = true;
        }
        ran
    }

    /// Drive the executor on the current thread until `fut` completes.
    pub fn block_on<F: Future>(&self, fut: F) -> F::Output {
        futures_lite::future::block_on(futures_lite::future::or(fut, self.drive()))
    }

    async fn drive<R>(&self) -> R {
        loop {
            self.executor.tick().await;
        }
    }
}

/// Bound `fut` by `timeout`, mapping expiry to [`TaskError::Timeout`].
pub async fn with_deadline<R>(
    func: TaskFunc,
    timeout: Duration,
    fut: impl Future<Output = Result<R, TaskError>>,
) -> Result<R, TaskError> {
    match embassy_time::with_timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!(target: "dispatch", "{func} timed out after {} ms", timeout.as_millis());
            Err(TaskError::Timeout {
                func,
                after_ms: timeout.as_millis(),
            })
        }
    }
}
