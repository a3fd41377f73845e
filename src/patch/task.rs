//! Shared command-task machinery.
//!
//! Every concrete task owns a [`TaskBase`], which bundles the shared
//! [`TaskContext`] with the task's single-flight slot and provides the
//! steps common to all invocations:
//!
//! ```text
//!  pre_condition ──▶ wait_ready ──▶ send ──▶ check_response ──▶ finish
//!     (no I/O)                                                 (log + event)
//! ```

use core::fmt;
use core::future::Future;
use std::rc::Rc;

use embassy_time::Duration;
use log::{error, info};

use crate::app::events::AppEvent;
use crate::app::ports::{ConfigError, EventSink};
use crate::config::TaskTiming;
use crate::error::{PreconditionFailure, TaskError};

use super::dispatcher::{InFlight, TaskDispatcher, with_deadline};
use super::response::check_response;
use super::store::PatchConfigStore;
use super::transport::{PatchCommand, PatchResponse, PatchTransport};

/// Identifies a task kind in logs, events and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskFunc {
    LowReservoir,
    StartBond,
    StartQuickBolus,
    UpdateConnection,
}

impl TaskFunc {
    pub fn name(self) -> &'static str {
        match self {
            Self::LowReservoir => "LOW_RESERVOIR",
            Self::StartBond => "START_BOND",
            Self::StartQuickBolus => "START_QUICK_BOLUS",
            Self::UpdateConnection => "UPDATE_CONNECTION",
        }
    }
}

impl fmt::Display for TaskFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One kind of patch command.
pub trait CommandTask {
    fn func(&self) -> TaskFunc;

    /// Device-state gate checked before anything is transmitted.
    fn pre_condition(&self) -> Result<(), PreconditionFailure>;
}

/// Collaborators shared by every task.
pub struct TaskContext<T> {
    pub(crate) transport: Rc<T>,
    pub(crate) dispatcher: Rc<TaskDispatcher>,
    pub(crate) store: Rc<PatchConfigStore>,
    pub(crate) sink: Rc<dyn EventSink>,
    pub(crate) timing: TaskTiming,
}

impl<T> TaskContext<T> {
    /// Bundle the collaborators, rejecting deadlines outside the allowed
    /// range.
    pub fn new(
        transport: Rc<T>,
        dispatcher: Rc<TaskDispatcher>,
        store: Rc<PatchConfigStore>,
        sink: Rc<dyn EventSink>,
        timing: TaskTiming,
    ) -> Result<Self, ConfigError> {
        timing.validate()?;
        Ok(Self {
            transport,
            dispatcher,
            store,
            sink,
            timing,
        })
    }
}

impl<T> Clone for TaskContext<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Rc::clone(&self.transport),
            dispatcher: Rc::clone(&self.dispatcher),
            store: Rc::clone(&self.store),
            sink: Rc::clone(&self.sink),
            timing: self.timing,
        }
    }
}

pub struct TaskBase<T> {
    ctx: TaskContext<T>,
    func: TaskFunc,
    in_flight: InFlight,
}

impl<T: PatchTransport> TaskBase<T> {
    pub fn new(ctx: TaskContext<T>, func: TaskFunc) -> Self {
        Self {
            ctx,
            func,
            in_flight: InFlight::new(),
        }
    }

    pub fn ctx(&self) -> &TaskContext<T> {
        &self.ctx
    }

    pub fn func(&self) -> TaskFunc {
        self.func
    }

    // ── Preconditions ─────────────────────────────────────────

    pub fn check_patch_connected(&self) -> Result<(), PreconditionFailure> {
        if self.ctx.transport.is_connected() {
            Ok(())
        } else {
            Err(PreconditionFailure::NotConnected)
        }
    }

    pub fn check_patch_activated(&self) -> Result<(), PreconditionFailure> {
        if self.ctx.transport.is_activated() {
            Ok(())
        } else {
            Err(PreconditionFailure::NotActivated)
        }
    }

    /// Gate on `pre_condition`, then wait for the link to accept commands.
    pub async fn is_ready(
        &self,
        pre_condition: Result<(), PreconditionFailure>,
    ) -> Result<(), TaskError> {
        pre_condition?;
        self.ctx.transport.wait_ready().await;
        Ok(())
    }

    // ── Round trip ────────────────────────────────────────────

    /// Send one command and classify its acknowledgement.
    pub async fn transmit(&self, command: PatchCommand) -> Result<PatchResponse, TaskError> {
        let response = self.ctx.transport.send(command).await?;
        check_response(self.func, &response)?;
        Ok(response)
    }

    /// Run `body` under `timeout` and report the outcome.
    pub async fn run<R>(
        &self,
        timeout: Duration,
        body: impl Future<Output = Result<R, TaskError>>,
    ) -> Result<R, TaskError> {
        self.finish(with_deadline(self.func, timeout, body).await)
    }

    /// Log the outcome and emit the matching event.
    pub fn finish<R>(&self, result: Result<R, TaskError>) -> Result<R, TaskError> {
        match &result {
            Ok(_) => {
                info!(target: "pumpcomm", "{} done", self.func);
                self.ctx.sink.emit(&AppEvent::TaskSucceeded(self.func));
            }
            Err(e) => {
                error!(target: "pumpcomm", "{} failed: {e}", self.func);
                self.ctx.sink.emit(&AppEvent::TaskFailed {
                    func: self.func,
                    error: e.clone(),
                });
            }
        }
        result
    }

    /// Start a background invocation unless one is already in flight.
    pub fn enqueue_with(&self, fut: impl Future<Output = ()> + 'static) -> bool {
        self.ctx.dispatcher.enqueue(self.func, &self.in_flight, fut)
    }

    /// Abort the background invocation, if one is running.
    pub fn cancel(&self) -> bool {
        let cancelled = self.in_flight.cancel();
        if cancelled {
            info!(target: "pumpcomm", "{} cancelled", self.func);
        }
        cancelled
    }
}
