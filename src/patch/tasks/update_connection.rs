//! Connection-status refresh.

use std::rc::Rc;

use log::debug;

use crate::app::events::AppEvent;
use crate::error::{PreconditionFailure, TaskError, TransportError};
use crate::patch::task::{CommandTask, TaskBase, TaskContext, TaskFunc};
use crate::patch::transport::{ConnectionStatus, PatchCommand, PatchTransport, ResponsePayload};

pub struct UpdateConnectionTask<T> {
    base: TaskBase<T>,
}

impl<T: PatchTransport + 'static> UpdateConnectionTask<T> {
    pub fn new(ctx: TaskContext<T>) -> Self {
        Self {
            base: TaskBase::new(ctx, TaskFunc::UpdateConnection),
        }
    }

    pub async fn update(&self) -> Result<ConnectionStatus, TaskError> {
        let timeout = self.base.ctx().timing.command_timeout();
        self.base.run(timeout, self.invoke()).await
    }

    pub fn enqueue(self: &Rc<Self>) -> bool {
        let this = Rc::clone(self);
        self.base.enqueue_with(async move {
            let timeout = this.base.ctx().timing.enqueue_timeout();
            let _ = this.base.run(timeout, this.invoke()).await;
        })
    }

    pub fn cancel(&self) -> bool {
        self.base.cancel()
    }

    async fn invoke(&self) -> Result<ConnectionStatus, TaskError> {
        self.base.is_ready(self.pre_condition()).await?;
        let response = self.base.transmit(PatchCommand::UpdateConnection).await?;
        let status = match response.payload {
            ResponsePayload::Connection(status) => status,
            other => return Err(TransportError::Io(format!("unexpected payload {other:?}")).into()),
        };
        debug!(
            target: "pumpcomm",
            "connection: battery={}% reservoir={} U rssi={} dBm",
            status.battery_percent,
            status.reservoir_units,
            status.rssi_dbm
        );
        self.base.ctx().sink.emit(&AppEvent::ConnectionUpdated(status));
        Ok(status)
    }
}

impl<T: PatchTransport> CommandTask for UpdateConnectionTask<T> {
    fn func(&self) -> TaskFunc {
        self.base.func()
    }

    fn pre_condition(&self) -> Result<(), PreconditionFailure> {
        self.base.check_patch_connected()
    }
}
