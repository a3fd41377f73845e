//! Low-reservoir and expiry alert configuration.

use std::rc::Rc;

use crate::error::{PreconditionFailure, TaskError};
use crate::patch::task::{CommandTask, TaskBase, TaskContext, TaskFunc};
use crate::patch::transport::{PatchCommand, PatchTransport};

pub struct SetLowReservoirTask<T> {
    base: TaskBase<T>,
}

impl<T: PatchTransport + 'static> SetLowReservoirTask<T> {
    pub fn new(ctx: TaskContext<T>) -> Self {
        Self {
            base: TaskBase::new(ctx, TaskFunc::LowReservoir),
        }
    }

    /// Push the alert thresholds to the patch. Safe to repeat with the same
    /// values.
    pub async fn set(&self, reservoir_units: u8, expire_alert_hours: u8) -> Result<(), TaskError> {
        let timeout = self.base.ctx().timing.command_timeout();
        self.base
            .run(timeout, self.invoke(reservoir_units, expire_alert_hours))
            .await
    }

    /// Re-send the stored thresholds in the background.
    pub fn enqueue(self: &Rc<Self>) -> bool {
        let cfg = self.base.ctx().store.get();
        let this = Rc::clone(self);
        self.base.enqueue_with(async move {
            let timeout = this.base.ctx().timing.enqueue_timeout();
            let _ = this
                .base
                .run(
                    timeout,
                    this.invoke(cfg.low_reservoir_alert_units, cfg.expire_alert_hours),
                )
                .await;
        })
    }

    pub fn cancel(&self) -> bool {
        self.base.cancel()
    }

    async fn invoke(&self, reservoir_units: u8, expire_alert_hours: u8) -> Result<(), TaskError> {
        self.base.is_ready(self.pre_condition()).await?;
        self.base
            .transmit(PatchCommand::SetLowReservoirAndExpireAlert {
                reservoir_units,
                expire_alert_hours,
            })
            .await?;
        Ok(())
    }
}

impl<T: PatchTransport> CommandTask for SetLowReservoirTask<T> {
    fn func(&self) -> TaskFunc {
        self.base.func()
    }

    fn pre_condition(&self) -> Result<(), PreconditionFailure> {
        self.base.check_patch_connected()
    }
}
