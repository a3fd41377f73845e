//! Quick bolus start.
//!
//! The command shape is chosen once from the two dose magnitudes (see
//! [`QuickBolus::select`]); exactly one bolus command is sent per call. An
//! accepted bolus queues a connection refresh without waiting for it.

use std::rc::Rc;

use log::info;

use crate::app::events::AppEvent;
use crate::error::{PreconditionFailure, TaskError};
use crate::patch::task::{CommandTask, TaskBase, TaskContext, TaskFunc};
use crate::patch::transport::{BolusExDuration, PatchCommand, PatchTransport, QuickBolus};

use super::update_connection::UpdateConnectionTask;

pub struct StartQuickBolusTask<T> {
    base: TaskBase<T>,
    update_connection: Rc<UpdateConnectionTask<T>>,
}

impl<T: PatchTransport + 'static> StartQuickBolusTask<T> {
    pub fn new(ctx: TaskContext<T>, update_connection: Rc<UpdateConnectionTask<T>>) -> Self {
        Self {
            base: TaskBase::new(ctx, TaskFunc::StartQuickBolus),
            update_connection,
        }
    }

    /// Start an immediate, extended or combined bolus.
    ///
    /// `ext_duration` is required when `ext_dose_u > 0`.
    pub async fn start(
        &self,
        now_dose_u: f32,
        ext_dose_u: f32,
        ext_duration: Option<BolusExDuration>,
    ) -> Result<QuickBolus, TaskError> {
        let timeout = self.base.ctx().timing.command_timeout();
        self.base
            .run(timeout, self.invoke(now_dose_u, ext_dose_u, ext_duration))
            .await
    }

    async fn invoke(
        &self,
        now_dose_u: f32,
        ext_dose_u: f32,
        ext_duration: Option<BolusExDuration>,
    ) -> Result<QuickBolus, TaskError> {
        let bolus = QuickBolus::select(now_dose_u, ext_dose_u, ext_duration)?;
        self.base.is_ready(self.pre_condition()).await?;
        self.base.transmit(PatchCommand::StartBolus(bolus)).await?;

        info!(
            target: "pumpcomm",
            "quick bolus started: now={} U ext={} U",
            bolus.now_dose_u(),
            bolus.ext_dose_u()
        );
        self.base.ctx().sink.emit(&AppEvent::QuickBolusStarted(bolus));
        self.update_connection.enqueue();
        Ok(bolus)
    }
}

impl<T: PatchTransport> CommandTask for StartQuickBolusTask<T> {
    fn func(&self) -> TaskFunc {
        self.base.func()
    }

    fn pre_condition(&self) -> Result<(), PreconditionFailure> {
        self.base.check_patch_connected()?;
        self.base.check_patch_activated()
    }
}
