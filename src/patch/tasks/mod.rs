//! Concrete patch command tasks.

pub mod low_reservoir;
pub mod quick_bolus;
pub mod start_bond;
pub mod update_connection;

use std::rc::Rc;

pub use low_reservoir::SetLowReservoirTask;
pub use quick_bolus::StartQuickBolusTask;
pub use start_bond::StartBondTask;
pub use update_connection::UpdateConnectionTask;

use super::task::TaskContext;
use super::transport::PatchTransport;

/// One instance of every task, sharing a context.
pub struct PatchTasks<T> {
    pub low_reservoir: Rc<SetLowReservoirTask<T>>,
    pub start_bond: Rc<StartBondTask<T>>,
    pub quick_bolus: Rc<StartQuickBolusTask<T>>,
    pub update_connection: Rc<UpdateConnectionTask<T>>,
}

impl<T: PatchTransport + 'static> PatchTasks<T> {
    pub fn new(ctx: &TaskContext<T>) -> Self {
        let update_connection = Rc::new(UpdateConnectionTask::new(ctx.clone()));
        Self {
            low_reservoir: Rc::new(SetLowReservoirTask::new(ctx.clone())),
            start_bond: Rc::new(StartBondTask::new(ctx.clone())),
            quick_bolus: Rc::new(StartQuickBolusTask::new(
                ctx.clone(),
                Rc::clone(&update_connection),
            )),
            update_connection,
        }
    }
}
