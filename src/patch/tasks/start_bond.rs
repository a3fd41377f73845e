//! Bonding handshake.
//!
//! ```text
//!  stage MAC ──▶ StartBonding(Numeric) ──▶ bond-state stream
//!                                             │ Bonding → keep waiting
//!                                             │ None    → Unbonded (fail)
//!                                             ▼ Bonded
//!                                        persist MAC + PatchBonded
//! ```
//!
//! The link drops and re-establishes itself for pairing after the command
//! is accepted, so success is only known from the bond-state stream. The
//! staged MAC is held by a [`StagedMac`] guard: any exit other than a
//! committed success (error, timeout, cancellation) rolls it back.

use std::rc::Rc;

use log::{debug, info, warn};

use crate::app::events::AppEvent;
use crate::config::{MAC_ADDRESS_LEN, is_valid_mac};
use crate::error::{PreconditionFailure, TaskError};
use crate::patch::store::PatchConfigStore;
use crate::patch::task::{CommandTask, TaskBase, TaskContext, TaskFunc};
use crate::patch::transport::{BondState, BondingOption, PatchCommand, PatchTransport};

type Mac = heapless::String<MAC_ADDRESS_LEN>;

pub struct StartBondTask<T> {
    base: TaskBase<T>,
}

impl<T: PatchTransport + 'static> StartBondTask<T> {
    pub fn new(ctx: TaskContext<T>) -> Self {
        Self {
            base: TaskBase::new(ctx, TaskFunc::StartBond),
        }
    }

    /// Bond with the patch at `mac`. Resolves once the link reports bonded.
    pub async fn start(&self, mac: &str) -> Result<(), TaskError> {
        let timeout = self.base.ctx().timing.bond_timeout();
        self.base.run(timeout, self.invoke(mac)).await
    }

    /// Background variant of [`start`](Self::start).
    pub fn enqueue(self: &Rc<Self>, mac: &str) -> bool {
        let mac = match parse_mac(mac) {
            Ok(mac) => mac,
            Err(e) => {
                let _ = self.base.finish::<()>(Err(e));
                return false;
            }
        };
        let this = Rc::clone(self);
        self.base.enqueue_with(async move {
            let timeout = this.base.ctx().timing.bond_timeout();
            let _ = this.base.run(timeout, this.invoke(&mac)).await;
        })
    }

    pub fn cancel(&self) -> bool {
        self.base.cancel()
    }

    async fn invoke(&self, mac: &str) -> Result<(), TaskError> {
        let mac = parse_mac(mac)?;
        self.base.is_ready(self.pre_condition()).await?;

        let ctx = self.base.ctx();
        let staged = StagedMac::stage(&ctx.store, &*ctx.transport, &mac)?;

        self.base
            .transmit(PatchCommand::StartBonding(BondingOption::Numeric))
            .await?;

        loop {
            match ctx.transport.next_bond_state().await? {
                BondState::Bonded => break,
                BondState::None => return Err(TaskError::Unbonded),
                BondState::Bonding => debug!(target: "pumpcomm", "bonding with {mac}"),
            }
        }

        staged.commit()?;
        info!(target: "pumpcomm", "bonded with {mac}");
        ctx.sink.emit(&AppEvent::PatchBonded { mac });
        Ok(())
    }
}

impl<T: PatchTransport> CommandTask for StartBondTask<T> {
    fn func(&self) -> TaskFunc {
        self.base.func()
    }

    fn pre_condition(&self) -> Result<(), PreconditionFailure> {
        self.base.check_patch_connected()
    }
}

fn parse_mac(mac: &str) -> Result<Mac, TaskError> {
    if !is_valid_mac(mac) {
        return Err(TaskError::InvalidArgument("mac must be XX:XX:XX:XX:XX:XX"));
    }
    let mut out = Mac::new();
    out.push_str(mac)
        .map_err(|()| TaskError::InvalidArgument("mac too long"))?;
    Ok(out)
}

// ── Staged identity ──────────────────────────────────────────

/// A MAC written to the working config and the link layer, pending bond.
///
/// Dropped without [`commit`](Self::commit): the MAC is cleared in both
/// places and the cleared state persisted.
struct StagedMac<'a, T: PatchTransport> {
    store: &'a PatchConfigStore,
    transport: &'a T,
    committed: bool,
}

impl<'a, T: PatchTransport> StagedMac<'a, T> {
    fn stage(store: &'a PatchConfigStore, transport: &'a T, mac: &str) -> Result<Self, TaskError> {
        store.stage_mac(mac).map_err(TaskError::Storage)?;
        transport.update_mac_address(mac);
        Ok(Self {
            store,
            transport,
            committed: false,
        })
    }

    fn commit(mut self) -> Result<(), TaskError> {
        self.store.commit_mac().map_err(TaskError::Storage)?;
        self.committed = true;
        Ok(())
    }
}

impl<T: PatchTransport> Drop for StagedMac<'_, T> {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        warn!(target: "pumpcomm", "bonding did not complete, clearing staged MAC");
        self.store.rollback_mac();
        self.transport.update_mac_address("");
    }
}
