//! Outbound application events.
//!
//! The engine and the command tasks emit these through the
//! [`EventSink`](super::ports::EventSink) port. Receivers must tolerate
//! duplicates; delivery is fire-and-forget.

use std::sync::Arc;

use crate::dosing::result::DosingResult;
use crate::error::{DosingError, TaskError};
use crate::patch::task::TaskFunc;
use crate::patch::transport::{ConnectionStatus, QuickBolus};

/// Structured events emitted by the core.
#[derive(Debug, Clone)]
pub enum AppEvent {
    // ── Dosing engine ─────────────────────────────────────────
    /// A new result was published.
    DosingResultUpdated(Arc<DosingResult>),

    /// The adapter failed and the published result was cleared.
    DosingResultCleared,

    /// A cycle was aborted. Missing-input variants double as the
    /// user-visible status message.
    DosingFailed(DosingError),

    /// `verify` replaced an out-of-range value with its bound.
    LimitClamped {
        name: &'static str,
        value: f64,
        clamped: f64,
    },

    // ── Command tasks ─────────────────────────────────────────
    /// A task invocation completed with a validated acknowledgement.
    TaskSucceeded(TaskFunc),

    /// A task invocation failed (precondition, rejection, timeout, transport).
    TaskFailed { func: TaskFunc, error: TaskError },

    /// The patch reached the bonded state and the MAC was recorded.
    PatchBonded {
        mac: heapless::String<{ crate::config::MAC_ADDRESS_LEN }>,
    },

    /// A quick bolus was accepted by the patch.
    QuickBolusStarted(QuickBolus),

    /// Fresh connection status read from the patch.
    ConnectionUpdated(ConnectionStatus),
}
