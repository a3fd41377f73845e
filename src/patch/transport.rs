//! Patch transport abstraction.
//!
//! The wireless stack (scanning, GATT, framing) lives outside this crate.
//! Command tasks see only typed commands and typed acknowledgements:
//!
//! - a command is **accepted** (`ResultCode::Success`),
//! - **rejected** (any other code), or
//! - **dropped** (the future never resolves; the task's deadline fires).
//!
//! The transport is shared by every task and takes `&self`; it serialises
//! commands internally if the link needs it.

use core::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{TaskError, TransportError};

/// Pairing status between controller and patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondState {
    None,
    Bonding,
    Bonded,
}

/// Pairing method requested with the bond command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BondingOption {
    JustWorks,
    Numeric,
}

/// Extended bolus duration, 30-minute steps up to 8 h.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BolusExDuration(u16);

impl BolusExDuration {
    pub const STEP_MINUTES: u16 = 30;
    pub const MAX_MINUTES: u16 = 480;

    pub fn from_minutes(minutes: u16) -> Option<Self> {
        (minutes > 0 && minutes <= Self::MAX_MINUTES && minutes % Self::STEP_MINUTES == 0)
            .then_some(Self(minutes))
    }

    pub fn minutes(self) -> u16 {
        self.0
    }
}

/// The three mutually exclusive quick-bolus command shapes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum QuickBolus {
    Immediate {
        dose_u: f32,
    },
    Extended {
        dose_u: f32,
        duration: BolusExDuration,
    },
    Combined {
        now_dose_u: f32,
        ext_dose_u: f32,
        duration: BolusExDuration,
    },
}

impl QuickBolus {
    /// Pick the command shape from the two dose magnitudes.
    ///
    /// `duration` is required whenever `ext_dose_u > 0`.
    pub fn select(
        now_dose_u: f32,
        ext_dose_u: f32,
        duration: Option<BolusExDuration>,
    ) -> Result<Self, TaskError> {
        if !now_dose_u.is_finite() || !ext_dose_u.is_finite() || now_dose_u < 0.0 || ext_dose_u < 0.0 {
            return Err(TaskError::InvalidArgument("bolus doses must be finite and non-negative"));
        }
        match (now_dose_u > 0.0, ext_dose_u > 0.0) {
            (false, false) => Err(TaskError::InvalidArgument("bolus has no dose")),
            (true, false) => Ok(Self::Immediate { dose_u: now_dose_u }),
            (now, true) => {
                let duration =
                    duration.ok_or(TaskError::InvalidArgument("extended bolus needs a duration"))?;
                Ok(if now {
                    Self::Combined {
                        now_dose_u,
                        ext_dose_u,
                        duration,
                    }
                } else {
                    Self::Extended {
                        dose_u: ext_dose_u,
                        duration,
                    }
                })
            }
        }
    }

    /// Units delivered immediately.
    pub fn now_dose_u(&self) -> f32 {
        match *self {
            Self::Immediate { dose_u } => dose_u,
            Self::Extended { .. } => 0.0,
            Self::Combined { now_dose_u, .. } => now_dose_u,
        }
    }

    /// Units delivered over the extended duration.
    pub fn ext_dose_u(&self) -> f32 {
        match *self {
            Self::Immediate { .. } => 0.0,
            Self::Extended { dose_u, .. } => dose_u,
            Self::Combined { ext_dose_u, .. } => ext_dose_u,
        }
    }
}

/// One logical command to the patch.
#[derive(Debug, Clone, PartialEq)]
pub enum PatchCommand {
    SetLowReservoirAndExpireAlert {
        reservoir_units: u8,
        expire_alert_hours: u8,
    },
    StartBonding(BondingOption),
    StartBolus(QuickBolus),
    UpdateConnection,
}

/// Result code carried by every acknowledgement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultCode {
    Success,
    Failed,
    InvalidParameter,
    Busy,
    NotReady,
}

/// Snapshot of the patch link and consumables.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub battery_percent: u8,
    pub reservoir_units: f32,
    pub rssi_dbm: i8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResponsePayload {
    Empty,
    /// Identifier assigned by the patch to an accepted bolus.
    Bolus { bolus_id: u8 },
    Connection(ConnectionStatus),
}

/// A raw acknowledgement from the patch.
#[derive(Debug, Clone, PartialEq)]
pub struct PatchResponse {
    pub code: ResultCode,
    pub payload: ResponsePayload,
}

impl PatchResponse {
    pub fn ack() -> Self {
        Self {
            code: ResultCode::Success,
            payload: ResponsePayload::Empty,
        }
    }

    pub fn rejected(code: ResultCode) -> Self {
        Self {
            code,
            payload: ResponsePayload::Empty,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == ResultCode::Success
    }
}

impl fmt::Display for PatchResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({:?})", self.code, self.payload)
    }
}

/// Command/response link to the patch.
#[allow(async_fn_in_trait)]
pub trait PatchTransport {
    fn is_connected(&self) -> bool;

    fn is_activated(&self) -> bool;

    /// Resolves once the link can accept a command.
    async fn wait_ready(&self);

    /// Send one command and wait for its acknowledgement.
    async fn send(&self, command: PatchCommand) -> Result<PatchResponse, TransportError>;

    /// Next bond-state transition observed on the link.
    async fn next_bond_state(&self) -> Result<BondState, TransportError>;

    /// Point the link layer at a (possibly staged) patch identity.
    fn update_mac_address(&self, mac: &str);
}
