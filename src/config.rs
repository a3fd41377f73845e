//! System configuration parameters.
//!
//! [`SystemConfig`] holds the tunables for the decision engine and the
//! command pipeline. [`PatchConfig`] is device state owned by the pipeline
//! (bonded identity, alert settings) and is persisted through the
//! [`StoragePort`](crate::app::ports::StoragePort) by
//! [`PatchConfigStore`](crate::patch::store::PatchConfigStore).

use embassy_time::Duration;
use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::safety::PatientAge;

/// Length of a colon-separated MAC address string.
pub const MAC_ADDRESS_LEN: usize = 17;

/// Core system configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemConfig {
    pub engine: EngineConfig,
    pub timing: TaskTiming,
}

/// Decision engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Master switch; a disabled engine refuses every cycle.
    pub enabled: bool,
    /// Selects the basal and IOB hard ceilings.
    pub patient_age: PatientAge,
}

/// Deadlines for patch command invocations (milliseconds).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TaskTiming {
    /// Bound on a direct `set()`/`start()` call.
    pub command_timeout_ms: u64,
    /// Bound on an invocation started through `enqueue()`.
    pub enqueue_timeout_ms: u64,
    /// Bound on the whole bonding handshake, bond-state wait included.
    pub bond_timeout_ms: u64,
}

impl TaskTiming {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn enqueue_timeout(&self) -> Duration {
        Duration::from_millis(self.enqueue_timeout_ms)
    }

    pub fn bond_timeout(&self) -> Duration {
        Duration::from_millis(self.bond_timeout_ms)
    }

    /// Every deadline must leave room for at least one round trip.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(100..=300_000).contains(&self.command_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "command_timeout_ms must be 100–300000",
            ));
        }
        if !(100..=300_000).contains(&self.enqueue_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "enqueue_timeout_ms must be 100–300000",
            ));
        }
        if !(100..=300_000).contains(&self.bond_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "bond_timeout_ms must be 100–300000",
            ));
        }
        Ok(())
    }
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig {
                enabled: true,
                patient_age: PatientAge::Adult,
            },
            timing: TaskTiming::default(),
        }
    }
}

impl Default for TaskTiming {
    fn default() -> Self {
        Self {
            command_timeout_ms: 30_000,
            enqueue_timeout_ms: 60_000,
            bond_timeout_ms: 60_000,
        }
    }
}

impl SystemConfig {
    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timing.validate()
    }
}

/// Patch-side settings and identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchConfig {
    /// Bonded patch MAC (`XX:XX:XX:XX:XX:XX`); empty when unbonded.
    pub mac_address: heapless::String<MAC_ADDRESS_LEN>,
    /// Reservoir level (U) that raises the low-reservoir alert.
    pub low_reservoir_alert_units: u8,
    /// Hours before patch expiry that raise the expiry alert.
    pub expire_alert_hours: u8,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            mac_address: heapless::String::new(),
            low_reservoir_alert_units: 10,
            expire_alert_hours: 4,
        }
    }
}

impl PatchConfig {
    pub fn is_bonded(&self) -> bool {
        !self.mac_address.is_empty()
    }

    /// Range-check before persisting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(10..=50).contains(&self.low_reservoir_alert_units)
            || self.low_reservoir_alert_units % 5 != 0
        {
            return Err(ConfigError::ValidationFailed(
                "low_reservoir_alert_units must be 10–50 in steps of 5",
            ));
        }
        if !(1..=24).contains(&self.expire_alert_hours) {
            return Err(ConfigError::ValidationFailed(
                "expire_alert_hours must be 1–24",
            ));
        }
        if !self.mac_address.is_empty() && !is_valid_mac(&self.mac_address) {
            return Err(ConfigError::ValidationFailed(
                "mac_address must be XX:XX:XX:XX:XX:XX",
            ));
        }
        Ok(())
    }
}

/// `XX:XX:XX:XX:XX:XX` with hex digits.
pub fn is_valid_mac(mac: &str) -> bool {
    mac.len() == MAC_ADDRESS_LEN
        && mac.split(':').count() == 6
        && mac
            .split(':')
            .all(|octet| octet.len() == 2 && octet.bytes().all(|b| b.is_ascii_hexdigit()))
}
