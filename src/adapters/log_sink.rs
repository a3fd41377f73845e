//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing every application event to the
//! `log` facade. A UI or broadcast adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`].
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&self, event: &AppEvent) {
        match event {
            AppEvent::DosingResultUpdated(r) => {
                info!(
                    target: "aps",
                    "RESULT | rate={:.2}U/h duration={}min requested={} | iob={:.3}U | {}",
                    r.rate,
                    r.duration_mins,
                    r.temp_basal_requested,
                    r.iob.iob,
                    r.reason,
                );
            }
            AppEvent::DosingResultCleared => {
                info!(target: "aps", "RESULT | cleared");
            }
            AppEvent::DosingFailed(e) => {
                info!(target: "aps", "FAILED | {}", e);
            }
            AppEvent::LimitClamped {
                name,
                value,
                clamped,
            } => {
                warn!(target: "safety", "CLAMP | {} {} -> {}", name, value, clamped);
            }
            AppEvent::TaskSucceeded(func) => {
                info!(target: "pumpcomm", "TASK | {} ok", func);
            }
            AppEvent::TaskFailed { func, error } => {
                warn!(target: "pumpcomm", "TASK | {} failed: {}", func, error);
            }
            AppEvent::PatchBonded { mac } => {
                info!(target: "pumpcomm", "BOND | {}", mac);
            }
            AppEvent::QuickBolusStarted(b) => {
                info!(
                    target: "pumpcomm",
                    "BOLUS | now={}U ext={}U",
                    b.now_dose_u(),
                    b.ext_dose_u()
                );
            }
            AppEvent::ConnectionUpdated(s) => {
                info!(
                    target: "pumpcomm",
                    "CONN | battery={}% reservoir={}U rssi={}dBm",
                    s.battery_percent,
                    s.reservoir_units,
                    s.rssi_dbm
                );
            }
        }
    }
}
