//! Published decision output and its cache.
//!
//! A [`DosingResult`] is immutable once produced. The [`ResultCache`]
//! holds the latest one together with the cycle timestamp; both are swapped
//! in one locked step so readers never observe a result from one cycle
//! paired with the timestamp of another.

use core::cell::RefCell;
use std::sync::Arc;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use serde::Serialize;

use super::snapshot::{IobTotal, PhysiologicalSnapshot};

/// Output of one successful decision cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DosingResult {
    /// Requested temp basal rate, U/h.
    pub rate: f64,
    pub duration_mins: u32,
    pub temp_basal_requested: bool,
    /// IOB total the decision was based on.
    pub iob: IobTotal,
    pub timestamp_ms: i64,
    pub reason: String,
    /// Inputs the decision was computed from.
    pub inputs: PhysiologicalSnapshot,
}

impl DosingResult {
    /// Equal in everything but the timestamp.
    pub fn same_decision(&self, other: &DosingResult) -> bool {
        self.rate == other.rate
            && self.duration_mins == other.duration_mins
            && self.temp_basal_requested == other.temp_basal_requested
            && self.iob == other.iob
            && self.reason == other.reason
            && self.inputs == other.inputs
    }

    /// Audit record for export.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[derive(Default)]
struct Published {
    result: Option<Arc<DosingResult>>,
    last_run_ms: Option<i64>,
}

/// Shared handle to the engine's last published result.
///
/// Clones share the same slot. Only the engine mutates it.
#[derive(Clone)]
pub struct ResultCache {
    inner: Arc<Mutex<CriticalSectionRawMutex, RefCell<Published>>>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(RefCell::new(Published::default()))),
        }
    }

    pub fn last_result(&self) -> Option<Arc<DosingResult>> {
        self.inner.lock(|p| p.borrow().result.clone())
    }

    /// Timestamp of the last successful cycle.
    pub fn last_run(&self) -> Option<i64> {
        self.inner.lock(|p| p.borrow().last_run_ms)
    }

    /// Result and cycle timestamp read under one lock.
    pub fn load(&self) -> (Option<Arc<DosingResult>>, Option<i64>) {
        self.inner.lock(|p| {
            let p = p.borrow();
            (p.result.clone(), p.last_run_ms)
        })
    }

    pub(crate) fn publish(&self, result: Arc<DosingResult>) {
        let run_at = result.timestamp_ms;
        self.inner.lock(|p| {
            *p.borrow_mut() = Published {
                result: Some(result),
                last_run_ms: Some(run_at),
            };
        });
    }

    pub(crate) fn clear(&self) {
        self.inner.lock(|p| *p.borrow_mut() = Published::default());
    }
}
