//! System clock adapter.
//!
//! Implements [`Clock`] over `std::time::SystemTime`, with a fixed UTC
//! offset for the seconds-from-midnight lookup used by time-indexed
//! profile values.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::app::ports::Clock;

/// Wall clock with a fixed local offset.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    utc_offset_secs: i32,
}

impl SystemClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Local time = UTC + `utc_offset_secs`.
    pub fn with_utc_offset(utc_offset_secs: i32) -> Self {
        Self { utc_offset_secs }
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> i64 {
        // A clock before 1970 reads as the epoch.
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as i64)
    }

    fn seconds_from_midnight(&self) -> u32 {
        let local = self.now_ms() / 1000 + i64::from(self.utc_offset_secs);
        local.rem_euclid(86_400) as u32
    }
}
