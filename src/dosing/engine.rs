//! Dosing decision engine.
//!
//! One cycle is linear with no retries:
//!
//! ```text
//!  inputs present? ──▶ snapshot (ceilings, targets, gates) ──▶ algorithm
//!        │ no                 │ hard limit                        │ failure
//!        ▼                    ▼                                   ▼
//!   DosingFailed        DosingFailed                  cache cleared + DosingFailed
//!   (cache kept)        (cache kept)
//!                                                                 │ ok
//!                                                                 ▼
//!                                        bound rate, zero-change override,
//!                                        publish + DosingResultUpdated
//! ```
//!
//! `invoke` takes `&mut self`, so two cycles on one engine cannot
//! interleave. Hosts that trigger cycles from several threads share the
//! engine behind a mutex; observers read through [`ResultCache`] clones.

use std::sync::Arc;
use std::time::Instant;

use log::{debug, error, info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::{Clock, EventSink};
use crate::config::EngineConfig;
use crate::error::{AlgorithmError, DosingError, MissingInput};
use crate::safety::SafetyLimitValidator;

use super::ports::{AlgorithmAdapter, DosingInputs, Recommendation};
use super::result::{DosingResult, ResultCache};
use super::snapshot::{PhysiologicalSnapshot, PumpInfo, SnapshotBuilder};

pub struct DosingEngine {
    config: EngineConfig,
    validator: SafetyLimitValidator,
    cache: ResultCache,
}

impl DosingEngine {
    pub fn new(config: EngineConfig) -> Self {
        let validator = SafetyLimitValidator::new(config.patient_age);
        Self {
            config,
            validator,
            cache: ResultCache::new(),
        }
    }

    // ── Queries ───────────────────────────────────────────────

    /// Read-only handle to the published result.
    pub fn results(&self) -> ResultCache {
        self.cache.clone()
    }

    pub fn last_result(&self) -> Option<Arc<DosingResult>> {
        self.cache.last_result()
    }

    /// Timestamp of the last successful cycle.
    pub fn last_run(&self) -> Option<i64> {
        self.cache.last_run()
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// The engine can only drive pumps that accept temp basals.
    pub fn is_usable_with(&self, pump: Option<&PumpInfo>) -> bool {
        pump.is_none_or(|p| p.temp_basal_capable)
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        info!(target: "aps", "engine {}", if enabled { "enabled" } else { "disabled" });
        self.config.enabled = enabled;
    }

    // ── Decision cycle ────────────────────────────────────────

    /// Run one decision cycle and publish its result.
    ///
    /// Missing inputs and hard-limit failures leave the previously
    /// published result in place; an algorithm failure clears it.
    pub fn invoke(
        &mut self,
        initiator: &str,
        inputs: &impl DosingInputs,
        algorithm: &impl AlgorithmAdapter,
        clock: &impl Clock,
        sink: &impl EventSink,
    ) -> Result<Arc<DosingResult>, DosingError> {
        debug!(target: "aps", "invoke from {initiator}");

        match self.run_cycle(inputs, algorithm, clock, sink) {
            Ok(result) => {
                let result = Arc::new(result);
                self.cache.publish(Arc::clone(&result));
                info!(
                    target: "aps",
                    "result published: rate={} U/h duration={} min requested={}",
                    result.rate,
                    result.duration_mins,
                    result.temp_basal_requested
                );
                sink.emit(&AppEvent::DosingResultUpdated(Arc::clone(&result)));
                Ok(result)
            }
            Err(e) => {
                match &e {
                    DosingError::MissingInput(m) => debug!(target: "aps", "{m}"),
                    // Already logged with name and bound by the validator.
                    DosingError::HardLimit(_) => {}
                    DosingError::Algorithm(a) => error!(target: "aps", "calculation failed: {a}"),
                }
                if e.clears_cache() {
                    self.cache.clear();
                    sink.emit(&AppEvent::DosingResultCleared);
                }
                sink.emit(&AppEvent::DosingFailed(e.clone()));
                Err(e)
            }
        }
    }

    fn run_cycle(
        &self,
        inputs: &impl DosingInputs,
        algorithm: &impl AlgorithmAdapter,
        clock: &impl Clock,
        sink: &impl EventSink,
    ) -> Result<DosingResult, DosingError> {
        let profile = inputs.profile().ok_or(MissingInput::Profile)?;
        let pump = inputs.pump().ok_or(MissingInput::Pump)?;
        if !self.config.enabled || !self.is_usable_with(Some(&pump)) {
            return Err(MissingInput::EngineDisabled.into());
        }
        let glucose = inputs.glucose_status().ok_or(MissingInput::GlucoseData)?;

        let now_ms = clock.now_ms();
        let started = Instant::now();
        let mut builder = SnapshotBuilder::new(&self.validator);
        let built = builder.build(
            inputs,
            profile,
            pump,
            glucose,
            now_ms,
            clock.seconds_from_midnight(),
        );
        for c in builder.clamps() {
            sink.emit(&AppEvent::LimitClamped {
                name: c.name,
                value: c.value,
                clamped: c.clamped,
            });
        }
        let snapshot = built?;
        debug!(target: "aps", "data gathering took {} ms", started.elapsed().as_millis());

        let started = Instant::now();
        let recommendation = algorithm.determine_basal(&snapshot)?;
        debug!(target: "aps", "calculation took {} ms", started.elapsed().as_millis());

        self.bound(recommendation, snapshot, &pump, now_ms)
    }

    /// Apply the output-side limits to the algorithm's recommendation.
    fn bound(
        &self,
        rec: Recommendation,
        snapshot: PhysiologicalSnapshot,
        pump: &PumpInfo,
        now_ms: i64,
    ) -> Result<DosingResult, DosingError> {
        if !rec.rate.is_finite() || rec.rate < 0.0 {
            return Err(AlgorithmError::MalformedOutput(format!("rate {}", rec.rate)).into());
        }

        let mut rate = rec.rate;
        if rate > snapshot.max_basal {
            warn!(
                target: "aps",
                "rate {} U/h above max basal {} U/h, limiting",
                rate,
                snapshot.max_basal
            );
            rate = snapshot.max_basal;
        }

        // A zero temp basal with nothing running means "no action".
        let mut temp_basal_requested = rec.temp_basal_requested;
        if rec.rate == 0.0 && rec.duration_mins == 0 && !pump.temp_basal_in_progress {
            temp_basal_requested = false;
        }

        Ok(DosingResult {
            rate,
            duration_mins: rec.duration_mins,
            temp_basal_requested,
            iob: snapshot.iob,
            timestamp_ms: now_ms,
            reason: rec.reason,
            inputs: snapshot,
        })
    }
}
