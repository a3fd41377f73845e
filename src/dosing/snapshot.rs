//! Physiological inputs for one decision cycle.
//!
//! The value types here mirror what the host application already tracks
//! (profile, pump, glucose trend, treatments). [`SnapshotBuilder`] turns
//! them into a [`PhysiologicalSnapshot`]: ceilings resolved, targets
//! rounded and clamped, no-fallback parameters gated.

use serde::{Deserialize, Serialize};

use crate::safety::{
    Bounds, DIA_BOUNDS, IC_BOUNDS, ISF_BOUNDS, LimitViolation, PROFILE_TARGET_BOUNDS,
    SafetyLimitValidator, TEMP_TARGET_BOUNDS, TargetBounds, round_to,
};

use super::ports::DosingInputs;

// ───────────────────────────────────────────────────────────────
// Input value types
// ───────────────────────────────────────────────────────────────

/// Carb ratio in effect from `start_secs` after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CarbRatioBlock {
    pub start_secs: u32,
    /// Grams of carbohydrate covered by one unit.
    pub ratio: f64,
}

/// The active therapy profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub target_low_mgdl: f64,
    pub target_high_mgdl: f64,
    pub target_mgdl: f64,
    /// Insulin sensitivity factor, mg/dL per U.
    pub isf_mgdl: f64,
    /// Duration of insulin action, hours.
    pub dia_hours: f64,
    /// Sorted by `start_secs`.
    pub carb_ratios: Vec<CarbRatioBlock>,
    pub max_daily_basal: f64,
}

impl Profile {
    /// Carb ratio in effect at `seconds_from_midnight`.
    ///
    /// Before the first block starts, the last block of the previous day
    /// is still in effect.
    pub fn carb_ratio_at(&self, seconds_from_midnight: u32) -> Option<f64> {
        self.carb_ratios
            .iter()
            .rev()
            .find(|b| b.start_secs <= seconds_from_midnight)
            .or_else(|| self.carb_ratios.last())
            .map(|b| b.ratio)
    }
}

/// Glucose trend derived from recent CGM readings (mg/dL).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlucoseStatus {
    pub glucose: f64,
    pub delta: f64,
    pub short_avg_delta: f64,
    pub long_avg_delta: f64,
    pub date_ms: i64,
}

/// Insulin-on-board totals at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IobTotal {
    pub time_ms: i64,
    pub iob: f64,
    pub activity: f64,
    pub bolus_snooze: f64,
    pub basal_iob: f64,
    pub net_basal_insulin: f64,
    pub high_temp_insulin: f64,
}

impl IobTotal {
    /// Combine bolus and temp-basal IOB into one total.
    pub fn combine(bolus: &IobTotal, basal: &IobTotal) -> Self {
        Self {
            time_ms: bolus.time_ms,
            iob: bolus.iob + basal.basal_iob,
            activity: bolus.activity + basal.activity,
            bolus_snooze: bolus.bolus_snooze,
            basal_iob: bolus.basal_iob + basal.basal_iob,
            net_basal_insulin: bolus.net_basal_insulin + basal.net_basal_insulin,
            high_temp_insulin: bolus.high_temp_insulin + basal.high_temp_insulin,
        }
    }

    /// Round amounts to 0.001 U and activity to 0.0001.
    #[must_use]
    pub fn round(self) -> Self {
        Self {
            time_ms: self.time_ms,
            iob: round_to(self.iob, 0.001),
            activity: round_to(self.activity, 0.0001),
            bolus_snooze: round_to(self.bolus_snooze, 0.0001),
            basal_iob: round_to(self.basal_iob, 0.001),
            net_basal_insulin: round_to(self.net_basal_insulin, 0.001),
            high_temp_insulin: round_to(self.high_temp_insulin, 0.001),
        }
    }
}

/// Carbohydrate and bolus history relevant to the current cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MealData {
    pub carbs: f64,
    pub meal_cob: f64,
    pub boluses: f64,
}

/// A time-bounded user override of the target range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempTarget {
    pub start_ms: i64,
    pub duration_mins: u32,
    pub low_mgdl: f64,
    pub high_mgdl: f64,
}

impl TempTarget {
    pub fn target(&self) -> f64 {
        (self.low_mgdl + self.high_mgdl) / 2.0
    }

    pub fn end_ms(&self) -> i64 {
        self.start_ms + i64::from(self.duration_mins) * 60_000
    }

    pub fn is_active_at(&self, now_ms: i64) -> bool {
        self.start_ms <= now_ms && now_ms < self.end_ms()
    }
}

/// What the active pump reports about itself.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PumpInfo {
    /// Scheduled basal rate right now, U/h.
    pub base_basal_rate: f64,
    pub temp_basal_capable: bool,
    pub temp_basal_in_progress: bool,
}

// ───────────────────────────────────────────────────────────────
// Snapshot
// ───────────────────────────────────────────────────────────────

/// Fully validated input handed to the algorithm adapter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhysiologicalSnapshot {
    pub profile: Profile,
    pub min_bg: f64,
    pub max_bg: f64,
    pub target_bg: f64,
    /// Set when a temporary target replaced the profile targets.
    pub temp_target: Option<TempTarget>,
    /// Carb ratio in effect for this cycle.
    pub carb_ratio: f64,
    pub current_basal: f64,
    pub max_basal: f64,
    pub max_iob: f64,
    pub iob: IobTotal,
    pub glucose: GlucoseStatus,
    pub meal: MealData,
}

/// A `verify` clamp that changed a value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clamp {
    pub name: &'static str,
    pub value: f64,
    pub clamped: f64,
}

/// Assembles a [`PhysiologicalSnapshot`] from the host's data sources.
pub struct SnapshotBuilder<'a> {
    validator: &'a SafetyLimitValidator,
    clamps: Vec<Clamp>,
}

impl<'a> SnapshotBuilder<'a> {
    pub fn new(validator: &'a SafetyLimitValidator) -> Self {
        Self {
            validator,
            clamps: Vec::new(),
        }
    }

    /// Clamps applied by the last [`build`](Self::build).
    pub fn clamps(&self) -> &[Clamp] {
        &self.clamps
    }

    /// Resolve ceilings and targets, then run the no-fallback gates.
    ///
    /// The caller has already checked that profile, pump and glucose data
    /// exist.
    pub fn build(
        &mut self,
        sources: &impl DosingInputs,
        profile: Profile,
        pump: PumpInfo,
        glucose: GlucoseStatus,
        now_ms: i64,
        seconds_from_midnight: u32,
    ) -> Result<PhysiologicalSnapshot, LimitViolation> {
        self.clamps.clear();
        let v = self.validator;

        // ── Ceilings from the constraint subsystem ───────────────
        let max_basal = self.verify(
            sources.max_basal_allowed(&profile),
            "max_basal",
            Bounds::new(0.0, v.age().max_basal()),
        )?;
        let max_iob = self.verify(sources.max_iob_allowed(), "max_iob", v.max_iob_bounds())?;

        // ── Treatments ───────────────────────────────────────────
        let iob = IobTotal::combine(&sources.bolus_iob(now_ms), &sources.basal_iob(now_ms)).round();
        let meal = sources.meal_data(now_ms);

        // ── Targets: profile first, temp target overrides ────────
        let temp_target = sources
            .temp_target_at(now_ms)
            .filter(|tt| tt.is_active_at(now_ms));
        let (min_bg, max_bg, target_bg) = match temp_target {
            Some(tt) => self.verify_targets(
                tt.low_mgdl,
                tt.high_mgdl,
                tt.target(),
                &TEMP_TARGET_BOUNDS,
            )?,
            None => self.verify_targets(
                round_to(profile.target_low_mgdl, 0.1),
                round_to(profile.target_high_mgdl, 0.1),
                round_to(profile.target_mgdl, 0.1),
                &PROFILE_TARGET_BOUNDS,
            )?,
        };

        // ── No-fallback gates ────────────────────────────────────
        v.check_only(profile.dia_hours, "dia", DIA_BOUNDS)?;
        let carb_ratio = v.check_only(
            profile.carb_ratio_at(seconds_from_midnight).unwrap_or(f64::NAN),
            "carbratio",
            IC_BOUNDS,
        )?;
        v.check_only(profile.isf_mgdl, "sens", ISF_BOUNDS)?;
        v.check_only(
            profile.max_daily_basal,
            "max_daily_basal",
            v.max_daily_basal_bounds(),
        )?;
        let current_basal = v.check_only(
            pump.base_basal_rate,
            "current_basal",
            v.current_basal_bounds(),
        )?;

        Ok(PhysiologicalSnapshot {
            profile,
            min_bg,
            max_bg,
            target_bg,
            temp_target,
            carb_ratio,
            current_basal,
            max_basal,
            max_iob,
            iob,
            glucose,
            meal,
        })
    }

    fn verify_targets(
        &mut self,
        min_bg: f64,
        max_bg: f64,
        target_bg: f64,
        bounds: &TargetBounds,
    ) -> Result<(f64, f64, f64), LimitViolation> {
        Ok((
            self.verify(min_bg, "minBg", bounds.min_bg)?,
            self.verify(max_bg, "maxBg", bounds.max_bg)?,
            self.verify(target_bg, "targetBg", bounds.target_bg)?,
        ))
    }

    fn verify(
        &mut self,
        value: f64,
        name: &'static str,
        bounds: Bounds,
    ) -> Result<f64, LimitViolation> {
        let clamped = self.validator.verify(value, name, bounds)?;
        if clamped != value {
            self.clamps.push(Clamp {
                name,
                value,
                clamped,
            });
        }
        Ok(clamped)
    }
}
