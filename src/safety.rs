//! Hard physiological limits.
//!
//! Two kinds of check guard every decision cycle:
//!
//! - [`SafetyLimitValidator::verify`] **clamps** a value into its bounds.
//!   Used where the bound itself is a safe fallback (BG targets, IOB ceiling).
//! - [`SafetyLimitValidator::check_only`] **rejects** an out-of-range value.
//!   Used where no fallback exists (DIA, carb ratio, ISF, basal rates); a
//!   failure aborts the cycle.
//!
//! Target bounds come in two sets: the permanent profile set and a tighter
//! set applied only while a temporary target is active.

use core::fmt;

use log::{error, warn};
use serde::{Deserialize, Serialize};

/// Inclusive `[min, max]` range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

/// Bounds for the three BG target values (mg/dL).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetBounds {
    pub min_bg: Bounds,
    pub max_bg: Bounds,
    pub target_bg: Bounds,
}

// ── Target bounds (mg/dL) ─────────────────────────────────────

pub const PROFILE_TARGET_BOUNDS: TargetBounds = TargetBounds {
    min_bg: Bounds::new(72.0, 180.0),
    max_bg: Bounds::new(90.0, 270.0),
    target_bg: Bounds::new(80.0, 200.0),
};

/// Each range sits inside its [`PROFILE_TARGET_BOUNDS`] counterpart.
pub const TEMP_TARGET_BOUNDS: TargetBounds = TargetBounds {
    min_bg: Bounds::new(80.0, 160.0),
    max_bg: Bounds::new(90.0, 200.0),
    target_bg: Bounds::new(80.0, 180.0),
};

// ── Profile parameter limits ──────────────────────────────────

/// Insulin action duration, hours.
pub const DIA_BOUNDS: Bounds = Bounds::new(5.0, 12.0);
/// Carb ratio, g/U.
pub const IC_BOUNDS: Bounds = Bounds::new(2.0, 100.0);
/// Insulin sensitivity, mg/dL per U.
pub const ISF_BOUNDS: Bounds = Bounds::new(2.0, 720.0);

pub const MIN_DAILY_BASAL: f64 = 0.02;
pub const MIN_CURRENT_BASAL: f64 = 0.01;

/// Patient age group; selects the basal and IOB ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientAge {
    Child,
    Teenage,
    Adult,
    ResistantAdult,
    Pregnant,
}

impl PatientAge {
    /// Hard ceiling for any basal rate, U/h.
    pub const fn max_basal(self) -> f64 {
        match self {
            Self::Child => 2.0,
            Self::Teenage => 5.0,
            Self::Adult => 10.0,
            Self::ResistantAdult => 12.0,
            Self::Pregnant => 25.0,
        }
    }

    /// Hard ceiling for total insulin on board, U.
    pub const fn max_iob(self) -> f64 {
        match self {
            Self::Child => 3.0,
            Self::Teenage => 5.0,
            Self::Adult => 7.0,
            Self::ResistantAdult => 12.0,
            Self::Pregnant => 25.0,
        }
    }
}

/// A value that failed a hard-limit check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LimitViolation {
    pub name: &'static str,
    pub value: f64,
    pub bounds: Bounds,
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} outside hard limits {}", self.name, self.value, self.bounds)
    }
}

/// Round `value` to the nearest multiple of `step`.
pub fn round_to(value: f64, step: f64) -> f64 {
    (value / step).round() * step
}

/// Stateless validator parameterised by patient age group.
#[derive(Debug, Clone, Copy)]
pub struct SafetyLimitValidator {
    age: PatientAge,
}

impl SafetyLimitValidator {
    pub fn new(age: PatientAge) -> Self {
        Self { age }
    }

    pub fn age(&self) -> PatientAge {
        self.age
    }

    /// Bounds for the maximum daily basal.
    pub fn max_daily_basal_bounds(&self) -> Bounds {
        Bounds::new(MIN_DAILY_BASAL, self.age.max_basal())
    }

    /// Bounds for the pump's current base basal rate.
    pub fn current_basal_bounds(&self) -> Bounds {
        Bounds::new(MIN_CURRENT_BASAL, self.age.max_basal())
    }

    /// Bounds for the externally supplied IOB ceiling.
    pub fn max_iob_bounds(&self) -> Bounds {
        Bounds::new(0.0, self.age.max_iob())
    }

    /// Clamp `value` into `bounds`.
    ///
    /// Non-finite input has no meaningful clamp and is rejected.
    pub fn verify(
        &self,
        value: f64,
        name: &'static str,
        bounds: Bounds,
    ) -> Result<f64, LimitViolation> {
        if !value.is_finite() {
            error!(target: "safety", "{name}={value} is not a number");
            return Err(LimitViolation { name, value, bounds });
        }
        let clamped = value.clamp(bounds.min, bounds.max);
        if clamped != value {
            warn!(
                target: "safety",
                "{name}={value} out of hard limits {bounds}, using {clamped}"
            );
        }
        Ok(clamped)
    }

    /// Pass/fail check without clamping.
    pub fn check_only(
        &self,
        value: f64,
        name: &'static str,
        bounds: Bounds,
    ) -> Result<f64, LimitViolation> {
        if bounds.contains(value) {
            Ok(value)
        } else {
            error!(target: "safety", "{name}={value} outside hard limits {bounds}, aborting");
            Err(LimitViolation { name, value, bounds })
        }
    }
}
