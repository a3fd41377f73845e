//! Input ports for the decision engine.
//!
//! Each trait is one external collaborator. The engine takes a single
//! `&impl DosingInputs`, so a host can implement every source on one
//! adapter or compose several.

use serde::{Deserialize, Serialize};

use crate::error::AlgorithmError;

use super::snapshot::{GlucoseStatus, IobTotal, MealData, PhysiologicalSnapshot, Profile, PumpInfo, TempTarget};

/// Supplies the active therapy profile.
pub trait ProfileSource {
    /// `None` when no profile is selected.
    fn profile(&self) -> Option<Profile>;
}

/// Supplies the active pump's capabilities and state.
pub trait PumpSource {
    /// `None` when no pump is selected.
    fn pump(&self) -> Option<PumpInfo>;
}

/// Supplies the current glucose trend.
pub trait GlucoseSource {
    /// `None` when there is no recent, usable CGM data.
    fn glucose_status(&self) -> Option<GlucoseStatus>;
}

/// Supplies treatment history: IOB, meals, temporary targets.
pub trait TreatmentSource {
    fn bolus_iob(&self, now_ms: i64) -> IobTotal;
    fn basal_iob(&self, now_ms: i64) -> IobTotal;
    fn meal_data(&self, now_ms: i64) -> MealData;
    fn temp_target_at(&self, now_ms: i64) -> Option<TempTarget>;
}

/// Authoritative ceilings from the constraint subsystem.
pub trait ConstraintSource {
    /// Max temp basal rate, U/h.
    fn max_basal_allowed(&self, profile: &Profile) -> f64;
    /// Max total insulin on board, U.
    fn max_iob_allowed(&self) -> f64;
}

/// Everything one decision cycle reads.
pub trait DosingInputs:
    ProfileSource + PumpSource + GlucoseSource + TreatmentSource + ConstraintSource
{
}

impl<T> DosingInputs for T where
    T: ProfileSource + PumpSource + GlucoseSource + TreatmentSource + ConstraintSource
{
}

/// What the algorithm asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    /// Temp basal rate, U/h.
    pub rate: f64,
    pub duration_mins: u32,
    pub temp_basal_requested: bool,
    /// Human-readable explanation from the algorithm.
    pub reason: String,
}

/// The numeric dosing algorithm.
///
/// Must be deterministic for identical input and free of side effects.
pub trait AlgorithmAdapter {
    fn determine_basal(
        &self,
        snapshot: &PhysiologicalSnapshot,
    ) -> Result<Recommendation, AlgorithmError>;
}
