//! Fuzz target: `SafetyLimitValidator::verify` / `check_only`
//!
//! Feeds arbitrary f64 bit patterns (NaN, infinities, subnormals) through
//! both checks and asserts:
//! - `verify` never returns a value outside the bounds
//! - `verify` rejects exactly the non-finite inputs
//! - `check_only` passes exactly the values inside the bounds, unchanged
//!
//! cargo fuzz run fuzz_hard_limits

#![no_main]

use insulinloop::safety::{
    Bounds, DIA_BOUNDS, IC_BOUNDS, ISF_BOUNDS, PROFILE_TARGET_BOUNDS, PatientAge,
    SafetyLimitValidator, TEMP_TARGET_BOUNDS,
};
use libfuzzer_sys::fuzz_target;

const AGES: [PatientAge; 5] = [
    PatientAge::Child,
    PatientAge::Teenage,
    PatientAge::Adult,
    PatientAge::ResistantAdult,
    PatientAge::Pregnant,
];

fuzz_target!(|data: &[u8]| {
    if data.len() < 9 {
        return;
    }
    let age = AGES[data[0] as usize % AGES.len()];
    let v = SafetyLimitValidator::new(age);

    let bounds: [Bounds; 10] = [
        DIA_BOUNDS,
        IC_BOUNDS,
        ISF_BOUNDS,
        PROFILE_TARGET_BOUNDS.min_bg,
        PROFILE_TARGET_BOUNDS.target_bg,
        TEMP_TARGET_BOUNDS.max_bg,
        TEMP_TARGET_BOUNDS.target_bg,
        v.max_daily_basal_bounds(),
        v.current_basal_bounds(),
        v.max_iob_bounds(),
    ];

    for chunk in data[1..].chunks_exact(8) {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(chunk);
        let value = f64::from_le_bytes(raw);

        for b in bounds {
            match v.verify(value, "fuzz", b) {
                Ok(out) => {
                    assert!(value.is_finite());
                    assert!(b.contains(out), "{out} escaped {b}");
                }
                Err(e) => {
                    assert!(!value.is_finite());
                    assert_eq!(e.bounds, b);
                }
            }
            match v.check_only(value, "fuzz", b) {
                Ok(out) => assert_eq!(out.to_bits(), value.to_bits()),
                Err(_) => assert!(!b.contains(value)),
            }
        }
    }
});
