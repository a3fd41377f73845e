//! Dosing decision engine: pure domain logic, zero I/O.
//!
//! ```text
//!  DosingInputs ──▶ SnapshotBuilder ──▶ AlgorithmAdapter ──▶ DosingResult
//!                   (safety limits)                          (ResultCache)
//! ```

pub mod engine;
pub mod ports;
pub mod result;
pub mod snapshot;

pub use engine::DosingEngine;
pub use result::{DosingResult, ResultCache};
