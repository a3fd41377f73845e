//! InsulinLoop core library.
//!
//! Two halves sharing one error, config and event model:
//!
//! - [`dosing`]: the closed-loop decision engine, which gathers inputs, enforces
//!   hard safety limits, calls the dosing algorithm, publishes the result.
//! - [`patch`]: command tasks against a wearable patch pump, with single-flight
//!   dispatch, deadlines, acknowledgement checks, bonding rollback.
//!
//! Hosts plug in through the port traits in [`app::ports`],
//! [`dosing::ports`] and [`patch::transport`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod dosing;
pub mod error;
pub mod patch;
pub mod safety;

pub use error::{Error, Result};
