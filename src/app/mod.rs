//! Application boundary shared by both halves of the core.
//!
//! [`events`] is what the core tells the outside world; [`ports`] is what
//! the core needs from it. Everything behind these traits (screens,
//! preferences, notifications) is the host application's business.

pub mod events;
pub mod ports;
