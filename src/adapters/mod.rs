//! Adapter implementations of the core's port traits.

pub mod channel_sink;
pub mod log_sink;
pub mod nvs;
pub mod time;

pub use channel_sink::{ChannelEventSink, EventChannel};
pub use log_sink::LogEventSink;
pub use nvs::NvsAdapter;
pub use time::SystemClock;
