//! Channel-backed event sink.
//!
//! Forwards events into a bounded `embassy-sync` channel so an async
//! consumer (UI bridge, uploader) can `receive().await` them. A full channel
//! drops the event with a warning; emitters never block.
//!
//! ```text
//!  engine / tasks ──emit──▶ EventChannel ──receive──▶ consumer
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver};
use log::warn;

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Channel depth for outbound events.
pub const EVENT_DEPTH: usize = 16;

pub type EventChannel = Channel<CriticalSectionRawMutex, AppEvent, EVENT_DEPTH>;

pub struct ChannelEventSink<'a> {
    channel: &'a EventChannel,
}

impl<'a> ChannelEventSink<'a> {
    pub fn new(channel: &'a EventChannel) -> Self {
        Self { channel }
    }

    pub fn receiver(&self) -> Receiver<'a, CriticalSectionRawMutex, AppEvent, EVENT_DEPTH> {
        self.channel.receiver()
    }
}

impl EventSink for ChannelEventSink<'_> {
    fn emit(&self, event: &AppEvent) {
        if self.channel.try_send(event.clone()).is_err() {
            warn!(target: "dispatch", "event channel full, dropping {:?}", event);
        }
    }
}
