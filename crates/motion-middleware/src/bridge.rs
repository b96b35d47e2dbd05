//! [`MotionBridge`] – the channels a host framework talks to.
//!
//! The bridge is an explicit context object: construct it once around a
//! shared [`SensorRegistry`] and hand it to whatever drives the transport.
//! It exposes the control channel under
//! [`METHOD_CHANNEL`][crate::protocol::METHOD_CHANNEL] and one
//! [`EventChannel`] per sensor kind.

use std::sync::Arc;

use motion_hal::SensorRegistry;
use motion_types::SensorKind;
use tracing::debug;

use crate::control::ControlChannel;
use crate::event_channel::EventChannel;
use crate::protocol::METHOD_CHANNEL;

pub struct MotionBridge {
    registry: Arc<SensorRegistry>,
    control: ControlChannel,
}

impl MotionBridge {
    pub fn new(registry: Arc<SensorRegistry>) -> Self {
        debug!(
            method_channel = METHOD_CHANNEL,
            event_channels = ?Self::event_channel_names().collect::<Vec<_>>(),
            "motion bridge registered"
        );
        Self {
            control: ControlChannel::new(registry.clone()),
            registry,
        }
    }

    pub fn registry(&self) -> &Arc<SensorRegistry> {
        &self.registry
    }

    pub fn control(&self) -> &ControlChannel {
        &self.control
    }

    /// Look up an event channel by its external name.
    pub fn event_channel(&self, name: &str) -> Option<EventChannel> {
        SensorKind::ALL
            .into_iter()
            .find(|kind| kind.channel_name() == name)
            .map(|kind| self.event_channel_for(kind))
    }

    pub fn event_channel_for(&self, kind: SensorKind) -> EventChannel {
        EventChannel::new(kind, self.registry.clone())
    }

    /// Names of every event channel, in sensor-code order.
    pub fn event_channel_names() -> impl Iterator<Item = &'static str> {
        SensorKind::ALL.into_iter().map(SensorKind::channel_name)
    }
}
