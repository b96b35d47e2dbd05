//! Per-kind event channels.
//!
//! Each [`SensorKind`] is reachable under a stable channel name (see
//! [`SensorKind::channel_name`]).  `listen` opens a subscription on the
//! kind's stream handler; `cancel` (or dropping the subscription) closes it.
//! Only readings ever travel on these channels, encoded as
//! `{"timestamp", "x", "y", "z"}` objects.

use std::sync::Arc;

use futures_util::stream::{BoxStream, StreamExt};
use motion_hal::{SensorRegistry, Subscription};
use motion_types::{SensorKind, SensorReading};
use serde_json::{Value, json};

/// Encode a reading in the shape delivered across the boundary.
pub fn encode(reading: &SensorReading) -> Value {
    json!({
        "timestamp": reading.timestamp,
        "x": reading.x,
        "y": reading.y,
        "z": reading.z,
    })
}

/// The event channel for one sensor kind.  Cheap to clone.
#[derive(Clone)]
pub struct EventChannel {
    kind: SensorKind,
    registry: Arc<SensorRegistry>,
}

impl EventChannel {
    pub fn new(kind: SensorKind, registry: Arc<SensorRegistry>) -> Self {
        Self { kind, registry }
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    pub fn name(&self) -> &'static str {
        self.kind.channel_name()
    }

    /// Open a subscription.  Readings start flowing immediately if the
    /// sensor is available; otherwise the subscription stays silent.
    pub fn listen(&self) -> Subscription {
        self.registry.listen(self.kind)
    }

    /// Close a subscription obtained from [`listen`][Self::listen].
    pub fn cancel(&self, subscription: Subscription) {
        self.registry.handler(self.kind).cancel(subscription);
    }

    /// Open a subscription and expose it as a stream of encoded readings.
    /// Dropping the stream cancels the subscription.
    pub fn listen_encoded(&self) -> BoxStream<'static, Value> {
        self.listen()
            .into_stream()
            .map(|reading| encode(&reading))
            .boxed()
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("name", &self.name())
            .finish()
    }
}
