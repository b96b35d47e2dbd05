//! [`StreamHandler`] – per-kind subscription lifecycle and delivery fan-out.
//!
//! A handler owns one [`SensorSource`] and keeps it running exactly while at
//! least one [`Subscription`] is alive:
//!
//! | Transition | Effect |
//! |---|---|
//! | first `listen` (Idle → Active) | availability check, then `start` with the stored interval |
//! | further `listen` | new sink added to the fan-out, source untouched |
//! | last `cancel` / drop (Active → Idle) | sink removed, then `stop` |
//!
//! Every subscription gets a fresh channel, so readings produced while no
//! one was listening are never replayed to a later subscriber.
//!
//! A kind whose capability is absent stays Idle: `listen` still hands back a
//! subscription, it simply never yields anything.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::stream::{self, BoxStream, StreamExt};
use motion_types::{
    RawSample, ReferenceFrame, SensorKind, SensorReading, StartOptions, UpdateInterval,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::source::{SampleCallback, SensorSource};
use crate::transform::transform;

// ────────────────────────────────────────────────────────────────────────────
// Internal state
// ────────────────────────────────────────────────────────────────────────────

struct Sink {
    id: u64,
    sender: mpsc::UnboundedSender<SensorReading>,
}

type SinkList = Arc<Mutex<Vec<Sink>>>;

#[derive(Default)]
struct Lifecycle {
    interval: Option<UpdateInterval>,
    active: bool,
    next_id: u64,
}

struct Inner {
    kind: SensorKind,
    source: Box<dyn SensorSource>,
    lifecycle: Mutex<Lifecycle>,
    // Lock order: `lifecycle` before `sinks`.  The delivery callback only
    // ever takes `sinks`.
    sinks: SinkList,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn start_options(&self, interval: Option<UpdateInterval>) -> StartOptions {
        match self.kind {
            SensorKind::Magnetometer => StartOptions {
                interval,
                reference_frame: Some(ReferenceFrame::XArbitraryCorrectedZVertical),
                show_calibration_display: true,
            },
            _ => StartOptions {
                interval,
                ..StartOptions::default()
            },
        }
    }

    fn delivery_callback(&self) -> SampleCallback {
        let kind = self.kind;
        let sinks = self.sinks.clone();
        Box::new(move |raw: RawSample| {
            let reading = transform(kind, &raw);
            lock(&sinks).retain(|sink| sink.sender.send(reading).is_ok());
        })
    }

    /// Start the source if the capability is present.  Leaves the handler
    /// Idle otherwise.
    fn arm(&self, lifecycle: &mut Lifecycle) {
        if !self.source.is_available() {
            debug!(kind = %self.kind, "sensor unavailable; subscription will stay silent");
            return;
        }
        let options = self.start_options(lifecycle.interval);
        match self.source.start(&options, self.delivery_callback()) {
            Ok(()) => {
                lifecycle.active = true;
                debug!(
                    kind = %self.kind,
                    interval_secs = ?options.interval.map(UpdateInterval::as_secs_f64),
                    "sensor source started"
                );
            }
            Err(e) => {
                debug!(kind = %self.kind, error = %e, "sensor source refused to start");
            }
        }
    }

    fn cancel(&self, id: u64) {
        let mut lifecycle = lock(&self.lifecycle);
        let remaining = {
            let mut sinks = lock(&self.sinks);
            sinks.retain(|sink| sink.id != id);
            sinks.len()
        };
        debug!(kind = %self.kind, subscription = id, remaining, "subscription cancelled");
        if remaining == 0 {
            self.source.stop();
            if lifecycle.active {
                debug!(kind = %self.kind, "sensor source stopped");
            }
            lifecycle.active = false;
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// StreamHandler
// ────────────────────────────────────────────────────────────────────────────

/// Owns one sensor kind's source, its stored update interval, and the set of
/// active subscriptions.
pub struct StreamHandler {
    inner: Arc<Inner>,
}

impl StreamHandler {
    /// Wrap `source` in a new, Idle handler.  The handler's kind is taken
    /// from the source.
    pub fn new(source: Box<dyn SensorSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                kind: source.kind(),
                source,
                lifecycle: Mutex::new(Lifecycle::default()),
                sinks: Arc::new(Mutex::new(Vec::new())),
            }),
        }
    }

    pub fn kind(&self) -> SensorKind {
        self.inner.kind
    }

    /// Availability of the underlying source.
    pub fn is_available(&self) -> bool {
        self.inner.source.is_available()
    }

    /// Open a new subscription to this kind's readings.
    pub fn listen(&self) -> Subscription {
        let mut lifecycle = lock(&self.inner.lifecycle);
        let id = lifecycle.next_id;
        lifecycle.next_id += 1;

        let (sender, receiver) = mpsc::unbounded_channel();
        lock(&self.inner.sinks).push(Sink { id, sender });
        debug!(kind = %self.inner.kind, subscription = id, "subscription opened");

        if !lifecycle.active {
            self.inner.arm(&mut lifecycle);
        }

        Subscription {
            id,
            kind: self.inner.kind,
            receiver,
            handler: Arc::downgrade(&self.inner),
        }
    }

    /// Close `subscription`.  Equivalent to dropping it.
    pub fn cancel(&self, subscription: Subscription) {
        drop(subscription);
    }

    /// Store a new sampling interval.
    ///
    /// Always used by the next start.  When the source is already running
    /// the interval is applied live if the source supports it; otherwise the
    /// source is re-armed with a stop/start cycle, keeping every subscriber.
    pub fn set_update_interval(&self, interval: UpdateInterval) {
        let mut lifecycle = lock(&self.inner.lifecycle);
        lifecycle.interval = Some(interval);
        info!(
            kind = %self.inner.kind,
            interval_us = interval.micros(),
            active = lifecycle.active,
            "update interval set"
        );

        if lifecycle.active && !self.inner.source.update_interval(interval) {
            debug!(kind = %self.inner.kind, "source lacks live interval updates; re-arming");
            self.inner.source.stop();
            lifecycle.active = false;
            self.inner.arm(&mut lifecycle);
        }
    }

    /// The stored interval, or `None` while the source default applies.
    pub fn update_interval(&self) -> Option<UpdateInterval> {
        lock(&self.inner.lifecycle).interval
    }

    /// Whether the source is currently running.
    pub fn is_active(&self) -> bool {
        lock(&self.inner.lifecycle).active
    }

    /// Number of live subscriptions, including silent ones on an
    /// unavailable sensor.
    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.sinks).len()
    }
}

impl std::fmt::Debug for StreamHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamHandler")
            .field("kind", &self.inner.kind)
            .field("active", &self.is_active())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Subscription
// ────────────────────────────────────────────────────────────────────────────

/// One consumer's view of a sensor kind's readings.
///
/// Dropping the subscription cancels it; once the drop returns no further
/// readings are routed to it.
pub struct Subscription {
    id: u64,
    kind: SensorKind,
    receiver: mpsc::UnboundedReceiver<SensorReading>,
    handler: Weak<Inner>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Wait for the next reading.
    ///
    /// Returns `None` once the owning handler is gone.
    pub async fn recv(&mut self) -> Option<SensorReading> {
        self.receiver.recv().await
    }

    /// Take the next already-delivered reading without waiting.
    pub fn try_recv(&mut self) -> Option<SensorReading> {
        self.receiver.try_recv().ok()
    }

    /// Drain every reading delivered so far.
    pub fn drain(&mut self) -> Vec<SensorReading> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Convert into a stream.  The subscription stays open for as long as
    /// the stream is alive.
    pub fn into_stream(self) -> BoxStream<'static, SensorReading> {
        stream::unfold(self, |mut sub| async move {
            let reading = sub.recv().await?;
            Some((reading, sub))
        })
        .boxed()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.handler.upgrade() {
            inner.cancel(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .finish()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
