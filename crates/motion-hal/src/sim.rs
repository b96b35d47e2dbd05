//! In-process simulated motion sensors for headless runs and tests.
//!
//! [`SimSensorSource`] stands in for the OS sensor subsystem.  Each source is
//! paired with a [`SimFeed`] handle: whatever is pushed into the feed while
//! the source is running is delivered synchronously to the handler's
//! callback, exactly like an OS delivery queue would.
//!
//! [`SimRegistry`] builds a complete [`SensorRegistry`] backed by simulated
//! sources, and [`SimDriver`] animates those feeds from a background thread
//! so the bridge can run without any motion hardware.
//!
//! # Example
//!
//! ```rust
//! use motion_hal::sim::SimRegistry;
//! use motion_types::{RawSample, SensorKind};
//!
//! let (registry, feeds) = SimRegistry::new().build();
//! let mut sub = registry.listen(SensorKind::Gyroscope);
//!
//! feeds[SensorKind::Gyroscope].push(RawSample::new(0.1, 1.0, 2.0, 3.0));
//! assert_eq!(sub.try_recv().map(|r| r.timestamp), Some(100));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use motion_types::{MotionError, RawSample, SensorKind, StartOptions, UpdateInterval};
use tracing::debug;

use crate::registry::SensorRegistry;
use crate::source::{SampleCallback, SensorSource};

/// Sampling period used when no interval has been requested.
pub const DEFAULT_SIM_INTERVAL: Duration = Duration::from_millis(20);

// ────────────────────────────────────────────────────────────────────────────
// Simulated source
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct SimState {
    callback: Option<SampleCallback>,
    last_start: Option<StartOptions>,
    start_count: usize,
    interval: Option<UpdateInterval>,
}

struct SimShared {
    kind: SensorKind,
    available: AtomicBool,
    live_updates: bool,
    state: Mutex<SimState>,
}

impl SimShared {
    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A simulated sensor that records how it was started and forwards pushed
/// samples while running.
pub struct SimSensorSource {
    shared: Arc<SimShared>,
}

impl SimSensorSource {
    /// Create a source without live interval updates, together with its feed.
    pub fn new(kind: SensorKind, available: bool) -> (Box<Self>, SimFeed) {
        Self::with_live_updates(kind, available, false)
    }

    /// Create a source, choosing whether a running source accepts interval
    /// changes without a restart.
    pub fn with_live_updates(
        kind: SensorKind,
        available: bool,
        live_updates: bool,
    ) -> (Box<Self>, SimFeed) {
        let shared = Arc::new(SimShared {
            kind,
            available: AtomicBool::new(available),
            live_updates,
            state: Mutex::new(SimState::default()),
        });
        (
            Box::new(Self {
                shared: shared.clone(),
            }),
            SimFeed { shared },
        )
    }
}

impl SensorSource for SimSensorSource {
    fn kind(&self) -> SensorKind {
        self.shared.kind
    }

    fn is_available(&self) -> bool {
        self.shared.available.load(Ordering::SeqCst)
    }

    fn start(&self, options: &StartOptions, on_sample: SampleCallback) -> Result<(), MotionError> {
        if !self.is_available() {
            return Err(MotionError::Unavailable(self.shared.kind));
        }
        let mut state = self.shared.state();
        state.callback = Some(on_sample);
        state.last_start = Some(*options);
        state.start_count += 1;
        state.interval = options.interval;
        Ok(())
    }

    fn stop(&self) {
        self.shared.state().callback = None;
    }

    fn update_interval(&self, interval: UpdateInterval) -> bool {
        if !self.shared.live_updates {
            return false;
        }
        self.shared.state().interval = Some(interval);
        true
    }
}

/// Test and driver handle onto a [`SimSensorSource`].
#[derive(Clone)]
pub struct SimFeed {
    shared: Arc<SimShared>,
}

impl SimFeed {
    pub fn kind(&self) -> SensorKind {
        self.shared.kind
    }

    /// Deliver `sample` to the running source's callback.
    ///
    /// Returns `false` when the source is stopped and the sample was dropped.
    pub fn push(&self, sample: RawSample) -> bool {
        let state = self.shared.state();
        match state.callback.as_ref() {
            Some(callback) => {
                callback(sample);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.shared.state().callback.is_some()
    }

    /// Options passed to the most recent successful `start`.
    pub fn last_start(&self) -> Option<StartOptions> {
        self.shared.state().last_start
    }

    /// Number of successful `start` calls so far.
    pub fn start_count(&self) -> usize {
        self.shared.state().start_count
    }

    /// Interval currently in effect, including live updates.
    pub fn current_interval(&self) -> Option<UpdateInterval> {
        self.shared.state().interval
    }

    /// Simulate the capability appearing or disappearing.
    pub fn set_available(&self, available: bool) {
        self.shared.available.store(available, Ordering::SeqCst);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRegistry builder
// ────────────────────────────────────────────────────────────────────────────

/// Feeds for every simulated source in a registry built by [`SimRegistry`].
#[derive(Clone)]
pub struct SimFeeds {
    feeds: Vec<SimFeed>,
}

impl SimFeeds {
    pub fn feed(&self, kind: SensorKind) -> Option<&SimFeed> {
        self.feeds.iter().find(|f| f.kind() == kind)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SimFeed> {
        self.feeds.iter()
    }
}

impl std::ops::Index<SensorKind> for SimFeeds {
    type Output = SimFeed;

    /// Panics only if the feeds did not come from a [`SimRegistry`], which
    /// always covers every kind.
    fn index(&self, kind: SensorKind) -> &SimFeed {
        match self.feed(kind) {
            Some(feed) => feed,
            None => panic!("no simulated feed for {kind}"),
        }
    }
}

/// Builder for a [`SensorRegistry`] backed entirely by simulated sources.
#[derive(Default)]
pub struct SimRegistry {
    unavailable: Vec<SensorKind>,
    live_updates: bool,
}

impl SimRegistry {
    /// All kinds available, no live interval updates.
    pub fn new() -> Self {
        Self::default()
    }

    /// Report `kind` as absent from the simulated device.
    pub fn with_unavailable(mut self, kind: SensorKind) -> Self {
        self.unavailable.push(kind);
        self
    }

    /// Let running sources accept interval changes without a restart.
    pub fn with_live_interval_updates(mut self, enabled: bool) -> Self {
        self.live_updates = enabled;
        self
    }

    /// Consume the builder and return the registry plus the feeds driving it.
    pub fn build(self) -> (SensorRegistry, SimFeeds) {
        let mut feeds = Vec::with_capacity(SensorKind::ALL.len());
        let registry = SensorRegistry::new(|kind| -> Box<dyn SensorSource> {
            let available = !self.unavailable.contains(&kind);
            let (source, feed) = SimSensorSource::with_live_updates(kind, available, self.live_updates);
            feeds.push(feed);
            source
        });
        (registry, SimFeeds { feeds })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Background driver
// ────────────────────────────────────────────────────────────────────────────

/// Synthetic raw sample for `kind` at `t` seconds, in OS units (g for
/// acceleration, rad/s for rotation, µT for the magnetic field).
pub fn synthetic_sample(kind: SensorKind, t: f64) -> RawSample {
    let wobble = (t * std::f64::consts::TAU * 0.5).sin();
    let sway = (t * std::f64::consts::TAU * 0.5).cos();
    match kind {
        SensorKind::Accelerometer => RawSample::new(t, 0.02 * wobble, 0.02 * sway, -1.0),
        SensorKind::UserAccelerometer => RawSample::new(t, 0.02 * wobble, 0.02 * sway, 0.0),
        SensorKind::Gyroscope => RawSample::new(t, 0.1 * wobble, -0.1 * sway, 0.05 * wobble),
        SensorKind::Magnetometer => {
            RawSample::new(t, 22.0 + 0.5 * wobble, -4.5 + 0.5 * sway, -41.0)
        }
    }
}

/// Pushes [`synthetic_sample`]s into every feed at that feed's current
/// interval until shut down.
pub struct SimDriver {
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SimDriver {
    /// Start the driver thread.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    pub fn spawn(feeds: SimFeeds) -> std::io::Result<Self> {
        let shutdown = Arc::new(AtomicBool::new(false));
        let flag = shutdown.clone();
        let handle = thread::Builder::new()
            .name("motion-sim".to_string())
            .spawn(move || drive(feeds, flag))?;
        debug!("simulated motion driver started");
        Ok(Self {
            shutdown,
            handle: Some(handle),
        })
    }

    /// Stop the driver and wait for its thread to finish.
    pub fn shutdown(mut self) {
        self.stop_and_join();
    }

    fn stop_and_join(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            debug!("simulated motion driver stopped");
        }
    }
}

impl Drop for SimDriver {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}

fn drive(feeds: SimFeeds, shutdown: Arc<AtomicBool>) {
    let epoch = Instant::now();
    let mut next_due: Vec<Instant> = feeds.iter().map(|_| epoch).collect();

    while !shutdown.load(Ordering::SeqCst) {
        let now = Instant::now();
        for (feed, due) in feeds.iter().zip(next_due.iter_mut()) {
            if now < *due {
                continue;
            }
            let period = feed
                .current_interval()
                .map(UpdateInterval::as_duration)
                .filter(|d| !d.is_zero())
                .unwrap_or(DEFAULT_SIM_INTERVAL);
            if feed.is_running() {
                let t = now.duration_since(epoch).as_secs_f64();
                feed.push(synthetic_sample(feed.kind(), t));
            }
            *due = now + period;
        }
        thread::sleep(Duration::from_millis(1));
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_source_refuses_to_start() {
        let (source, feed) = SimSensorSource::new(SensorKind::Magnetometer, false);
        let result = source.start(&StartOptions::default(), Box::new(|_| {}));
        assert_eq!(result, Err(MotionError::Unavailable(SensorKind::Magnetometer)));
        assert!(!feed.is_running());
        assert_eq!(feed.start_count(), 0);
    }

    #[test]
    fn feed_drops_samples_while_stopped() {
        let (source, feed) = SimSensorSource::new(SensorKind::Gyroscope, true);
        assert!(!feed.push(RawSample::new(0.0, 1.0, 1.0, 1.0)));

        source.start(&StartOptions::default(), Box::new(|_| {})).unwrap();
        assert!(feed.push(RawSample::new(0.0, 1.0, 1.0, 1.0)));

        source.stop();
        source.stop();
        assert!(!feed.push(RawSample::new(0.0, 1.0, 1.0, 1.0)));
    }

    #[test]
    fn availability_can_change_at_runtime() {
        let (source, feed) = SimSensorSource::new(SensorKind::Gyroscope, true);
        assert!(source.is_available());
        feed.set_available(false);
        assert!(!source.is_available());
    }

    #[test]
    fn live_updates_toggle_controls_update_interval() {
        let interval = UpdateInterval::from_micros(1_000).unwrap();

        let (fixed, _) = SimSensorSource::new(SensorKind::Gyroscope, true);
        assert!(!fixed.update_interval(interval));

        let (live, feed) = SimSensorSource::with_live_updates(SensorKind::Gyroscope, true, true);
        assert!(live.update_interval(interval));
        assert_eq!(feed.current_interval(), Some(interval));
    }

    #[test]
    fn sim_registry_covers_every_kind() {
        let (registry, feeds) = SimRegistry::new().build();
        for kind in SensorKind::ALL {
            assert!(registry.is_sensor_available(kind));
            assert_eq!(feeds[kind].kind(), kind);
        }
    }

    #[test]
    fn sim_registry_marks_unavailable_kinds() {
        let (registry, _feeds) = SimRegistry::new()
            .with_unavailable(SensorKind::Magnetometer)
            .build();
        assert!(!registry.is_sensor_available(SensorKind::Magnetometer));
        assert!(registry.is_sensor_available(SensorKind::Gyroscope));
    }

    #[test]
    fn synthetic_accelerometer_rests_near_minus_one_g() {
        let sample = synthetic_sample(SensorKind::Accelerometer, 1.0);
        assert!((sample.z + 1.0).abs() < f64::EPSILON);
        assert!(sample.x.abs() <= 0.02);
    }

    #[test]
    fn driver_feeds_running_sources_only() {
        let (registry, feeds) = SimRegistry::new().build();
        registry.set_sensor_update_interval(
            SensorKind::Gyroscope,
            UpdateInterval::from_micros(2_000).unwrap(),
        );
        let mut gyro = registry.listen(SensorKind::Gyroscope);
        let driver = SimDriver::spawn(feeds.clone()).expect("driver thread");

        thread::sleep(Duration::from_millis(60));
        driver.shutdown();

        let readings = gyro.drain();
        assert!(!readings.is_empty(), "gyroscope must have been driven");
        assert!(
            readings.windows(2).all(|w| w[0].timestamp <= w[1].timestamp),
            "readings must arrive in production order"
        );
        assert!(!feeds[SensorKind::Accelerometer].is_running());
    }
}
