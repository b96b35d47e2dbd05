//! Generic `SensorSource` trait for anything that can push motion samples.
//!
//! One source wraps one physical or fused sensor.  A
//! [`StreamHandler`][crate::handler::StreamHandler] owns exactly one source
//! and drives its start/stop lifecycle; the rest of the bridge only ever
//! talks to the trait, so platform back-ends can be swapped without touching
//! the handler or registry logic.

use motion_types::{MotionError, RawSample, SensorKind, StartOptions, UpdateInterval};

/// Callback invoked by a running source for every raw sample, on whatever
/// execution context the source delivers from.
pub type SampleCallback = Box<dyn Fn(RawSample) + Send + Sync + 'static>;

/// A continuously sampling motion sensor.
///
/// Methods take `&self` because delivery happens concurrently on the
/// source's own context; implementations use interior mutability.
pub trait SensorSource: Send + Sync {
    /// The sensor kind this source produces samples for.
    fn kind(&self) -> SensorKind;

    /// Whether the underlying capability is present.  Must not have side
    /// effects.
    fn is_available(&self) -> bool;

    /// Begin continuous delivery into `on_sample`.
    ///
    /// Samples are handed over synchronously, in production order, with no
    /// buffering.  Starting an already running source replaces its callback.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::Unavailable`] when the capability is absent.
    fn start(&self, options: &StartOptions, on_sample: SampleCallback) -> Result<(), MotionError>;

    /// Stop delivery.  Safe to call when not started.  Once this returns no
    /// further samples reach the previous callback.
    fn stop(&self);

    /// Apply a new sampling interval to a running source.
    ///
    /// Returns `false` when the source cannot change its rate while running;
    /// the caller then re-arms it with a stop/start cycle.
    fn update_interval(&self, _interval: UpdateInterval) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Minimal in-process source used only for tests.
    struct MockSource {
        callback: Mutex<Option<SampleCallback>>,
    }

    impl MockSource {
        fn new() -> Self {
            Self {
                callback: Mutex::new(None),
            }
        }

        fn emit(&self, sample: RawSample) {
            if let Some(cb) = self.callback.lock().unwrap().as_ref() {
                cb(sample);
            }
        }
    }

    impl SensorSource for MockSource {
        fn kind(&self) -> SensorKind {
            SensorKind::Gyroscope
        }

        fn is_available(&self) -> bool {
            true
        }

        fn start(&self, _options: &StartOptions, on_sample: SampleCallback) -> Result<(), MotionError> {
            *self.callback.lock().unwrap() = Some(on_sample);
            Ok(())
        }

        fn stop(&self) {
            self.callback.lock().unwrap().take();
        }
    }

    #[test]
    fn mock_source_delivers_until_stopped() {
        let source = MockSource::new();
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        source
            .start(
                &StartOptions::default(),
                Box::new(move |s| sink.lock().unwrap().push(s.x)),
            )
            .unwrap();

        source.emit(RawSample::new(0.0, 1.0, 0.0, 0.0));
        source.stop();
        source.stop();
        source.emit(RawSample::new(0.1, 2.0, 0.0, 0.0));

        assert_eq!(*seen.lock().unwrap(), vec![1.0]);
    }

    #[test]
    fn live_interval_updates_are_unsupported_by_default() {
        let source = MockSource::new();
        let interval = UpdateInterval::from_micros(10_000).unwrap();
        assert!(!source.update_interval(interval));
    }
}
