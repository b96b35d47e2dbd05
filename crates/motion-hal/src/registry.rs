//! [`SensorRegistry`] – the single entry point routing requests to handlers.
//!
//! The registry owns one [`StreamHandler`] per [`SensorKind`].  The mapping
//! is built exhaustively from [`SensorKind::ALL`] at construction and never
//! changes afterwards; there is no dynamic registration.
//!
//! Requests addressed by external sensor-type code are permissive: an
//! unknown code reads as "not available" and interval changes for it are
//! ignored.

use motion_types::{SensorKind, UpdateInterval};
use tracing::{debug, warn};

use crate::handler::{StreamHandler, Subscription};
use crate::source::SensorSource;

/// Owns every [`StreamHandler`] for the lifetime of the bridge.
///
/// Construct once at startup and share by reference (typically in an
/// [`Arc`][std::sync::Arc]).
pub struct SensorRegistry {
    handlers: [StreamHandler; SensorKind::ALL.len()],
}

const fn slot(kind: SensorKind) -> usize {
    match kind {
        SensorKind::Accelerometer => 0,
        SensorKind::Magnetometer => 1,
        SensorKind::Gyroscope => 2,
        SensorKind::UserAccelerometer => 3,
    }
}

impl SensorRegistry {
    /// Build a registry, asking `source_for` for the source of every kind.
    ///
    /// `source_for(kind)` must return a source reporting that same kind.
    pub fn new(mut source_for: impl FnMut(SensorKind) -> Box<dyn SensorSource>) -> Self {
        let handlers = SensorKind::ALL.map(|kind| {
            let source = source_for(kind);
            if source.kind() != kind {
                warn!(requested = %kind, reported = %source.kind(), "source kind mismatch");
            }
            StreamHandler::new(source)
        });
        Self { handlers }
    }

    /// The handler for `kind`.
    pub fn handler(&self, kind: SensorKind) -> &StreamHandler {
        &self.handlers[slot(kind)]
    }

    pub fn handlers(&self) -> impl Iterator<Item = &StreamHandler> {
        self.handlers.iter()
    }

    /// Whether the source behind `kind` reports its capability as present.
    pub fn is_sensor_available(&self, kind: SensorKind) -> bool {
        self.handler(kind).is_available()
    }

    /// Store `interval` on `kind`'s handler.
    pub fn set_sensor_update_interval(&self, kind: SensorKind, interval: UpdateInterval) {
        self.handler(kind).set_update_interval(interval);
    }

    /// Availability by external sensor-type code.  `false` for unknown codes.
    pub fn is_sensor_available_code(&self, sensor_type: i64) -> bool {
        match SensorKind::from_code(sensor_type) {
            Some(kind) => self.is_sensor_available(kind),
            None => {
                debug!(sensor_type, "availability query for unknown sensor type");
                false
            }
        }
    }

    /// Interval change by external sensor-type code.  No-op for unknown codes.
    pub fn set_sensor_update_interval_code(&self, sensor_type: i64, interval: UpdateInterval) {
        match SensorKind::from_code(sensor_type) {
            Some(kind) => self.set_sensor_update_interval(kind, interval),
            None => debug!(sensor_type, "ignoring interval for unknown sensor type"),
        }
    }

    /// Open a subscription on `kind`'s handler.
    pub fn listen(&self, kind: SensorKind) -> Subscription {
        self.handler(kind).listen()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimRegistry, SimSensorSource};
    use motion_types::RawSample;

    fn micros(us: i64) -> UpdateInterval {
        UpdateInterval::from_micros(us).unwrap()
    }

    #[test]
    fn every_kind_has_its_own_handler() {
        let (registry, _feeds) = SimRegistry::new().build();
        assert_eq!(registry.handlers().count(), SensorKind::ALL.len());
        for kind in SensorKind::ALL {
            assert_eq!(registry.handler(kind).kind(), kind);
        }
    }

    #[test]
    fn availability_reflects_source_and_is_idempotent() {
        let (registry, feeds) = SimRegistry::new()
            .with_unavailable(SensorKind::UserAccelerometer)
            .build();
        for _ in 0..3 {
            assert!(registry.is_sensor_available(SensorKind::Accelerometer));
            assert!(!registry.is_sensor_available(SensorKind::UserAccelerometer));
        }

        feeds[SensorKind::UserAccelerometer].set_available(true);
        assert!(registry.is_sensor_available(SensorKind::UserAccelerometer));
    }

    #[test]
    fn availability_by_code() {
        let (registry, _feeds) = SimRegistry::new()
            .with_unavailable(SensorKind::Magnetometer)
            .build();
        assert!(registry.is_sensor_available_code(1));
        assert!(!registry.is_sensor_available_code(2));
        assert!(registry.is_sensor_available_code(4));
        assert!(registry.is_sensor_available_code(10));
    }

    #[test]
    fn unknown_code_is_unavailable() {
        let (registry, _feeds) = SimRegistry::new().build();
        assert!(!registry.is_sensor_available_code(3));
        assert!(!registry.is_sensor_available_code(-7));
    }

    #[test]
    fn interval_by_code_reaches_matching_handler_only() {
        let (registry, _feeds) = SimRegistry::new().build();
        registry.set_sensor_update_interval_code(4, micros(10_000));

        assert_eq!(
            registry.handler(SensorKind::Gyroscope).update_interval(),
            Some(micros(10_000))
        );
        for kind in [
            SensorKind::Accelerometer,
            SensorKind::Magnetometer,
            SensorKind::UserAccelerometer,
        ] {
            assert_eq!(registry.handler(kind).update_interval(), None);
        }
    }

    #[test]
    fn unknown_code_interval_is_ignored() {
        let (registry, _feeds) = SimRegistry::new().build();
        registry.set_sensor_update_interval_code(99, micros(1_000));
        assert!(registry.handlers().all(|h| h.update_interval().is_none()));
    }

    #[test]
    fn interval_then_listen_starts_source_with_interval() {
        let (registry, feeds) = SimRegistry::new().build();
        registry.set_sensor_update_interval(SensorKind::Accelerometer, micros(100_000));
        let _sub = registry.listen(SensorKind::Accelerometer);

        let secs = feeds[SensorKind::Accelerometer]
            .last_start()
            .and_then(|o| o.interval)
            .map(UpdateInterval::as_secs_f64)
            .expect("started with interval");
        assert!((secs - 0.1).abs() < 1e-6);
    }

    #[test]
    fn streams_are_independent_per_kind() {
        let (registry, feeds) = SimRegistry::new().build();
        let mut gyro = registry.listen(SensorKind::Gyroscope);
        let mut accel = registry.listen(SensorKind::Accelerometer);

        feeds[SensorKind::Gyroscope].push(RawSample::new(0.1, 1.0, 0.0, 0.0));

        assert_eq!(gyro.drain().len(), 1);
        assert!(accel.try_recv().is_none());
    }

    #[test]
    fn registry_accepts_custom_source_factory() {
        let registry =
            SensorRegistry::new(|kind| -> Box<dyn SensorSource> {
                SimSensorSource::new(kind, kind != SensorKind::Gyroscope).0
            });
        assert!(!registry.is_sensor_available(SensorKind::Gyroscope));
        assert!(registry.is_sensor_available(SensorKind::Magnetometer));
    }
}
