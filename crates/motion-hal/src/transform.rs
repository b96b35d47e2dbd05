//! Sample transformation: raw OS samples → public [`SensorReading`]s.
//!
//! The OS reports acceleration as the force felt by the device in units of
//! g.  Subscribers expect device acceleration in m/s², so both acceleration
//! kinds are negated and scaled by [`STANDARD_GRAVITY`].  Rotation rate and
//! the fused magnetic field already use the public convention.

use motion_types::{RawSample, SensorKind, SensorReading};

/// Gravity constant applied to acceleration axes.
pub const STANDARD_GRAVITY: f64 = 9.8;

/// Convert a monotonic timestamp in seconds to whole milliseconds.
///
/// Truncates rather than rounds: `1.9999 s` becomes `1999 ms`.
pub fn timestamp_millis(timestamp_secs: f64) -> i64 {
    (timestamp_secs * 1000.0).floor() as i64
}

/// Map one raw sample of `kind` to the reading delivered to subscribers.
pub fn transform(kind: SensorKind, raw: &RawSample) -> SensorReading {
    let timestamp = timestamp_millis(raw.timestamp_secs);
    match kind {
        SensorKind::Accelerometer | SensorKind::UserAccelerometer => SensorReading {
            timestamp,
            x: -raw.x * STANDARD_GRAVITY,
            y: -raw.y * STANDARD_GRAVITY,
            z: -raw.z * STANDARD_GRAVITY,
        },
        SensorKind::Gyroscope | SensorKind::Magnetometer => SensorReading {
            timestamp,
            x: raw.x,
            y: raw.y,
            z: raw.z,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn assert_axes(reading: &SensorReading, x: f64, y: f64, z: f64) {
        assert!((reading.x - x).abs() < EPS, "x: {} != {}", reading.x, x);
        assert!((reading.y - y).abs() < EPS, "y: {} != {}", reading.y, y);
        assert!((reading.z - z).abs() < EPS, "z: {} != {}", reading.z, z);
    }

    #[test]
    fn acceleration_kinds_are_negated_and_scaled() {
        let raw = RawSample::new(0.0, 0.5, -1.0, 0.25);
        for kind in [SensorKind::Accelerometer, SensorKind::UserAccelerometer] {
            let reading = transform(kind, &raw);
            assert_axes(&reading, -4.9, 9.8, -2.45);
        }
    }

    #[test]
    fn resting_device_reads_positive_gravity_on_z() {
        // Face up on a table the OS reports z = -1 g.
        let reading = transform(SensorKind::Accelerometer, &RawSample::new(0.0, 0.0, 0.0, -1.0));
        assert_axes(&reading, 0.0, 0.0, STANDARD_GRAVITY);
    }

    #[test]
    fn gyroscope_and_magnetometer_pass_through() {
        let raw = RawSample::new(0.0, 12.5, -3.0, 41.75);
        for kind in [SensorKind::Gyroscope, SensorKind::Magnetometer] {
            let reading = transform(kind, &raw);
            assert_axes(&reading, 12.5, -3.0, 41.75);
        }
    }

    #[test]
    fn timestamp_is_truncated_not_rounded() {
        assert_eq!(timestamp_millis(0.0), 0);
        assert_eq!(timestamp_millis(1.2345), 1234);
        assert_eq!(timestamp_millis(1.9999), 1999);
    }

    #[test]
    fn transform_carries_converted_timestamp() {
        let reading = transform(SensorKind::Gyroscope, &RawSample::new(0.3, 7.0, 8.0, 9.0));
        assert_eq!(reading.timestamp, 300);
    }
}
