use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The motion-data sources exposed across the bridge.
///
/// Each kind maps to one stream handler and one event channel.  The numeric
/// [`code`][SensorKind::code] is part of the external contract and must not
/// change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// Raw device acceleration including gravity.
    Accelerometer,
    /// Bias-corrected magnetic field from the motion-fusion subsystem.
    Magnetometer,
    /// Angular rate around each axis.
    Gyroscope,
    /// Acceleration with gravity removed.
    UserAccelerometer,
}

impl SensorKind {
    /// Every kind, in code order.  Registries iterate this to stay exhaustive.
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Accelerometer,
        SensorKind::Magnetometer,
        SensorKind::Gyroscope,
        SensorKind::UserAccelerometer,
    ];

    /// External sensor-type code.
    pub const fn code(self) -> i64 {
        match self {
            SensorKind::Accelerometer => 1,
            SensorKind::Magnetometer => 2,
            SensorKind::Gyroscope => 4,
            SensorKind::UserAccelerometer => 10,
        }
    }

    /// Resolve an external sensor-type code.  Unknown codes yield `None`.
    pub const fn from_code(code: i64) -> Option<SensorKind> {
        match code {
            1 => Some(SensorKind::Accelerometer),
            2 => Some(SensorKind::Magnetometer),
            4 => Some(SensorKind::Gyroscope),
            10 => Some(SensorKind::UserAccelerometer),
            _ => None,
        }
    }

    /// Stable name of the event channel carrying this kind's readings.
    pub const fn channel_name(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "motion_sensors/accelerometer",
            SensorKind::Magnetometer => "motion_sensors/magnetometer",
            SensorKind::Gyroscope => "motion_sensors/gyroscope",
            SensorKind::UserAccelerometer => "motion_sensors/user_accelerometer",
        }
    }

    /// Short lowercase label, e.g. `"gyroscope"`.
    pub const fn label(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Magnetometer => "magnetometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::UserAccelerometer => "user_accelerometer",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

impl std::str::FromStr for SensorKind {
    type Err = MotionError;

    /// Accepts the label (`"gyroscope"`), a short alias (`"gyro"`, `"mag"`,
    /// `"accel"`, `"user"`), or the numeric code.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "accelerometer" | "accel" => Ok(SensorKind::Accelerometer),
            "magnetometer" | "mag" | "magnetic_field" => Ok(SensorKind::Magnetometer),
            "gyroscope" | "gyro" => Ok(SensorKind::Gyroscope),
            "user_accelerometer" | "user" => Ok(SensorKind::UserAccelerometer),
            other => other
                .parse::<i64>()
                .ok()
                .and_then(SensorKind::from_code)
                .ok_or_else(|| MotionError::InvalidArguments {
                    method: "parse_sensor_kind".to_string(),
                    details: format!("'{s}' is not a sensor kind"),
                }),
        }
    }
}

/// One sample as produced by the OS sensor subsystem, before any sign or
/// unit conversion.  `timestamp_secs` is monotonic time in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp_secs: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl RawSample {
    pub fn new(timestamp_secs: f64, x: f64, y: f64, z: f64) -> Self {
        Self {
            timestamp_secs,
            x,
            y,
            z,
        }
    }
}

/// A timestamped 3-axis reading after transformation, as delivered to
/// stream subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Monotonic time in whole milliseconds.
    pub timestamp: i64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

/// Requested sampling period for one sensor kind.
///
/// Carried in microseconds at the public boundary and handed to sources in
/// seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UpdateInterval {
    micros: u64,
}

impl UpdateInterval {
    /// Build an interval from a boundary value in microseconds.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::InvalidArguments`] for negative values.
    pub fn from_micros(micros: i64) -> Result<Self, MotionError> {
        u64::try_from(micros)
            .map(|micros| Self { micros })
            .map_err(|_| MotionError::InvalidArguments {
                method: "setSensorUpdateInterval".to_string(),
                details: format!("interval must be non-negative, got {micros}"),
            })
    }

    pub const fn micros(self) -> u64 {
        self.micros
    }

    /// The interval in seconds, the unit sensor sources are configured in.
    pub fn as_secs_f64(self) -> f64 {
        self.micros as f64 / 1_000_000.0
    }

    pub fn as_duration(self) -> std::time::Duration {
        std::time::Duration::from_micros(self.micros)
    }
}

/// Attitude reference frame requested from the motion-fusion subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReferenceFrame {
    XArbitraryZVertical,
    /// Like [`ReferenceFrame::XArbitraryZVertical`] but using the
    /// magnetometer to correct yaw drift.  Required for calibrated
    /// magnetic-field output.
    XArbitraryCorrectedZVertical,
    XMagneticNorthZVertical,
    XTrueNorthZVertical,
}

/// Everything a stream handler passes to a source when starting delivery.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StartOptions {
    /// `None` leaves the source at its default sampling rate.
    pub interval: Option<UpdateInterval>,
    /// `None` for sources that do not run sensor fusion.
    pub reference_frame: Option<ReferenceFrame>,
    /// Let the OS prompt the user for a figure-eight calibration if needed.
    pub show_calibration_display: bool,
}

/// Error type shared by every motion-sensors crate.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MotionError {
    #[error("Sensor Unavailable: {0}")]
    Unavailable(SensorKind),

    #[error("Unknown sensor type code: {0}")]
    UnknownSensorType(i64),

    #[error("Method not implemented: {0}")]
    UnknownMethod(String),

    #[error("Invalid arguments for {method}: {details}")]
    InvalidArguments { method: String, details: String },

    #[error("Serialization Error: {0}")]
    Serialization(String),

    #[error("Channel Error: {0}")]
    Channel(String),
}
