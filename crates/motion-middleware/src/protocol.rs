//! Wire shapes of the control channel.
//!
//! A caller sends a [`MethodCall`] envelope: a method name plus untyped JSON
//! arguments.  [`ControlRequest::from_call`] validates it against the typed
//! schema before anything reaches the registry, and the channel answers with
//! a [`MethodResponse`].
//!
//! | Method | Arguments | Result |
//! |---|---|---|
//! | `isSensorAvailable` | sensor-type code (bare integer) | `bool` |
//! | `setSensorUpdateInterval` | `{"sensorType": int, "interval": int µs}` | `null` |

use motion_types::{MotionError, UpdateInterval};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Name of the shared request/response channel.
pub const METHOD_CHANNEL: &str = "motion_sensors/method";

pub const IS_SENSOR_AVAILABLE: &str = "isSensorAvailable";
pub const SET_SENSOR_UPDATE_INTERVAL: &str = "setSensorUpdateInterval";

/// Untyped request envelope as it arrives over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Value,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Value) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct IntervalArguments {
    sensor_type: i64,
    interval: i64,
}

/// A validated control request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlRequest {
    IsSensorAvailable {
        sensor_type: i64,
    },
    SetSensorUpdateInterval {
        sensor_type: i64,
        interval: UpdateInterval,
    },
}

impl ControlRequest {
    /// Validate `call` against the request schema.
    ///
    /// Sensor-type codes are not checked here; unknown codes are handled
    /// permissively by the registry.
    ///
    /// # Errors
    ///
    /// * [`MotionError::UnknownMethod`] for a method name outside the schema.
    /// * [`MotionError::InvalidArguments`] when the arguments have the wrong
    ///   shape or the interval is negative.
    pub fn from_call(call: &MethodCall) -> Result<Self, MotionError> {
        match call.method.as_str() {
            IS_SENSOR_AVAILABLE => {
                let sensor_type =
                    call.arguments
                        .as_i64()
                        .ok_or_else(|| MotionError::InvalidArguments {
                            method: call.method.clone(),
                            details: format!(
                                "expected an integer sensor type, got {}",
                                call.arguments
                            ),
                        })?;
                Ok(ControlRequest::IsSensorAvailable { sensor_type })
            }
            SET_SENSOR_UPDATE_INTERVAL => {
                let args: IntervalArguments = serde_json::from_value(call.arguments.clone())
                    .map_err(|e| MotionError::InvalidArguments {
                        method: call.method.clone(),
                        details: e.to_string(),
                    })?;
                Ok(ControlRequest::SetSensorUpdateInterval {
                    sensor_type: args.sensor_type,
                    interval: UpdateInterval::from_micros(args.interval)?,
                })
            }
            other => Err(MotionError::UnknownMethod(other.to_string())),
        }
    }
}

/// Reply to a [`MethodCall`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { result: Value },
    /// The method name is not part of the schema.
    NotImplemented,
    Error { code: String, message: String },
}

impl MethodResponse {
    pub fn success(result: impl Into<Value>) -> Self {
        MethodResponse::Success {
            result: result.into(),
        }
    }

    /// Map a request failure to its response.
    pub fn from_error(error: &MotionError) -> Self {
        match error {
            MotionError::UnknownMethod(_) => MethodResponse::NotImplemented,
            other => MethodResponse::Error {
                code: error_code(other).to_string(),
                message: other.to_string(),
            },
        }
    }
}

/// Stable machine-readable code for an error response.
pub fn error_code(error: &MotionError) -> &'static str {
    match error {
        MotionError::Unavailable(_) => "SENSOR_UNAVAILABLE",
        MotionError::UnknownSensorType(_) => "UNKNOWN_SENSOR_TYPE",
        MotionError::UnknownMethod(_) => "NOT_IMPLEMENTED",
        MotionError::InvalidArguments { .. } => "INVALID_ARGUMENTS",
        MotionError::Serialization(_) => "SERIALIZATION",
        MotionError::Channel(_) => "CHANNEL",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_is_sensor_available() {
        let call = MethodCall::new(IS_SENSOR_AVAILABLE, json!(4));
        assert_eq!(
            ControlRequest::from_call(&call).unwrap(),
            ControlRequest::IsSensorAvailable { sensor_type: 4 }
        );
    }

    #[test]
    fn parses_set_sensor_update_interval() {
        let call = MethodCall::new(
            SET_SENSOR_UPDATE_INTERVAL,
            json!({"sensorType": 1, "interval": 20000}),
        );
        let request = ControlRequest::from_call(&call).unwrap();
        assert_eq!(
            request,
            ControlRequest::SetSensorUpdateInterval {
                sensor_type: 1,
                interval: UpdateInterval::from_micros(20_000).unwrap(),
            }
        );
    }

    #[test]
    fn unknown_method_is_reported_as_such() {
        let call = MethodCall::new("calibrate", Value::Null);
        assert_eq!(
            ControlRequest::from_call(&call),
            Err(MotionError::UnknownMethod("calibrate".to_string()))
        );
    }

    #[test]
    fn wrong_argument_shapes_are_rejected() {
        let cases = [
            MethodCall::new(IS_SENSOR_AVAILABLE, json!("4")),
            MethodCall::new(IS_SENSOR_AVAILABLE, Value::Null),
            MethodCall::new(SET_SENSOR_UPDATE_INTERVAL, json!(4)),
            MethodCall::new(SET_SENSOR_UPDATE_INTERVAL, json!({"sensorType": 4})),
            MethodCall::new(
                SET_SENSOR_UPDATE_INTERVAL,
                json!({"sensorType": 4, "interval": 1.5}),
            ),
            MethodCall::new(
                SET_SENSOR_UPDATE_INTERVAL,
                json!({"sensorType": 4, "interval": 100, "extra": true}),
            ),
        ];
        for call in cases {
            let result = ControlRequest::from_call(&call);
            assert!(
                matches!(result, Err(MotionError::InvalidArguments { .. })),
                "{call:?} gave {result:?}"
            );
        }
    }

    #[test]
    fn negative_interval_is_rejected() {
        let call = MethodCall::new(
            SET_SENSOR_UPDATE_INTERVAL,
            json!({"sensorType": 4, "interval": -1}),
        );
        assert!(matches!(
            ControlRequest::from_call(&call),
            Err(MotionError::InvalidArguments { .. })
        ));
    }

    #[test]
    fn method_call_arguments_default_to_null() {
        let call: MethodCall = serde_json::from_str(r#"{"method":"isSensorAvailable"}"#).unwrap();
        assert_eq!(call.arguments, Value::Null);
    }

    #[test]
    fn responses_serialise_with_status_tag() {
        let ok = serde_json::to_value(MethodResponse::success(true)).unwrap();
        assert_eq!(ok, json!({"status": "success", "result": true}));

        let missing = serde_json::to_value(MethodResponse::NotImplemented).unwrap();
        assert_eq!(missing, json!({"status": "not_implemented"}));
    }

    #[test]
    fn unknown_method_error_maps_to_not_implemented() {
        let response = MethodResponse::from_error(&MotionError::UnknownMethod("x".into()));
        assert_eq!(response, MethodResponse::NotImplemented);

        let response = MethodResponse::from_error(&MotionError::InvalidArguments {
            method: "m".into(),
            details: "d".into(),
        });
        assert!(matches!(response, MethodResponse::Error { ref code, .. } if code == "INVALID_ARGUMENTS"));
    }
}
