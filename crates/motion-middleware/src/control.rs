//! [`ControlChannel`] – request/response dispatcher for the method channel.
//!
//! Validates each [`MethodCall`] against the typed schema in
//! [`protocol`][crate::protocol] and routes it to the shared
//! [`SensorRegistry`].  Nothing a caller sends can panic the channel: unknown
//! methods get [`MethodResponse::NotImplemented`] and malformed arguments get
//! an `INVALID_ARGUMENTS` error response.

use std::sync::Arc;

use motion_hal::SensorRegistry;
use motion_types::MotionError;
use tracing::{debug, warn};

use crate::protocol::{ControlRequest, MethodCall, MethodResponse};

/// Handles calls arriving on [`METHOD_CHANNEL`][crate::protocol::METHOD_CHANNEL].
#[derive(Clone)]
pub struct ControlChannel {
    registry: Arc<SensorRegistry>,
}

impl ControlChannel {
    pub fn new(registry: Arc<SensorRegistry>) -> Self {
        Self { registry }
    }

    /// Execute one call and produce its response.
    pub fn handle(&self, call: &MethodCall) -> MethodResponse {
        match ControlRequest::from_call(call) {
            Ok(request) => self.execute(request),
            Err(e @ MotionError::UnknownMethod(_)) => {
                warn!(method = %call.method, "method not implemented");
                MethodResponse::from_error(&e)
            }
            Err(e) => {
                warn!(method = %call.method, error = %e, "rejected control call");
                MethodResponse::from_error(&e)
            }
        }
    }

    /// Execute an already validated request.
    pub fn execute(&self, request: ControlRequest) -> MethodResponse {
        debug!(?request, "control request");
        match request {
            ControlRequest::IsSensorAvailable { sensor_type } => {
                MethodResponse::success(self.registry.is_sensor_available_code(sensor_type))
            }
            ControlRequest::SetSensorUpdateInterval {
                sensor_type,
                interval,
            } => {
                self.registry
                    .set_sensor_update_interval_code(sensor_type, interval);
                MethodResponse::success(serde_json::Value::Null)
            }
        }
    }

    /// Decode a JSON [`MethodCall`], handle it, and encode the response.
    ///
    /// # Errors
    ///
    /// Returns [`MotionError::Serialization`] when `raw` is not a valid call
    /// envelope.  Schema violations inside a well-formed envelope are
    /// reported in the response instead.
    pub fn handle_json(&self, raw: &str) -> Result<String, MotionError> {
        let call: MethodCall = serde_json::from_str(raw)
            .map_err(|e| MotionError::Serialization(format!("invalid method call: {e}")))?;
        let response = self.handle(&call);
        serde_json::to_string(&response).map_err(|e| MotionError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{IS_SENSOR_AVAILABLE, SET_SENSOR_UPDATE_INTERVAL};
    use motion_hal::sim::{SimFeeds, SimRegistry};
    use motion_types::{SensorKind, UpdateInterval};
    use serde_json::{Value, json};

    fn channel(unavailable: &[SensorKind]) -> (ControlChannel, Arc<SensorRegistry>, SimFeeds) {
        let builder = unavailable
            .iter()
            .fold(SimRegistry::new(), |b, &kind| b.with_unavailable(kind));
        let (registry, feeds) = builder.build();
        let registry = Arc::new(registry);
        (ControlChannel::new(registry.clone()), registry, feeds)
    }

    #[test]
    fn availability_call_returns_bool() {
        let (channel, _, _) = channel(&[SensorKind::Magnetometer]);
        let ok = channel.handle(&MethodCall::new(IS_SENSOR_AVAILABLE, json!(1)));
        assert_eq!(ok, MethodResponse::success(true));

        let missing = channel.handle(&MethodCall::new(IS_SENSOR_AVAILABLE, json!(2)));
        assert_eq!(missing, MethodResponse::success(false));
    }

    #[test]
    fn availability_for_unknown_code_is_false() {
        let (channel, _, _) = channel(&[]);
        let response = channel.handle(&MethodCall::new(IS_SENSOR_AVAILABLE, json!(42)));
        assert_eq!(response, MethodResponse::success(false));
    }

    #[test]
    fn interval_call_updates_handler() {
        let (channel, registry, _) = channel(&[]);
        let response = channel.handle(&MethodCall::new(
            SET_SENSOR_UPDATE_INTERVAL,
            json!({"sensorType": 10, "interval": 33333}),
        ));
        assert_eq!(response, MethodResponse::success(Value::Null));
        assert_eq!(
            registry
                .handler(SensorKind::UserAccelerometer)
                .update_interval(),
            Some(UpdateInterval::from_micros(33_333).unwrap())
        );
    }

    #[test]
    fn interval_call_for_unknown_code_changes_nothing() {
        let (channel, registry, _) = channel(&[]);
        let response = channel.handle(&MethodCall::new(
            SET_SENSOR_UPDATE_INTERVAL,
            json!({"sensorType": 7, "interval": 1000}),
        ));
        assert_eq!(response, MethodResponse::success(Value::Null));
        assert!(registry.handlers().all(|h| h.update_interval().is_none()));
    }

    #[test]
    fn unknown_method_is_not_implemented() {
        let (channel, _, _) = channel(&[]);
        let response = channel.handle(&MethodCall::new("getSensorList", Value::Null));
        assert_eq!(response, MethodResponse::NotImplemented);
    }

    #[test]
    fn malformed_arguments_yield_error_response() {
        let (channel, registry, _) = channel(&[]);
        let response = channel.handle(&MethodCall::new(
            SET_SENSOR_UPDATE_INTERVAL,
            json!({"sensorType": "gyro", "interval": 1000}),
        ));
        match response {
            MethodResponse::Error { code, message } => {
                assert_eq!(code, "INVALID_ARGUMENTS");
                assert!(message.contains(SET_SENSOR_UPDATE_INTERVAL));
            }
            other => panic!("expected error response, got {other:?}"),
        }
        assert!(registry.handlers().all(|h| h.update_interval().is_none()));
    }

    #[test]
    fn handle_json_round_trips_envelopes() {
        let (channel, _, _) = channel(&[]);
        let raw = channel
            .handle_json(r#"{"method":"isSensorAvailable","arguments":4}"#)
            .unwrap();
        let response: Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(response, json!({"status": "success", "result": true}));
    }

    #[test]
    fn handle_json_rejects_garbage() {
        let (channel, _, _) = channel(&[]);
        assert!(matches!(
            channel.handle_json("not json"),
            Err(MotionError::Serialization(_))
        ));
        assert!(matches!(
            channel.handle_json(r#"{"arguments": 1}"#),
            Err(MotionError::Serialization(_))
        ));
    }
}
