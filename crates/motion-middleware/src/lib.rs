//! `motion-middleware` – The Boundary
//!
//! Carries requests and readings across the language boundary without
//! caring what produced them.
//!
//! # Modules
//!
//! - [`protocol`] – method-call envelope, typed request schema and response
//!   shapes of the control channel.
//! - [`control`] – [`ControlChannel`]: validates and dispatches method calls
//!   to the sensor registry.
//! - [`event_channel`] – [`EventChannel`]: per-kind listen / cancel and the
//!   encoded reading stream.
//! - [`bridge`] – [`MotionBridge`]: owns the control channel and hands out
//!   event channels by name.

pub mod bridge;
pub mod control;
pub mod event_channel;
pub mod protocol;

pub use bridge::MotionBridge;
pub use control::ControlChannel;
pub use event_channel::{EventChannel, encode};
pub use protocol::{ControlRequest, METHOD_CHANNEL, MethodCall, MethodResponse};
