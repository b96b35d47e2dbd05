//! `motion-hal` – Motion Sensor Abstraction
//!
//! Turns continuously sampling OS sensors into per-kind reading streams.
//!
//! # Modules
//!
//! - [`source`] – [`SensorSource`][source::SensorSource]: the trait a
//!   platform back-end implements for one sensor kind.
//! - [`transform`] – pure sign, unit and timestamp conversion from raw
//!   samples to [`SensorReading`][motion_types::SensorReading]s.
//! - [`handler`] – [`StreamHandler`][handler::StreamHandler]: subscribe /
//!   unsubscribe lifecycle, stored update interval, delivery fan-out.
//! - [`registry`] – [`SensorRegistry`][registry::SensorRegistry]: one handler
//!   per kind, routing availability and interval requests.
//! - [`sim`] – simulated sources, a registry builder and a background driver
//!   for running without motion hardware.

pub mod handler;
pub mod registry;
pub mod sim;
pub mod source;
pub mod transform;

pub use handler::{StreamHandler, Subscription};
pub use registry::SensorRegistry;
pub use source::{SampleCallback, SensorSource};
pub use transform::{STANDARD_GRAVITY, timestamp_millis, transform};
