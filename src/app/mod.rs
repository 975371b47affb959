//! Application core: event routing, recording and polling, no I/O.
//!
//! This module wires the recording controller, the sensor poller, the event
//! bus and the timer service into one [`service::GarageService`].  All
//! interaction with hardware and the network happens through **port
//! traits** defined in [`ports`], keeping this layer fully testable without
//! real peripherals.

pub mod inbox;
pub mod ports;
pub mod service;
