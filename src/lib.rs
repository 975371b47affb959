//! GarageWatch library.
//!
//! Exposes the pure-logic modules (recording state machine, sensor poller,
//! event bus, timer service) for integration testing, plus the adapters the
//! runner binary wires together.  Nothing here spawns threads or sleeps;
//! the host drives time through [`app::service::GarageService::run_until`].

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod error;
pub mod events;
pub mod fsm;
pub mod scheduler;
pub mod sensors;

pub use app::service::GarageService;
pub use config::SystemConfig;
pub use error::{Error, Result};
