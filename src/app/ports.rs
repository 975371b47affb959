//! Port traits: the boundary between the garage core and the hardware.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GarageService (domain)
//! ```
//!
//! Driven adapters (camera, sensor bus, status reporting, storage) implement
//! these traits.  The [`GarageService`](super::service::GarageService)
//! consumes them via generics, so the domain core never touches hardware
//! or the network directly.
//!
//! ## Contract notes
//!
//! - Commands are fire-and-forget: an `Err` is logged by the core and never
//!   changes recording state.
//! - No port method may block indefinitely; timeouts are the adapter's job.

use crate::config::SystemConfig;
use crate::error::{BusError, ConfigError};
use crate::events::PrepareAttempt;
use crate::fsm::RecordingState;
use crate::sensors::{ParkingDistance, RawBlock};

// ───────────────────────────────────────────────────────────────
// Camera port (driven adapter: domain → camera)
// ───────────────────────────────────────────────────────────────

/// Commands the recording controller issues to the camera.
pub trait Camera {
    /// Begin warming up for a recording.
    ///
    /// Setup may run asynchronously.  When it completes early the adapter
    /// posts `Event::PrepareFinished(attempt)` through the service inbox;
    /// otherwise the preparation timer raises it.  A completion for an
    /// attempt that is no longer live is ignored by the controller.
    fn prepare_recording(&mut self, attempt: PrepareAttempt) -> anyhow::Result<()>;

    fn start_recording(&mut self) -> anyhow::Result<()>;

    fn stop_recording(&mut self) -> anyhow::Result<()>;

    /// Periodic still capture.  `state` lets the camera annotate the image
    /// and pick the video port while recording.
    fn capture_snapshot(&mut self, state: RecordingState) -> anyhow::Result<()> {
        let _ = state;
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Bus reader port (driven adapter: sensor controller → domain)
// ───────────────────────────────────────────────────────────────

/// Reads the raw status block from the sensor controller.
pub trait BusReader {
    /// One block read.  Must return within the device timeout.
    fn read_block(&mut self) -> Result<RawBlock, BusError>;
}

impl<T: BusReader + ?Sized> BusReader for Box<T> {
    fn read_block(&mut self) -> Result<RawBlock, BusError> {
        (**self).read_block()
    }
}

// ───────────────────────────────────────────────────────────────
// Audit hooks (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// Lifecycle notifications from the recording controller, decoupled from
/// the transitions themselves.  Which events fire them is governed by
/// [`AuditScope`](crate::config::AuditScope).
pub trait AuditHooks {
    fn on_door_open(&mut self) {}
    fn on_door_closed(&mut self) {}
    fn on_cancel_requested(&mut self) {}
    fn on_prepare_finished(&mut self, attempt: PrepareAttempt) {
        let _ = attempt;
    }
}

// ───────────────────────────────────────────────────────────────
// Telemetry port (driven adapter: domain → parking display)
// ───────────────────────────────────────────────────────────────

/// Receives the parking status and distance pair on every qualifying tick.
pub trait ParkingTelemetrySink {
    fn on_parking_telemetry(&mut self, status: u8, distance: ParkingDistance)
    -> anyhow::Result<()>;
}

impl<F> ParkingTelemetrySink for F
where
    F: FnMut(u8, ParkingDistance) -> anyhow::Result<()>,
{
    fn on_parking_telemetry(
        &mut self,
        status: u8,
        distance: ParkingDistance,
    ) -> anyhow::Result<()> {
        self(status, distance)
    }
}

// ───────────────────────────────────────────────────────────────
// Status reporter port (driven adapter: domain → MQTT / dashboard)
// ───────────────────────────────────────────────────────────────

/// Publishes the door status to the outside world.
pub trait StatusReporter {
    fn report_door(&mut self, open: bool) -> anyhow::Result<()>;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`ConfigError::NotFound`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}
