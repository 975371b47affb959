//! Log-based adapters.
//!
//! Stand-ins for the camera, the status reporter and the parking display
//! that write to the log instead.  The runner uses them when no real
//! collaborator is configured; the audit hooks are the recorder's default.

use log::info;

use crate::app::ports::{AuditHooks, Camera, ParkingTelemetrySink, StatusReporter};
use crate::events::PrepareAttempt;
use crate::fsm::RecordingState;
use crate::sensors::ParkingDistance;
use crate::sensors::parking::ParkingPhase;

/// Audit hooks that log each accepted event.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogAuditHooks;

impl AuditHooks for LogAuditHooks {
    fn on_door_open(&mut self) {
        info!("Recorder: Door opened");
    }

    fn on_door_closed(&mut self) {
        info!("Recorder: Door closed");
    }

    fn on_cancel_requested(&mut self) {
        info!("Recorder: Cancel requested");
    }

    fn on_prepare_finished(&mut self, attempt: PrepareAttempt) {
        info!("Recorder: Preparations finished ({})", attempt);
    }
}

/// Camera that only logs the commands it receives.
#[derive(Debug, Default)]
pub struct LogCamera {
    recording: bool,
}

impl LogCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.recording
    }
}

impl Camera for LogCamera {
    fn prepare_recording(&mut self, attempt: PrepareAttempt) -> anyhow::Result<()> {
        info!("CAMERA | prepare {}", attempt);
        Ok(())
    }

    fn start_recording(&mut self) -> anyhow::Result<()> {
        self.recording = true;
        info!("CAMERA | start");
        Ok(())
    }

    fn stop_recording(&mut self) -> anyhow::Result<()> {
        self.recording = false;
        info!("CAMERA | stop");
        Ok(())
    }

    fn capture_snapshot(&mut self, state: RecordingState) -> anyhow::Result<()> {
        let port = if self.recording { "video" } else { "still" };
        info!("CAMERA | snapshot state={} port={}", state, port);
        Ok(())
    }
}

/// Door status reporter that logs.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogStatusReporter;

impl StatusReporter for LogStatusReporter {
    fn report_door(&mut self, open: bool) -> anyhow::Result<()> {
        info!("STATUS | door={}", if open { "open" } else { "closed" });
        Ok(())
    }
}

/// Parking display that logs the phase and distances.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogParkingDisplay;

impl ParkingTelemetrySink for LogParkingDisplay {
    fn on_parking_telemetry(
        &mut self,
        status: u8,
        distance: ParkingDistance,
    ) -> anyhow::Result<()> {
        let phase = ParkingPhase::from_status(status).map_or("-", ParkingPhase::name);
        info!(
            "PARK | status={} phase={} near={} far={}",
            status, phase, distance.near, distance.far
        );
        Ok(())
    }
}
