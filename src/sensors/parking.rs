//! Parking-mode tracker.
//!
//! A small state machine (idle ↔ active) derived from the parking-status
//! byte.  Status 0 means "no target"; any other valid status means a car is
//! manoeuvring in front of the sensor.  The tracker only reports what
//! changed; the poller turns that into events and timer restarts.

use core::fmt;

use super::ParkingDistance;

/// Whether a parking manoeuvre is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParkingMode {
    #[default]
    Idle,
    Active,
}

impl ParkingMode {
    pub const fn from_status(status: u8) -> Self {
        if status == 0 { Self::Idle } else { Self::Active }
    }
}

/// Mode transition caused by one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeSwitch {
    /// Idle → Active.
    Entered,
    /// Active → Idle.
    Exited,
}

/// Result of feeding one valid status byte to the tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParkingObservation {
    /// `(new, old)` when the status differs from the previous one.
    pub changed: Option<(u8, u8)>,
    pub switch: Option<ModeSwitch>,
    /// The distance pair was updated and telemetry should be emitted.
    pub telemetry: bool,
}

/// Last-status edge detector with the current distance pair.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParkingTracker {
    last_status: u8,
    distance: ParkingDistance,
}

impl ParkingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_status(&self) -> u8 {
        self.last_status
    }

    pub fn distance(&self) -> ParkingDistance {
        self.distance
    }

    pub fn mode(&self) -> ParkingMode {
        ParkingMode::from_status(self.last_status)
    }

    /// Record a range-checked status and its distance pair.
    ///
    /// Telemetry is reported while a target is present and once more on the
    /// tick it disappears, so consumers see the final reading.
    pub fn observe(&mut self, status: u8, distance: ParkingDistance) -> ParkingObservation {
        let old = self.last_status;
        let mut obs = ParkingObservation::default();

        if status != old {
            obs.changed = Some((status, old));
            obs.switch = match (ParkingMode::from_status(old), ParkingMode::from_status(status)) {
                (ParkingMode::Idle, ParkingMode::Active) => Some(ModeSwitch::Entered),
                (ParkingMode::Active, ParkingMode::Idle) => Some(ModeSwitch::Exited),
                _ => None,
            };
            self.last_status = status;
        }

        if status != 0 || old != 0 {
            self.distance = distance;
            obs.telemetry = true;
        }
        obs
    }
}

// ── Display phases ────────────────────────────────────────────

/// What the parking display shows for a given status byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParkingPhase {
    Hold,
    Start,
    Approach,
    Parking,
    InPlace,
    TooFar,
    ExitInPlace,
    ExitBackup,
    ExitComplete,
}

impl ParkingPhase {
    const BY_STATUS: [Self; 9] = [
        Self::Hold,
        Self::Start,
        Self::Approach,
        Self::Parking,
        Self::InPlace,
        Self::TooFar,
        Self::ExitInPlace,
        Self::ExitBackup,
        Self::ExitComplete,
    ];

    /// Phase for statuses 0–8.  Status 9 is valid but has no phase.
    pub fn from_status(status: u8) -> Option<Self> {
        Self::BY_STATUS.get(usize::from(status)).copied()
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Hold => "hold",
            Self::Start => "parking_start",
            Self::Approach => "parking_approach",
            Self::Parking => "parking_parking",
            Self::InPlace => "parking_inplace",
            Self::TooFar => "parking_toofar",
            Self::ExitInPlace => "exit_in_place",
            Self::ExitBackup => "exit_backup",
            Self::ExitComplete => "exit_complete",
        }
    }
}

impl fmt::Display for ParkingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
