//! System configuration parameters
//!
//! All tunable parameters for the GarageWatch system.  Values can be
//! overridden through a [`ConfigPort`](crate::app::ports::ConfigPort)
//! (a JSON file on the Raspberry Pi).  Only the ratio between the two poll
//! cadences is a behavioural contract; the absolute numbers are tuning.

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sensors::MAX_EDGE_SLOTS;

/// Edge-code byte values reported by the sensor controller.
/// A value of 0 in the block always means "no edge in this slot".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeCodeTable {
    pub door_open: u8,
    pub door_closed: u8,
    pub override_pressed: u8,
}

impl Default for EdgeCodeTable {
    fn default() -> Self {
        Self {
            door_open: 0x01,
            door_closed: 0x02,
            override_pressed: 0x03,
        }
    }
}

/// Which accepted events fire the recorder's audit hooks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AuditScope {
    /// Only events accepted while the recorder is in `Prepare`.
    PrepareOnly,
    /// Every event the transition table accepts, whatever the source state.
    #[default]
    EveryAccepted,
}

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    // --- Recording ---
    /// Delay between the door opening and recording start (milliseconds)
    pub prepare_delay_ms: u32,
    /// When the recorder's audit hooks fire
    pub audit_scope: AuditScope,

    // --- Polling ---
    /// Poll interval outside parking mode (milliseconds)
    pub poll_regular_ms: u32,
    /// Poll interval while a parking target is detected (milliseconds)
    pub poll_fast_ms: u32,

    // --- Sensor block ---
    /// I2C address of the sensor controller
    pub sensor_i2c_address: u8,
    /// First register of the status block
    pub sensor_register: u8,
    /// Leading block bytes scanned for edge codes
    pub edge_scan_len: u8,
    /// Lowest valid parking status (0 = no target)
    pub parking_status_min: u8,
    /// Highest valid parking status
    pub parking_status_max: u8,
    /// Edge-code to event mapping
    pub edge_codes: EdgeCodeTable,

    // --- Housekeeping ---
    /// Periodic door status report interval (seconds, 0 = off)
    pub door_report_interval_secs: u32,
    /// Periodic snapshot interval (seconds, 0 = off)
    pub snapshot_interval_secs: u32,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Recording
            prepare_delay_ms: 10_000,
            audit_scope: AuditScope::default(),

            // Polling
            poll_regular_ms: 2_000,
            poll_fast_ms: 500,

            // Sensor block
            sensor_i2c_address: 0x27,
            sensor_register: 0x00,
            edge_scan_len: MAX_EDGE_SLOTS as u8,
            parking_status_min: 0,
            parking_status_max: 9,
            edge_codes: EdgeCodeTable::default(),

            // Housekeeping
            door_report_interval_secs: 60,
            snapshot_interval_secs: 60,
        }
    }
}

impl SystemConfig {
    /// Reject values the core cannot run with.  Invalid ranges are reported,
    /// never silently clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.prepare_delay_ms == 0 {
            return Err(ConfigError::ValidationFailed("prepare_delay_ms must be > 0"));
        }
        if self.poll_regular_ms == 0 || self.poll_fast_ms == 0 {
            return Err(ConfigError::ValidationFailed("poll intervals must be > 0"));
        }
        if self.poll_fast_ms > self.poll_regular_ms {
            return Err(ConfigError::ValidationFailed(
                "poll_fast_ms must not exceed poll_regular_ms",
            ));
        }
        if self.parking_status_min != 0 {
            return Err(ConfigError::ValidationFailed(
                "parking_status_min must be 0 (no target)",
            ));
        }
        if self.parking_status_min > self.parking_status_max {
            return Err(ConfigError::ValidationFailed(
                "parking_status_min must not exceed parking_status_max",
            ));
        }
        if usize::from(self.edge_scan_len) > MAX_EDGE_SLOTS {
            return Err(ConfigError::ValidationFailed("edge_scan_len exceeds edge slots"));
        }

        let codes = self.edge_codes;
        if codes.door_open == 0 || codes.door_closed == 0 || codes.override_pressed == 0 {
            return Err(ConfigError::ValidationFailed("edge code 0 is reserved for 'none'"));
        }
        if codes.door_open == codes.door_closed
            || codes.door_open == codes.override_pressed
            || codes.door_closed == codes.override_pressed
        {
            return Err(ConfigError::ValidationFailed("edge codes must be distinct"));
        }
        Ok(())
    }

    pub fn prepare_delay(&self) -> Duration {
        Duration::from_millis(u64::from(self.prepare_delay_ms))
    }

    pub fn poll_regular(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_regular_ms))
    }

    pub fn poll_fast(&self) -> Duration {
        Duration::from_millis(u64::from(self.poll_fast_ms))
    }

    /// `None` when periodic door reports are disabled.
    pub fn door_report_interval(&self) -> Option<Duration> {
        (self.door_report_interval_secs > 0)
            .then(|| Duration::from_secs(u64::from(self.door_report_interval_secs)))
    }

    /// `None` when periodic snapshots are disabled.
    pub fn snapshot_interval(&self) -> Option<Duration> {
        (self.snapshot_interval_secs > 0)
            .then(|| Duration::from_secs(u64::from(self.snapshot_interval_secs)))
    }
}
