//! Sensor subsystem: raw status block layout, decoding, the parking
//! tracker and the [`SensorPoller`](poller::SensorPoller).
//!
//! The sensor controller exposes one 8-byte status block:
//!
//! ```text
//!  byte:  0    1    2    3    4    5        6       7
//!        ┌────┬────┬────┬────┬────┬────────┬───────┬───────┐
//!        │edge│edge│edge│edge│edge│parking │ near  │ far   │
//!        │    │    │    │    │    │status  │ dist  │ dist  │
//!        └────┴────┴────┴────┴────┴────────┴───────┴───────┘
//! ```
//!
//! Edge slots hold one code each (0 = none).  The controller queues edges
//! left to right, so slot order is event order.

pub mod parking;
pub mod poller;

use log::debug;

use crate::config::EdgeCodeTable;
use crate::events::Event;

/// Length of the raw status block.
pub const BLOCK_LEN: usize = 8;
/// Number of edge-code slots at the start of the block.
pub const MAX_EDGE_SLOTS: usize = 5;
/// Offset of the parking-status byte.
pub const PARKING_STATUS_INDEX: usize = 5;
/// Offset of the near/far distance pair.
pub const DISTANCE_INDEX: usize = 6;

/// One raw block as returned by the bus reader.
pub type RawBlock = [u8; BLOCK_LEN];

/// Discrete edge reported in an edge slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeCode {
    DoorOpen,
    DoorClosed,
    OverridePressed,
}

impl EdgeCode {
    /// The bus event this edge publishes.
    pub const fn event(self) -> Event {
        match self {
            Self::DoorOpen => Event::DoorOpen,
            Self::DoorClosed => Event::DoorClosed,
            Self::OverridePressed => Event::OverrideButtonPressed,
        }
    }
}

impl EdgeCodeTable {
    /// Map a slot byte to an edge.  `None` for 0 and for unknown codes.
    pub fn classify(&self, code: u8) -> Option<EdgeCode> {
        match code {
            0 => None,
            c if c == self.door_open => Some(EdgeCode::DoorOpen),
            c if c == self.door_closed => Some(EdgeCode::DoorClosed),
            c if c == self.override_pressed => Some(EdgeCode::OverridePressed),
            _ => None,
        }
    }
}

/// Near/far distance bytes of the parking sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParkingDistance {
    pub near: u8,
    pub far: u8,
}

/// Decoded view of one raw block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    /// Recognised edges, in slot order.
    pub edges: heapless::Vec<EdgeCode, MAX_EDGE_SLOTS>,
    /// Raw parking-status byte (not range-checked here).
    pub parking_status: u8,
    pub distance: ParkingDistance,
}

impl SensorReading {
    /// Decode a block, scanning the first `scan_len` edge slots.
    pub fn decode(block: &RawBlock, codes: &EdgeCodeTable, scan_len: usize) -> Self {
        let mut edges = heapless::Vec::new();
        for (slot, &code) in block[..scan_len.min(MAX_EDGE_SLOTS)].iter().enumerate() {
            match codes.classify(code) {
                // Capacity equals the slot count, so this cannot overflow.
                Some(edge) => {
                    let _ = edges.push(edge);
                }
                None if code != 0 => {
                    debug!("Sensors: unknown edge code {:#04x} in slot {}", code, slot);
                }
                None => {}
            }
        }

        Self {
            edges,
            parking_status: block[PARKING_STATUS_INDEX],
            distance: ParkingDistance {
                near: block[DISTANCE_INDEX],
                far: block[DISTANCE_INDEX + 1],
            },
        }
    }
}
