//! Simulated sensor bus.
//!
//! Replays a script of raw blocks, one per read, optionally looping.  The
//! built-in [`SimulatedBus::garage_cycle`] script drives a full
//! arrival: door opens, a car parks with the status walking through the
//! parking phases, the door closes, and a bus glitch shows up once per
//! cycle.

use log::debug;

use crate::app::ports::BusReader;
use crate::error::BusError;
use crate::sensors::RawBlock;

/// One scripted read.
pub type ScriptedRead = Result<RawBlock, BusError>;

/// Block with no edges and no parking target.
pub const QUIET: RawBlock = [0; 8];

/// Scripted [`BusReader`].
#[derive(Debug, Clone)]
pub struct SimulatedBus {
    script: Vec<ScriptedRead>,
    cursor: usize,
    looping: bool,
    reads: u64,
}

impl SimulatedBus {
    /// Replay `script` once, then return quiet blocks.
    pub fn once(script: Vec<ScriptedRead>) -> Self {
        Self {
            script,
            cursor: 0,
            looping: false,
            reads: 0,
        }
    }

    /// Replay `script` forever.
    pub fn looping(script: Vec<ScriptedRead>) -> Self {
        Self {
            looping: true,
            ..Self::once(script)
        }
    }

    /// Door open, parking manoeuvre, door closed; repeats.
    pub fn garage_cycle() -> Self {
        let mut script: Vec<ScriptedRead> = Vec::new();
        let quiet = |n: usize, script: &mut Vec<ScriptedRead>| {
            script.extend(core::iter::repeat_n(Ok(QUIET), n));
        };

        quiet(5, &mut script);
        script.push(Ok([0x01, 0, 0, 0, 0, 0, 0, 0])); // door open
        quiet(2, &mut script);
        // Approach: status 1..=4 with the distance closing in.
        for (status, near) in [(1u8, 200u8), (2, 150), (2, 120), (3, 80), (3, 60), (4, 30)] {
            script.push(Ok([0, 0, 0, 0, 0, status, near, near.saturating_add(20)]));
        }
        script.push(Err(BusError::Timeout));
        script.push(Ok([0, 0, 0, 0, 0, 4, 30, 50]));
        script.push(Ok([0, 0, 0, 0, 0, 0, 0, 0])); // target gone
        script.push(Ok([0x02, 0, 0, 0, 0, 0, 0, 0])); // door closed
        quiet(10, &mut script);

        Self::looping(script)
    }

    /// Reads served so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl BusReader for SimulatedBus {
    fn read_block(&mut self) -> Result<RawBlock, BusError> {
        self.reads += 1;
        if self.cursor >= self.script.len() {
            if !self.looping || self.script.is_empty() {
                return Ok(QUIET);
            }
            debug!("SimBus: script restarted");
            self.cursor = 0;
        }
        let read = self.script[self.cursor];
        self.cursor += 1;
        read
    }
}
