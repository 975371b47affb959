//! I2C sensor-controller adapter.
//!
//! Reads the 8-byte status block with a single register-addressed
//! `write_read` transaction.  Generic over any `embedded-hal` 1.0 I2C bus,
//! so the same adapter runs on the Raspberry Pi (`rppal`) and against a
//! mock in tests.

use embedded_hal::i2c::{Error as _, I2c};

use crate::app::ports::BusReader;
use crate::config::SystemConfig;
use crate::error::BusError;
use crate::sensors::{BLOCK_LEN, RawBlock};

/// Sensor controller on an I2C bus.
pub struct I2cSensorBus<I> {
    i2c: I,
    address: u8,
    register: u8,
}

impl<I: I2c> I2cSensorBus<I> {
    pub fn new(i2c: I, address: u8, register: u8) -> Self {
        Self {
            i2c,
            address,
            register,
        }
    }

    pub fn from_config(i2c: I, config: &SystemConfig) -> Self {
        Self::new(i2c, config.sensor_i2c_address, config.sensor_register)
    }

    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> BusReader for I2cSensorBus<I> {
    fn read_block(&mut self) -> Result<RawBlock, BusError> {
        let mut block = [0u8; BLOCK_LEN];
        self.i2c
            .write_read(self.address, &[self.register], &mut block)
            .map_err(|e| BusError::from(e.kind()))?;
        Ok(block)
    }
}
