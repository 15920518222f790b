//! [`RegisterTransport`] over a blocking `embedded-hal` I²C bus.
//!
//! The SX93xx family uses one address byte followed by one data byte:
//! a write is `[reg, value]`, a read is a write of `[reg]` followed by a
//! one-byte read in the same transaction.

use embedded_hal::i2c::{Error as _, I2c, SevenBitAddress};
use log::trace;

use crate::app::ports::RegisterTransport;
use crate::error::BusError;

/// Default 7-bit bus address of the SX9310.
pub const SX9310_I2C_ADDR: SevenBitAddress = 0x28;

pub struct I2cTransport<I> {
    i2c: I,
    addr: SevenBitAddress,
}

impl<I: I2c> I2cTransport<I> {
    pub fn new(i2c: I, addr: SevenBitAddress) -> Self {
        Self { i2c, addr }
    }

    pub fn address(&self) -> SevenBitAddress {
        self.addr
    }

    /// Give the bus back.
    pub fn release(self) -> I {
        self.i2c
    }
}

impl<I: I2c> RegisterTransport for I2cTransport<I> {
    fn write(&mut self, reg: u8, value: u8) -> Result<(), BusError> {
        trace!("i2c 0x{:02x}: write 0x{:02x} <- 0x{:02x}", self.addr, reg, value);
        self.i2c
            .write(self.addr, &[reg, value])
            .map_err(|e| BusError::Write { reg, kind: e.kind() })
    }

    fn read(&mut self, reg: u8) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.addr, &[reg], &mut buf)
            .map_err(|e| BusError::Read { reg, kind: e.kind() })?;
        trace!("i2c 0x{:02x}: read 0x{:02x} -> 0x{:02x}", self.addr, reg, buf[0]);
        Ok(buf[0])
    }
}
