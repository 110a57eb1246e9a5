//! Dallas 1-Wire bus.
//!
//! [`OneWireBus`] is the byte-level seam the DS18B20 driver talks to;
//! [`BitBangOneWire`] implements it on an open-drain GPIO with standard-speed
//! slot timing.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;

pub trait OneWireBus {
    /// Reset pulse.  `Err(NotPresent)` when no device answers.
    fn reset(&mut self) -> Result<(), SensorError>;

    fn write_byte(&mut self, byte: u8) -> Result<(), SensorError>;

    fn read_byte(&mut self) -> Result<u8, SensorError>;

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), SensorError> {
        bytes.iter().try_for_each(|&b| self.write_byte(b))
    }

    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<(), SensorError> {
        for b in buf {
            *b = self.read_byte()?;
        }
        Ok(())
    }
}

/// Maxim CRC-8 (polynomial x⁸+x⁵+x⁴+1, reflected 0x8C).
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |mut crc, &byte| {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
        crc
    })
}

// Standard-speed slot timing (µs).
const RESET_LOW_US: u32 = 480;
const PRESENCE_SAMPLE_US: u32 = 70;
const RESET_RECOVERY_US: u32 = 410;
const WRITE_1_LOW_US: u32 = 6;
const WRITE_1_RECOVERY_US: u32 = 64;
const WRITE_0_LOW_US: u32 = 60;
const WRITE_0_RECOVERY_US: u32 = 10;
const READ_LOW_US: u32 = 6;
const READ_SAMPLE_US: u32 = 9;
const READ_RECOVERY_US: u32 = 55;

/// 1-Wire master on an open-drain pin with an external pull-up.
pub struct BitBangOneWire<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> BitBangOneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    /// Releases the line before first use.
    pub fn new(mut pin: P, delay: D) -> Result<Self, SensorError> {
        pin.set_high().map_err(|_| SensorError::BusFailed)?;
        Ok(Self { pin, delay })
    }

    fn drive_low(&mut self) -> Result<(), SensorError> {
        self.pin.set_low().map_err(|_| SensorError::BusFailed)
    }

    fn release(&mut self) -> Result<(), SensorError> {
        self.pin.set_high().map_err(|_| SensorError::BusFailed)
    }

    fn line_is_low(&mut self) -> Result<bool, SensorError> {
        self.pin.is_low().map_err(|_| SensorError::BusFailed)
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), SensorError> {
        let (low, recovery) = if bit {
            (WRITE_1_LOW_US, WRITE_1_RECOVERY_US)
        } else {
            (WRITE_0_LOW_US, WRITE_0_RECOVERY_US)
        };
        self.drive_low()?;
        self.delay.delay_us(low);
        self.release()?;
        self.delay.delay_us(recovery);
        Ok(())
    }

    fn read_bit(&mut self) -> Result<bool, SensorError> {
        self.drive_low()?;
        self.delay.delay_us(READ_LOW_US);
        self.release()?;
        self.delay.delay_us(READ_SAMPLE_US);
        let bit = !self.line_is_low()?;
        self.delay.delay_us(READ_RECOVERY_US);
        Ok(bit)
    }
}

impl<P, D> OneWireBus for BitBangOneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn reset(&mut self) -> Result<(), SensorError> {
        self.drive_low()?;
        self.delay.delay_us(RESET_LOW_US);
        self.release()?;
        self.delay.delay_us(PRESENCE_SAMPLE_US);
        let present = self.line_is_low()?;
        self.delay.delay_us(RESET_RECOVERY_US);
        if present {
            Ok(())
        } else {
            Err(SensorError::NotPresent)
        }
    }

    fn write_byte(&mut self, byte: u8) -> Result<(), SensorError> {
        // LSB first
        (0..8).try_for_each(|i| self.write_bit((byte >> i) & 1 == 1))
    }

    fn read_byte(&mut self) -> Result<u8, SensorError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }
}
