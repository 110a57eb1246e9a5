//! DS18B20 digital thermometer (single device, skip-ROM addressing).
//!
//! Conversion is split in two so the acquisition worker never waits on it:
//! [`request_conversion`](ThermometerPort::request_conversion) issues
//! Convert T and returns, [`read_celsius`](ThermometerPort::read_celsius)
//! reads the scratchpad once the conversion time has passed.

use log::{debug, info};

use crate::app::ports::ThermometerPort;
use crate::error::SensorError;

use super::onewire::{crc8, OneWireBus};

const CMD_SKIP_ROM: u8 = 0xCC;
const CMD_CONVERT_T: u8 = 0x44;
const CMD_WRITE_SCRATCHPAD: u8 = 0x4E;
const CMD_READ_SCRATCHPAD: u8 = 0xBE;

const SCRATCHPAD_LEN: usize = 9;
const CONFIG_BYTE: usize = 4;
/// Bits 0-4 of the config register always read 1, bit 7 always 0.
const CONFIG_FIXED_ONES: u8 = 0x1F;
const CONFIG_FIXED_ZERO: u8 = 0x80;

/// Alarm registers are unused; write the power-on defaults back.
const DEFAULT_TH: u8 = 0x4B;
const DEFAULT_TL: u8 = 0x46;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Bits9,
    Bits10,
    Bits11,
    Bits12,
}

impl Resolution {
    fn config_register(self) -> u8 {
        match self {
            Self::Bits9 => 0x1F,
            Self::Bits10 => 0x3F,
            Self::Bits11 => 0x5F,
            Self::Bits12 => 0x7F,
        }
    }

    /// Datasheet worst-case conversion time.
    pub fn conversion_ms(self) -> u32 {
        match self {
            Self::Bits9 => 94,
            Self::Bits10 => 188,
            Self::Bits11 => 375,
            Self::Bits12 => 750,
        }
    }

    /// LSBs that are undefined at this resolution.
    fn undefined_bits(self) -> i16 {
        match self {
            Self::Bits9 => 0b111,
            Self::Bits10 => 0b11,
            Self::Bits11 => 0b1,
            Self::Bits12 => 0,
        }
    }
}

pub struct Ds18b20<B> {
    bus: B,
    resolution: Resolution,
    configured: bool,
}

impl<B: OneWireBus> Ds18b20<B> {
    pub fn new(bus: B, resolution: Resolution) -> Self {
        Self {
            bus,
            resolution,
            configured: false,
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Write the resolution into the scratchpad.
    pub fn configure(&mut self) -> Result<(), SensorError> {
        self.bus.reset()?;
        self.bus.write_bytes(&[
            CMD_SKIP_ROM,
            CMD_WRITE_SCRATCHPAD,
            DEFAULT_TH,
            DEFAULT_TL,
            self.resolution.config_register(),
        ])?;
        self.configured = true;
        info!("DS18B20: configured for {:?}", self.resolution);
        Ok(())
    }

    pub fn start_conversion(&mut self) -> Result<(), SensorError> {
        if !self.configured {
            self.configure()?;
        }
        self.bus.reset()?;
        self.bus.write_bytes(&[CMD_SKIP_ROM, CMD_CONVERT_T])
    }

    pub fn read_scratchpad(&mut self) -> Result<[u8; SCRATCHPAD_LEN], SensorError> {
        self.bus.reset()?;
        self.bus.write_bytes(&[CMD_SKIP_ROM, CMD_READ_SCRATCHPAD])?;
        let mut pad = [0u8; SCRATCHPAD_LEN];
        self.bus.read_bytes(&mut pad)?;

        if crc8(&pad[..SCRATCHPAD_LEN - 1]) != pad[SCRATCHPAD_LEN - 1] {
            return Err(SensorError::CrcMismatch);
        }
        // An all-zero pad passes the CRC; the config register cannot be zero.
        let config = pad[CONFIG_BYTE];
        if config & CONFIG_FIXED_ONES != CONFIG_FIXED_ONES || config & CONFIG_FIXED_ZERO != 0 {
            return Err(SensorError::BusFailed);
        }
        Ok(pad)
    }

    pub fn release(self) -> B {
        self.bus
    }
}

/// Scratchpad temperature bytes → °C.
pub fn raw_to_celsius(lsb: u8, msb: u8, resolution: Resolution) -> f32 {
    let raw = i16::from_le_bytes([lsb, msb]) & !resolution.undefined_bits();
    f32::from(raw) / 16.0
}

impl<B: OneWireBus> ThermometerPort for Ds18b20<B> {
    fn request_conversion(&mut self) -> Result<(), SensorError> {
        self.start_conversion().inspect_err(|_| {
            // Re-send the resolution once the probe is back.
            self.configured = false;
        })
    }

    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        let pad = self.read_scratchpad()?;
        let celsius = raw_to_celsius(pad[0], pad[1], self.resolution);
        debug!("DS18B20: {celsius:.2} °C");
        Ok(celsius)
    }
}
