//! MAX30100 pulse oximeter over I²C.
//!
//! Configured for SpO2 + HR mode at 100 samples/s with 1600 µs LED pulses
//! (16-bit samples).  Every [`update`](OximeterPort::update) drains the
//! 16-deep FIFO into a [`PulseEstimator`].

use embedded_hal::i2c::I2c;
use log::{info, warn};

use crate::app::ports::OximeterPort;
use crate::error::SensorError;

use super::pulse::PulseEstimator;

pub const I2C_ADDRESS: u8 = 0x57;
pub const EXPECTED_PART_ID: u8 = 0x11;

const REG_FIFO_WR_PTR: u8 = 0x02;
const REG_FIFO_OVF_COUNTER: u8 = 0x03;
const REG_FIFO_RD_PTR: u8 = 0x04;
const REG_FIFO_DATA: u8 = 0x05;
const REG_MODE_CONFIG: u8 = 0x06;
const REG_SPO2_CONFIG: u8 = 0x07;
const REG_LED_CONFIG: u8 = 0x09;
const REG_PART_ID: u8 = 0xFF;

const MODE_SPO2_HR: u8 = 0x03;
/// Hi-res enable, 100 sps, 1600 µs pulse width.
const SPO2_CONFIG: u8 = 0x47;
/// Red 27.1 mA (upper nibble), IR 50 mA (lower nibble).
const LED_CONFIG: u8 = 0x8F;

const FIFO_DEPTH: u8 = 16;
const BYTES_PER_SAMPLE: usize = 4;

pub struct Max30100<I2C> {
    i2c: I2C,
    estimator: PulseEstimator,
    initialized: bool,
    last_ir: Option<u16>,
    beat_pending: bool,
}

impl<I2C: I2c> Max30100<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self {
            i2c,
            estimator: PulseEstimator::new(),
            initialized: false,
            last_ir: None,
            beat_pending: false,
        }
    }

    /// Probe the part ID and program the sampling configuration.
    pub fn init(&mut self) -> Result<(), SensorError> {
        let part_id = self.read_register(REG_PART_ID)?;
        if part_id != EXPECTED_PART_ID {
            return Err(SensorError::WrongDevice(part_id));
        }
        self.write_register(REG_SPO2_CONFIG, SPO2_CONFIG)?;
        self.write_register(REG_LED_CONFIG, LED_CONFIG)?;
        self.write_register(REG_FIFO_WR_PTR, 0)?;
        self.write_register(REG_FIFO_OVF_COUNTER, 0)?;
        self.write_register(REG_FIFO_RD_PTR, 0)?;
        self.write_register(REG_MODE_CONFIG, MODE_SPO2_HR)?;

        self.estimator = PulseEstimator::new();
        self.last_ir = None;
        self.beat_pending = false;
        self.initialized = true;
        Ok(())
    }

    /// Feed every buffered sample to the estimator.  Returns how many.
    pub fn drain_fifo(&mut self) -> Result<usize, SensorError> {
        let mut ptrs = [0u8; 3];
        self.i2c
            .write_read(I2C_ADDRESS, &[REG_FIFO_WR_PTR], &mut ptrs)
            .map_err(|_| SensorError::BusFailed)?;
        let [wr, ovf, rd] = ptrs;

        let mut pending = wr.wrapping_sub(rd) & (FIFO_DEPTH - 1);
        if pending == 0 && ovf > 0 {
            pending = FIFO_DEPTH;
        }

        let mut sample = [0u8; BYTES_PER_SAMPLE];
        for _ in 0..pending {
            self.i2c
                .write_read(I2C_ADDRESS, &[REG_FIFO_DATA], &mut sample)
                .map_err(|_| SensorError::BusFailed)?;
            let ir = u16::from_be_bytes([sample[0], sample[1]]);
            let red = u16::from_be_bytes([sample[2], sample[3]]);
            if self.estimator.push(ir, red) {
                self.beat_pending = true;
            }
            self.last_ir = Some(ir);
        }
        Ok(usize::from(pending))
    }

    pub fn release(self) -> I2C {
        self.i2c
    }

    fn read_register(&mut self, reg: u8) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(I2C_ADDRESS, &[reg], &mut buf)
            .map_err(|_| SensorError::BusFailed)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(I2C_ADDRESS, &[reg, value])
            .map_err(|_| SensorError::BusFailed)
    }
}

impl<I2C: I2c> OximeterPort for Max30100<I2C> {
    fn try_init(&mut self) -> bool {
        match self.init() {
            Ok(()) => {
                info!("MAX30100: ready (SpO2+HR, 100 sps)");
                true
            }
            Err(e) => {
                warn!("MAX30100: init failed: {e}");
                self.initialized = false;
                false
            }
        }
    }

    fn update(&mut self) -> Result<(), SensorError> {
        if !self.initialized {
            return Err(SensorError::NotPresent);
        }
        self.drain_fifo().map(|_| ()).inspect_err(|_| {
            self.initialized = false;
        })
    }

    fn poll_spo2_hr(&mut self) -> Option<(f32, f32)> {
        self.initialized
            .then(|| (self.estimator.spo2(), self.estimator.heart_rate()))
    }

    fn poll_raw_waveform(&mut self) -> Option<u16> {
        self.last_ir
    }

    fn take_beat(&mut self) -> bool {
        core::mem::take(&mut self.beat_pending)
    }
}
