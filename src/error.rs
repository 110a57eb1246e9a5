//! Unified error types for the ventilator firmware.
//!
//! A single `Error` enum that every hardware-facing subsystem converts into.
//! All variants are `Copy` so they can be passed between the acquisition
//! worker and the control loop without allocation.
//!
//! Rejected operator requests are not hardware errors; they live in
//! [`RequestError`](crate::app::commands::RequestError).

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned unusable data.
    Sensor(SensorError),
    /// An actuator command failed.
    Actuator(ActuatorError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I2C transaction failed (NACK, arbitration loss, timeout).
    BusFailed,
    /// Device answered with an unexpected part ID.
    WrongDevice(u8),
    /// No device asserted a presence pulse on the 1-Wire bus.
    NotPresent,
    /// Payload failed its CRC check.
    CrcMismatch,
    /// Reading is outside the physically plausible range.
    OutOfRange,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusFailed => write!(f, "bus transaction failed"),
            Self::WrongDevice(id) => write!(f, "unexpected part id 0x{id:02x}"),
            Self::NotPresent => write!(f, "no device present"),
            Self::CrcMismatch => write!(f, "CRC mismatch"),
            Self::OutOfRange => write!(f, "reading out of range"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// PWM duty-cycle write failed.
    PwmWriteFailed,
    /// GPIO set failed.
    GpioWriteFailed,
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PwmWriteFailed => write!(f, "PWM write failed"),
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}
