//! Piezo alarm buzzer on an active-high GPIO.

use embedded_hal::digital::OutputPin;

use crate::error::ActuatorError;

pub struct Buzzer<P> {
    pin: P,
    on: bool,
}

impl<P: OutputPin> Buzzer<P> {
    /// Drives the pin low before returning.
    pub fn new(mut pin: P) -> Result<Self, ActuatorError> {
        pin.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        Ok(Self { pin, on: false })
    }

    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        let result = if on {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        result.map_err(|_| ActuatorError::GpioWriteFailed)?;
        self.on = on;
        Ok(())
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}
