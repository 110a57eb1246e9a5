//! Bellows servo driver.
//!
//! A hobby servo on a 50 Hz PWM channel.  The angle is mapped linearly
//! onto the configured pulse-width range across 0-180°.
//!
//! ## Safety contract
//!
//! The driver only moves the servo when the commanded angle changes; it
//! does not know about breathing cycles.  The rest angle on stop is chosen
//! by the control loop.

use embedded_hal::pwm::SetDutyCycle;

use crate::error::ActuatorError;
use crate::pins::SERVO_FRAME_US;

pub const MAX_ANGLE: u8 = 180;

pub struct ServoDriver<P> {
    pwm: P,
    min_pulse_us: u16,
    max_pulse_us: u16,
    angle: Option<u8>,
}

impl<P: SetDutyCycle> ServoDriver<P> {
    pub fn new(pwm: P, min_pulse_us: u16, max_pulse_us: u16) -> Self {
        Self {
            pwm,
            min_pulse_us,
            max_pulse_us,
            angle: None,
        }
    }

    /// Pulse width for `angle`, clamped to 0-180°.
    pub fn pulse_for_angle(&self, angle: u8) -> u16 {
        let angle = u32::from(angle.min(MAX_ANGLE));
        let span = u32::from(self.max_pulse_us - self.min_pulse_us);
        self.min_pulse_us + (span * angle / u32::from(MAX_ANGLE)) as u16
    }

    pub fn set_angle(&mut self, angle: u8) -> Result<(), ActuatorError> {
        if self.angle == Some(angle) {
            return Ok(());
        }
        let pulse = self.pulse_for_angle(angle);
        self.pwm
            .set_duty_cycle_fraction(pulse, SERVO_FRAME_US)
            .map_err(|_| ActuatorError::PwmWriteFailed)?;
        self.angle = Some(angle);
        Ok(())
    }

    /// Last angle successfully written.
    pub fn angle(&self) -> Option<u8> {
        self.angle
    }
}
