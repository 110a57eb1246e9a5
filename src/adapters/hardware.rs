//! Hardware adapter: bridges the actuator drivers to [`ActuatorPort`].
//!
//! Owned by the control loop.  Driver errors are logged once per failure
//! streak and never propagate into the domain; the next tick simply tries
//! again.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;
use log::{error, info};

use crate::app::ports::ActuatorPort;
use crate::drivers::buzzer::Buzzer;
use crate::drivers::servo::ServoDriver;
use crate::error::ActuatorError;

pub struct HardwareAdapter<S, B> {
    servo: ServoDriver<S>,
    buzzer: Buzzer<B>,
    servo_faulted: bool,
    buzzer_faulted: bool,
}

impl<S: SetDutyCycle, B: OutputPin> HardwareAdapter<S, B> {
    pub fn new(servo: ServoDriver<S>, buzzer: Buzzer<B>) -> Self {
        Self {
            servo,
            buzzer,
            servo_faulted: false,
            buzzer_faulted: false,
        }
    }

    pub fn servo(&self) -> &ServoDriver<S> {
        &self.servo
    }

    pub fn buzzer(&self) -> &Buzzer<B> {
        &self.buzzer
    }
}

/// Log the first failure of a streak and the recovery after it.
fn track(faulted: &mut bool, what: &str, result: Result<(), ActuatorError>) {
    match result {
        Err(e) if !*faulted => {
            error!("{what}: {e}");
            *faulted = true;
        }
        Ok(()) if *faulted => {
            info!("{what}: recovered");
            *faulted = false;
        }
        _ => {}
    }
}

impl<S: SetDutyCycle, B: OutputPin> ActuatorPort for HardwareAdapter<S, B> {
    fn set_position(&mut self, angle: u8) {
        let result = self.servo.set_angle(angle);
        track(&mut self.servo_faulted, "servo", result);
    }

    fn set_buzzer(&mut self, on: bool) {
        let result = self.buzzer.set(on);
        track(&mut self.buzzer_faulted, "buzzer", result);
    }

    fn all_off(&mut self, rest_angle: u8) {
        self.set_buzzer(false);
        self.set_position(rest_angle);
    }
}
