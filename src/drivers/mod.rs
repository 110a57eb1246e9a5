//! Actuator drivers and task/runtime helpers.

pub mod buzzer;
pub mod servo;
pub mod task_pin;
pub mod watchdog;
