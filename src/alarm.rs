//! Patient alarm monitor.
//!
//! Runs every control tick, after the actuator update.
//!
//! ## Alarm lifecycle
//!
//! 1. Once per `alarm_check_interval_ms` the monitor re-evaluates each
//!    cause against the current [`TelemetrySnapshot`] and updates a bitmask.
//! 2. On the inactive → active edge the buzzer goes high immediately.
//! 3. While active, the buzzer toggles every `buzzer_toggle_interval_ms`.
//!    Toggling is checked every tick, independent of the evaluation gate.
//! 4. On the active → inactive edge the buzzer goes low.
//!
//! Unknown readings never raise an alarm.

use core::fmt;

use log::{info, warn};

use crate::config::SystemConfig;
use crate::scheduler::Cadence;
use crate::telemetry::TelemetrySnapshot;

/// Individual alarm causes, stored as bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AlarmCause {
    LowTemperature = 0b0000_0001,
    LowSpo2 = 0b0000_0010,
}

impl AlarmCause {
    pub const ALL: [Self; 2] = [Self::LowTemperature, Self::LowSpo2];

    pub fn mask(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for AlarmCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowTemperature => write!(f, "low body temperature"),
            Self::LowSpo2 => write!(f, "low SpO2"),
        }
    }
}

/// Result of an alarm evaluation that changed the active flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmTransition {
    Raised(u8),
    Cleared,
}

/// What one tick of the monitor wants done.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlarmTick {
    pub transition: Option<AlarmTransition>,
    /// New buzzer level, if it changed.
    pub buzzer: Option<bool>,
}

pub struct AlarmMonitor {
    temp_threshold_f: f32,
    spo2_threshold: f32,
    causes: u8,
    check: Cadence,
    toggle: Cadence,
    buzzer_on: bool,
}

impl AlarmMonitor {
    pub fn new(config: &SystemConfig, now_ms: u32) -> Self {
        Self {
            temp_threshold_f: config.alarm_temp_threshold_f,
            spo2_threshold: config.alarm_spo2_threshold,
            causes: 0,
            check: Cadence::starting_at(config.alarm_check_interval_ms, now_ms),
            toggle: Cadence::starting_at(config.buzzer_toggle_interval_ms, now_ms),
            buzzer_on: false,
        }
    }

    /// Gate evaluation, then pulse the buzzer.
    pub fn tick(&mut self, now_ms: u32, snap: &TelemetrySnapshot) -> AlarmTick {
        let mut out = AlarmTick::default();

        if self.check.due(now_ms) {
            out.transition = self.evaluate(snap);
            match out.transition {
                Some(AlarmTransition::Raised(_)) => {
                    self.buzzer_on = true;
                    self.toggle.reset(now_ms);
                    out.buzzer = Some(true);
                    return out;
                }
                Some(AlarmTransition::Cleared) => {
                    self.buzzer_on = false;
                    out.buzzer = Some(false);
                    return out;
                }
                None => {}
            }
        }

        if self.is_active() && self.toggle.due(now_ms) {
            self.buzzer_on = !self.buzzer_on;
            out.buzzer = Some(self.buzzer_on);
        }
        out
    }

    /// Re-evaluate every cause.  Returns the edge, if any.
    pub fn evaluate(&mut self, snap: &TelemetrySnapshot) -> Option<AlarmTransition> {
        let was_active = self.is_active();

        self.eval_cause(
            AlarmCause::LowTemperature,
            snap.temperature_f().is_some_and(|f| f < self.temp_threshold_f),
        );
        self.eval_cause(
            AlarmCause::LowSpo2,
            snap.spo2.is_some_and(|s| s < self.spo2_threshold),
        );

        match (was_active, self.is_active()) {
            (false, true) => Some(AlarmTransition::Raised(self.causes)),
            (true, false) => Some(AlarmTransition::Cleared),
            _ => None,
        }
    }

    pub fn causes(&self) -> u8 {
        self.causes
    }

    pub fn is_active(&self) -> bool {
        self.causes != 0
    }

    pub fn has_cause(&self, cause: AlarmCause) -> bool {
        self.causes & cause.mask() != 0
    }

    pub fn buzzer_on(&self) -> bool {
        self.buzzer_on
    }

    fn eval_cause(&mut self, cause: AlarmCause, condition: bool) {
        if condition {
            if self.causes & cause.mask() == 0 {
                warn!("ALARM SET: {cause}");
            }
            self.causes |= cause.mask();
        } else {
            if self.causes & cause.mask() != 0 {
                info!("ALARM CLEARED: {cause}");
            }
            self.causes &= !cause.mask();
        }
    }
}
