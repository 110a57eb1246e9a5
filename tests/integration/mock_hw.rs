//! Mock adapters for integration tests.
//!
//! Records every actuator call and every emitted event so tests can assert
//! on the full history without touching real GPIO/PWM/I2C registers.

use std::cell::{Cell, RefCell, RefMut};
use std::collections::VecDeque;
use std::rc::Rc;

use ventilator::app::events::AppEvent;
use ventilator::app::ports::{
    ActuatorPort, ClockPort, EventSink, OximeterPort, ThermometerPort,
};
use ventilator::error::SensorError;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorCall {
    Position(u8),
    Buzzer(bool),
    AllOff { rest: u8 },
}

// ── MockActuators ─────────────────────────────────────────────

#[derive(Default)]
pub struct MockActuators {
    pub calls: Vec<ActuatorCall>,
}

#[allow(dead_code)]
impl MockActuators {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_position(&self) -> Option<u8> {
        self.calls.iter().rev().find_map(|c| match c {
            ActuatorCall::Position(a) => Some(*a),
            ActuatorCall::AllOff { rest } => Some(*rest),
            ActuatorCall::Buzzer(_) => None,
        })
    }

    pub fn positions(&self) -> Vec<u8> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                ActuatorCall::Position(a) => Some(*a),
                _ => None,
            })
            .collect()
    }

    pub fn buzzer_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                ActuatorCall::Buzzer(on) => Some(*on),
                ActuatorCall::AllOff { .. } => Some(false),
                ActuatorCall::Position(_) => None,
            })
            .unwrap_or(false)
    }

    pub fn buzzer_writes(&self) -> usize {
        self.calls
            .iter()
            .filter(|c| matches!(c, ActuatorCall::Buzzer(_)))
            .count()
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }
}

impl ActuatorPort for MockActuators {
    fn set_position(&mut self, angle: u8) {
        self.calls.push(ActuatorCall::Position(angle));
    }

    fn set_buzzer(&mut self, on: bool) {
        self.calls.push(ActuatorCall::Buzzer(on));
    }

    fn all_off(&mut self, rest_angle: u8) {
        self.calls.push(ActuatorCall::AllOff { rest: rest_angle });
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, event: &AppEvent) -> bool {
        self.events.contains(event)
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── ScriptedOximeter ──────────────────────────────────────────

/// What the scripted oximeter will report next.
#[derive(Default)]
pub struct OximeterScript {
    pub present: bool,
    pub fail_updates: bool,
    pub reading: Option<(f32, f32)>,
    pub raw: Option<u16>,
    pub beats: VecDeque<bool>,
    pub init_calls: u32,
}

/// Oximeter whose readings are set by the test.  Clones share one script,
/// so a test can keep a handle after moving the device into the worker.
#[derive(Default, Clone)]
pub struct ScriptedOximeter(Rc<RefCell<OximeterScript>>);

#[allow(dead_code)]
impl ScriptedOximeter {
    pub fn present(spo2: f32, hr: f32) -> Self {
        Self(Rc::new(RefCell::new(OximeterScript {
            present: true,
            reading: Some((spo2, hr)),
            raw: Some(1000),
            ..OximeterScript::default()
        })))
    }

    pub fn absent() -> Self {
        Self::default()
    }

    pub fn script(&self) -> RefMut<'_, OximeterScript> {
        self.0.borrow_mut()
    }
}

impl OximeterPort for ScriptedOximeter {
    fn try_init(&mut self) -> bool {
        let mut s = self.script();
        s.init_calls += 1;
        s.present
    }

    fn update(&mut self) -> Result<(), SensorError> {
        if self.script().fail_updates {
            Err(SensorError::BusFailed)
        } else {
            Ok(())
        }
    }

    fn poll_spo2_hr(&mut self) -> Option<(f32, f32)> {
        self.script().reading
    }

    fn poll_raw_waveform(&mut self) -> Option<u16> {
        self.script().raw
    }

    fn take_beat(&mut self) -> bool {
        self.script().beats.pop_front().unwrap_or(false)
    }
}

// ── ScriptedThermometer ───────────────────────────────────────

#[derive(Default)]
pub struct ScriptedThermometer {
    pub celsius: Option<f32>,
    pub requests: u32,
}

#[allow(dead_code)]
impl ScriptedThermometer {
    pub fn reading(celsius: f32) -> Self {
        Self {
            celsius: Some(celsius),
            requests: 0,
        }
    }

    pub fn disconnected() -> Self {
        Self::default()
    }
}

impl ThermometerPort for ScriptedThermometer {
    fn request_conversion(&mut self) -> Result<(), SensorError> {
        self.requests += 1;
        match self.celsius {
            Some(_) => Ok(()),
            None => Err(SensorError::NotPresent),
        }
    }

    fn read_celsius(&mut self) -> Result<f32, SensorError> {
        self.celsius.ok_or(SensorError::NotPresent)
    }
}

// ── ManualClock ───────────────────────────────────────────────

#[derive(Default)]
pub struct ManualClock {
    now: Cell<u32>,
}

#[allow(dead_code)]
impl ManualClock {
    pub fn at(now_ms: u32) -> Self {
        Self {
            now: Cell::new(now_ms),
        }
    }

    pub fn advance(&self, ms: u32) -> u32 {
        let next = self.now.get().wrapping_add(ms);
        self.now.set(next);
        next
    }
}

impl ClockPort for ManualClock {
    fn now_ms(&self) -> u32 {
        self.now.get()
    }
}
