//! Acquisition worker: the only code that touches the sensor buses.
//!
//! Runs in its own context (core 0) and never blocks: every iteration it
//! polls a handful of [`Cadence`]s, advances the temperature conversion
//! state machine, and publishes a complete [`AcquisitionResult`] to
//! [`SharedTelemetry`] whenever something changed.
//!
//! ```text
//!   Temperature:  Idle ──(1000 ms)──▶ Requested ──(400 ms)──▶ read ──▶ Idle
//!   Oximeter:     update() every iteration
//!                 waveform sample every 20 ms
//!                 SpO2 / HR every 100 ms (only when SpO2 > 0.01)
//!                 absent → re-init every 5000 ms
//! ```

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::app::ports::{ClockPort, OximeterPort, ThermometerPort};
use crate::config::SystemConfig;
use crate::scheduler::Cadence;
use crate::telemetry::{AcquisitionResult, SharedTelemetry};

/// Readings at or beyond these bounds are wiring faults, not patients.
pub const TEMP_MIN_VALID_C: f32 = -100.0;
pub const TEMP_MAX_VALID_C: f32 = 150.0;

/// The estimator reports 0 until it has converged.
const MIN_VALID_SPO2: f32 = 0.01;

/// Temperature conversion state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempState {
    Idle,
    Requested { since_ms: u32 },
}

pub struct AcquisitionWorker<O, T> {
    oximeter: O,
    thermometer: T,
    result: AcquisitionResult,
    temp_state: TempState,
    temp_request: Cadence,
    temp_conversion_ms: u32,
    waveform: Cadence,
    vitals: Cadence,
    retry: Cadence,
    dirty: bool,
}

impl<O: OximeterPort, T: ThermometerPort> AcquisitionWorker<O, T> {
    pub fn new(oximeter: O, thermometer: T, config: &SystemConfig, now_ms: u32) -> Self {
        Self {
            oximeter,
            thermometer,
            result: AcquisitionResult::EMPTY,
            temp_state: TempState::Idle,
            temp_request: Cadence::starting_at(config.temp_request_interval_ms, now_ms),
            temp_conversion_ms: config.temp_conversion_ms,
            waveform: Cadence::starting_at(config.waveform_sample_interval_ms, now_ms),
            vitals: Cadence::starting_at(config.vitals_refresh_interval_ms, now_ms),
            retry: Cadence::starting_at(config.sensor_retry_interval_ms, now_ms),
            dirty: false,
        }
    }

    /// First oximeter init attempt.  On failure the worker keeps running
    /// and retries on the backoff cadence.
    pub fn start(&mut self, now_ms: u32, shared: &SharedTelemetry) {
        self.try_init_oximeter(now_ms);
        shared.publish(&self.result);
    }

    /// One non-blocking iteration.
    pub fn step(&mut self, now_ms: u32, shared: &SharedTelemetry) {
        self.step_temperature(now_ms);

        if self.result.sensor_present {
            self.step_oximeter(now_ms);
        } else if self.retry.due(now_ms) {
            self.try_init_oximeter(now_ms);
        }

        if self.dirty {
            shared.publish(&self.result);
            self.dirty = false;
        }
    }

    /// Worker main loop.  Never returns.
    pub fn run(
        mut self,
        shared: Arc<SharedTelemetry>,
        clock: &impl ClockPort,
        period: Duration,
        mut on_iteration: impl FnMut(),
    ) -> ! {
        self.start(clock.now_ms(), &shared);
        loop {
            self.step(clock.now_ms(), &shared);
            on_iteration();
            std::thread::sleep(period);
        }
    }

    pub fn result(&self) -> &AcquisitionResult {
        &self.result
    }

    pub fn temp_state(&self) -> TempState {
        self.temp_state
    }

    // ── Internal ──────────────────────────────────────────────

    fn step_temperature(&mut self, now_ms: u32) {
        match self.temp_state {
            TempState::Idle => {
                if self.temp_request.due(now_ms) {
                    match self.thermometer.request_conversion() {
                        Ok(()) => self.temp_state = TempState::Requested { since_ms: now_ms },
                        Err(e) => debug!("temperature request failed: {e}"),
                    }
                }
            }
            TempState::Requested { since_ms } => {
                if now_ms.wrapping_sub(since_ms) >= self.temp_conversion_ms {
                    self.temp_state = TempState::Idle;
                    match self.thermometer.read_celsius() {
                        Ok(c) if c > TEMP_MIN_VALID_C && c < TEMP_MAX_VALID_C => {
                            self.result.temperature_c = Some(c);
                            self.dirty = true;
                        }
                        Ok(c) => debug!("temperature {c} °C discarded"),
                        Err(e) => debug!("temperature read failed: {e}"),
                    }
                }
            }
        }
    }

    fn step_oximeter(&mut self, now_ms: u32) {
        if let Err(e) = self.oximeter.update() {
            warn!(
                "Oximeter lost ({e}); retrying every {} ms",
                self.retry.period_ms()
            );
            self.result.sensor_present = false;
            self.result.spo2 = None;
            self.result.heart_rate = None;
            self.retry.reset(now_ms);
            self.dirty = true;
            return;
        }

        if self.oximeter.take_beat() {
            self.result.last_beat_ms = Some(now_ms);
            self.dirty = true;
        }

        if self.waveform.due(now_ms) {
            if let Some(sample) = self.oximeter.poll_raw_waveform() {
                self.result.waveform.push(sample);
                self.dirty = true;
            }
        }

        if self.vitals.due(now_ms) {
            if let Some((spo2, hr)) = self.oximeter.poll_spo2_hr() {
                if spo2 > MIN_VALID_SPO2 {
                    self.result.spo2 = Some(spo2);
                    self.result.heart_rate = (hr > 0.0).then_some(hr);
                    self.dirty = true;
                }
            }
        }
    }

    fn try_init_oximeter(&mut self, now_ms: u32) {
        if self.oximeter.try_init() {
            info!("Oximeter online");
            self.result.sensor_present = true;
            self.waveform.reset(now_ms);
            self.vitals.reset(now_ms);
        } else {
            warn!(
                "Oximeter not found; next attempt in {} ms",
                self.retry.period_ms()
            );
            self.result.sensor_present = false;
            self.retry.reset(now_ms);
        }
        self.dirty = true;
    }
}
