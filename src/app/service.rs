//! Application service: the control loop's hexagonal core.
//!
//! [`VentilatorService`] owns the authoritative [`TelemetrySnapshot`], the
//! breathing cycle, the alarm monitor and the data log.  It runs entirely
//! inside the control-loop context; the only thing it reads from the
//! acquisition side is a copied [`AcquisitionResult`].
//!
//! ```text
//!  SharedTelemetry ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                      │       VentilatorService      │
//!     ActuatorPort ◀── │ rate · breath · alarm · log  │ ◀── AppCommand
//!                      └──────────────────────────────┘
//! ```

use log::{info, warn};

use crate::alarm::{AlarmMonitor, AlarmTransition};
use crate::config::SystemConfig;
use crate::control::breath::{BreathCycle, BreathProfile};
use crate::control::rate::{self, RateSource, DEFAULT_BPM};
use crate::datalog::{DataLog, LogWindow};
use crate::telemetry::{AcquisitionResult, SharedTelemetry, TelemetrySnapshot, BEAT_DISPLAY_WINDOW_MS};

use super::auth::RateOverrideCredential;
use super::commands::{AppCommand, CommandReply, RequestError};
use super::events::AppEvent;
use super::ports::{ActuatorPort, EventSink};
use super::status::StatusReport;

// ───────────────────────────────────────────────────────────────
// VentilatorService
// ───────────────────────────────────────────────────────────────

pub struct VentilatorService {
    snapshot: TelemetrySnapshot,
    cycle: BreathCycle,
    alarm: AlarmMonitor,
    log: DataLog,
    credential: RateOverrideCredential,
    ventilating: bool,
    manual_spo2: f32,
    rate_override: Option<u8>,
    tick_count: u64,
}

impl VentilatorService {
    /// Construct the service.  It boots stopped with the actuator at rest;
    /// only [`AppCommand::Start`] begins the breathing cycle.
    pub fn new(config: &SystemConfig, now_ms: u32) -> Self {
        let profile = BreathProfile {
            min_angle: config.servo_min_angle,
            max_angle: config.servo_max_angle,
            inhale_fraction: config.inhale_fraction,
        };
        let cycle = BreathCycle::new(profile, DEFAULT_BPM);
        Self {
            snapshot: TelemetrySnapshot::new(DEFAULT_BPM, cycle.duration_ms()),
            cycle,
            alarm: AlarmMonitor::new(config, now_ms),
            log: DataLog::new(config.data_log_interval_ms, now_ms),
            credential: RateOverrideCredential::new(&config.rate_override_secret),
            ventilating: false,
            manual_spo2: 0.0,
            rate_override: None,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Park the actuator, silence the buzzer and announce the service.
    /// Ventilation itself stays off until a Start command.
    pub fn start(&mut self, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        hw.all_off(self.cycle.rest_angle());
        sink.emit(&AppEvent::Started {
            target_bpm: self.snapshot.target_bpm,
        });
        info!(
            "VentilatorService ready, at rest, {} bpm ({} ms cycle) on start",
            self.snapshot.target_bpm,
            self.cycle.duration_ms()
        );
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// One control cycle: sync vitals → rate → actuator → alarm → log.
    pub fn tick(
        &mut self,
        now_ms: u32,
        shared: &SharedTelemetry,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        self.tick_count += 1;

        // 1. Vitals from the latest published acquisition result
        self.sync_vitals(&shared.latest(), now_ms);

        // 2. Target rate
        self.resolve_rate(sink);

        // 3. Breathing waveform
        let position = if self.ventilating {
            self.cycle.advance(now_ms)
        } else {
            self.cycle.rest_angle()
        };
        hw.set_position(position);
        self.snapshot.cycle_start_ms = self.cycle.start_ms();
        self.snapshot.cycle_duration_ms = self.cycle.duration_ms();

        // 4. Alarm
        let alarm = self.alarm.tick(now_ms, &self.snapshot);
        match alarm.transition {
            Some(AlarmTransition::Raised(causes)) => sink.emit(&AppEvent::AlarmRaised(causes)),
            Some(AlarmTransition::Cleared) => sink.emit(&AppEvent::AlarmCleared),
            None => {}
        }
        if let Some(level) = alarm.buzzer {
            hw.set_buzzer(level);
        }

        // 5. Data log
        if let Some(point) = self.log.maybe_append(now_ms, &self.snapshot) {
            sink.emit(&AppEvent::Telemetry(point));
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply an operator command.  A rejected command changes nothing.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand<'_>,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandReply, RequestError> {
        let result = self.apply_command(cmd, hw, sink);
        if let Err(e) = result {
            warn!("request rejected: {e}");
            sink.emit(&AppEvent::RequestRejected(e));
        }
        result
    }

    fn apply_command(
        &mut self,
        cmd: AppCommand<'_>,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) -> Result<CommandReply, RequestError> {
        match cmd {
            AppCommand::Stop => {
                self.ventilating = false;
                self.cycle.restart();
                self.snapshot.cycle_start_ms = None;
                hw.set_position(self.cycle.rest_angle());
                sink.emit(&AppEvent::VentilationStopped);
                Ok(CommandReply::Stopped)
            }
            AppCommand::Start => {
                self.ventilating = true;
                self.cycle.restart();
                sink.emit(&AppEvent::VentilationStarted);
                Ok(CommandReply::Started)
            }
            AppCommand::SetManualSpo2(value) => {
                if !value.is_finite() || !(0.0..=100.0).contains(&value) {
                    return Err(RequestError::InvalidValue);
                }
                self.manual_spo2 = value;
                self.set_manual_mode(true, sink);
                Ok(CommandReply::ManualSpo2Set)
            }
            AppCommand::SetAuto => {
                self.set_manual_mode(false, sink);
                self.rate_override = None;
                Ok(CommandReply::AutoMode)
            }
            AppCommand::SetRateOverride { credential, bpm } => {
                if !self.credential.verify(credential) {
                    return Err(RequestError::Unauthorized);
                }
                let bpm = rate::validate_override(bpm).ok_or(RequestError::RateOutOfRange)?;
                self.rate_override = Some(bpm);
                self.resolve_rate(sink);
                Ok(CommandReply::RateOverrideSet(bpm))
            }
            AppCommand::ClearRateOverride => {
                self.rate_override = None;
                self.resolve_rate(sink);
                Ok(CommandReply::RateOverrideCleared)
            }
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> StatusReport {
        StatusReport::from_snapshot(
            &self.snapshot,
            self.ventilating,
            self.rate_override,
            self.alarm.is_active(),
        )
    }

    pub fn export_log(&self, window: LogWindow, now_ms: u32) -> String {
        self.log.export_csv(window, now_ms)
    }

    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    pub fn data_log(&self) -> &DataLog {
        &self.log
    }

    pub fn is_ventilating(&self) -> bool {
        self.ventilating
    }

    pub fn rate_override(&self) -> Option<u8> {
        self.rate_override
    }

    pub fn alarm_active(&self) -> bool {
        self.alarm.is_active()
    }

    /// Total control ticks executed since startup.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // ── Internal ──────────────────────────────────────────────

    fn sync_vitals(&mut self, acquired: &AcquisitionResult, now_ms: u32) {
        let snap = &mut self.snapshot;
        if snap.manual_mode {
            // Operator-supplied vitals; HR keeps its last known value.
            snap.spo2 = Some(self.manual_spo2);
            snap.sensor_present = true;
        } else {
            snap.spo2 = acquired.spo2;
            snap.heart_rate = acquired.heart_rate;
            snap.sensor_present = acquired.sensor_present;
        }
        snap.temperature_c = acquired.temperature_c;
        snap.waveform = acquired.waveform;
        snap.last_beat_ms = acquired.last_beat_ms;
        snap.beat_detected = acquired
            .last_beat_ms
            .is_some_and(|t| now_ms.wrapping_sub(t) < BEAT_DISPLAY_WINDOW_MS);
    }

    /// Override, else the SpO2 rule, else keep the current rate.
    fn resolve_rate(&mut self, sink: &mut impl EventSink) {
        let (target, source) = match (self.rate_override, self.snapshot.spo2) {
            (Some(bpm), _) => (bpm, RateSource::Override),
            (None, Some(spo2)) => {
                let source = if self.snapshot.manual_mode {
                    RateSource::Manual
                } else {
                    RateSource::Sensor
                };
                (rate::target_bpm_for_spo2(spo2), source)
            }
            (None, None) => return,
        };

        let from = self.snapshot.target_bpm;
        if target != from {
            self.snapshot.target_bpm = target;
            self.cycle.set_rate(target);
            self.snapshot.cycle_duration_ms = self.cycle.duration_ms();
            sink.emit(&AppEvent::RateChanged {
                from,
                to: target,
                source,
            });
        }
    }

    fn set_manual_mode(&mut self, manual: bool, sink: &mut impl EventSink) {
        if self.snapshot.manual_mode != manual {
            self.snapshot.manual_mode = manual;
            sink.emit(&AppEvent::ModeChanged { manual });
        }
    }
}
