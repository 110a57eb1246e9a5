//! Integration tests for the shared store → VentilatorService → actuators
//! pipeline.
//!
//! These run on the host (x86_64) and drive the control loop tick by tick
//! with a manual timeline, publishing acquisition results the way the
//! worker would.

use super::mock_hw::{ActuatorCall, MockActuators, RecordingSink};

use ventilator::alarm::AlarmCause;
use ventilator::app::commands::{AppCommand, CommandReply, RequestError};
use ventilator::app::events::AppEvent;
use ventilator::app::service::VentilatorService;
use ventilator::config::SystemConfig;
use ventilator::control::rate::RateSource;
use ventilator::datalog::LogWindow;
use ventilator::telemetry::{AcquisitionResult, SharedTelemetry};

const SECRET: &str = "12345678";

struct Rig {
    service: VentilatorService,
    shared: SharedTelemetry,
    hw: MockActuators,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        let config = SystemConfig::default();
        let mut rig = Self {
            service: VentilatorService::new(&config, 0),
            shared: SharedTelemetry::new(),
            hw: MockActuators::new(),
            sink: RecordingSink::new(),
        };
        rig.service.start(&mut rig.hw, &mut rig.sink);
        rig
    }

    fn publish(&self, spo2: Option<f32>, temperature_c: Option<f32>) {
        let mut r = AcquisitionResult::EMPTY;
        r.sensor_present = true;
        r.spo2 = spo2;
        r.heart_rate = spo2.map(|_| 72.0);
        r.temperature_c = temperature_c;
        self.shared.publish(&r);
    }

    fn tick(&mut self, now_ms: u32) {
        self.service
            .tick(now_ms, &self.shared, &mut self.hw, &mut self.sink);
    }

    /// Tick every `step_ms` from `from_ms` up to and including `to_ms`.
    fn run(&mut self, from_ms: u32, to_ms: u32, step_ms: u32) {
        let mut t = from_ms;
        while t <= to_ms {
            self.tick(t);
            t += step_ms;
        }
    }

    fn command(&mut self, cmd: AppCommand<'_>) -> Result<CommandReply, RequestError> {
        self.service.handle_command(cmd, &mut self.hw, &mut self.sink)
    }

    fn target_bpm(&self) -> u8 {
        self.service.snapshot().target_bpm
    }
}

// ── Startup ──────────────────────────────────────────────────

#[test]
fn start_parks_actuator_and_uses_default_rate() {
    let rig = Rig::new();
    assert_eq!(rig.hw.calls, vec![ActuatorCall::AllOff { rest: 0 }]);
    assert!(rig.sink.contains(&AppEvent::Started { target_bpm: 15 }));
    assert_eq!(rig.target_bpm(), 15);
    assert_eq!(rig.service.snapshot().cycle_duration_ms, 4000);
    assert!(!rig.service.is_ventilating());
}

#[test]
fn boots_stopped_and_holds_rest_until_start() {
    let mut rig = Rig::new();
    rig.publish(Some(75.0), Some(37.0));
    rig.run(0, 8000, 50);
    assert!(rig.hw.positions().iter().all(|&p| p == 0));
    assert!(!rig.service.status().ventilating);
    assert_eq!(rig.service.snapshot().cycle_start_ms, None);
    // The rate rule still tracks vitals while idle.
    assert_eq!(rig.target_bpm(), 20);

    assert_eq!(rig.command(AppCommand::Start), Ok(CommandReply::Started));
    rig.hw.clear();
    rig.run(8050, 11_000, 50);
    assert_eq!(rig.hw.positions().iter().max(), Some(&90));
    assert_eq!(rig.service.snapshot().cycle_start_ms, Some(8050));
}

#[test]
fn no_valid_spo2_keeps_previous_rate() {
    let mut rig = Rig::new();
    rig.publish(None, None);
    rig.tick(2);
    assert_eq!(rig.target_bpm(), 15);

    rig.publish(Some(75.0), None);
    rig.tick(4);
    assert_eq!(rig.target_bpm(), 20);

    rig.publish(None, None);
    rig.tick(6);
    assert_eq!(rig.target_bpm(), 20, "unknown SpO2 must not reset the rate");
}

// ── Rate rule + alarm, end to end ────────────────────────────

#[test]
fn hypoxic_reading_raises_rate_and_alarm_then_recovers() {
    let mut rig = Rig::new();
    rig.publish(Some(75.0), Some(36.8));

    rig.tick(2);
    assert_eq!(rig.target_bpm(), 20);
    assert_eq!(rig.service.snapshot().cycle_duration_ms, 3000);
    assert!(rig.sink.contains(&AppEvent::RateChanged {
        from: 15,
        to: 20,
        source: RateSource::Sensor,
    }));

    // Alarm evaluation is gated to once per second.
    rig.tick(500);
    assert!(!rig.service.alarm_active());
    assert!(!rig.hw.buzzer_on());

    rig.tick(1000);
    assert!(rig.service.alarm_active());
    assert!(rig.sink.contains(&AppEvent::AlarmRaised(AlarmCause::LowSpo2.mask())));
    assert!(rig.hw.buzzer_on());

    rig.tick(1500);
    assert!(!rig.hw.buzzer_on(), "buzzer pulses while the alarm is active");

    rig.publish(Some(98.0), Some(36.8));
    rig.tick(1600);
    assert_eq!(rig.target_bpm(), 15);
    assert!(rig.service.alarm_active(), "alarm clears only on evaluation");

    rig.tick(2000);
    assert!(!rig.service.alarm_active());
    assert!(rig.sink.contains(&AppEvent::AlarmCleared));
    assert!(!rig.hw.buzzer_on());
}

#[test]
fn mild_desaturation_raises_rate_without_alarm() {
    let mut rig = Rig::new();
    rig.publish(Some(85.0), Some(36.8));
    rig.run(0, 3000, 100);
    assert_eq!(rig.target_bpm(), 20);
    assert!(!rig.service.alarm_active());
    assert_eq!(rig.hw.buzzer_writes(), 0);
}

#[test]
fn borderline_spo2_selects_middle_rate() {
    let mut rig = Rig::new();
    rig.publish(Some(92.0), None);
    rig.tick(2);
    assert_eq!(rig.target_bpm(), 17);
    assert_eq!(rig.service.snapshot().cycle_duration_ms, 60_000 / 17);
}

#[test]
fn low_temperature_alarms_on_fahrenheit_threshold() {
    let mut rig = Rig::new();
    // 25 °C = 77 °F, below the 80 °F threshold.
    rig.publish(Some(98.0), Some(25.0));
    rig.run(0, 1000, 100);
    assert!(rig.sink.contains(&AppEvent::AlarmRaised(
        AlarmCause::LowTemperature.mask()
    )));
}

#[test]
fn unknown_vitals_never_alarm() {
    let mut rig = Rig::new();
    rig.publish(None, None);
    rig.run(0, 5000, 250);
    assert!(!rig.service.alarm_active());
    assert_eq!(rig.hw.buzzer_writes(), 0);
}

// ── Rate override ────────────────────────────────────────────

#[test]
fn override_wins_over_rule_until_cleared() {
    let mut rig = Rig::new();
    rig.publish(Some(98.0), None);
    rig.tick(2);
    assert_eq!(rig.target_bpm(), 15);

    let reply = rig.command(AppCommand::SetRateOverride {
        credential: SECRET,
        bpm: 25.0,
    });
    assert_eq!(reply, Ok(CommandReply::RateOverrideSet(25)));
    assert_eq!(reply.unwrap().to_string(), "OK: BPM Set to 25");
    assert_eq!(rig.target_bpm(), 25);
    assert_eq!(rig.service.snapshot().cycle_duration_ms, 2400);

    rig.publish(Some(75.0), None);
    rig.tick(4);
    assert_eq!(rig.target_bpm(), 25, "override ignores the SpO2 rule");

    assert_eq!(
        rig.command(AppCommand::ClearRateOverride),
        Ok(CommandReply::RateOverrideCleared)
    );
    assert_eq!(rig.service.rate_override(), None);
    assert_eq!(rig.target_bpm(), 20);
}

#[test]
fn wrong_credential_is_rejected_before_range_check() {
    let mut rig = Rig::new();
    let result = rig.command(AppCommand::SetRateOverride {
        credential: "guess",
        bpm: 100.0,
    });
    assert_eq!(result, Err(RequestError::Unauthorized));
    assert_eq!(rig.service.rate_override(), None);
    assert_eq!(rig.target_bpm(), 15);
    assert!(rig
        .sink
        .contains(&AppEvent::RequestRejected(RequestError::Unauthorized)));
}

#[test]
fn override_outside_range_or_fractional_is_rejected() {
    let mut rig = Rig::new();
    for bpm in [4.0, 41.0, 25.5, f32::NAN] {
        let result = rig.command(AppCommand::SetRateOverride {
            credential: SECRET,
            bpm,
        });
        assert_eq!(result, Err(RequestError::RateOutOfRange), "bpm {bpm}");
    }
    assert_eq!(rig.service.rate_override(), None);

    for bpm in [5.0, 40.0] {
        assert!(rig
            .command(AppCommand::SetRateOverride {
                credential: SECRET,
                bpm,
            })
            .is_ok());
    }
    assert_eq!(rig.service.rate_override(), Some(40));
}

#[test]
fn stop_and_start_keep_override() {
    let mut rig = Rig::new();
    rig.command(AppCommand::SetRateOverride {
        credential: SECRET,
        bpm: 30.0,
    })
    .unwrap();
    rig.command(AppCommand::Stop).unwrap();
    rig.command(AppCommand::Start).unwrap();
    assert_eq!(rig.service.rate_override(), Some(30));
}

// ── Manual mode ──────────────────────────────────────────────

#[test]
fn manual_spo2_drives_rate_and_reports_sensor_ok() {
    let mut rig = Rig::new();
    // Sensor absent: nothing published yet.
    assert_eq!(
        rig.command(AppCommand::SetManualSpo2(85.0)),
        Ok(CommandReply::ManualSpo2Set)
    );
    assert!(rig.sink.contains(&AppEvent::ModeChanged { manual: true }));

    rig.tick(2);
    assert_eq!(rig.target_bpm(), 20);
    assert!(rig.sink.contains(&AppEvent::RateChanged {
        from: 15,
        to: 20,
        source: RateSource::Manual,
    }));

    let status = rig.service.status();
    assert!(status.manual_mode);
    assert!(status.sensor_ok);
    assert_eq!(status.spo2, Some(85.0));
}

#[test]
fn manual_mode_ignores_sensor_spo2() {
    let mut rig = Rig::new();
    rig.command(AppCommand::SetManualSpo2(97.0)).unwrap();
    rig.publish(Some(70.0), None);
    rig.tick(2);
    assert_eq!(rig.service.snapshot().spo2, Some(97.0));
    assert_eq!(rig.target_bpm(), 15);
}

#[test]
fn invalid_manual_spo2_leaves_mode_unchanged() {
    let mut rig = Rig::new();
    for value in [150.0, -1.0, f32::NAN, f32::INFINITY] {
        assert_eq!(
            rig.command(AppCommand::SetManualSpo2(value)),
            Err(RequestError::InvalidValue)
        );
    }
    assert!(!rig.service.snapshot().manual_mode);
}

#[test]
fn set_auto_returns_to_sensor_and_drops_override() {
    let mut rig = Rig::new();
    rig.command(AppCommand::SetManualSpo2(85.0)).unwrap();
    rig.command(AppCommand::SetRateOverride {
        credential: SECRET,
        bpm: 12.0,
    })
    .unwrap();

    assert_eq!(rig.command(AppCommand::SetAuto), Ok(CommandReply::AutoMode));
    assert!(!rig.service.snapshot().manual_mode);
    assert_eq!(rig.service.rate_override(), None);

    rig.publish(Some(98.0), None);
    rig.tick(2);
    assert_eq!(rig.target_bpm(), 15);
}

// ── Breathing waveform ───────────────────────────────────────

#[test]
fn ventilation_sweeps_full_stroke_each_cycle() {
    let mut rig = Rig::new();
    rig.command(AppCommand::Start).unwrap();
    rig.hw.clear();
    rig.run(0, 4000, 50);
    let positions = rig.hw.positions();
    assert_eq!(positions.iter().max(), Some(&90));
    assert_eq!(positions.iter().min(), Some(&0));
    assert!(positions.iter().all(|&p| p <= 90));
}

#[test]
fn stop_holds_rest_until_start() {
    let mut rig = Rig::new();
    rig.command(AppCommand::Start).unwrap();
    rig.run(0, 1000, 100);
    assert!(rig.hw.last_position().unwrap_or(0) > 0);

    assert_eq!(rig.command(AppCommand::Stop), Ok(CommandReply::Stopped));
    assert_eq!(rig.hw.last_position(), Some(0));
    rig.hw.clear();
    rig.run(1100, 3000, 100);
    assert!(rig.hw.positions().iter().all(|&p| p == 0));
    assert!(!rig.service.status().ventilating);
    assert_eq!(rig.service.snapshot().cycle_start_ms, None);

    assert_eq!(rig.command(AppCommand::Start), Ok(CommandReply::Started));
    rig.tick(3100);
    assert_eq!(rig.hw.last_position(), Some(0), "fresh cycle begins at rest");
    assert_eq!(rig.service.snapshot().cycle_start_ms, Some(3100));
    rig.tick(3900);
    assert!(rig.hw.last_position().unwrap_or(0) > 0);
}

// ── Beat reporting ───────────────────────────────────────────

#[test]
fn beat_reported_for_a_short_window() {
    let mut rig = Rig::new();
    let mut r = AcquisitionResult::EMPTY;
    r.sensor_present = true;
    r.last_beat_ms = Some(1000);
    rig.shared.publish(&r);

    rig.tick(1100);
    assert!(rig.service.status().beat_detected);
    rig.tick(1300);
    assert!(!rig.service.status().beat_detected);
}

// ── Data log ─────────────────────────────────────────────────

#[test]
fn data_log_appends_once_a_minute() {
    let mut rig = Rig::new();
    rig.publish(Some(96.0), Some(37.0));
    rig.run(0, 59_999, 1000);
    assert!(rig.service.data_log().is_empty());

    rig.tick(60_000);
    assert_eq!(rig.service.data_log().len(), 1);
    assert_eq!(
        rig.sink
            .count(|e| matches!(e, AppEvent::Telemetry(_))),
        1
    );

    rig.run(61_000, 180_000, 1000);
    assert_eq!(rig.service.data_log().len(), 3);

    let csv = rig.service.export_log(LogWindow::OneHour, 180_000);
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("Timestamp,SpO2 (%),Heart Rate (BPM),Temperature (°F),Ventilation Rate (BPM)")
    );
    assert_eq!(lines.next(), Some("2 min ago,96.0,72.0,98.6,15"));
    assert_eq!(lines.count(), 2);
}
