//! Integration tests for the acquisition worker → shared store → control
//! loop path.
//!
//! The worker and the service run interleaved on one thread against a
//! manual clock; the only thing they share is the telemetry store.

use super::mock_hw::{ManualClock, MockActuators, RecordingSink, ScriptedOximeter, ScriptedThermometer};

use ventilator::acquisition::AcquisitionWorker;
use ventilator::app::ports::ClockPort;
use ventilator::app::service::VentilatorService;
use ventilator::config::SystemConfig;
use ventilator::telemetry::{SharedTelemetry, WAVEFORM_LEN};

struct Loop {
    clock: ManualClock,
    shared: SharedTelemetry,
    worker: AcquisitionWorker<ScriptedOximeter, ScriptedThermometer>,
    service: VentilatorService,
    hw: MockActuators,
    sink: RecordingSink,
}

impl Loop {
    fn new(oximeter: ScriptedOximeter, thermometer: ScriptedThermometer) -> Self {
        let config = SystemConfig::default();
        let clock = ManualClock::at(0);
        let shared = SharedTelemetry::new();
        let mut worker = AcquisitionWorker::new(oximeter, thermometer, &config, clock.now_ms());
        worker.start(clock.now_ms(), &shared);
        let mut hw = MockActuators::new();
        let mut sink = RecordingSink::new();
        let mut service = VentilatorService::new(&config, clock.now_ms());
        service.start(&mut hw, &mut sink);
        Self {
            clock,
            shared,
            worker,
            service,
            hw,
            sink,
        }
    }

    /// Advance both contexts in 10 ms steps for `ms` milliseconds.
    fn run_for(&mut self, ms: u32) {
        for _ in 0..ms / 10 {
            let now = self.clock.advance(10);
            self.worker.step(now, &self.shared);
            self.service
                .tick(now, &self.shared, &mut self.hw, &mut self.sink);
        }
    }
}

#[test]
fn sensor_readings_reach_the_control_loop() {
    let mut lp = Loop::new(
        ScriptedOximeter::present(85.0, 70.0),
        ScriptedThermometer::reading(36.6),
    );
    lp.run_for(200);

    let status = lp.service.status();
    assert!(status.sensor_ok);
    assert_eq!(status.spo2, Some(85.0));
    assert_eq!(status.hr, Some(70.0));
    assert_eq!(status.target_bpm, 20);
    assert_eq!(status.temp_c, None, "first conversion not finished yet");

    lp.run_for(1300);
    let status = lp.service.status();
    assert_eq!(status.temp_c, Some(36.6));
    assert_eq!(status.temp_f, Some(97.9));
}

#[test]
fn absent_sensor_reports_not_ok_and_retries() {
    let oximeter = ScriptedOximeter::absent();
    let handle = oximeter.clone();
    let mut lp = Loop::new(oximeter, ScriptedThermometer::reading(36.6));

    lp.run_for(1000);
    let status = lp.service.status();
    assert!(!status.sensor_ok);
    assert_eq!(status.spo2, None);
    assert_eq!(status.target_bpm, 15);
    assert_eq!(handle.script().init_calls, 1);

    lp.run_for(4000);
    assert_eq!(handle.script().init_calls, 2);

    {
        let mut s = handle.script();
        s.present = true;
        s.reading = Some((97.0, 64.0));
    }
    lp.run_for(5100);
    assert_eq!(handle.script().init_calls, 3);
    assert!(lp.service.status().sensor_ok);
    assert_eq!(lp.service.status().spo2, Some(97.0));
}

#[test]
fn sensor_loss_clears_vitals_but_keeps_rate() {
    let oximeter = ScriptedOximeter::present(75.0, 90.0);
    let handle = oximeter.clone();
    let mut lp = Loop::new(oximeter, ScriptedThermometer::reading(36.6));

    lp.run_for(200);
    assert_eq!(lp.service.status().target_bpm, 20);

    handle.script().fail_updates = true;
    lp.run_for(20);
    let status = lp.service.status();
    assert!(!status.sensor_ok);
    assert_eq!(status.spo2, None);
    assert_eq!(status.hr, None);
    assert_eq!(status.target_bpm, 20);

    // Re-init happens on the backoff, not on the next iteration.
    let calls = handle.script().init_calls;
    lp.run_for(1000);
    assert_eq!(handle.script().init_calls, calls);
}

#[test]
fn unconverged_estimator_stays_unknown() {
    let mut lp = Loop::new(
        ScriptedOximeter::present(0.0, 0.0),
        ScriptedThermometer::disconnected(),
    );
    lp.run_for(3000);
    let status = lp.service.status();
    assert!(status.sensor_ok);
    assert_eq!(status.spo2, None);
    assert_eq!(status.target_bpm, 15);
    assert!(!status.alarm_active, "unknown readings never alarm");
}

#[test]
fn heartbeat_is_visible_to_status_polls() {
    let oximeter = ScriptedOximeter::present(97.0, 60.0);
    let handle = oximeter.clone();
    let mut lp = Loop::new(oximeter, ScriptedThermometer::reading(36.6));
    lp.run_for(100);
    assert!(!lp.service.status().beat_detected);

    handle.script().beats.push_back(true);
    lp.run_for(10);
    assert!(lp.service.status().beat_detected);

    lp.run_for(300);
    assert!(!lp.service.status().beat_detected);
}

#[test]
fn waveform_keeps_most_recent_samples() {
    let mut lp = Loop::new(
        ScriptedOximeter::present(97.0, 60.0),
        ScriptedThermometer::reading(36.6),
    );
    lp.run_for(500);
    let partial = lp.service.status().ppg.len();
    assert!(partial > 0 && partial < WAVEFORM_LEN);

    lp.run_for(2000);
    assert_eq!(lp.service.status().ppg.len(), WAVEFORM_LEN);
}
