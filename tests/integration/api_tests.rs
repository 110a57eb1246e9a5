//! Integration tests for the request boundary: route parsing, dispatch
//! against a live service, and the bridge into the control loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::mock_hw::{MockActuators, RecordingSink};

use ventilator::api::bridge::RequestBridge;
use ventilator::api::{dispatch, parse_request, ApiResponse, CONTENT_CSV, CONTENT_JSON};
use ventilator::app::commands::RequestError;
use ventilator::app::events::AppEvent;
use ventilator::app::service::VentilatorService;
use ventilator::config::SystemConfig;
use ventilator::telemetry::{AcquisitionResult, SharedTelemetry};

struct Boundary {
    service: VentilatorService,
    shared: SharedTelemetry,
    hw: MockActuators,
    sink: RecordingSink,
}

impl Boundary {
    fn new() -> Self {
        let mut b = Self {
            service: VentilatorService::new(&SystemConfig::default(), 0),
            shared: SharedTelemetry::new(),
            hw: MockActuators::new(),
            sink: RecordingSink::new(),
        };
        b.service.start(&mut b.hw, &mut b.sink);
        b
    }

    fn get(&mut self, uri: &str, now_ms: u32) -> ApiResponse {
        match parse_request(uri) {
            Ok(request) => dispatch(&mut self.service, &request, now_ms, &mut self.hw, &mut self.sink),
            Err(e) => ApiResponse::from_error(e),
        }
    }

    fn tick(&mut self, now_ms: u32) {
        self.service
            .tick(now_ms, &self.shared, &mut self.hw, &mut self.sink);
    }
}

fn assert_text(response: &ApiResponse, status: u16, body: &str) {
    assert_eq!(response.status, status, "body: {}", response.body);
    assert_eq!(response.body, body);
}

// ── Routes ───────────────────────────────────────────────────

#[test]
fn control_routes_reply_with_plain_text() {
    let mut b = Boundary::new();
    assert_text(&b.get("/set_zero", 10), 200, "OK: Position Zero Set");
    assert!(!b.service.is_ventilating());
    assert_text(&b.get("/start", 20), 200, "OK: Ventilator Started");
    assert!(b.service.is_ventilating());
    assert_text(&b.get("/set_spo2?val=88", 30), 200, "OK: Manual SpO2 Set");
    assert!(b.service.snapshot().manual_mode);
    assert_text(&b.get("/set_auto", 40), 200, "OK: Auto Mode");
    assert!(!b.service.snapshot().manual_mode);
}

#[test]
fn unknown_route_is_404() {
    let mut b = Boundary::new();
    assert_text(&b.get("/reboot", 0), 404, "Not Found");
}

#[test]
fn status_is_json_with_expected_fields() {
    let mut b = Boundary::new();
    let mut r = AcquisitionResult::EMPTY;
    r.sensor_present = true;
    r.spo2 = Some(93.46);
    r.heart_rate = Some(71.0);
    r.temperature_c = Some(37.0);
    r.waveform.push(500);
    b.shared.publish(&r);
    b.tick(2);

    let response = b.get("/status", 2);
    assert_eq!(response.status, 200);
    assert_eq!(response.content_type, CONTENT_JSON);

    let json: serde_json::Value = serde_json::from_str(&response.body).unwrap();
    assert_eq!(json["sensor_ok"], true);
    assert_eq!(json["manual_mode"], false);
    assert_eq!(json["target_bpm"], 17);
    assert_eq!(json["hr"], 71.0);
    assert_eq!(json["alarm_active"], false);
    assert_eq!(json["beat_detected"], false);
    assert_eq!(json["ppg"], serde_json::json!([500]));
    assert!(json["bpm_override"].is_null());
    let spo2 = json["spo2"].as_f64().unwrap();
    assert!((spo2 - 93.5).abs() < 1e-4);
    let temp_f = json["temp_f"].as_f64().unwrap();
    assert!((temp_f - 98.6).abs() < 1e-4);
}

// ── Parameter validation ─────────────────────────────────────

#[test]
fn set_spo2_requires_numeric_value() {
    let mut b = Boundary::new();
    assert_text(&b.get("/set_spo2", 0), 400, "Bad Request: Missing parameters");
    assert_text(&b.get("/set_spo2?val=abc", 0), 400, "Bad Request: Invalid value");
    assert_text(&b.get("/set_spo2?val=101", 0), 400, "Bad Request: Invalid value");
    assert!(!b.service.snapshot().manual_mode);
    assert_eq!(
        b.sink
            .count(|e| matches!(e, AppEvent::RequestRejected(_))),
        3
    );
}

#[test]
fn set_bpm_checks_parameters_then_credential_then_range() {
    let mut b = Boundary::new();
    assert_text(
        &b.get("/set_bpm?bpm=25", 0),
        400,
        "Bad Request: Missing parameters",
    );
    assert_text(
        &b.get("/set_bpm?password=wrong&bpm=500", 0),
        403,
        "Forbidden: Incorrect password",
    );
    assert_text(
        &b.get("/set_bpm?password=12345678&bpm=500", 0),
        400,
        "Bad Request: BPM must be between 5 and 40",
    );
    assert_text(
        &b.get("/set_bpm?password=12345678&bpm=fast", 0),
        400,
        "Bad Request: BPM must be between 5 and 40",
    );
    assert_eq!(b.service.rate_override(), None);

    assert_text(
        &b.get("/set_bpm?password=12345678&bpm=25", 0),
        200,
        "OK: BPM Set to 25",
    );
    assert_eq!(b.service.snapshot().target_bpm, 25);
    assert_text(&b.get("/clear_bpm", 0), 200, "OK: BPM Override Cleared");
    assert_eq!(b.service.rate_override(), None);
}

#[test]
fn percent_encoded_credential_is_decoded() {
    let mut config = SystemConfig::default();
    config.rate_override_secret = heapless::String::try_from("p@ss word").unwrap();
    let mut service = VentilatorService::new(&config, 0);
    let mut hw = MockActuators::new();
    let mut sink = RecordingSink::new();

    let request = parse_request("/set_bpm?password=p%40ss+word&bpm=30").unwrap();
    let response = dispatch(&mut service, &request, 0, &mut hw, &mut sink);
    assert_text(&response, 200, "OK: BPM Set to 30");
}

#[test]
fn malformed_query_is_rejected() {
    let mut b = Boundary::new();
    assert_text(&b.get("/set_spo2?val=%G0", 0), 400, "Bad Request: Malformed query");
    let long = "a".repeat(200);
    let response = b.get(&format!("/set_bpm?password={long}&bpm=20"), 0);
    assert_eq!(response.status, 400);
    assert_eq!(b.service.rate_override(), None);
}

// ── Export ───────────────────────────────────────────────────

#[test]
fn get_data_validates_duration_and_returns_csv() {
    let mut b = Boundary::new();
    assert_text(
        &b.get("/get_data", 0),
        400,
        "Bad Request: Missing duration parameter",
    );
    assert_text(
        &b.get("/get_data?duration=2d", 0),
        400,
        "Bad Request: Invalid duration",
    );

    let mut r = AcquisitionResult::EMPTY;
    r.sensor_present = true;
    r.spo2 = Some(97.0);
    b.shared.publish(&r);
    for minute in 0..=90u32 {
        b.tick(minute * 60_000);
    }

    let hour = b.get("/get_data?duration=1h", 90 * 60_000);
    assert_eq!(hour.status, 200);
    assert_eq!(hour.content_type, CONTENT_CSV);
    // Header plus points aged 0..=60 minutes.
    assert_eq!(hour.body.lines().count(), 1 + 61);
    assert!(hour.body.contains("60 min ago,97.0,,,15"));
    assert!(!hour.body.contains("61 min ago"));

    let all = b.get("/get_data?duration=all", 90 * 60_000);
    assert_eq!(all.body.lines().count(), 1 + 90);
}

// ── Bridge into the control loop ─────────────────────────────

#[test]
fn requests_are_served_by_the_control_loop_thread() {
    let bridge = Arc::new(RequestBridge::new());
    let stop = Arc::new(AtomicBool::new(false));

    let control = {
        let bridge = Arc::clone(&bridge);
        let stop = Arc::clone(&stop);
        std::thread::spawn(move || {
            let mut b = Boundary::new();
            let mut now = 0u32;
            while !stop.load(Ordering::Relaxed) {
                bridge.serve_pending(|request| {
                    dispatch(&mut b.service, request, now, &mut b.hw, &mut b.sink)
                });
                b.tick(now);
                now += 2;
                std::thread::sleep(Duration::from_millis(1));
            }
            b.service.rate_override()
        })
    };

    let timeout = Duration::from_secs(2);
    let response = bridge.submit(
        parse_request("/set_bpm?password=12345678&bpm=22").unwrap(),
        timeout,
    );
    assert_text(&response, 200, "OK: BPM Set to 22");

    let status = bridge.submit(parse_request("/status").unwrap(), timeout);
    let json: serde_json::Value = serde_json::from_str(&status.body).unwrap();
    assert_eq!(json["bpm_override"], 22);
    assert_eq!(json["target_bpm"], 22);

    stop.store(true, Ordering::Relaxed);
    assert_eq!(control.join().unwrap(), Some(22));
}

#[test]
fn stalled_control_loop_yields_503() {
    let bridge = RequestBridge::new();
    let response = bridge.submit(
        parse_request("/status").unwrap(),
        Duration::from_millis(20),
    );
    assert_eq!(response.status, RequestError::Busy.status());
}
