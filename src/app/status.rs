//! Status report served at `/status`.

use serde::Serialize;

use crate::telemetry::{TelemetrySnapshot, WAVEFORM_LEN};

/// JSON body of the status endpoint.  Unknown values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub sensor_ok: bool,
    pub manual_mode: bool,
    pub ventilating: bool,
    pub target_bpm: u8,
    pub bpm_override: Option<u8>,
    pub spo2: Option<f32>,
    pub hr: Option<f32>,
    pub temp_c: Option<f32>,
    pub temp_f: Option<f32>,
    pub alarm_active: bool,
    pub beat_detected: bool,
    pub ppg: heapless::Vec<u16, WAVEFORM_LEN>,
}

impl StatusReport {
    pub fn from_snapshot(
        snap: &TelemetrySnapshot,
        ventilating: bool,
        bpm_override: Option<u8>,
        alarm_active: bool,
    ) -> Self {
        Self {
            sensor_ok: snap.sensor_present,
            manual_mode: snap.manual_mode,
            ventilating,
            target_bpm: snap.target_bpm,
            bpm_override,
            spo2: snap.spo2.map(round1),
            hr: snap.heart_rate.map(round1),
            temp_c: snap.temperature_c.map(round1),
            temp_f: snap.temperature_f().map(round1),
            alarm_active,
            beat_detected: snap.beat_detected,
            ppg: snap.waveform.iter().collect(),
        }
    }

    pub fn to_json(&self) -> String {
        // Plain struct of numbers and bools; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }
}

fn round1(v: f32) -> f32 {
    (v * 10.0).round() / 10.0
}
