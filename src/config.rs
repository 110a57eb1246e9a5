//! System configuration parameters
//!
//! All tunable parameters for the ventilator controller.
//! Values are loaded from NVS at boot and fall back to [`SystemConfig::default`].

use serde::{Deserialize, Serialize};

use log::warn;

use crate::app::ports::{ConfigError, ConfigPort};

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Actuator ---
    /// Servo angle at the bottom of the stroke (fully exhaled).
    pub servo_min_angle: u8,
    /// Servo angle at the top of the stroke (fully inhaled).
    pub servo_max_angle: u8,
    /// Pulse width commanding 0 degrees (microseconds).
    pub servo_min_pulse_us: u16,
    /// Pulse width commanding 180 degrees (microseconds).
    pub servo_max_pulse_us: u16,
    /// Share of each cycle spent inhaling (0-1).
    pub inhale_fraction: f32,

    // --- Alarm ---
    /// Body temperature (°F) below which the alarm sounds.
    pub alarm_temp_threshold_f: f32,
    /// SpO2 (%) below which the alarm sounds.
    pub alarm_spo2_threshold: f32,

    // --- Acquisition timing ---
    /// Raw waveform sampling interval (milliseconds).
    pub waveform_sample_interval_ms: u32,
    /// SpO2 / HR re-derivation interval (milliseconds).
    pub vitals_refresh_interval_ms: u32,
    /// Interval between temperature conversion requests (milliseconds).
    pub temp_request_interval_ms: u32,
    /// Worst-case temperature conversion latency (milliseconds).
    pub temp_conversion_ms: u32,
    /// Back-off between oximeter init attempts (milliseconds).
    pub sensor_retry_interval_ms: u32,
    /// Sleep between acquisition worker iterations (milliseconds).
    pub worker_period_ms: u32,

    // --- Control timing ---
    /// Sleep between control loop iterations (milliseconds).
    pub control_loop_period_ms: u32,
    /// Alarm evaluation interval (milliseconds).
    pub alarm_check_interval_ms: u32,
    /// Buzzer toggle interval while the alarm is active (milliseconds).
    pub buzzer_toggle_interval_ms: u32,
    /// Data log append interval (milliseconds).
    pub data_log_interval_ms: u32,

    // --- Operator ---
    /// Shared secret required to override the ventilation rate.
    pub rate_override_secret: heapless::String<32>,

    // --- Network ---
    /// Soft-AP SSID.
    pub ap_ssid: heapless::String<32>,
    /// Soft-AP WPA2 passphrase (8-64 bytes).
    pub ap_password: heapless::String<64>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Actuator
            servo_min_angle: 0,
            servo_max_angle: 90,
            servo_min_pulse_us: 500,
            servo_max_pulse_us: 2400,
            inhale_fraction: 0.4,

            // Alarm
            alarm_temp_threshold_f: 80.0,
            alarm_spo2_threshold: 80.0,

            // Acquisition
            waveform_sample_interval_ms: 20,  // ~50 Hz
            vitals_refresh_interval_ms: 100,  // 10 Hz
            temp_request_interval_ms: 1000,
            temp_conversion_ms: 400, // 11-bit DS18B20 worst case is 375 ms
            sensor_retry_interval_ms: 5000,
            worker_period_ms: 2,

            // Control
            control_loop_period_ms: 2,
            alarm_check_interval_ms: 1000,
            buzzer_toggle_interval_ms: 500,
            data_log_interval_ms: 60_000, // 1/min

            // Operator
            rate_override_secret: fixed("12345678"),

            // Network
            ap_ssid: fixed("DIY_Ventilator"),
            ap_password: fixed("12345678"),
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.servo_min_angle >= self.servo_max_angle {
            return Err(ConfigError::ValidationFailed(
                "servo_min_angle must be < servo_max_angle",
            ));
        }
        if self.servo_max_angle > 180 {
            return Err(ConfigError::ValidationFailed("servo_max_angle must be 0–180"));
        }
        if self.servo_min_pulse_us >= self.servo_max_pulse_us || self.servo_max_pulse_us > 20_000 {
            return Err(ConfigError::ValidationFailed(
                "servo pulse range must be increasing and within the 20 ms frame",
            ));
        }
        if !(0.05..=0.95).contains(&self.inhale_fraction) {
            return Err(ConfigError::ValidationFailed("inhale_fraction must be 0.05–0.95"));
        }
        if !(50.0..=110.0).contains(&self.alarm_temp_threshold_f) {
            return Err(ConfigError::ValidationFailed(
                "alarm_temp_threshold_f must be 50.0–110.0",
            ));
        }
        if !(50.0..=100.0).contains(&self.alarm_spo2_threshold) {
            return Err(ConfigError::ValidationFailed(
                "alarm_spo2_threshold must be 50.0–100.0",
            ));
        }
        if self.waveform_sample_interval_ms == 0
            || self.vitals_refresh_interval_ms == 0
            || self.temp_request_interval_ms == 0
            || self.sensor_retry_interval_ms == 0
            || self.alarm_check_interval_ms == 0
            || self.buzzer_toggle_interval_ms == 0
            || self.data_log_interval_ms == 0
        {
            return Err(ConfigError::ValidationFailed("polling intervals must be non-zero"));
        }
        if self.temp_conversion_ms >= self.temp_request_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "temp_conversion_ms must be < temp_request_interval_ms",
            ));
        }
        if self.rate_override_secret.is_empty() {
            return Err(ConfigError::ValidationFailed("rate_override_secret must not be empty"));
        }
        if self.ap_ssid.is_empty() {
            return Err(ConfigError::ValidationFailed("ap_ssid must not be empty"));
        }
        if self.ap_password.len() < 8 {
            return Err(ConfigError::ValidationFailed("ap_password must be 8–64 bytes"));
        }
        Ok(())
    }
}

impl SystemConfig {
    /// Boot-time load: a missing, corrupt or out-of-range stored config
    /// falls back to defaults.
    pub fn load_or_default(port: &impl ConfigPort) -> Self {
        match port.load() {
            Ok(cfg) => match cfg.validate() {
                Ok(()) => cfg,
                Err(e) => {
                    warn!("stored config rejected ({e}); using defaults");
                    Self::default()
                }
            },
            Err(e) => {
                warn!("config load failed ({e}); using defaults");
                Self::default()
            }
        }
    }
}

/// Copy a compile-time default into a fixed-capacity string.
fn fixed<const N: usize>(s: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in s.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
