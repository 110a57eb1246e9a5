//! SpO2 → target ventilation rate.
//!
//! | SpO2 (%)      | Target (bpm) |
//! |---------------|--------------|
//! | < 90          | 20           |
//! | 90 ≤ x < 95   | 17           |
//! | ≥ 95          | 15           |
//!
//! The thresholds are fixed and not part of
//! [`SystemConfig`](crate::config::SystemConfig).

/// Below this SpO2 the patient gets the fastest rate.
pub const SPO2_LOW_THRESHOLD: f32 = 90.0;
/// At or above this SpO2 the patient gets the resting rate.
pub const SPO2_NORMAL_THRESHOLD: f32 = 95.0;

pub const BPM_LOW_SPO2: u8 = 20;
pub const BPM_MID_SPO2: u8 = 17;
pub const BPM_NORMAL_SPO2: u8 = 15;

/// Rate used from boot until the first valid SpO2 reading.
pub const DEFAULT_BPM: u8 = BPM_NORMAL_SPO2;

/// Accepted range for an operator rate override (inclusive).
pub const MIN_OVERRIDE_BPM: u8 = 5;
pub const MAX_OVERRIDE_BPM: u8 = 40;

/// Where the current target rate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateSource {
    /// SpO2 rule on the sensor reading.
    Sensor,
    /// SpO2 rule on the operator's manual value.
    Manual,
    /// Operator rate override.
    Override,
}

impl RateSource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Manual => "manual",
            Self::Override => "override",
        }
    }
}

/// Target breathing rate for a (known) SpO2 reading.
pub fn target_bpm_for_spo2(spo2: f32) -> u8 {
    if spo2 < SPO2_LOW_THRESHOLD {
        BPM_LOW_SPO2
    } else if spo2 < SPO2_NORMAL_THRESHOLD {
        BPM_MID_SPO2
    } else {
        BPM_NORMAL_SPO2
    }
}

/// Accept an override only if it is a whole number within
/// [`MIN_OVERRIDE_BPM`]..=[`MAX_OVERRIDE_BPM`].
pub fn validate_override(bpm: f32) -> Option<u8> {
    let in_range = bpm >= f32::from(MIN_OVERRIDE_BPM) && bpm <= f32::from(MAX_OVERRIDE_BPM);
    if in_range && bpm.fract() == 0.0 {
        Some(bpm as u8)
    } else {
        None
    }
}

/// Length of one full breath at `bpm`.
pub fn cycle_duration_ms(bpm: u8) -> u32 {
    60_000 / u32::from(bpm.max(1))
}
