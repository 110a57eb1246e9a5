//! Inbound commands to the application service.
//!
//! These represent operator actions arriving at the request boundary that
//! the [`VentilatorService`](super::service::VentilatorService) validates
//! and applies.  Read-only requests (status, export) are plain method
//! calls and do not go through here.

use core::fmt;

use crate::control::rate::{MAX_OVERRIDE_BPM, MIN_OVERRIDE_BPM};

/// State-changing operator actions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AppCommand<'a> {
    /// Stop the breathing cycle and park the actuator at rest.
    Stop,

    /// Begin a fresh breathing cycle from rest.
    Start,

    /// Enter manual mode with an operator-supplied SpO2 value.
    SetManualSpo2(f32),

    /// Leave manual mode; vitals come from the sensor again.
    /// Also drops any rate override.
    SetAuto,

    /// Pin the ventilation rate, bypassing the SpO2 rule.
    SetRateOverride { credential: &'a str, bpm: f32 },

    /// Drop a rate override; the SpO2 rule drives the rate again.
    ClearRateOverride,
}

/// Successful outcome of an [`AppCommand`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandReply {
    Stopped,
    Started,
    ManualSpo2Set,
    AutoMode,
    RateOverrideSet(u8),
    RateOverrideCleared,
}

impl fmt::Display for CommandReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "OK: Position Zero Set"),
            Self::Started => write!(f, "OK: Ventilator Started"),
            Self::ManualSpo2Set => write!(f, "OK: Manual SpO2 Set"),
            Self::AutoMode => write!(f, "OK: Auto Mode"),
            Self::RateOverrideSet(bpm) => write!(f, "OK: BPM Set to {bpm}"),
            Self::RateOverrideCleared => write!(f, "OK: BPM Override Cleared"),
        }
    }
}

/// A rejected operator request.  Rejection never mutates state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestError {
    /// A required parameter was absent.
    MissingParameter,
    /// A parameter was present but unparseable or out of range.
    InvalidValue,
    /// The rate-override credential did not match.
    Unauthorized,
    /// Rate override outside the accepted range.
    RateOutOfRange,
    /// `/get_data` without a `duration`.
    MissingDuration,
    /// `/get_data` with a selector other than 1h/6h/12h/all.
    UnknownDuration,
    /// Query string could not be decoded.
    MalformedQuery,
    /// No such route.
    NotFound,
    /// The control loop did not answer in time.
    Busy,
}

impl RequestError {
    /// HTTP status code for this rejection.
    pub fn status(self) -> u16 {
        match self {
            Self::Unauthorized => 403,
            Self::NotFound => 404,
            Self::Busy => 503,
            _ => 400,
        }
    }
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingParameter => write!(f, "Bad Request: Missing parameters"),
            Self::InvalidValue => write!(f, "Bad Request: Invalid value"),
            Self::Unauthorized => write!(f, "Forbidden: Incorrect password"),
            Self::RateOutOfRange => write!(
                f,
                "Bad Request: BPM must be between {MIN_OVERRIDE_BPM} and {MAX_OVERRIDE_BPM}"
            ),
            Self::MissingDuration => write!(f, "Bad Request: Missing duration parameter"),
            Self::UnknownDuration => write!(f, "Bad Request: Invalid duration"),
            Self::MalformedQuery => write!(f, "Bad Request: Malformed query"),
            Self::NotFound => write!(f, "Not Found"),
            Self::Busy => write!(f, "Service Unavailable"),
        }
    }
}
