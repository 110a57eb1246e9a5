//! Outbound application events.
//!
//! The [`VentilatorService`](super::service::VentilatorService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them.

use crate::control::rate::RateSource;
use crate::datalog::PatientDataPoint;

use super::commands::RequestError;

/// Structured events emitted by the control loop.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started (carries the initial target rate).
    Started { target_bpm: u8 },

    /// The breathing cycle was (re)started.
    VentilationStarted,

    /// The breathing cycle was stopped; the actuator is at rest.
    VentilationStopped,

    /// The target rate moved.
    RateChanged { from: u8, to: u8, source: RateSource },

    /// Manual SpO2 mode toggled.
    ModeChanged { manual: bool },

    /// One or more alarm causes became active (bitmask).
    AlarmRaised(u8),

    /// All alarm causes have cleared.
    AlarmCleared,

    /// A point was appended to the data log.
    Telemetry(PatientDataPoint),

    /// An operator request was refused.
    RequestRejected(RequestError),
}
