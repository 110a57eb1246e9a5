//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Sensor driver ──▶ OximeterPort / ThermometerPort ──▶ AcquisitionWorker
//!   VentilatorService ──▶ ActuatorPort / EventSink ──▶ Adapter
//! ```
//!
//! Sensor ports are owned by the acquisition worker, actuator and event
//! ports by the control loop.  Nothing is shared through a port, only
//! through [`SharedTelemetry`](crate::telemetry::SharedTelemetry).

use crate::config::SystemConfig;
use crate::error::SensorError;

// ───────────────────────────────────────────────────────────────
// Sensor ports (driven adapters: hardware → acquisition worker)
// ───────────────────────────────────────────────────────────────

/// Pulse oximeter.
///
/// `update` must be called as often as possible; the driver does its own
/// sampling and filtering in between.
pub trait OximeterPort {
    /// Probe and configure the device.  Returns `true` when it is ready.
    fn try_init(&mut self) -> bool;

    /// Drain pending samples.  An `Err` means the device stopped answering.
    fn update(&mut self) -> Result<(), SensorError>;

    /// Latest derived `(spo2, heart_rate)`.  Values of `0.0` mean the
    /// estimator has not converged yet.
    fn poll_spo2_hr(&mut self) -> Option<(f32, f32)>;

    /// Most recent raw IR sample, for display.
    fn poll_raw_waveform(&mut self) -> Option<u16>;

    /// `true` once per detected heartbeat.
    fn take_beat(&mut self) -> bool;
}

/// Body-temperature probe with a request/poll conversion cycle.
pub trait ThermometerPort {
    /// Start a conversion.  Must not block for the conversion time.
    fn request_conversion(&mut self) -> Result<(), SensorError>;

    /// Read the result of the last conversion in °C.
    fn read_celsius(&mut self) -> Result<f32, SensorError>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Write-side port: the control loop commands the bellows and the buzzer.
pub trait ActuatorPort {
    /// Drive the bellows servo to `angle` degrees.
    fn set_position(&mut self, angle: u8);

    /// Switch the alarm buzzer.
    fn set_buzzer(&mut self, on: bool);

    /// Buzzer off, servo to rest.
    fn all_off(&mut self, rest_angle: u8);
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Clock port
// ───────────────────────────────────────────────────────────────

/// Monotonic milliseconds since boot.  Wraps at `u32::MAX`.
pub trait ClockPort {
    fn now_ms(&self) -> u32;
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate before persisting.  Invalid ranges are
/// rejected with [`ConfigError::ValidationFailed`], not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&mut self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl std::error::Error for ConfigError {}
