//! Shared telemetry store: the only memory visible to both execution contexts.
//!
//! ```text
//! ┌────────────────────┐  publish(&result)   ┌──────────────────┐  latest()  ┌──────────────┐
//! │ AcquisitionWorker  │ ──────────────────▶ │ SharedTelemetry  │ ─────────▶ │ Control loop │
//! │ (core 0)           │   copy under lock   │ Mutex<Cell<..>>  │  copy out  │ (core 1)     │
//! └────────────────────┘                     └──────────────────┘            └──────────────┘
//! ```
//!
//! The worker owns its [`AcquisitionResult`] and publishes a complete copy;
//! the control loop copies the latest version out.  The lock is held for
//! the copy only, never across a bus transaction or an actuator write, so
//! a reader can never observe a half-written composite.

use core::cell::Cell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

/// Number of raw PPG samples kept for display.
pub const WAVEFORM_LEN: usize = 50;

/// A beat counts as "detected" in status reports for this long after it lands.
pub const BEAT_DISPLAY_WINDOW_MS: u32 = 250;

/// Fahrenheit conversion used for the alarm threshold, the status report and
/// the data log.
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

// ---------------------------------------------------------------------------
// Waveform ring
// ---------------------------------------------------------------------------

/// Fixed-size ring of the most recent raw IR samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waveform {
    samples: [u16; WAVEFORM_LEN],
    head: usize,
    count: usize,
}

impl Waveform {
    pub const EMPTY: Self = Self {
        samples: [0; WAVEFORM_LEN],
        head: 0,
        count: 0,
    };

    pub fn push(&mut self, sample: u16) {
        self.samples[self.head] = sample;
        self.head = (self.head + 1) % WAVEFORM_LEN;
        if self.count < WAVEFORM_LEN {
            self.count += 1;
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Samples oldest → newest.
    pub fn iter(&self) -> impl Iterator<Item = u16> + '_ {
        let start = (self.head + WAVEFORM_LEN - self.count) % WAVEFORM_LEN;
        (0..self.count).map(move |i| self.samples[(start + i) % WAVEFORM_LEN])
    }
}

impl Default for Waveform {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ---------------------------------------------------------------------------
// Worker output
// ---------------------------------------------------------------------------

/// Everything the acquisition worker is allowed to produce.
///
/// `None` means "unknown", never coerced to zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionResult {
    pub spo2: Option<f32>,
    pub heart_rate: Option<f32>,
    pub sensor_present: bool,
    pub temperature_c: Option<f32>,
    /// Monotonic time of the most recent heartbeat.
    pub last_beat_ms: Option<u32>,
    pub waveform: Waveform,
}

impl AcquisitionResult {
    pub const EMPTY: Self = Self {
        spo2: None,
        heart_rate: None,
        sensor_present: false,
        temperature_c: None,
        last_beat_ms: None,
        waveform: Waveform::EMPTY,
    };
}

impl Default for AcquisitionResult {
    fn default() -> Self {
        Self::EMPTY
    }
}

// ---------------------------------------------------------------------------
// Shared store
// ---------------------------------------------------------------------------

/// Single-slot snapshot exchange between the worker and the control loop.
pub struct SharedTelemetry {
    latest: Mutex<CriticalSectionRawMutex, Cell<AcquisitionResult>>,
}

impl SharedTelemetry {
    pub const fn new() -> Self {
        Self {
            latest: Mutex::new(Cell::new(AcquisitionResult::EMPTY)),
        }
    }

    /// Replace the published snapshot with a complete copy of `result`.
    pub fn publish(&self, result: &AcquisitionResult) {
        self.latest.lock(|slot| slot.set(*result));
    }

    /// Copy out the most recently published snapshot.
    pub fn latest(&self) -> AcquisitionResult {
        self.latest.lock(Cell::get)
    }
}

impl Default for SharedTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Control-loop view
// ---------------------------------------------------------------------------

/// The authoritative, control-loop-owned state read by the actuator path
/// and the reporting boundary.  Rebuilt from the latest
/// [`AcquisitionResult`] plus operator overrides every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetrySnapshot {
    pub spo2: Option<f32>,
    pub heart_rate: Option<f32>,
    pub sensor_present: bool,
    pub temperature_c: Option<f32>,
    pub beat_detected: bool,
    pub last_beat_ms: Option<u32>,
    pub waveform: Waveform,
    pub target_bpm: u8,
    pub manual_mode: bool,
    pub cycle_start_ms: Option<u32>,
    pub cycle_duration_ms: u32,
}

impl TelemetrySnapshot {
    pub fn new(target_bpm: u8, cycle_duration_ms: u32) -> Self {
        Self {
            spo2: None,
            heart_rate: None,
            sensor_present: false,
            temperature_c: None,
            beat_detected: false,
            last_beat_ms: None,
            waveform: Waveform::EMPTY,
            target_bpm,
            manual_mode: false,
            cycle_start_ms: None,
            cycle_duration_ms,
        }
    }

    pub fn temperature_f(&self) -> Option<f32> {
        self.temperature_c.map(celsius_to_fahrenheit)
    }
}
