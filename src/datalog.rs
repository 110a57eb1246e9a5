//! Rolling patient data log and CSV export.
//!
//! One [`PatientDataPoint`] per `data_log_interval_ms`, at most
//! [`DATA_LOG_CAPACITY`] points (12 h at one per minute).  The oldest point
//! is evicted first.  The ring is a boxed [`HistoryBuffer`], so capacity is
//! part of the type and the points live on the heap rather than the
//! control-loop stack.

use std::fmt::{self, Write as _};

use heapless::HistoryBuffer;
use serde::Serialize;

use crate::scheduler::Cadence;
use crate::telemetry::TelemetrySnapshot;

pub const DATA_LOG_CAPACITY: usize = 720;

pub const CSV_HEADER: &str =
    "Timestamp,SpO2 (%),Heart Rate (BPM),Temperature (°F),Ventilation Rate (BPM)";

const MS_PER_MINUTE: u32 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PatientDataPoint {
    pub timestamp_ms: u32,
    pub spo2: Option<f32>,
    pub heart_rate: Option<f32>,
    pub temperature_f: Option<f32>,
    pub target_bpm: u8,
}

impl PatientDataPoint {
    pub fn capture(now_ms: u32, snap: &TelemetrySnapshot) -> Self {
        Self {
            timestamp_ms: now_ms,
            spo2: snap.spo2,
            heart_rate: snap.heart_rate,
            temperature_f: snap.temperature_f(),
            target_bpm: snap.target_bpm,
        }
    }
}

/// Export window selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogWindow {
    OneHour,
    SixHours,
    TwelveHours,
    All,
}

impl LogWindow {
    /// Parse a `duration` selector: `1h`, `6h`, `12h` or `all`.
    pub fn parse(selector: &str) -> Option<Self> {
        match selector {
            "1h" => Some(Self::OneHour),
            "6h" => Some(Self::SixHours),
            "12h" => Some(Self::TwelveHours),
            "all" => Some(Self::All),
            _ => None,
        }
    }

    /// Window length in minutes.  `None` means unbounded.
    pub fn minutes(self) -> Option<u32> {
        match self {
            Self::OneHour => Some(60),
            Self::SixHours => Some(360),
            Self::TwelveHours => Some(720),
            Self::All => None,
        }
    }

    fn contains(self, age_ms: u32) -> bool {
        self.minutes()
            .is_none_or(|m| age_ms <= m.saturating_mul(MS_PER_MINUTE))
    }
}

/// One exported row: a point plus its age at export time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportRow {
    pub age_minutes: u32,
    pub point: PatientDataPoint,
}

type PointRing = HistoryBuffer<PatientDataPoint, DATA_LOG_CAPACITY>;

pub struct DataLog {
    points: Box<PointRing>,
    cadence: Cadence,
}

impl DataLog {
    /// First append happens one interval after `now_ms`.
    pub fn new(interval_ms: u32, now_ms: u32) -> Self {
        Self {
            points: Box::new(PointRing::new()),
            cadence: Cadence::starting_at(interval_ms, now_ms),
        }
    }

    /// Append a point if the log interval has elapsed.
    pub fn maybe_append(
        &mut self,
        now_ms: u32,
        snap: &TelemetrySnapshot,
    ) -> Option<PatientDataPoint> {
        if !self.cadence.due(now_ms) {
            return None;
        }
        let point = PatientDataPoint::capture(now_ms, snap);
        self.push(point);
        Some(point)
    }

    /// Unconditional append; a full ring overwrites its oldest point.
    pub fn push(&mut self, point: PatientDataPoint) {
        self.points.write(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.points.capacity()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PatientDataPoint> {
        self.points.oldest_ordered()
    }

    /// Points inside `window`, oldest first, with their age at `now_ms`.
    pub fn query(&self, window: LogWindow, now_ms: u32) -> impl Iterator<Item = ExportRow> + '_ {
        self.iter().filter_map(move |p| {
            let age_ms = now_ms.wrapping_sub(p.timestamp_ms);
            window.contains(age_ms).then_some(ExportRow {
                age_minutes: age_ms / MS_PER_MINUTE,
                point: *p,
            })
        })
    }

    /// Render `window` as CSV, header included.
    pub fn export_csv(&self, window: LogWindow, now_ms: u32) -> String {
        let mut csv = String::with_capacity(64 + self.points.len() * 40);
        csv.push_str(CSV_HEADER);
        csv.push('\n');
        for row in self.query(window, now_ms) {
            let p = row.point;
            // Writing to a String cannot fail.
            let _ = writeln!(
                csv,
                "{} min ago,{},{},{},{}",
                row.age_minutes,
                OneDecimal(p.spo2),
                OneDecimal(p.heart_rate),
                OneDecimal(p.temperature_f),
                p.target_bpm
            );
        }
        csv
    }
}

/// Renders a known value with one decimal, an unknown one as nothing.
struct OneDecimal(Option<f32>);

impl fmt::Display for OneDecimal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.1}"),
            None => Ok(()),
        }
    }
}
