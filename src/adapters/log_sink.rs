//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the logger (UART in production).  Each event is one tagged line.

use log::{info, warn};

use crate::alarm::AlarmCause;
use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// Comma-separated cause names for an alarm bitmask.
pub fn describe_causes(mask: u8) -> String {
    AlarmCause::ALL
        .iter()
        .filter(|c| mask & c.mask() != 0)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `x.x` or `--` for an unknown value.
fn reading(v: Option<f32>) -> String {
    v.map_or_else(|| String::from("--"), |v| format!("{v:.1}"))
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started { target_bpm } => {
                info!("START | target={target_bpm}bpm");
            }
            AppEvent::VentilationStarted => info!("VENT | started"),
            AppEvent::VentilationStopped => info!("VENT | stopped, at rest"),
            AppEvent::RateChanged { from, to, source } => {
                info!("RATE | {from} -> {to} bpm ({})", source.as_str());
            }
            AppEvent::ModeChanged { manual } => {
                info!("MODE | {}", if *manual { "manual SpO2" } else { "auto" });
            }
            AppEvent::AlarmRaised(mask) => {
                warn!("ALARM | raised: {}", describe_causes(*mask));
            }
            AppEvent::AlarmCleared => info!("ALARM | cleared"),
            AppEvent::Telemetry(p) => {
                info!(
                    "TELEM | SpO2={}% HR={}bpm T={}\u{00b0}F rate={}bpm",
                    reading(p.spo2),
                    reading(p.heart_rate),
                    reading(p.temperature_f),
                    p.target_bpm,
                );
            }
            AppEvent::RequestRejected(e) => {
                warn!("REQ | {} {e}", e.status());
            }
        }
    }
}
