//! Busy-poll cadence timers.
//!
//! Neither execution context ever blocks on a timer.  Each loop iteration
//! samples the monotonic clock and asks every [`Cadence`] whether its period
//! has elapsed.  Timestamps are `u32` milliseconds since boot and all
//! arithmetic wraps, so a cadence keeps working across the ~49-day rollover.
//!
//! ```text
//!   loop {
//!       now = clock.now_ms()
//!       if waveform.due(now)  { sample }        20 ms
//!       if vitals.due(now)    { publish }      100 ms
//!       if retry.due(now)     { re-init }     5000 ms
//!       sleep(2 ms)
//!   }
//! ```

/// A fixed-period trigger driven by externally supplied timestamps.
#[derive(Debug, Clone, Copy)]
pub struct Cadence {
    period_ms: u32,
    /// Timestamp of the last firing.  `None` until the first firing.
    last_ms: Option<u32>,
    /// Whether the first call to [`due`](Self::due) fires immediately.
    fire_first: bool,
}

impl Cadence {
    /// A cadence whose first firing is one full period after `start_ms`.
    pub fn starting_at(period_ms: u32, start_ms: u32) -> Self {
        Self {
            period_ms,
            last_ms: Some(start_ms),
            fire_first: false,
        }
    }

    /// A cadence that fires on the first poll, then every `period_ms`.
    pub fn immediate(period_ms: u32) -> Self {
        Self {
            period_ms,
            last_ms: None,
            fire_first: true,
        }
    }

    /// Returns `true` (and re-arms) when at least one period has elapsed.
    ///
    /// A late poll fires once; missed periods are not replayed, the next
    /// period is measured from `now_ms`.
    pub fn due(&mut self, now_ms: u32) -> bool {
        let fire = match self.last_ms {
            None => self.fire_first,
            Some(last) => now_ms.wrapping_sub(last) >= self.period_ms,
        };
        if fire {
            self.last_ms = Some(now_ms);
        }
        fire
    }

    /// Re-arm so the next firing is one full period after `now_ms`.
    pub fn reset(&mut self, now_ms: u32) {
        self.last_ms = Some(now_ms);
    }

    /// Milliseconds since the last firing, if it has ever fired.
    pub fn since_last(&self, now_ms: u32) -> Option<u32> {
        self.last_ms.map(|last| now_ms.wrapping_sub(last))
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }
}
