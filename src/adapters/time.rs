//! Monotonic clock adapter.
//!
//! - **`target_os = "espidf"`**: `esp_timer_get_time()` (µs since boot).
//! - **otherwise**: `std::time::Instant` from construction.
//!
//! Both are truncated to `u32` milliseconds; consumers use wrapping
//! arithmetic.

use crate::app::ports::ClockPort;

pub struct MonotonicClock {
    #[cfg(not(target_os = "espidf"))]
    start: std::time::Instant,
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            start: std::time::Instant::now(),
        }
    }
}

impl ClockPort for MonotonicClock {
    #[cfg(target_os = "espidf")]
    fn now_ms(&self) -> u32 {
        // SAFETY: reads the high-resolution timer; no preconditions.
        let us = unsafe { esp_idf_svc::sys::esp_timer_get_time() };
        (us / 1000) as u32
    }

    #[cfg(not(target_os = "espidf"))]
    fn now_ms(&self) -> u32 {
        self.start.elapsed().as_millis() as u32
    }
}
