//! Breathing-cycle waveform.
//!
//! One cycle is an inhale ramp from `min_angle` to `max_angle` followed by
//! an exhale ramp back down, both shaped by a sine ease so the bellows
//! start and stop gently:
//!
//! ```text
//!  max ┤      ╭─╮
//!      │    ╭╯   ╲
//!      │   ╱      ╲
//!      │ ╭╯        ╲___
//!  min ┼─┴──────┴───────┤
//!      0    inhale   cycle
//! ```

use core::f32::consts::PI;

use super::rate::cycle_duration_ms;

/// Sine ease-in-out over `t ∈ [0, 1]`: 0 → 0, 0.5 → 0.5, 1 → 1.
pub fn ease_in_out_sine(t: f32) -> f32 {
    -0.5 * ((PI * t).cos() - 1.0)
}

/// Stroke geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreathProfile {
    pub min_angle: u8,
    pub max_angle: u8,
    pub inhale_fraction: f32,
}

impl BreathProfile {
    /// Commanded angle `elapsed_ms` into a cycle of `cycle_ms`.
    pub fn position_at(&self, elapsed_ms: u32, cycle_ms: u32) -> u8 {
        let elapsed = elapsed_ms.min(cycle_ms);
        let inhale_ms = (cycle_ms as f32 * self.inhale_fraction) as u32;
        let exhale_ms = cycle_ms - inhale_ms;
        let span = f32::from(self.max_angle) - f32::from(self.min_angle);

        let angle = if elapsed < inhale_ms {
            let t = elapsed as f32 / inhale_ms as f32;
            f32::from(self.min_angle) + span * ease_in_out_sine(t)
        } else if exhale_ms == 0 {
            f32::from(self.min_angle)
        } else {
            let t = ((elapsed - inhale_ms) as f32 / exhale_ms as f32).min(1.0);
            f32::from(self.max_angle) - span * ease_in_out_sine(t)
        };

        angle
            .round()
            .clamp(f32::from(self.min_angle), f32::from(self.max_angle)) as u8
    }
}

/// Progress through the current breath.
#[derive(Debug, Clone, Copy)]
pub struct BreathCycle {
    profile: BreathProfile,
    duration_ms: u32,
    /// `None` until the first advance after a (re)start.
    start_ms: Option<u32>,
}

impl BreathCycle {
    pub fn new(profile: BreathProfile, bpm: u8) -> Self {
        Self {
            profile,
            duration_ms: cycle_duration_ms(bpm),
            start_ms: None,
        }
    }

    /// Change the rate.  The running cycle keeps its start time; only the
    /// duration changes.
    pub fn set_rate(&mut self, bpm: u8) {
        self.duration_ms = cycle_duration_ms(bpm);
    }

    /// Next [`advance`](Self::advance) starts a fresh cycle at rest.
    pub fn restart(&mut self) {
        self.start_ms = None;
    }

    /// Position for `now_ms`.  Once a whole cycle has elapsed the start
    /// time snaps forward to `now_ms`.
    pub fn advance(&mut self, now_ms: u32) -> u8 {
        let start = *self.start_ms.get_or_insert(now_ms);
        let mut elapsed = now_ms.wrapping_sub(start);
        if elapsed >= self.duration_ms {
            self.start_ms = Some(now_ms);
            elapsed = 0;
        }
        self.profile.position_at(elapsed, self.duration_ms)
    }

    pub fn rest_angle(&self) -> u8 {
        self.profile.min_angle
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    pub fn start_ms(&self) -> Option<u32> {
        self.start_ms
    }
}
