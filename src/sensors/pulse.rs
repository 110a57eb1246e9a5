//! Photoplethysmography estimator: heart rate and SpO2 from raw IR/red
//! samples at a fixed sample rate.
//!
//! Pipeline per sample:
//!
//! 1. DC removal on both channels (`y[n] = w[n] - w[n-1]`,
//!    `w[n] = x[n] + α·w[n-1]`).
//! 2. The inverted IR AC signal is smoothed and fed to a hysteresis beat
//!    detector with an adaptive envelope and a refractory period.
//! 3. On each beat: HR from the mean of the last few beat intervals,
//!    SpO2 from the ratio of red to IR AC RMS since the previous beat.
//!
//! Both outputs read `0.0` until enough beats have been seen, and fall back
//! to `0.0` when beats stop arriving.

/// MAX30100 configured for 100 samples/s.
pub const SAMPLE_PERIOD_MS: u32 = 10;

const DC_ALPHA: f32 = 0.95;
const SMOOTHING_LEN: usize = 4;
const ENVELOPE_DECAY: f32 = 0.99;
const HYSTERESIS_FRACTION: f32 = 0.3;
/// Below this the finger is not on the sensor.
const MIN_PULSE_AMPLITUDE: f32 = 20.0;
/// 200 bpm ceiling.
const REFRACTORY_MS: u32 = 300;
/// 30 bpm floor; longer gaps are not averaged.
const MAX_BEAT_INTERVAL_MS: u32 = 2000;
const BEAT_TIMEOUT_MS: u32 = 3000;
const INTERVAL_HISTORY: usize = 4;
const INTERVALS_FOR_VALID: usize = 3;
const SPO2_SMOOTHING: f32 = 0.3;

/// Empirical linear calibration `SpO2 = A - B·R`.
const SPO2_CAL_A: f32 = 110.0;
const SPO2_CAL_B: f32 = 25.0;

#[derive(Debug, Clone, Copy, Default)]
struct DcFilter {
    w: Option<f32>,
}

impl DcFilter {
    fn step(&mut self, x: f32) -> f32 {
        // Seed at steady state so the first samples carry no step transient.
        let prev = *self.w.get_or_insert(x / (1.0 - DC_ALPHA));
        let w = x + DC_ALPHA * prev;
        self.w = Some(w);
        w - prev
    }
}

pub struct PulseEstimator {
    ir_dc: DcFilter,
    red_dc: DcFilter,
    smooth: [f32; SMOOTHING_LEN],
    smooth_idx: usize,
    envelope: f32,
    armed: bool,
    clock_ms: u32,
    last_beat_ms: Option<u32>,
    intervals: heapless::Deque<u32, INTERVAL_HISTORY>,
    ir_sq_sum: f32,
    red_sq_sum: f32,
    sq_count: u32,
    spo2: f32,
    heart_rate: f32,
}

impl Default for PulseEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl PulseEstimator {
    pub fn new() -> Self {
        Self {
            ir_dc: DcFilter::default(),
            red_dc: DcFilter::default(),
            smooth: [0.0; SMOOTHING_LEN],
            smooth_idx: 0,
            envelope: 0.0,
            armed: false,
            clock_ms: 0,
            last_beat_ms: None,
            intervals: heapless::Deque::new(),
            ir_sq_sum: 0.0,
            red_sq_sum: 0.0,
            sq_count: 0,
            spo2: 0.0,
            heart_rate: 0.0,
        }
    }

    /// Feed one sample pair.  Returns `true` if it completed a beat.
    pub fn push(&mut self, ir: u16, red: u16) -> bool {
        self.clock_ms = self.clock_ms.wrapping_add(SAMPLE_PERIOD_MS);

        let ir_ac = self.ir_dc.step(f32::from(ir));
        let red_ac = self.red_dc.step(f32::from(red));
        self.ir_sq_sum += ir_ac * ir_ac;
        self.red_sq_sum += red_ac * red_ac;
        self.sq_count += 1;

        // Absorbance peaks when IR transmission dips.
        let s = self.smoothed(-ir_ac);
        self.envelope = s.abs().max(self.envelope * ENVELOPE_DECAY);
        let threshold = self.envelope * HYSTERESIS_FRACTION;

        if s < 0.0 {
            self.armed = true;
        }

        let mut beat = false;
        if self.armed
            && self.envelope >= MIN_PULSE_AMPLITUDE
            && s > threshold
            && self.since_last_beat().is_none_or(|ms| ms >= REFRACTORY_MS)
        {
            self.armed = false;
            self.on_beat();
            beat = true;
        }

        if self.since_last_beat().is_some_and(|ms| ms > BEAT_TIMEOUT_MS) {
            self.reset_outputs();
        }
        beat
    }

    /// Estimated SpO2 (%), `0.0` while not converged.
    pub fn spo2(&self) -> f32 {
        self.spo2
    }

    /// Estimated heart rate (bpm), `0.0` while not converged.
    pub fn heart_rate(&self) -> f32 {
        self.heart_rate
    }

    fn smoothed(&mut self, x: f32) -> f32 {
        self.smooth[self.smooth_idx] = x;
        self.smooth_idx = (self.smooth_idx + 1) % SMOOTHING_LEN;
        self.smooth.iter().sum::<f32>() / SMOOTHING_LEN as f32
    }

    fn since_last_beat(&self) -> Option<u32> {
        self.last_beat_ms.map(|t| self.clock_ms.wrapping_sub(t))
    }

    fn on_beat(&mut self) {
        if let Some(interval) = self.since_last_beat() {
            if interval <= MAX_BEAT_INTERVAL_MS {
                if self.intervals.is_full() {
                    self.intervals.pop_front();
                }
                let _ = self.intervals.push_back(interval);
            }
        }
        self.last_beat_ms = Some(self.clock_ms);

        if self.sq_count > 0 && self.ir_sq_sum > 0.0 {
            let n = self.sq_count as f32;
            let ratio = (self.red_sq_sum / n).sqrt() / (self.ir_sq_sum / n).sqrt();
            let estimate = (SPO2_CAL_A - SPO2_CAL_B * ratio).clamp(0.0, 100.0);

            if self.intervals.len() >= INTERVALS_FOR_VALID {
                self.spo2 = if self.spo2 == 0.0 {
                    estimate
                } else {
                    self.spo2 + SPO2_SMOOTHING * (estimate - self.spo2)
                };
                let mean = self.intervals.iter().sum::<u32>() as f32 / self.intervals.len() as f32;
                self.heart_rate = 60_000.0 / mean;
            }
        }
        self.ir_sq_sum = 0.0;
        self.red_sq_sum = 0.0;
        self.sq_count = 0;
    }

    fn reset_outputs(&mut self) {
        self.last_beat_ms = None;
        self.intervals.clear();
        self.spo2 = 0.0;
        self.heart_rate = 0.0;
    }
}
