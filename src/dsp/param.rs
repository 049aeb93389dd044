//! Smoothed gain parameter with WebAudio `setTargetAtTime` semantics.
//!
//! A ramp approaches its target exponentially:
//! `v(t) = target + (v0 - target) * exp(-(t - t0) / tau)`.
//! Issuing a new target supersedes whatever ramp was in flight.

/// Difference below which a ramp snaps onto its target.
const SNAP_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct GainParam {
    value: f64,
    target: f64,
    /// Per-sample decay factor `exp(-1 / (tau * sample_rate))`; 0 = jump.
    coeff: f64,
    time_constant: f64,
    sample_rate: f64,
    /// Samples rendered since the current ramp was issued.
    elapsed: u64,
}

impl GainParam {
    pub fn new(value: f64, sample_rate: f64) -> Self {
        GainParam {
            value,
            target: value,
            coeff: 0.0,
            time_constant: 0.0,
            sample_rate,
            elapsed: 0,
        }
    }

    /// Jump to `value` immediately (`setValueAtTime(value, now)`).
    pub fn set_value(&mut self, value: f64) {
        self.value = value;
        self.target = value;
        self.coeff = 0.0;
        self.time_constant = 0.0;
        self.elapsed = 0;
    }

    /// Start an exponential approach toward `target` (`setTargetAtTime`).
    pub fn set_target(&mut self, target: f64, time_constant: f64) {
        if time_constant <= 0.0 {
            self.set_value(target);
            return;
        }
        self.target = target;
        self.time_constant = time_constant;
        self.coeff = (-1.0 / (time_constant * self.sample_rate)).exp();
        self.elapsed = 0;
    }

    /// Advance one sample and return the new value.
    pub fn next_value(&mut self) -> f64 {
        if self.value != self.target {
            self.value = self.target + (self.value - self.target) * self.coeff;
            if (self.value - self.target).abs() < SNAP_EPSILON {
                self.value = self.target;
            }
        }
        self.elapsed = self.elapsed.saturating_add(1);
        self.value
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    /// How many time constants the current ramp has run.
    ///
    /// Immediate jumps count as already complete.
    pub fn elapsed_time_constants(&self) -> f64 {
        if self.time_constant <= 0.0 {
            return f64::INFINITY;
        }
        self.elapsed as f64 / (self.time_constant * self.sample_rate)
    }
}
