//! Low-frequency sine oscillator driving amplitude modulation.

use std::f64::consts::PI;

/// A sine oscillator with a normalized phase accumulator.
#[derive(Debug, Clone)]
pub struct Oscillator {
    pub frequency: f64,
    phase: f64,
    sample_rate: f64,
    running: bool,
}

impl Oscillator {
    pub fn new(frequency: f64, sample_rate: f64) -> Self {
        Oscillator {
            frequency,
            phase: 0.0,
            sample_rate,
            running: false,
        }
    }

    /// Phase increment per sample.
    fn phase_inc(&self) -> f64 {
        self.frequency / self.sample_rate
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop the oscillator. Stopping twice is harmless.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Generate the next sample; a stopped oscillator outputs silence.
    pub fn next_sample(&mut self) -> f64 {
        if !self.running {
            return 0.0;
        }
        let sample = (2.0 * PI * self.phase).sin();
        self.phase += self.phase_inc();
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        sample
    }
}
