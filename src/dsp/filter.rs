//! Biquad filter: matches WebAudio BiquadFilterNode coefficients.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Butterworth Q: flat passband, no resonant peak.
pub const NEUTRAL_Q: f64 = std::f64::consts::FRAC_1_SQRT_2;

/// Filter response shape used by recipe stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Lowpass,
    Highpass,
    Bandpass,
}

/// A biquad IIR filter (2nd order), one channel.
///
/// Direct Form II Transposed; coefficients from the Audio EQ Cookbook
/// (Robert Bristow-Johnson). Parameters are fixed at construction since
/// recipe stages are static.
#[derive(Debug, Clone)]
pub struct BiquadFilter {
    filter_type: FilterType,
    frequency: f64,
    q: f64,

    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,

    z1: f64,
    z2: f64,
}

impl BiquadFilter {
    /// Build a filter. `frequency` is clamped to (0, Nyquist) like WebAudio does.
    ///
    /// An explicit `q` is read the way `BiquadFilterNode.Q` is: in dB for
    /// lowpass and highpass, as a plain quality factor for bandpass. `None`
    /// (or an unusable value) gives the Butterworth response.
    pub fn new(filter_type: FilterType, frequency: f64, q: Option<f64>, sample_rate: f64) -> Self {
        let nyquist = sample_rate / 2.0;
        let frequency = frequency.clamp(1e-3, nyquist * 0.999);
        let q = resonance(filter_type, q);

        let w0 = 2.0 * PI * frequency / sample_rate;
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2) = match filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
            FilterType::Bandpass => (alpha, 0.0, -alpha),
        };
        // All three share the same denominator.
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        BiquadFilter {
            filter_type,
            frequency,
            q,
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
            z1: 0.0,
            z2: 0.0,
        }
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn frequency(&self) -> f64 {
        self.frequency
    }

    /// Linear quality factor the coefficients were built from.
    pub fn q(&self) -> f64 {
        self.q
    }

    /// Process a single sample through the filter.
    pub fn process(&mut self, input: f64) -> f64 {
        let output = self.b0 * input + self.z1;
        self.z1 = self.b1 * input - self.a1 * output + self.z2;
        self.z2 = self.b2 * input - self.a2 * output;
        output
    }
}

/// Linear Q for the cookbook `alpha`. Lowpass/highpass peak gain at the
/// cutoff is `10^(Q/20)`.
fn resonance(filter_type: FilterType, q: Option<f64>) -> f64 {
    match (filter_type, q) {
        (_, Some(q)) if !q.is_finite() => NEUTRAL_Q,
        (FilterType::Lowpass | FilterType::Highpass, Some(db)) => 10f64.powf(db / 20.0),
        (FilterType::Bandpass, Some(q)) if q > 0.0 => q,
        _ => NEUTRAL_Q,
    }
}
