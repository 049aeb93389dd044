//! Flat, pink and brown random sample streams.
//!
//! Buffers are rendered once per layer and looped by the buffer source, so
//! generation is a plain fill rather than a per-block stream.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Spectral color of a noise stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseColor {
    /// Equal energy per Hz.
    #[serde(alias = "white")]
    Flat,
    /// −3 dB/octave (Paul Kellet's refined IIR approximation).
    Pink,
    /// −6 dB/octave (leaky integration of flat noise).
    #[serde(alias = "red")]
    Brown,
}

/// Running filter state for one channel fill.
///
/// Each call to [`NoiseState::next`] consumes one flat sample in [-1, 1).
#[derive(Debug, Clone)]
pub struct NoiseState {
    color: NoiseColor,
    b: [f64; 7],
    last_out: f64,
}

impl NoiseState {
    pub fn new(color: NoiseColor) -> Self {
        NoiseState {
            color,
            b: [0.0; 7],
            last_out: 0.0,
        }
    }

    /// Shape one white sample.
    pub fn next(&mut self, white: f64) -> f64 {
        match self.color {
            NoiseColor::Flat => white * 0.5,
            NoiseColor::Pink => {
                let b = &mut self.b;
                b[0] = 0.99886 * b[0] + white * 0.0555179;
                b[1] = 0.99332 * b[1] + white * 0.0750759;
                b[2] = 0.96900 * b[2] + white * 0.1538520;
                b[3] = 0.86650 * b[3] + white * 0.3104856;
                b[4] = 0.55000 * b[4] + white * 0.5329522;
                b[5] = -0.7616 * b[5] - white * 0.0168980;
                // b[6] enters the sum one sample late.
                let out = (b[0] + b[1] + b[2] + b[3] + b[4] + b[5] + b[6] + white * 0.5362) * 0.11;
                b[6] = white * 0.115926;
                out
            }
            NoiseColor::Brown => {
                self.last_out = (self.last_out + 0.02 * white) / 1.02;
                self.last_out * 3.5
            }
        }
    }

    /// Integrator state of the brown generator (unscaled).
    pub fn brown_state(&self) -> f64 {
        self.last_out
    }
}

/// Fill `sample_count` samples of `color` drawing flat noise from `rng`.
pub fn generate_with_rng<R: Rng + ?Sized>(
    color: NoiseColor,
    sample_count: usize,
    rng: &mut R,
) -> Vec<f32> {
    let mut state = NoiseState::new(color);
    (0..sample_count)
        .map(|_| state.next(rng.gen_range(-1.0..1.0)) as f32)
        .collect()
}

/// Fill `sample_count` samples of `color` from thread-local entropy.
pub fn generate(color: NoiseColor, sample_count: usize) -> Vec<f32> {
    generate_with_rng(color, sample_count, &mut rand::thread_rng())
}

/// Two independently drawn channels; left and right are decorrelated.
pub fn generate_stereo<R: Rng + ?Sized>(
    color: NoiseColor,
    frames: usize,
    rng: &mut R,
) -> [Vec<f32>; 2] {
    let left = generate_with_rng(color, frames, rng);
    let right = generate_with_rng(color, frames, rng);
    [left, right]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    const ALL: [NoiseColor; 3] = [NoiseColor::Flat, NoiseColor::Pink, NoiseColor::Brown];

    #[test]
    fn entropy_seeded_buffers_are_sized_and_bounded() {
        for color in ALL {
            let out = generate(color, 4096);
            assert_eq!(out.len(), 4096);
            assert!(out.iter().all(|s| s.is_finite() && s.abs() <= 1.5), "{color:?} out of range");
            assert!(out.iter().any(|&s| s != 0.0), "{color:?} produced silence");
        }
        assert!(generate(NoiseColor::Pink, 0).is_empty());
    }

    #[test]
    fn exact_length_and_bounded() {
        let mut rng = StdRng::seed_from_u64(7);
        for color in ALL {
            for n in [0, 1, 17, 44100] {
                let out = generate_with_rng(color, n, &mut rng);
                assert_eq!(out.len(), n, "{color:?} should yield {n} samples");
                for (i, &s) in out.iter().enumerate() {
                    assert!(
                        (-1.5..=1.5).contains(&s),
                        "{color:?} sample {i} out of range: {s}"
                    );
                }
            }
        }
    }

    #[test]
    fn flat_is_half_amplitude() {
        let mut rng = StdRng::seed_from_u64(1);
        let out = generate_with_rng(NoiseColor::Flat, 10000, &mut rng);
        let peak = out.iter().fold(0.0_f32, |m, &s| m.max(s.abs()));
        assert!(peak <= 0.5, "Flat noise peak should be <= 0.5, got {peak}");
        assert!(peak > 0.45, "Flat noise should use its headroom, got {peak}");
    }

    #[test]
    fn pink_matches_kellet_recurrence() {
        let whites = [0.3, -0.9, 0.55, 1.0, -1.0, 0.0, 0.12, -0.4];
        let mut state = NoiseState::new(NoiseColor::Pink);

        let (mut b0, mut b1, mut b2, mut b3, mut b4, mut b5, mut b6) =
            (0.0_f64, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0);
        for &w in &whites {
            b0 = 0.99886 * b0 + w * 0.0555179;
            b1 = 0.99332 * b1 + w * 0.0750759;
            b2 = 0.96900 * b2 + w * 0.1538520;
            b3 = 0.86650 * b3 + w * 0.3104856;
            b4 = 0.55000 * b4 + w * 0.5329522;
            b5 = -0.7616 * b5 - w * 0.0168980;
            let expected = (b0 + b1 + b2 + b3 + b4 + b5 + b6 + w * 0.5362) * 0.11;
            b6 = w * 0.115926;

            let got = state.next(w);
            assert!(
                (got - expected).abs() < 1e-12,
                "Pink output drifted from recurrence: {got} vs {expected}"
            );
        }
    }

    #[test]
    fn pink_first_samples_golden() {
        let mut state = NoiseState::new(NoiseColor::Pink);
        // First sample: every pole starts at 0, b6 not yet loaded.
        let first = state.next(1.0);
        let expected_first = (0.0555179 + 0.0750759 + 0.1538520 + 0.3104856 + 0.5329522
            - 0.0168980
            + 0.5362)
            * 0.11;
        assert!((first - expected_first).abs() < 1e-12, "got {first}");

        // Second sample with zero input: only decayed poles and the delayed b6.
        let second = state.next(0.0);
        let expected_second = (0.99886 * 0.0555179
            + 0.99332 * 0.0750759
            + 0.96900 * 0.1538520
            + 0.86650 * 0.3104856
            + 0.55000 * 0.5329522
            + -0.7616 * -0.0168980
            + 0.115926)
            * 0.11;
        assert!((second - expected_second).abs() < 1e-12, "got {second}");
    }

    #[test]
    fn brown_follows_leaky_integrator() {
        let whites = [0.5, -0.25, 1.0, 0.75, -1.0];
        let mut state = NoiseState::new(NoiseColor::Brown);
        let mut prev = 0.0_f64;
        for &w in &whites {
            let expected = (prev + 0.02 * w) / 1.02 * 3.5;
            let got = state.next(w);
            assert!((got - expected).abs() < 1e-12, "got {got}, expected {expected}");
            prev = (prev + 0.02 * w) / 1.02;
        }
    }

    #[test]
    fn brown_leak_bounds_sustained_input() {
        let mut state = NoiseState::new(NoiseColor::Brown);
        for _ in 0..1_000_000 {
            state.next(1.0);
            assert!(state.brown_state().abs() <= 1.0 + 1e-9);
        }
        // Converges to the fixed point s = (s + 0.02) / 1.02 → s = 1.
        assert!((state.brown_state() - 1.0).abs() < 1e-6);

        for _ in 0..1_000_000 {
            state.next(-1.0);
        }
        assert!((state.brown_state() + 1.0).abs() < 1e-6);
    }

    #[test]
    fn stereo_channels_are_decorrelated() {
        let mut rng = StdRng::seed_from_u64(3);
        let [l, r] = generate_stereo(NoiseColor::Flat, 4096, &mut rng);
        assert_eq!(l.len(), r.len());
        assert_ne!(l, r, "Channels must not be duplicated");
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = generate_with_rng(NoiseColor::Pink, 512, &mut StdRng::seed_from_u64(99));
        let b = generate_with_rng(NoiseColor::Pink, 512, &mut StdRng::seed_from_u64(99));
        assert_eq!(a, b);
    }

    #[test]
    fn color_names_parse() {
        let c: NoiseColor = serde_json::from_str("\"white\"").unwrap();
        assert_eq!(c, NoiseColor::Flat);
        let c: NoiseColor = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(c, NoiseColor::Brown);
        let c: NoiseColor = serde_json::from_str("\"pink\"").unwrap();
        assert_eq!(c, NoiseColor::Pink);
    }
}
