//! Master bus: sums every active sound and applies the master gain.

use super::param::GainParam;

/// A stereo summing bus with a smoothed master gain.
#[derive(Debug, Clone)]
pub struct Mixer {
    master: GainParam,
    left: Vec<f64>,
    right: Vec<f64>,
}

impl Mixer {
    pub fn new(master_volume: f64, sample_rate: f64) -> Self {
        Mixer {
            master: GainParam::new(master_volume, sample_rate),
            left: Vec::new(),
            right: Vec::new(),
        }
    }

    /// Prepare a block of `frames` zeroed frames.
    pub fn clear(&mut self, frames: usize) {
        self.left.clear();
        self.left.resize(frames, 0.0);
        self.right.clear();
        self.right.resize(frames, 0.0);
    }

    /// Accumulate a stereo frame at `index`.
    pub fn add(&mut self, index: usize, left: f64, right: f64) {
        if index < self.left.len() {
            self.left[index] += left;
            self.right[index] += right;
        }
    }

    /// Ramp the master gain toward `level`.
    pub fn set_master(&mut self, level: f64, time_constant: f64) {
        self.master.set_target(level, time_constant);
    }

    /// The level the master gain is heading to.
    pub fn master_volume(&self) -> f64 {
        self.master.target()
    }

    /// The master gain right now (mid-ramp values included).
    pub fn master_gain(&self) -> f64 {
        self.master.value()
    }

    /// Apply master gain and soft clipping, writing the block out.
    pub fn write_output(&mut self, left: &mut [f32], right: &mut [f32]) {
        let frames = self.left.len().min(left.len()).min(right.len());
        for i in 0..frames {
            let g = self.master.next_value();
            left[i] = soft_clip(self.left[i] * g) as f32;
            right[i] = soft_clip(self.right[i] * g) as f32;
        }
    }
}

/// Soft clipper using tanh to prevent harsh digital clipping.
fn soft_clip(x: f64) -> f64 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_block_is_silent() {
        let mut m = Mixer::new(0.8, 8000.0);
        m.clear(128);
        let mut l = vec![1.0_f32; 128];
        let mut r = vec![1.0_f32; 128];
        m.write_output(&mut l, &mut r);
        assert!(l.iter().chain(r.iter()).all(|&s| s == 0.0));
    }

    #[test]
    fn accumulates_frames() {
        let mut m = Mixer::new(1.0, 8000.0);
        m.clear(4);
        m.add(0, 0.5, 0.1);
        m.add(0, 0.3, 0.1);
        m.add(1, 1.0, -1.0);
        m.add(9, 1.0, 1.0);
        let mut l = vec![0.0_f32; 4];
        let mut r = vec![0.0_f32; 4];
        m.write_output(&mut l, &mut r);
        assert!((f64::from(l[0]) - soft_clip(0.8)).abs() < 1e-6);
        assert!((f64::from(r[0]) - soft_clip(0.2)).abs() < 1e-6);
        assert!((f64::from(r[1]) + soft_clip(1.0)).abs() < 1e-6);
        assert_eq!(l[2], 0.0);
    }

    #[test]
    fn soft_clip_prevents_overflow() {
        let mut m = Mixer::new(1.0, 8000.0);
        m.clear(1);
        m.add(0, 100.0, -100.0);
        let mut l = [0.0_f32];
        let mut r = [0.0_f32];
        m.write_output(&mut l, &mut r);
        assert!(l[0].abs() <= 1.0 && r[0].abs() <= 1.0);
    }

    #[test]
    fn master_ramps_instead_of_jumping() {
        let mut m = Mixer::new(1.0, 8000.0);
        m.set_master(0.0, 0.1);
        assert_eq!(m.master_volume(), 0.0);
        m.clear(8);
        for i in 0..8 {
            m.add(i, 0.5, 0.5);
        }
        let mut l = vec![0.0_f32; 8];
        let mut r = vec![0.0_f32; 8];
        m.write_output(&mut l, &mut r);
        assert!(l[0] > 0.4, "First sample should still be near full level, got {}", l[0]);
        assert!(m.master_gain() > 0.9 && m.master_gain() < 1.0);
    }
}
