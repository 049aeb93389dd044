//! Mixer tuning loaded from JSON, with every field defaulted and clamped
//! to a range the audio graph can honor.

use serde::{Deserialize, Serialize};

/// Minimum number of stop-ramp time constants to wait before releasing a
/// sound's nodes. After 5 tau the gain is below 1% of its starting value.
pub const MIN_RELEASE_TIME_CONSTANTS: f64 = 5.0;

/// Engine tuning. Every field has a default, so a partial (or empty) JSON
/// object is a valid configuration.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct MixerConfig {
    /// Requested rate of the audio context in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: f64,
    /// Initial master level in [0, 1].
    #[serde(default = "default_master_volume")]
    pub master_volume: f64,
    /// Length of each layer's looped noise buffer.
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: f64,
    /// Time constant for volume retargets and master changes.
    #[serde(default = "default_ramp_time_constant")]
    pub ramp_time_constant: f64,
    /// Time constant for the fade-out on stop.
    #[serde(default = "default_stop_time_constant")]
    pub stop_time_constant: f64,
    /// Release delay after stop, in multiples of `stop_time_constant`.
    #[serde(default = "default_release_time_constants")]
    pub release_time_constants: f64,
}

fn default_sample_rate() -> f64 {
    44100.0
}

fn default_master_volume() -> f64 {
    0.8
}

fn default_buffer_seconds() -> f64 {
    4.0
}

fn default_ramp_time_constant() -> f64 {
    0.1
}

fn default_stop_time_constant() -> f64 {
    0.3
}

fn default_release_time_constants() -> f64 {
    MIN_RELEASE_TIME_CONSTANTS
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            master_volume: default_master_volume(),
            buffer_seconds: default_buffer_seconds(),
            ramp_time_constant: default_ramp_time_constant(),
            stop_time_constant: default_stop_time_constant(),
            release_time_constants: default_release_time_constants(),
        }
    }
}

impl MixerConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<MixerConfig>(json).map(MixerConfig::sanitized)
    }

    /// Clamp out-of-range values, warning about each correction.
    pub fn sanitized(mut self) -> Self {
        if !(0.0..=1.0).contains(&self.master_volume) {
            log::warn!("master_volume {} out of range, clamping", self.master_volume);
            self.master_volume = clamp_level(self.master_volume);
        }
        if !(self.buffer_seconds > 0.0) {
            log::warn!("buffer_seconds {} must be positive, using default", self.buffer_seconds);
            self.buffer_seconds = default_buffer_seconds();
        }
        if !(self.ramp_time_constant > 0.0) {
            log::warn!("ramp_time_constant {} must be positive, using default", self.ramp_time_constant);
            self.ramp_time_constant = default_ramp_time_constant();
        }
        if !(self.stop_time_constant > 0.0) {
            log::warn!("stop_time_constant {} must be positive, using default", self.stop_time_constant);
            self.stop_time_constant = default_stop_time_constant();
        }
        if !(self.release_time_constants >= MIN_RELEASE_TIME_CONSTANTS) {
            log::warn!(
                "release_time_constants {} would cut the fade short, raising to {}",
                self.release_time_constants,
                MIN_RELEASE_TIME_CONSTANTS
            );
            self.release_time_constants = MIN_RELEASE_TIME_CONSTANTS;
        }
        self
    }

    /// Seconds between `stop` and the release of the sound's nodes.
    pub fn release_delay(&self) -> f64 {
        self.stop_time_constant * self.release_time_constants
    }
}

/// Clamp a level into [0, 1]; NaN becomes silence.
pub fn clamp_level(level: f64) -> f64 {
    if level.is_nan() { 0.0 } else { level.clamp(0.0, 1.0) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_uses_defaults() {
        let cfg = MixerConfig::from_json("{}").unwrap();
        assert_eq!(cfg, MixerConfig::default());
        assert!((cfg.release_delay() - 1.5).abs() < 1e-12);
    }

    #[test]
    fn partial_override() {
        let cfg = MixerConfig::from_json(r#"{ "sample_rate": 48000, "buffer_seconds": 2 }"#).unwrap();
        assert_eq!(cfg.sample_rate, 48000.0);
        assert_eq!(cfg.buffer_seconds, 2.0);
        assert_eq!(cfg.master_volume, 0.8);
    }

    #[test]
    fn release_delay_never_shorter_than_five_tau() {
        let cfg = MixerConfig::from_json(r#"{ "stop_time_constant": 0.3, "release_time_constants": 1.0 }"#)
            .unwrap();
        assert_eq!(cfg.release_time_constants, MIN_RELEASE_TIME_CONSTANTS);
        assert!(cfg.release_delay() >= 5.0 * cfg.stop_time_constant);
    }

    #[test]
    fn bad_values_are_repaired() {
        let cfg = MixerConfig {
            master_volume: 3.0,
            buffer_seconds: 0.0,
            ramp_time_constant: -1.0,
            ..Default::default()
        }
        .sanitized();
        assert_eq!(cfg.master_volume, 1.0);
        assert_eq!(cfg.buffer_seconds, 4.0);
        assert_eq!(cfg.ramp_time_constant, 0.1);
    }

    #[test]
    fn clamp_level_handles_nan() {
        assert_eq!(clamp_level(f64::NAN), 0.0);
        assert_eq!(clamp_level(-0.2), 0.0);
        assert_eq!(clamp_level(0.4), 0.4);
        assert_eq!(clamp_level(1.7), 1.0);
    }
}
