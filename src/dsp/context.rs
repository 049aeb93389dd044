//! Audio-processing context: sample clock, run state and node bookkeeping.

use std::collections::HashSet;

use crate::error::ContextError;

/// Legal sample-rate range (same bounds WebAudio enforces).
pub const MIN_SAMPLE_RATE: f64 = 3000.0;
pub const MAX_SAMPLE_RATE: f64 = 768000.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    /// Created but not yet allowed to produce sound (autoplay policy).
    Suspended,
    Running,
}

/// Handle for one processing node owned by the context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u64);

#[derive(Debug)]
pub struct AudioContext {
    sample_rate: f64,
    state: ContextState,
    /// Frames rendered while running.
    frame: u64,
    next_node: u64,
    live: HashSet<NodeId>,
}

impl AudioContext {
    pub fn new(sample_rate: f64) -> Result<Self, ContextError> {
        if !sample_rate.is_finite() || !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&sample_rate) {
            return Err(ContextError::UnsupportedSampleRate {
                rate: sample_rate,
                min: MIN_SAMPLE_RATE,
                max: MAX_SAMPLE_RATE,
            });
        }
        Ok(AudioContext {
            sample_rate,
            state: ContextState::Suspended,
            frame: 0,
            next_node: 0,
            live: HashSet::new(),
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn state(&self) -> ContextState {
        self.state
    }

    pub fn resume(&mut self) {
        self.state = ContextState::Running;
    }

    pub fn suspend(&mut self) {
        self.state = ContextState::Suspended;
    }

    pub fn is_running(&self) -> bool {
        self.state == ContextState::Running
    }

    /// Current position of the audio clock in frames.
    pub fn current_frame(&self) -> u64 {
        self.frame
    }

    /// Current position of the audio clock in seconds.
    pub fn current_time(&self) -> f64 {
        self.frame as f64 / self.sample_rate
    }

    pub(crate) fn advance(&mut self, frames: usize) {
        self.frame += frames as u64;
    }

    /// Convert a duration in seconds to a whole number of frames (rounded up).
    pub fn seconds_to_frames(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate).ceil() as u64
    }

    pub fn allocate_node(&mut self) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node += 1;
        self.live.insert(id);
        id
    }

    /// Release a node. Returns false if it was already released.
    pub fn release_node(&mut self, id: NodeId) -> bool {
        self.live.remove(&id)
    }

    /// Number of nodes allocated and not yet released.
    pub fn live_nodes(&self) -> usize {
        self.live.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_unsupported_rates() {
        for rate in [0.0, -44100.0, 100.0, 1e7, f64::NAN, f64::INFINITY] {
            assert!(AudioContext::new(rate).is_err(), "{rate} should be rejected");
        }
        assert!(AudioContext::new(44100.0).is_ok());
    }

    #[test]
    fn starts_suspended_and_resumes() {
        let mut ctx = AudioContext::new(48000.0).unwrap();
        assert_eq!(ctx.state(), ContextState::Suspended);
        ctx.resume();
        assert!(ctx.is_running());
        ctx.resume();
        assert!(ctx.is_running());
    }

    #[test]
    fn double_release_is_noop() {
        let mut ctx = AudioContext::new(8000.0).unwrap();
        let a = ctx.allocate_node();
        let b = ctx.allocate_node();
        assert_ne!(a, b);
        assert_eq!(ctx.live_nodes(), 2);
        assert!(ctx.release_node(a));
        assert!(!ctx.release_node(a));
        assert!(!ctx.live.contains(&a));
        assert!(ctx.live.contains(&b));
        assert_eq!(ctx.live_nodes(), 1);
    }

    #[test]
    fn clock_conversions() {
        let mut ctx = AudioContext::new(8000.0).unwrap();
        assert_eq!(ctx.seconds_to_frames(0.5), 4000);
        assert_eq!(ctx.seconds_to_frames(-1.0), 0);
        ctx.advance(2000);
        assert_eq!(ctx.current_frame(), 2000);
        assert!((ctx.current_time() - 0.25).abs() < 1e-12);
    }
}
