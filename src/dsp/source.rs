//! Looping stereo buffer source.

use std::sync::Arc;

/// Two equal-length channels of f32 audio.
#[derive(Debug, Clone, PartialEq)]
pub struct StereoBuffer {
    left: Vec<f32>,
    right: Vec<f32>,
}

impl StereoBuffer {
    /// Build from two channels; the longer one is truncated to match.
    pub fn new(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let frames = left.len().min(right.len());
        left.truncate(frames);
        right.truncate(frames);
        StereoBuffer { left, right }
    }

    /// Duplicate a mono signal onto both channels.
    pub fn from_mono(samples: Vec<f32>) -> Self {
        StereoBuffer {
            right: samples.clone(),
            left: samples,
        }
    }

    pub fn frames(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    fn frame(&self, index: usize) -> (f64, f64) {
        (f64::from(self.left[index]), f64::from(self.right[index]))
    }
}

/// Plays a shared buffer in a seamless loop until stopped.
#[derive(Debug, Clone)]
pub struct BufferSource {
    buffer: Arc<StereoBuffer>,
    position: usize,
    running: bool,
}

impl BufferSource {
    pub fn new(buffer: Arc<StereoBuffer>) -> Self {
        BufferSource {
            buffer,
            position: 0,
            running: false,
        }
    }

    pub fn start(&mut self) {
        self.running = true;
    }

    /// Stop playback. Stopping a stopped source is harmless.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Next stereo frame, wrapping at the end of the buffer.
    pub fn next_frame(&mut self) -> (f64, f64) {
        if !self.running || self.buffer.is_empty() {
            return (0.0, 0.0);
        }
        let frame = self.buffer.frame(self.position);
        self.position += 1;
        if self.position >= self.buffer.frames() {
            self.position = 0;
        }
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loops_seamlessly() {
        let buf = Arc::new(StereoBuffer::new(vec![0.1, 0.2, 0.3], vec![-0.1, -0.2, -0.3]));
        let mut src = BufferSource::new(buf);
        src.start();
        let lefts: Vec<f64> = (0..7).map(|_| src.next_frame().0).collect();
        let expected = [0.1, 0.2, 0.3, 0.1, 0.2, 0.3, 0.1];
        for (got, want) in lefts.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
    }

    #[test]
    fn silent_until_started_and_after_stop() {
        let buf = Arc::new(StereoBuffer::from_mono(vec![0.5; 4]));
        let mut src = BufferSource::new(buf);
        assert_eq!(src.next_frame(), (0.0, 0.0));
        src.start();
        assert_eq!(src.next_frame(), (0.5, 0.5));
        src.stop();
        src.stop();
        assert_eq!(src.next_frame(), (0.0, 0.0));
    }

    #[test]
    fn empty_buffer_is_silent() {
        let mut src = BufferSource::new(Arc::new(StereoBuffer::new(vec![], vec![])));
        src.start();
        assert_eq!(src.next_frame(), (0.0, 0.0));
    }

    #[test]
    fn mismatched_channels_are_truncated() {
        let buf = StereoBuffer::new(vec![0.0; 5], vec![0.0; 3]);
        assert_eq!(buf.frames(), 3);
        assert_eq!(buf.left.len(), 3);
        assert_eq!(buf.right.len(), 3);
    }
}
