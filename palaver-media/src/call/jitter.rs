//! Jitter buffer for received audio
//!
//! Absorbs network arrival jitter by queueing decoded 20ms frames between
//! the receive path and the playback clock. The buffer primes until the
//! low-water mark before emitting, drains one frame per playback tick,
//! and sheds the oldest frames past the high-water mark so latency stays
//! bounded.

use std::collections::VecDeque;

use palaver_common::media::{JITTER_HIGH_WATER_FRAMES, JITTER_LOW_WATER_FRAMES};

// =============================================================================
// Jitter Buffer
// =============================================================================

/// Bounded FIFO of decoded PCM frames
///
/// Not a timestamp-based adaptive buffer: frames play in arrival order
/// and depth alone drives the latency/robustness tradeoff.
pub struct JitterBuffer {
    /// Queued frames, oldest first
    queue: VecDeque<Vec<i16>>,
    /// Minimum depth before playback starts (or restarts after underrun)
    low_water: usize,
    /// Maximum depth; older frames are shed beyond this
    high_water: usize,
    /// Whether we are accumulating toward the low-water mark
    priming: bool,
    /// Times the queue ran dry during playback
    underruns: u64,
    /// Frames shed at the high-water mark
    dropped: u64,
}

impl JitterBuffer {
    /// Create a buffer with the default water marks
    pub fn new() -> Self {
        Self::with_water_marks(JITTER_LOW_WATER_FRAMES, JITTER_HIGH_WATER_FRAMES)
    }

    /// Create a buffer with custom water marks
    pub fn with_water_marks(low_water: usize, high_water: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            low_water,
            high_water,
            priming: true,
            underruns: 0,
            dropped: 0,
        }
    }

    /// Enqueue a decoded frame, shedding the oldest past the high-water mark
    ///
    /// Returns the queue depth after the operation. Depth never exceeds
    /// the high-water mark on return.
    pub fn enqueue(&mut self, frame: Vec<i16>) -> usize {
        self.queue.push_back(frame);
        while self.queue.len() > self.high_water {
            self.queue.pop_front();
            self.dropped += 1;
        }
        self.queue.len()
    }

    /// Take the next frame for playback, if the buffer is ready
    ///
    /// Returns `None` while priming (depth below the low-water mark);
    /// the caller plays silence for that tick. Once primed, every tick
    /// yields a frame until the queue runs dry, which counts an underrun
    /// and re-enters priming.
    pub fn drain_tick(&mut self) -> Option<Vec<i16>> {
        if self.priming {
            if self.queue.len() < self.low_water {
                return None;
            }
            self.priming = false;
        }

        let frame = self.queue.pop_front();
        match frame {
            Some(frame) => {
                if self.queue.is_empty() {
                    self.underruns += 1;
                    self.priming = true;
                }
                Some(frame)
            }
            None => {
                // Drained dry before this tick; re-prime without
                // double-counting the underrun
                self.priming = true;
                None
            }
        }
    }

    /// Current queue depth in frames
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Whether the queue is empty
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Times the queue ran dry during playback
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    /// Frames shed at the high-water mark
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl Default for JitterBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(tag: i16) -> Vec<i16> {
        vec![tag; 960]
    }

    #[test]
    fn test_primes_to_low_water_before_emitting() {
        let mut buffer = JitterBuffer::with_water_marks(2, 10);

        assert!(buffer.drain_tick().is_none());
        buffer.enqueue(frame(1));
        assert!(buffer.drain_tick().is_none());
        buffer.enqueue(frame(2));
        assert_eq!(buffer.drain_tick(), Some(frame(1)));
    }

    #[test]
    fn test_fifo_order() {
        let mut buffer = JitterBuffer::with_water_marks(1, 10);
        for tag in 0..5 {
            buffer.enqueue(frame(tag));
        }
        for tag in 0..5 {
            assert_eq!(buffer.drain_tick(), Some(frame(tag)));
        }
    }

    #[test]
    fn test_depth_never_exceeds_high_water() {
        let mut buffer = JitterBuffer::with_water_marks(2, 10);
        for tag in 0..100 {
            let depth = buffer.enqueue(frame(tag));
            assert!(depth <= 10);
        }
        assert_eq!(buffer.len(), 10);
    }

    #[test]
    fn test_overflow_sheds_oldest() {
        let mut buffer = JitterBuffer::with_water_marks(1, 3);
        for tag in 0..5 {
            buffer.enqueue(frame(tag));
        }
        assert_eq!(buffer.dropped(), 2);
        // Frames 0 and 1 were shed; 2 plays first
        assert_eq!(buffer.drain_tick(), Some(frame(2)));
    }

    #[test]
    fn test_underrun_counts_and_reprimes() {
        let mut buffer = JitterBuffer::with_water_marks(2, 10);
        buffer.enqueue(frame(1));
        buffer.enqueue(frame(2));

        assert_eq!(buffer.drain_tick(), Some(frame(1)));
        // Last frame out: queue hits zero, underrun recorded
        assert_eq!(buffer.drain_tick(), Some(frame(2)));
        assert_eq!(buffer.underruns(), 1);

        // Re-primed: one frame is not enough to resume
        buffer.enqueue(frame(3));
        assert!(buffer.drain_tick().is_none());
        buffer.enqueue(frame(4));
        assert_eq!(buffer.drain_tick(), Some(frame(3)));
    }

    #[test]
    fn test_steady_state_emits_every_tick() {
        let mut buffer = JitterBuffer::with_water_marks(2, 10);
        buffer.enqueue(frame(0));
        buffer.enqueue(frame(1));
        buffer.enqueue(frame(2));

        // One in, one out: never underruns
        for tag in 0..20 {
            assert!(buffer.drain_tick().is_some());
            buffer.enqueue(frame(tag + 3));
        }
        assert_eq!(buffer.underruns(), 0);
    }
}
