//! Volume processing for PCM audio
//!
//! Applies a linear gain to signed 16-bit samples with saturation, used
//! on both the capture path (before encode) and the playback path (after
//! the jitter buffer).

use palaver_common::media::{MAX_GAIN, MIN_GAIN};

/// Linear gain stage for i16 PCM
///
/// Gain is clamped to [0.0, 2.0] at the setter, so `apply` never sees an
/// out-of-range value.
pub struct VolumeProcessor {
    gain: f32,
}

impl VolumeProcessor {
    /// Create a processor with the given gain (clamped)
    pub fn new(gain: f32) -> Self {
        let mut processor = Self { gain: 1.0 };
        processor.set_gain(gain);
        processor
    }

    /// Set the gain, clamped to the valid range
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = gain.clamp(MIN_GAIN, MAX_GAIN);
    }

    /// Current gain
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Scale samples in place with saturation
    ///
    /// Unity gain is a no-op and leaves samples bit-exact.
    pub fn apply(&self, samples: &mut [i16]) {
        if self.gain == 1.0 {
            return;
        }
        for sample in samples.iter_mut() {
            let scaled = (*sample as f32 * self.gain) as i32;
            *sample = scaled.clamp(i16::MIN as i32, i16::MAX as i32) as i16;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unity_gain_is_bit_exact() {
        let processor = VolumeProcessor::new(1.0);
        let original: Vec<i16> = vec![i16::MIN, -1234, 0, 1, 5678, i16::MAX];
        let mut samples = original.clone();
        processor.apply(&mut samples);
        assert_eq!(samples, original);
    }

    #[test]
    fn test_doubling_saturates_at_extremes() {
        let processor = VolumeProcessor::new(2.0);
        let mut samples = vec![i16::MIN, -20000, -100, 0, 100, 20000, i16::MAX];
        processor.apply(&mut samples);
        assert_eq!(
            samples,
            vec![i16::MIN, i16::MIN, -200, 0, 200, i16::MAX, i16::MAX]
        );
    }

    #[test]
    fn test_zero_gain_silences() {
        let processor = VolumeProcessor::new(0.0);
        let mut samples = vec![-5000, 123, 32000];
        processor.apply(&mut samples);
        assert_eq!(samples, vec![0, 0, 0]);
    }

    #[test]
    fn test_half_gain() {
        let processor = VolumeProcessor::new(0.5);
        let mut samples = vec![-1000, 0, 1000];
        processor.apply(&mut samples);
        assert_eq!(samples, vec![-500, 0, 500]);
    }

    #[test]
    fn test_setter_clamps() {
        let mut processor = VolumeProcessor::new(1.0);
        processor.set_gain(-1.0);
        assert_eq!(processor.gain(), 0.0);
        processor.set_gain(5.0);
        assert_eq!(processor.gain(), 2.0);
        processor.set_gain(1.5);
        assert_eq!(processor.gain(), 1.5);
    }

    #[test]
    fn test_constructor_clamps() {
        assert_eq!(VolumeProcessor::new(-3.0).gain(), 0.0);
        assert_eq!(VolumeProcessor::new(99.0).gain(), 2.0);
    }
}
