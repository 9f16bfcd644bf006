//! Opus codec adapter for call audio
//!
//! Wraps the Opus encoder and decoder behind a fixed frame contract: one
//! call consumes or produces exactly one 20ms block of i16 PCM. Partial
//! blocks are rejected rather than padded so a sizing bug upstream never
//! turns into garbled audio.

use opus::{Application, Channels, Decoder, Encoder};
use palaver_common::media::{CHANNELS, SAMPLE_RATE, SAMPLES_PER_FRAME};
use serde::{Deserialize, Serialize};

// =============================================================================
// Constants
// =============================================================================

/// Maximum encoded frame size in bytes
///
/// At 96kbps with 20ms frames: 96000 * 0.020 / 8 = 240 bytes typical.
/// We allow extra headroom for codec overhead.
const MAX_ENCODED_FRAME_SIZE: usize = 512;

// =============================================================================
// Audio Quality
// =============================================================================

/// Audio quality preset (maps to encoder bitrate)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AudioQuality {
    /// 16 kbps, lowest bandwidth
    Low,
    /// 32 kbps
    Medium,
    /// 64 kbps, default
    #[default]
    High,
    /// 96 kbps, highest quality
    VeryHigh,
}

impl AudioQuality {
    /// Encoder bitrate in bits per second
    #[must_use]
    pub fn bitrate(&self) -> i32 {
        match self {
            Self::Low => 16_000,
            Self::Medium => 32_000,
            Self::High => 64_000,
            Self::VeryHigh => 96_000,
        }
    }

    /// All presets, lowest to highest
    #[must_use]
    pub fn all() -> &'static [AudioQuality] {
        &[Self::Low, Self::Medium, Self::High, Self::VeryHigh]
    }
}

// =============================================================================
// Audio Encoder
// =============================================================================

/// Opus encoder for outgoing call audio
pub struct AudioEncoder {
    /// The Opus encoder instance
    encoder: Encoder,
}

impl AudioEncoder {
    /// Create a new encoder with the specified quality
    ///
    /// # Errors
    ///
    /// Returns an error message if the encoder couldn't be created or
    /// the bitrate couldn't be set.
    pub fn new(quality: AudioQuality) -> Result<Self, String> {
        let channels = if CHANNELS == 1 {
            Channels::Mono
        } else {
            Channels::Stereo
        };

        let mut encoder = Encoder::new(SAMPLE_RATE, channels, Application::Voip)
            .map_err(|e| format!("Failed to create Opus encoder: {}", e))?;

        encoder
            .set_bitrate(opus::Bitrate::Bits(quality.bitrate()))
            .map_err(|e| format!("Failed to set bitrate: {}", e))?;

        Ok(Self { encoder })
    }

    /// Update the encoder's bitrate dynamically
    ///
    /// # Errors
    ///
    /// Returns an error message if the bitrate couldn't be set.
    pub fn set_quality(&mut self, quality: AudioQuality) -> Result<(), String> {
        self.encoder
            .set_bitrate(opus::Bitrate::Bits(quality.bitrate()))
            .map_err(|e| format!("Failed to set bitrate: {}", e))
    }

    /// Encode one 20ms block of i16 PCM
    ///
    /// # Errors
    ///
    /// Returns an error if the block is not exactly one frame or if the
    /// codec rejects it.
    pub fn encode(&mut self, samples: &[i16]) -> Result<Vec<u8>, String> {
        if samples.len() != SAMPLES_PER_FRAME as usize {
            return Err(format!(
                "Expected {} samples, got {}",
                SAMPLES_PER_FRAME,
                samples.len()
            ));
        }

        let mut output = vec![0u8; MAX_ENCODED_FRAME_SIZE];

        let len = self
            .encoder
            .encode(samples, &mut output)
            .map_err(|e| format!("Opus encode error: {}", e))?;

        output.truncate(len);
        Ok(output)
    }
}

// =============================================================================
// Audio Decoder
// =============================================================================

/// Opus decoder for incoming call audio
pub struct AudioDecoder {
    /// The Opus decoder instance
    decoder: Decoder,
}

impl AudioDecoder {
    /// Create a new decoder
    ///
    /// # Errors
    ///
    /// Returns an error message if the decoder couldn't be created.
    pub fn new() -> Result<Self, String> {
        let channels = if CHANNELS == 1 {
            Channels::Mono
        } else {
            Channels::Stereo
        };

        let decoder = Decoder::new(SAMPLE_RATE, channels)
            .map_err(|e| format!("Failed to create Opus decoder: {}", e))?;

        Ok(Self { decoder })
    }

    /// Decode one compressed frame to a 20ms block of i16 PCM
    ///
    /// # Errors
    ///
    /// Returns an error if the codec rejects the frame or the decoded
    /// block is not exactly one frame.
    pub fn decode(&mut self, data: &[u8]) -> Result<Vec<i16>, String> {
        let mut output = vec![0i16; SAMPLES_PER_FRAME as usize];

        let len = self
            .decoder
            .decode(data, &mut output, false)
            .map_err(|e| format!("Opus decode error: {}", e))?;

        if len != SAMPLES_PER_FRAME as usize {
            return Err(format!(
                "Decoded {} samples, expected {}",
                len, SAMPLES_PER_FRAME
            ));
        }

        Ok(output)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_bitrates_increase() {
        let mut previous = 0;
        for quality in AudioQuality::all() {
            assert!(quality.bitrate() > previous);
            previous = quality.bitrate();
        }
    }

    #[test]
    fn test_encoder_creation() {
        let encoder = AudioEncoder::new(AudioQuality::High);
        assert!(encoder.is_ok());
    }

    #[test]
    fn test_encoder_set_quality() {
        let mut encoder = AudioEncoder::new(AudioQuality::High).unwrap();

        assert!(encoder.set_quality(AudioQuality::Low).is_ok());
        assert!(encoder.set_quality(AudioQuality::Medium).is_ok());
        assert!(encoder.set_quality(AudioQuality::VeryHigh).is_ok());

        // Encoding should still work after quality change
        let samples = vec![0i16; SAMPLES_PER_FRAME as usize];
        assert!(encoder.encode(&samples).is_ok());
    }

    #[test]
    fn test_decoder_creation() {
        let decoder = AudioDecoder::new();
        assert!(decoder.is_ok());
    }

    #[test]
    fn test_encode_decode_roundtrip() {
        let mut encoder = AudioEncoder::new(AudioQuality::High).unwrap();
        let mut decoder = AudioDecoder::new().unwrap();

        // A 440Hz sine wave at half amplitude
        let samples: Vec<i16> = (0..SAMPLES_PER_FRAME)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                (f32::sin(2.0 * std::f32::consts::PI * 440.0 * t) * 16000.0) as i16
            })
            .collect();

        let encoded = encoder.encode(&samples).unwrap();
        assert!(!encoded.is_empty());
        assert!(encoded.len() < samples.len() * 2); // Smaller than raw PCM

        let decoded = decoder.decode(&encoded).unwrap();
        assert_eq!(decoded.len(), SAMPLES_PER_FRAME as usize);

        // Lossy compression, so just verify we got signal, not silence
        let max_amplitude = decoded.iter().map(|&s| s.unsigned_abs()).max().unwrap_or(0);
        assert!(max_amplitude > 1000, "Decoded audio seems too quiet");
    }

    #[test]
    fn test_encoder_wrong_frame_size() {
        let mut encoder = AudioEncoder::new(AudioQuality::High).unwrap();

        // Too few samples
        let samples = vec![0i16; 100];
        assert!(encoder.encode(&samples).is_err());

        // Too many samples
        let samples = vec![0i16; SAMPLES_PER_FRAME as usize * 2];
        assert!(encoder.encode(&samples).is_err());
    }

    #[test]
    fn test_decoder_rejects_garbage() {
        let mut decoder = AudioDecoder::new().unwrap();
        assert!(decoder.decode(&[0xff; 7]).is_err());
    }
}
