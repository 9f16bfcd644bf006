//! Shared media constants
//!
//! The codec frame contract (sample rate, frame duration, block size) is
//! shared by the jitter buffer tick, the volume processor block size, and
//! the codec adapter. Transport bounds live here too so both endpoints
//! agree on them.

/// Sample rate for call audio (48kHz, required by Opus)
pub const SAMPLE_RATE: u32 = 48000;

/// Codec frame duration in milliseconds
///
/// Every timing budget in the audio path is a multiple of this: the
/// jitter drain tick fires once per frame and the codec consumes exactly
/// one frame per call.
pub const FRAME_DURATION_MS: u32 = 20;

/// Number of samples per codec frame at 48kHz with 20ms frames
pub const SAMPLES_PER_FRAME: u32 = SAMPLE_RATE * FRAME_DURATION_MS / 1000;

/// Number of audio channels (mono)
pub const CHANNELS: u16 = 1;

/// Largest payload slice carried by one media fragment
///
/// Chosen to keep the full datagram below common path MTUs so fragments
/// are never split again by the network layer.
pub const MAX_FRAGMENT_PAYLOAD: usize = 1200;

/// Largest media datagram (fixed header + one payload slice)
pub const MAX_MEDIA_DATAGRAM: usize = crate::fragment::FRAGMENT_HEADER_SIZE + MAX_FRAGMENT_PAYLOAD;

/// Hard upper bound on fragments per logical packet
///
/// Guards the reassembly map against corrupted headers declaring huge
/// fragment counts; at the default fragment size this still allows
/// payloads over 1MB.
pub const MAX_FRAGMENTS_PER_PACKET: usize = 1024;

/// Staleness window for incomplete reassembly entries (seconds)
pub const REASSEMBLY_STALE_SECS: u64 = 5;

/// Jitter buffer low-water mark in codec frames (2 frames = 40ms)
pub const JITTER_LOW_WATER_FRAMES: usize = 2;

/// Jitter buffer high-water mark in codec frames (10 frames = 200ms)
pub const JITTER_HIGH_WATER_FRAMES: usize = 10;

/// Minimum volume gain
pub const MIN_GAIN: f32 = 0.0;

/// Maximum volume gain
pub const MAX_GAIN: f32 = 2.0;
