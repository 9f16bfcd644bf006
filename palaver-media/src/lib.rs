//! Palaver Media Engine
//!
//! Real-time call media transport for the Palaver chat client. Streams
//! audio and video over a best-effort UDP relay when direct connections
//! are degraded: oversized payloads are fragmented and reassembled out of
//! order under loss, and bursty audio arrival is smoothed into a steady
//! 20ms playback cadence by a bounded jitter buffer.
//!
//! The UI shell, device enumeration, call signaling, and codec internals
//! live elsewhere; this crate ends at PCM channels on the audio side and
//! reassembled frame bytes on the video side.

pub mod call;
pub mod config;
