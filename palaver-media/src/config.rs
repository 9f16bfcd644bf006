//! Call configuration
//!
//! Settings the UI layer persists and hands to the media engine when a
//! call starts. Every field has a default so a partial config file still
//! deserializes.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use palaver_common::DEFAULT_RELAY_PORT;
use palaver_common::media::MAX_FRAGMENT_PAYLOAD;
use serde::{Deserialize, Serialize};

use crate::call::codec::AudioQuality;

// =============================================================================
// Audio Settings
// =============================================================================

/// Per-call audio settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioSettings {
    /// Gain applied to captured audio before encoding
    #[serde(default = "default_gain")]
    pub capture_gain: f32,
    /// Gain applied to received audio before playback
    #[serde(default = "default_gain")]
    pub playback_gain: f32,
    /// Encoder quality preset
    #[serde(default)]
    pub quality: AudioQuality,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            capture_gain: default_gain(),
            playback_gain: default_gain(),
            quality: AudioQuality::default(),
        }
    }
}

fn default_gain() -> f32 {
    1.0
}

// =============================================================================
// Call Config
// =============================================================================

/// Configuration for the relay transport and audio pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallConfig {
    /// Relay server address
    #[serde(default = "default_relay_addr")]
    pub relay_addr: SocketAddr,
    /// Largest payload slice per media fragment
    #[serde(default = "default_max_fragment_size")]
    pub max_fragment_size: usize,
    /// Emit diagnostic output for discarded datagrams and rejections
    #[serde(default)]
    pub debug: bool,
    /// Audio pipeline settings
    #[serde(default)]
    pub audio: AudioSettings,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            relay_addr: default_relay_addr(),
            max_fragment_size: default_max_fragment_size(),
            debug: false,
            audio: AudioSettings::default(),
        }
    }
}

fn default_relay_addr() -> SocketAddr {
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), DEFAULT_RELAY_PORT)
}

fn default_max_fragment_size() -> usize {
    MAX_FRAGMENT_PAYLOAD
}

// =============================================================================
// Tests
// =============================================================================
