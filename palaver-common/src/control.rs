//! Control messages for the relay channel
//!
//! Registration and session lifecycle travel as human-readable JSON
//! datagrams on the same socket as binary media fragments. A JSON
//! datagram always starts with `{`, so it can never carry the media
//! magic tag; the receiver tries a control parse only after the magic
//! check fails.
//!
//! These messages are advisory. The transport is connectionless and the
//! relay does not acknowledge them; session intent is tracked by the
//! local consumer.

use serde::{Deserialize, Serialize};

/// Logical media channel of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaChannel {
    /// Voice audio (Opus frames)
    #[default]
    Audio,
    /// Video frames
    Video,
}

/// Control messages exchanged with the relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ControlMessage {
    /// Identify this endpoint to the relay (best-effort, no ack)
    Register { from: String },
    /// Announce intent to stream media to a peer
    SessionStart {
        from: String,
        to: String,
        channel: MediaChannel,
    },
    /// Announce the end of a media session
    SessionEnd { from: String, to: String },
}

impl ControlMessage {
    /// Serialize to a JSON datagram
    ///
    /// # Errors
    ///
    /// Returns the serializer's message if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, String> {
        serde_json::to_vec(self).map_err(|e| format!("Failed to encode control message: {}", e))
    }

    /// Deserialize from a JSON datagram
    ///
    /// Returns `None` if the datagram is not a valid control message.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

/// Session lifecycle notification delivered to the local consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEventKind {
    /// The peer opened a media session on the given channel
    Started(MediaChannel),
    /// The peer closed its media session
    Ended,
}
