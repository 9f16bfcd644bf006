//! Palaver Common Library
//!
//! Shared wire-format types and constants for the Palaver call media
//! transport: fragment headers, control messages, peer identities, and
//! the codec frame contract.

pub mod control;
pub mod fragment;
pub mod media;
pub mod peer;

/// Default UDP port for the media relay
pub const DEFAULT_RELAY_PORT: u16 = 7750;
