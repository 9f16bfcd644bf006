//! Peer identity validation
//!
//! Peer names travel in a fixed-width fragment header field (one length
//! byte plus a zero-padded name), so they are bounded to a few bytes and
//! restricted to ASCII graphic characters. Validation happens once at
//! construction; everything downstream can trust a `PeerId`.

use std::fmt;

/// Maximum peer name length in bytes
pub const MAX_PEER_NAME_LEN: usize = 7;

/// Width of an encoded identity field (length byte + padded name)
pub const PEER_FIELD_SIZE: usize = 1 + MAX_PEER_NAME_LEN;

/// Validation error for peer names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerIdError {
    /// Name is empty
    Empty,
    /// Name exceeds the maximum length
    TooLong,
    /// Name contains characters outside the ASCII graphic range
    InvalidCharacters,
}

impl PeerIdError {
    /// Convert to a short machine-readable string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::TooLong => "too_long",
            Self::InvalidCharacters => "invalid_characters",
        }
    }
}

impl fmt::Display for PeerIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A validated peer name
///
/// Guaranteed non-empty, at most [`MAX_PEER_NAME_LEN`] bytes, ASCII
/// graphic characters only, so it always round-trips through the
/// fixed-width header field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PeerId(String);

impl PeerId {
    /// Validate and construct a peer identity
    ///
    /// # Errors
    ///
    /// Returns a `PeerIdError` variant describing the validation failure.
    pub fn new(name: &str) -> Result<Self, PeerIdError> {
        if name.is_empty() {
            return Err(PeerIdError::Empty);
        }
        if name.len() > MAX_PEER_NAME_LEN {
            return Err(PeerIdError::TooLong);
        }
        if !name.chars().all(|ch| ch.is_ascii_graphic()) {
            return Err(PeerIdError::InvalidCharacters);
        }
        Ok(Self(name.to_string()))
    }

    /// Get the name as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Append the fixed-width wire encoding of this identity
    ///
    /// Writes exactly [`PEER_FIELD_SIZE`] bytes: the name length, the name
    /// bytes, and zero padding up to the field width.
    pub fn encode_field(&self, out: &mut Vec<u8>) {
        let bytes = self.0.as_bytes();
        out.push(bytes.len() as u8);
        out.extend_from_slice(bytes);
        out.extend(std::iter::repeat_n(0u8, MAX_PEER_NAME_LEN - bytes.len()));
    }

    /// Decode an identity from a fixed-width wire field
    ///
    /// Returns `None` if the length byte or name bytes are invalid.
    pub fn decode_field(field: &[u8]) -> Option<Self> {
        if field.len() != PEER_FIELD_SIZE {
            return None;
        }
        let len = field[0] as usize;
        if len == 0 || len > MAX_PEER_NAME_LEN {
            return None;
        }
        let name = std::str::from_utf8(&field[1..1 + len]).ok()?;
        Self::new(name).ok()
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(PeerId::new("alice").is_ok());
        assert!(PeerId::new("Bob-2").is_ok());
        assert!(PeerId::new("a").is_ok());
        assert!(PeerId::new(&"x".repeat(MAX_PEER_NAME_LEN)).is_ok());
    }

    #[test]
    fn test_empty() {
        assert_eq!(PeerId::new(""), Err(PeerIdError::Empty));
    }

    #[test]
    fn test_too_long() {
        let name = "x".repeat(MAX_PEER_NAME_LEN + 1);
        assert_eq!(PeerId::new(&name), Err(PeerIdError::TooLong));
    }

    #[test]
    fn test_invalid_characters() {
        assert_eq!(PeerId::new("a b"), Err(PeerIdError::InvalidCharacters));
        assert_eq!(PeerId::new("用户"), Err(PeerIdError::InvalidCharacters));
        assert_eq!(PeerId::new("a\n"), Err(PeerIdError::InvalidCharacters));
    }

    #[test]
    fn test_field_roundtrip() {
        let peer = PeerId::new("carol").expect("valid name");
        let mut field = Vec::new();
        peer.encode_field(&mut field);

        assert_eq!(field.len(), PEER_FIELD_SIZE);
        assert_eq!(field[0], 5);
        // Unused name bytes are zero-padded
        assert_eq!(&field[6..], &[0, 0]);

        let decoded = PeerId::decode_field(&field).expect("should decode");
        assert_eq!(decoded, peer);
    }

    #[test]
    fn test_field_roundtrip_max_length() {
        let peer = PeerId::new("maxname").expect("valid name");
        let mut field = Vec::new();
        peer.encode_field(&mut field);

        let decoded = PeerId::decode_field(&field).expect("should decode");
        assert_eq!(decoded.as_str(), "maxname");
    }

    #[test]
    fn test_decode_invalid_fields() {
        // Wrong width
        assert!(PeerId::decode_field(&[1, b'a']).is_none());
        // Zero length
        assert!(PeerId::decode_field(&[0; PEER_FIELD_SIZE]).is_none());
        // Length beyond the field
        let mut field = [0u8; PEER_FIELD_SIZE];
        field[0] = (MAX_PEER_NAME_LEN + 1) as u8;
        assert!(PeerId::decode_field(&field).is_none());
        // Non-graphic name bytes
        let field = [3u8, b'a', 0x07, b'b', 0, 0, 0, 0];
        assert!(PeerId::decode_field(&field).is_none());
    }

    #[test]
    fn test_error_strings() {
        assert_eq!(PeerIdError::Empty.as_str(), "empty");
        assert_eq!(PeerIdError::TooLong.as_str(), "too_long");
        assert_eq!(
            PeerIdError::InvalidCharacters.as_str(),
            "invalid_characters"
        );
    }
}
