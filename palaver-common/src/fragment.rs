//! Media fragment wire format
//!
//! A single encoded video frame can run to several kilobytes, well past
//! what one datagram should carry, so media payloads are split into
//! bounded fragments and reassembled on the far side. Each fragment
//! carries a fixed-width header; control messages share the same socket
//! as JSON text, and the 4-byte magic tag is the sole discriminator.
//!
//! Wire format (little-endian integers):
//! ```text
//! +-----------+----------------+----------------+
//! | MAGIC (4) | FROM_LEN (1)   | FROM (7)       |
//! +-----------+----------------+----------------+
//! | TO_LEN (1)| TO (7)         | PacketId (4)   |
//! +-----------+----------------+----------------+
//! | FragIndex (2) | TotalFrags (2) | PayloadLen (4) |
//! +-----------+----------------+----------------+
//! |                payload (variable)           |
//! +---------------------------------------------+
//! ```
//!
//! The identity fields are zero-padded to a constant width so the header
//! is always exactly [`FRAGMENT_HEADER_SIZE`] bytes and decodes in O(1).

use std::fmt;

use crate::peer::{PEER_FIELD_SIZE, PeerId};

/// Magic tag marking a datagram as a binary media fragment
pub const MEDIA_MAGIC: [u8; 4] = *b"PMF1";

/// Fixed header size: magic + two identity fields + packet id +
/// fragment index + total fragments + payload length
pub const FRAGMENT_HEADER_SIZE: usize = 4 + 2 * PEER_FIELD_SIZE + 4 + 2 + 2 + 4;

/// Check whether a datagram starts with the media magic tag
///
/// This is the only discriminator between binary media fragments and the
/// JSON control messages sharing the socket.
pub fn is_media_datagram(bytes: &[u8]) -> bool {
    bytes.len() >= MEDIA_MAGIC.len() && bytes[..MEDIA_MAGIC.len()] == MEDIA_MAGIC
}

/// Errors from splitting a payload into fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitError {
    /// Payload is empty
    EmptyPayload,
    /// Fragment size is zero
    ZeroFragmentSize,
    /// Payload would need more fragments than the 2-byte count can carry
    TooManyFragments,
}

impl SplitError {
    /// Convert to a short machine-readable string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyPayload => "empty_payload",
            Self::ZeroFragmentSize => "zero_fragment_size",
            Self::TooManyFragments => "too_many_fragments",
        }
    }
}

impl fmt::Display for SplitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Header of one media fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentHeader {
    /// Sender identity
    pub from: PeerId,
    /// Recipient identity
    pub to: PeerId,
    /// Logical packet this fragment belongs to (monotonic per sender)
    pub packet_id: u32,
    /// Zero-based position of this fragment within the packet
    pub fragment_index: u16,
    /// Declared fragment count for the packet
    pub total_fragments: u16,
    /// Exact length of this fragment's payload slice in bytes
    pub payload_len: u32,
}

impl FragmentHeader {
    /// Serialize the header to its fixed-width wire form
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FRAGMENT_HEADER_SIZE);
        bytes.extend_from_slice(&MEDIA_MAGIC);
        self.from.encode_field(&mut bytes);
        self.to.encode_field(&mut bytes);
        bytes.extend_from_slice(&self.packet_id.to_le_bytes());
        bytes.extend_from_slice(&self.fragment_index.to_le_bytes());
        bytes.extend_from_slice(&self.total_fragments.to_le_bytes());
        bytes.extend_from_slice(&self.payload_len.to_le_bytes());
        bytes
    }

    /// Serialize a complete datagram: header followed by the payload slice
    pub fn to_datagram(&self, payload: &[u8]) -> Vec<u8> {
        let mut bytes = self.to_bytes();
        bytes.reserve(payload.len());
        bytes.extend_from_slice(payload);
        bytes
    }

    /// Deserialize a header from the front of a datagram
    ///
    /// Returns `None` if the magic tag is missing or any field is
    /// malformed. Callers that need to distinguish "not a media datagram"
    /// from "corrupt media datagram" should check [`is_media_datagram`]
    /// first.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < FRAGMENT_HEADER_SIZE || !is_media_datagram(bytes) {
            return None;
        }

        let mut offset = MEDIA_MAGIC.len();
        let from = PeerId::decode_field(&bytes[offset..offset + PEER_FIELD_SIZE])?;
        offset += PEER_FIELD_SIZE;
        let to = PeerId::decode_field(&bytes[offset..offset + PEER_FIELD_SIZE])?;
        offset += PEER_FIELD_SIZE;

        let packet_id = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);
        offset += 4;
        let fragment_index = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        offset += 2;
        let total_fragments = u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        offset += 2;
        let payload_len = u32::from_le_bytes([
            bytes[offset],
            bytes[offset + 1],
            bytes[offset + 2],
            bytes[offset + 3],
        ]);

        Some(Self {
            from,
            to,
            packet_id,
            fragment_index,
            total_fragments,
            payload_len,
        })
    }
}

/// A parsed media fragment: header plus its payload bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFragment {
    /// Fragment header
    pub header: FragmentHeader,
    /// Payload slice carried by this fragment
    pub payload: Vec<u8>,
}

impl MediaFragment {
    /// Deserialize a full media datagram
    ///
    /// Returns `None` if the header is malformed or the payload length
    /// does not match the header's declared length.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let header = FragmentHeader::from_bytes(bytes)?;
        let payload = &bytes[FRAGMENT_HEADER_SIZE..];
        if payload.len() != header.payload_len as usize {
            return None;
        }
        Some(Self {
            header,
            payload: payload.to_vec(),
        })
    }
}

/// Split a payload into bounded fragments
///
/// Payloads that fit one fragment take the fast path: a single fragment
/// with `total_fragments = 1`, which the receiver completes without ever
/// touching its reassembly map. Larger payloads become
/// `ceil(len / max_fragment_size)` fragments with exact byte bounds; each
/// header's `payload_len` records the slice length so the receiver can
/// validate it.
///
/// # Errors
///
/// Returns a `SplitError` variant for empty payloads, a zero fragment
/// size, or payloads too large for the 2-byte fragment count.
pub fn split<'a>(
    from: &PeerId,
    to: &PeerId,
    packet_id: u32,
    payload: &'a [u8],
    max_fragment_size: usize,
) -> Result<Vec<(FragmentHeader, &'a [u8])>, SplitError> {
    if payload.is_empty() {
        return Err(SplitError::EmptyPayload);
    }
    if max_fragment_size == 0 {
        return Err(SplitError::ZeroFragmentSize);
    }

    let total = payload.len().div_ceil(max_fragment_size);
    if total > u16::MAX as usize {
        return Err(SplitError::TooManyFragments);
    }

    let mut fragments = Vec::with_capacity(total);
    for (index, chunk) in payload.chunks(max_fragment_size).enumerate() {
        let header = FragmentHeader {
            from: from.clone(),
            to: to.clone(),
            packet_id,
            fragment_index: index as u16,
            total_fragments: total as u16,
            payload_len: chunk.len() as u32,
        };
        fragments.push((header, chunk));
    }
    Ok(fragments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(name: &str) -> PeerId {
        PeerId::new(name).expect("valid peer name")
    }

    #[test]
    fn test_header_size() {
        // 4 magic + 8 from + 8 to + 4 id + 2 index + 2 total + 4 len
        assert_eq!(FRAGMENT_HEADER_SIZE, 32);
    }

    #[test]
    fn test_header_roundtrip() {
        let header = FragmentHeader {
            from: peer("alice"),
            to: peer("bob"),
            packet_id: 42,
            fragment_index: 3,
            total_fragments: 7,
            payload_len: 600,
        };

        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), FRAGMENT_HEADER_SIZE);

        let decoded = FragmentHeader::from_bytes(&bytes).expect("should decode");
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_constant_width() {
        // Header width does not depend on name length
        let short = FragmentHeader {
            from: peer("a"),
            to: peer("b"),
            packet_id: 0,
            fragment_index: 0,
            total_fragments: 1,
            payload_len: 1,
        };
        let long = FragmentHeader {
            from: peer("maxname"),
            to: peer("longest"),
            packet_id: 0,
            fragment_index: 0,
            total_fragments: 1,
            payload_len: 1,
        };
        assert_eq!(short.to_bytes().len(), long.to_bytes().len());
    }

    #[test]
    fn test_not_a_fragment() {
        assert!(!is_media_datagram(b"{\"type\":\"Register\"}"));
        assert!(!is_media_datagram(b""));
        assert!(!is_media_datagram(b"PM"));
        assert!(FragmentHeader::from_bytes(b"{\"type\":\"Register\"}").is_none());
    }

    #[test]
    fn test_truncated_header() {
        let header = FragmentHeader {
            from: peer("alice"),
            to: peer("bob"),
            packet_id: 1,
            fragment_index: 0,
            total_fragments: 1,
            payload_len: 4,
        };
        let bytes = header.to_bytes();
        assert!(FragmentHeader::from_bytes(&bytes[..FRAGMENT_HEADER_SIZE - 1]).is_none());
    }

    #[test]
    fn test_split_single_fragment_fast_path() {
        // A 150-byte payload fits one fragment
        let payload = vec![7u8; 150];
        let fragments =
            split(&peer("alice"), &peer("bob"), 9, &payload, 1200).expect("should split");

        assert_eq!(fragments.len(), 1);
        let (header, chunk) = &fragments[0];
        assert_eq!(header.fragment_index, 0);
        assert_eq!(header.total_fragments, 1);
        assert_eq!(header.payload_len, 150);
        assert_eq!(*chunk, &payload[..]);
    }

    #[test]
    fn test_split_exact_bounds() {
        // 3000 bytes at 1200 per fragment: 1200, 1200, 600
        let payload: Vec<u8> = (0..3000u32).map(|i| (i % 251) as u8).collect();
        let fragments =
            split(&peer("alice"), &peer("bob"), 5, &payload, 1200).expect("should split");

        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[0].1.len(), 1200);
        assert_eq!(fragments[1].1.len(), 1200);
        assert_eq!(fragments[2].1.len(), 600);

        for (index, (header, chunk)) in fragments.iter().enumerate() {
            assert_eq!(header.fragment_index, index as u16);
            assert_eq!(header.total_fragments, 3);
            assert_eq!(header.payload_len, chunk.len() as u32);
            assert_eq!(header.packet_id, 5);
        }

        // Concatenating the slices in order restores the payload
        let joined: Vec<u8> = fragments
            .iter()
            .flat_map(|(_, chunk)| chunk.iter().copied())
            .collect();
        assert_eq!(joined, payload);
    }

    #[test]
    fn test_split_boundary_multiple() {
        // Exactly two full fragments, no short tail
        let payload = vec![1u8; 2400];
        let fragments =
            split(&peer("alice"), &peer("bob"), 0, &payload, 1200).expect("should split");
        assert_eq!(fragments.len(), 2);
        assert_eq!(fragments[0].1.len(), 1200);
        assert_eq!(fragments[1].1.len(), 1200);
    }

    #[test]
    fn test_split_empty_payload() {
        assert_eq!(
            split(&peer("alice"), &peer("bob"), 0, &[], 1200),
            Err(SplitError::EmptyPayload)
        );
    }

    #[test]
    fn test_split_zero_fragment_size() {
        assert_eq!(
            split(&peer("alice"), &peer("bob"), 0, &[1, 2, 3], 0),
            Err(SplitError::ZeroFragmentSize)
        );
    }

    #[test]
    fn test_split_too_many_fragments() {
        let payload = vec![0u8; (u16::MAX as usize + 1) * 2];
        assert_eq!(
            split(&peer("alice"), &peer("bob"), 0, &payload, 2),
            Err(SplitError::TooManyFragments)
        );
    }

    #[test]
    fn test_media_fragment_roundtrip() {
        let payload = vec![9u8; 600];
        let fragments =
            split(&peer("alice"), &peer("bob"), 3, &payload, 1200).expect("should split");
        let datagram = fragments[0].0.to_datagram(fragments[0].1);

        let parsed = MediaFragment::from_bytes(&datagram).expect("should parse");
        assert_eq!(parsed.header, fragments[0].0);
        assert_eq!(parsed.payload, payload);
    }

    #[test]
    fn test_media_fragment_length_mismatch() {
        let header = FragmentHeader {
            from: peer("alice"),
            to: peer("bob"),
            packet_id: 1,
            fragment_index: 0,
            total_fragments: 1,
            payload_len: 100, // Declares more than the datagram carries
        };
        let datagram = header.to_datagram(&[1, 2, 3]);
        assert!(MediaFragment::from_bytes(&datagram).is_none());
    }
}
