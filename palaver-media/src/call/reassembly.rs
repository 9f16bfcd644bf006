//! Fragment reassembly for incoming media packets
//!
//! Collects fragments per (sender, packet id) until the declared count is
//! reached, then emits the concatenated payload. Incomplete packets are
//! evicted after a staleness window so sustained loss cannot grow the map
//! without bound.
//!
//! The buffer is owned exclusively by the transport receive task, and
//! staleness eviction runs on a timer branch of the same select loop, so
//! accept and cleanup are serialized by construction: a fragment is never
//! validated against an entry that a concurrent sweep is removing, and an
//! entry leaves the map exactly once, on completion or on eviction.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use palaver_common::fragment::FragmentHeader;
use palaver_common::media::{MAX_FRAGMENTS_PER_PACKET, REASSEMBLY_STALE_SECS};
use palaver_common::peer::PeerId;

// =============================================================================
// Accept Outcome
// =============================================================================

/// Outcome of accepting one fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Accept {
    /// All fragments arrived; the payload is reassembled in index order
    Complete(Vec<u8>),
    /// Fragment stored; more are outstanding
    Pending,
    /// Fragment failed validation and was not stored
    Rejected(RejectReason),
}

/// Reasons a fragment is rejected at the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Fragment index at or above the hard per-packet bound
    IndexOutOfBounds,
    /// Fragment index at or above the declared fragment count
    IndexBeyondTotal,
    /// Payload length differs from the header's declared length
    LengthMismatch,
    /// The count was met but an index was missing; the packet is dropped
    /// rather than emitting corrupted data
    MissingFragment,
}

impl RejectReason {
    /// Convert to a short machine-readable string
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IndexOutOfBounds => "index_out_of_bounds",
            Self::IndexBeyondTotal => "index_beyond_total",
            Self::LengthMismatch => "length_mismatch",
            Self::MissingFragment => "missing_fragment",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Reassembly Buffer
// =============================================================================

/// One partially received logical packet
struct PendingPacket {
    /// Received payload slices keyed by fragment index
    fragments: HashMap<u16, Vec<u8>>,
    /// Reconciled fragment count for the packet
    total_fragments: u16,
    /// Arrival time of the first fragment (eviction clock)
    first_seen: Instant,
}

/// Accumulator for in-flight multi-fragment packets
///
/// Keys are (sender, packet id) because packet ids are monotonic per
/// sender, not globally.
pub struct ReassemblyBuffer {
    /// In-flight packets
    packets: HashMap<(PeerId, u32), PendingPacket>,
    /// Retention limit for incomplete packets
    stale_window: Duration,
}

impl ReassemblyBuffer {
    /// Create a buffer with the default staleness window
    pub fn new() -> Self {
        Self::with_stale_window(Duration::from_secs(REASSEMBLY_STALE_SECS))
    }

    /// Create a buffer with a custom staleness window
    pub fn with_stale_window(stale_window: Duration) -> Self {
        Self {
            packets: HashMap::new(),
            stale_window,
        }
    }

    /// Accept one fragment: validate, store, and check for completion
    ///
    /// Validation order: the fragment index is checked against the hard
    /// bound before anything else, so a corrupted header can never cause
    /// unbounded allocation; then against the declared count; then the
    /// payload length against the header. A duplicate index overwrites
    /// the stored slice and does not change the distinct count.
    pub fn accept(&mut self, header: &FragmentHeader, payload: &[u8]) -> Accept {
        if header.fragment_index as usize >= MAX_FRAGMENTS_PER_PACKET {
            return Accept::Rejected(RejectReason::IndexOutOfBounds);
        }
        if header.fragment_index >= header.total_fragments {
            return Accept::Rejected(RejectReason::IndexBeyondTotal);
        }
        if payload.len() != header.payload_len as usize {
            return Accept::Rejected(RejectReason::LengthMismatch);
        }

        // Single-fragment fast path: the common case (one codec frame per
        // datagram) never touches the map
        if header.total_fragments == 1 {
            return Accept::Complete(payload.to_vec());
        }

        let key = (header.from.clone(), header.packet_id);
        let entry = self.packets.entry(key.clone()).or_insert_with(|| PendingPacket {
            fragments: HashMap::new(),
            total_fragments: header.total_fragments,
            first_seen: Instant::now(),
        });

        // Reconcile mismatched counts by adopting the maximum observed.
        // The first-seen declaration may itself have been wrong; rejecting
        // on mismatch would silently drop otherwise-recoverable data.
        // Documented leniency, not strict protocol conformance.
        if header.total_fragments > entry.total_fragments {
            entry.total_fragments = header.total_fragments;
        }

        entry.fragments.insert(header.fragment_index, payload.to_vec());

        if entry.fragments.len() < entry.total_fragments as usize {
            return Accept::Pending;
        }

        // Complete: remove the entry and concatenate in index order
        let Some(packet) = self.packets.remove(&key) else {
            return Accept::Rejected(RejectReason::MissingFragment);
        };

        let size: usize = packet.fragments.values().map(Vec::len).sum();
        let mut payload = Vec::with_capacity(size);
        for index in 0..packet.total_fragments {
            match packet.fragments.get(&index) {
                Some(chunk) => payload.extend_from_slice(chunk),
                // Should not happen given the index checks above, but fail
                // closed: the partial packet is already removed
                None => return Accept::Rejected(RejectReason::MissingFragment),
            }
        }
        Accept::Complete(payload)
    }

    /// Remove incomplete packets older than the staleness window
    ///
    /// Returns the number of packets evicted.
    pub fn evict_stale(&mut self) -> usize {
        let now = Instant::now();
        let before = self.packets.len();
        self.packets
            .retain(|_, packet| now.duration_since(packet.first_seen) < self.stale_window);
        before - self.packets.len()
    }

    /// Number of in-flight (incomplete) packets
    pub fn pending_packets(&self) -> usize {
        self.packets.len()
    }
}

impl Default for ReassemblyBuffer {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
