//! UDP relay transport
//!
//! Owns the single UDP socket a call uses for both binary media fragments
//! and JSON control messages. Sending is connectionless and best-effort:
//! every send reports plain success or failure and nothing retries.
//! Receiving runs in a dedicated task that demultiplexes datagrams by the
//! magic tag, feeds media fragments through the reassembly buffer, and
//! forwards completed packets and session events over a channel.
//!
//! Architecture:
//! - One socket, connected to the relay, shared by all sessions
//! - Packet ids from an atomic counter, so any task can send
//! - The receive task exclusively owns the reassembly buffer
//! - A watch channel signals shutdown; the receive loop polls the socket
//!   with a short timeout so it always notices within one interval

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use palaver_common::control::{ControlMessage, MediaChannel, SessionEventKind};
use palaver_common::fragment::{MediaFragment, is_media_datagram, split};
use palaver_common::media::MAX_MEDIA_DATAGRAM;
use palaver_common::peer::PeerId;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::reassembly::{Accept, ReassemblyBuffer};
use crate::config::CallConfig;

// =============================================================================
// Constants
// =============================================================================

/// Receive buffer size, slightly above the largest valid media datagram
const RECV_BUFFER_SIZE: usize = MAX_MEDIA_DATAGRAM + 64;

/// Socket poll timeout; bounds how long shutdown can take
const RECV_POLL_TIMEOUT_MS: u64 = 100;

/// Delay between consecutive fragments of one packet
///
/// Spreads a multi-fragment burst out so it does not overflow shallow
/// buffers along the path.
const FRAGMENT_PACING_MS: u64 = 2;

/// Interval between reassembly staleness sweeps
const HOUSEKEEPING_INTERVAL_SECS: u64 = 1;

// =============================================================================
// Transport Events
// =============================================================================

/// Events delivered by the receive task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// A complete media packet was reassembled
    MediaReceived {
        /// Peer that sent the packet
        sender: PeerId,
        /// Reassembled payload bytes
        data: Vec<u8>,
    },
    /// A peer opened or closed a media session
    SessionEvent {
        /// The peer the event concerns
        peer: PeerId,
        /// What happened
        kind: SessionEventKind,
    },
    /// The socket failed; the transport is down and no further events
    /// will be delivered
    TransportError(String),
}

// =============================================================================
// Relay Transport
// =============================================================================

/// UDP transport to the media relay
pub struct RelayTransport {
    /// The socket, connected to the relay
    socket: UdpSocket,
    /// Our own identity, stamped on every outgoing fragment
    identity: PeerId,
    /// Next logical packet id (monotonic per sender)
    next_packet_id: AtomicU32,
    /// Datagrams discarded as unparseable
    discarded_datagrams: AtomicU64,
    /// Shutdown signal for the receive task
    shutdown_tx: watch::Sender<bool>,
    /// Largest payload slice per media fragment
    max_fragment_size: usize,
    /// Emit diagnostics for discarded datagrams and rejected fragments
    debug: bool,
}

impl RelayTransport {
    /// Bind a socket and connect it to the relay, with default options
    ///
    /// # Errors
    ///
    /// Returns an error message if the socket couldn't be bound or
    /// connected.
    pub async fn bind(relay_addr: std::net::SocketAddr, identity: PeerId) -> Result<Arc<Self>, String> {
        Self::bind_with(relay_addr, identity, CallConfig::default().max_fragment_size, false).await
    }

    /// Bind using a call configuration
    ///
    /// # Errors
    ///
    /// Returns an error message if the socket couldn't be bound or
    /// connected.
    pub async fn from_config(config: &CallConfig, identity: PeerId) -> Result<Arc<Self>, String> {
        Self::bind_with(
            config.relay_addr,
            identity,
            config.max_fragment_size,
            config.debug,
        )
        .await
    }

    /// Bind a socket with explicit options
    async fn bind_with(
        relay_addr: std::net::SocketAddr,
        identity: PeerId,
        max_fragment_size: usize,
        debug: bool,
    ) -> Result<Arc<Self>, String> {
        let bind_addr = if relay_addr.is_ipv4() {
            "0.0.0.0:0"
        } else {
            "[::]:0"
        };

        let socket = UdpSocket::bind(bind_addr)
            .await
            .map_err(|e| format!("Failed to bind UDP socket: {}", e))?;

        socket
            .connect(relay_addr)
            .await
            .map_err(|e| format!("Failed to connect to relay {}: {}", relay_addr, e))?;

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Arc::new(Self {
            socket,
            identity,
            next_packet_id: AtomicU32::new(0),
            discarded_datagrams: AtomicU64::new(0),
            shutdown_tx,
            max_fragment_size,
            debug,
        }))
    }

    /// Our identity on this transport
    pub fn identity(&self) -> &PeerId {
        &self.identity
    }

    /// Local address the socket is bound to
    ///
    /// # Errors
    ///
    /// Returns the socket error if the address can't be read.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.socket.local_addr()
    }

    /// Number of datagrams discarded as unparseable
    pub fn discarded_datagrams(&self) -> u64 {
        self.discarded_datagrams.load(Ordering::Relaxed)
    }

    // =========================================================================
    // Control Plane
    // =========================================================================

    /// Identify this endpoint to the relay
    ///
    /// Best-effort; returns whether the datagram was handed to the OS.
    pub async fn register(&self) -> bool {
        self.send_control(&ControlMessage::Register {
            from: self.identity.as_str().to_string(),
        })
        .await
    }

    /// Announce a media session to a peer
    pub async fn start_session(&self, peer: &PeerId, channel: MediaChannel) -> bool {
        self.send_control(&ControlMessage::SessionStart {
            from: self.identity.as_str().to_string(),
            to: peer.as_str().to_string(),
            channel,
        })
        .await
    }

    /// Announce the end of a media session
    pub async fn end_session(&self, peer: &PeerId) -> bool {
        self.send_control(&ControlMessage::SessionEnd {
            from: self.identity.as_str().to_string(),
            to: peer.as_str().to_string(),
        })
        .await
    }

    async fn send_control(&self, message: &ControlMessage) -> bool {
        let Ok(bytes) = message.to_bytes() else {
            return false;
        };
        self.socket.send(&bytes).await.is_ok()
    }

    // =========================================================================
    // Media Plane
    // =========================================================================

    /// Send a media payload to a peer, fragmenting as needed
    ///
    /// Allocates the next packet id, splits the payload, and sends each
    /// fragment with a short pacing delay between fragments of the same
    /// packet. Returns `false` if the payload couldn't be split or any
    /// fragment failed to send; nothing retries.
    pub async fn send(&self, peer: &PeerId, payload: &[u8]) -> bool {
        let packet_id = self.next_packet_id.fetch_add(1, Ordering::Relaxed);

        let fragments = match split(&self.identity, peer, packet_id, payload, self.max_fragment_size)
        {
            Ok(fragments) => fragments,
            Err(e) => {
                if self.debug {
                    eprintln!("[media] cannot split payload for {}: {}", peer, e);
                }
                return false;
            }
        };

        let multi = fragments.len() > 1;
        for (index, (header, chunk)) in fragments.iter().enumerate() {
            if multi && index > 0 {
                tokio::time::sleep(Duration::from_millis(FRAGMENT_PACING_MS)).await;
            }
            let datagram = header.to_datagram(chunk);
            if self.socket.send(&datagram).await.is_err() {
                return false;
            }
        }
        true
    }

    // =========================================================================
    // Receive Task
    // =========================================================================

    /// Spawn the receive task
    ///
    /// Runs until [`shutdown`](Self::shutdown) is called, the event
    /// channel closes, or the socket fails. A socket failure is reported
    /// as [`TransportEvent::TransportError`] before the task exits.
    pub fn spawn_receive_loop(
        self: &Arc<Self>,
        event_tx: mpsc::UnboundedSender<TransportEvent>,
    ) -> JoinHandle<()> {
        let transport = Arc::clone(self);
        tokio::spawn(async move {
            transport.receive_loop(event_tx).await;
        })
    }

    /// Signal the receive task to stop
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    async fn receive_loop(&self, event_tx: mpsc::UnboundedSender<TransportEvent>) {
        let mut reassembly = ReassemblyBuffer::new();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut housekeeping =
            tokio::time::interval(Duration::from_secs(HOUSEKEEPING_INTERVAL_SECS));
        let recv_timeout = Duration::from_millis(RECV_POLL_TIMEOUT_MS);
        let mut buf = vec![0u8; RECV_BUFFER_SIZE];

        loop {
            // Subscribing marks the current value as seen, so a shutdown
            // signalled before the task started must be caught here
            if *shutdown_rx.borrow() {
                return;
            }

            tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        return;
                    }
                }
                _ = housekeeping.tick() => {
                    let evicted = reassembly.evict_stale();
                    if evicted > 0 && self.debug {
                        eprintln!("[media] evicted {} stale partial packets", evicted);
                    }
                }
                result = tokio::time::timeout(recv_timeout, self.socket.recv(&mut buf)) => {
                    match result {
                        Ok(Ok(len)) => {
                            self.handle_datagram(&buf[..len], &mut reassembly, &event_tx);
                        }
                        Ok(Err(e)) => {
                            // Socket failure takes the transport down
                            let _ = event_tx.send(TransportEvent::TransportError(format!(
                                "UDP receive failed: {}",
                                e
                            )));
                            return;
                        }
                        Err(_) => {
                            // Poll timeout; loop around to re-check shutdown
                        }
                    }
                }
            }

            if event_tx.is_closed() {
                return;
            }
        }
    }

    fn handle_datagram(
        &self,
        bytes: &[u8],
        reassembly: &mut ReassemblyBuffer,
        event_tx: &mpsc::UnboundedSender<TransportEvent>,
    ) {
        if is_media_datagram(bytes) {
            let Some(fragment) = MediaFragment::from_bytes(bytes) else {
                self.discard("malformed media fragment");
                return;
            };

            match reassembly.accept(&fragment.header, &fragment.payload) {
                Accept::Complete(data) => {
                    let _ = event_tx.send(TransportEvent::MediaReceived {
                        sender: fragment.header.from,
                        data,
                    });
                }
                Accept::Pending => {}
                Accept::Rejected(reason) => {
                    if self.debug {
                        eprintln!(
                            "[media] rejected fragment from {}: {}",
                            fragment.header.from, reason
                        );
                    }
                }
            }
            return;
        }

        match ControlMessage::from_bytes(bytes) {
            Some(ControlMessage::SessionStart { from, channel, .. }) => {
                let Ok(peer) = PeerId::new(&from) else {
                    self.discard("session start with invalid peer name");
                    return;
                };
                let _ = event_tx.send(TransportEvent::SessionEvent {
                    peer,
                    kind: SessionEventKind::Started(channel),
                });
            }
            Some(ControlMessage::SessionEnd { from, .. }) => {
                let Ok(peer) = PeerId::new(&from) else {
                    self.discard("session end with invalid peer name");
                    return;
                };
                let _ = event_tx.send(TransportEvent::SessionEvent {
                    peer,
                    kind: SessionEventKind::Ended,
                });
            }
            // Registration is client-to-relay only; ignore if echoed back
            Some(ControlMessage::Register { .. }) => {}
            None => {
                self.discard("unparseable datagram");
            }
        }
    }

    fn discard(&self, what: &str) {
        self.discarded_datagrams.fetch_add(1, Ordering::Relaxed);
        if self.debug {
            eprintln!("[media] discarded {}", what);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
