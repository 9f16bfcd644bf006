//! Call media pipeline
//!
//! Components of an active call, leaf-first: fragment reassembly, jitter
//! buffering, volume processing, the Opus codec adapter, the UDP relay
//! transport, and the audio loop that wires them together.

pub mod audio;
pub mod codec;
pub mod jitter;
pub mod reassembly;
pub mod transport;
pub mod volume;

pub use audio::{AudioCallCommand, AudioCallEvent, run_audio_call};
pub use transport::{RelayTransport, TransportEvent};
