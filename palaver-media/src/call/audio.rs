//! Audio call loop
//!
//! Drives one audio session end to end: captured PCM blocks are gained,
//! encoded, and sent through the relay transport; received frames are
//! decoded, jitter-buffered, gained, and handed to playback on a fixed
//! 20ms cadence.
//!
//! Channel layout:
//! - `capture_rx`: one 960-sample block per message from the capture side
//! - `playback_tx`: one 960-sample block per tick toward the output side
//! - `media_rx`: reassembled compressed frames from the transport
//! - `command_rx`: live adjustments (gain, quality, stop)
//! - `event_tx`: observability events; no consumer decision rides on them

use std::sync::Arc;
use std::time::Duration;

use palaver_common::media::{FRAME_DURATION_MS, SAMPLES_PER_FRAME};
use palaver_common::peer::PeerId;
use tokio::sync::mpsc;

use super::codec::{AudioDecoder, AudioEncoder, AudioQuality};
use super::jitter::JitterBuffer;
use super::transport::RelayTransport;
use super::volume::VolumeProcessor;
use crate::config::AudioSettings;

// =============================================================================
// Commands and Events
// =============================================================================

/// Live adjustments to a running audio call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AudioCallCommand {
    /// Change the capture-side gain
    SetCaptureGain(f32),
    /// Change the playback-side gain
    SetPlaybackGain(f32),
    /// Change the encoder quality preset
    SetQuality(AudioQuality),
    /// End the call loop
    Stop,
}

/// Observability events from a running audio call
///
/// These report what happened; the loop has already taken its action
/// (dropped the frame, re-primed the buffer) by the time one is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioCallEvent {
    /// The jitter buffer ran dry during playback
    Underrun,
    /// A received frame failed to decode and was dropped
    DecodeFailed(String),
    /// An encoded frame could not be handed to the transport
    SendFailed,
    /// A quality change was rejected by the encoder
    QualityChangeFailed(String),
    /// The codec could not be constructed; the loop did not start
    CodecUnavailable(String),
    /// The loop exited
    Stopped,
}

// =============================================================================
// Call Loop
// =============================================================================

/// Run one audio call until stopped
///
/// Exits when a [`AudioCallCommand::Stop`] arrives, the command or
/// capture channel closes, or the media channel closes (transport down).
/// Always sends [`AudioCallEvent::Stopped`] last.
pub async fn run_audio_call(
    transport: Arc<RelayTransport>,
    peer: PeerId,
    settings: AudioSettings,
    mut capture_rx: mpsc::Receiver<Vec<i16>>,
    playback_tx: mpsc::Sender<Vec<i16>>,
    mut media_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    event_tx: mpsc::UnboundedSender<AudioCallEvent>,
    mut command_rx: mpsc::UnboundedReceiver<AudioCallCommand>,
) {
    let mut encoder = match AudioEncoder::new(settings.quality) {
        Ok(encoder) => encoder,
        Err(e) => {
            let _ = event_tx.send(AudioCallEvent::CodecUnavailable(e));
            let _ = event_tx.send(AudioCallEvent::Stopped);
            return;
        }
    };
    let mut decoder = match AudioDecoder::new() {
        Ok(decoder) => decoder,
        Err(e) => {
            let _ = event_tx.send(AudioCallEvent::CodecUnavailable(e));
            let _ = event_tx.send(AudioCallEvent::Stopped);
            return;
        }
    };

    let mut jitter = JitterBuffer::new();
    let mut capture_volume = VolumeProcessor::new(settings.capture_gain);
    let mut playback_volume = VolumeProcessor::new(settings.playback_gain);
    let mut reported_underruns = 0u64;

    let mut playback_tick =
        tokio::time::interval(Duration::from_millis(FRAME_DURATION_MS as u64));
    playback_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = playback_tick.tick() => {
                if let Some(mut frame) = jitter.drain_tick() {
                    playback_volume.apply(&mut frame);
                    // Playback lagging is its problem; dropping here keeps
                    // the drain cadence steady
                    let _ = playback_tx.try_send(frame);
                }
                let underruns = jitter.underruns();
                if underruns > reported_underruns {
                    reported_underruns = underruns;
                    let _ = event_tx.send(AudioCallEvent::Underrun);
                }
            }

            block = capture_rx.recv() => {
                let Some(mut block) = block else {
                    break;
                };
                // The codec contract is one exact frame per call
                if block.len() != SAMPLES_PER_FRAME as usize {
                    continue;
                }
                capture_volume.apply(&mut block);
                match encoder.encode(&block) {
                    Ok(encoded) => {
                        if !transport.send(&peer, &encoded).await {
                            let _ = event_tx.send(AudioCallEvent::SendFailed);
                        }
                    }
                    Err(_) => {
                        // Drop the frame; the stream continues
                    }
                }
            }

            frame = media_rx.recv() => {
                let Some(frame) = frame else {
                    break;
                };
                match decoder.decode(&frame) {
                    Ok(pcm) => {
                        jitter.enqueue(pcm);
                    }
                    Err(e) => {
                        let _ = event_tx.send(AudioCallEvent::DecodeFailed(e));
                    }
                }
            }

            command = command_rx.recv() => {
                match command {
                    Some(AudioCallCommand::SetCaptureGain(gain)) => {
                        capture_volume.set_gain(gain);
                    }
                    Some(AudioCallCommand::SetPlaybackGain(gain)) => {
                        playback_volume.set_gain(gain);
                    }
                    Some(AudioCallCommand::SetQuality(quality)) => {
                        if let Err(e) = encoder.set_quality(quality) {
                            let _ = event_tx.send(AudioCallEvent::QualityChangeFailed(e));
                        }
                    }
                    Some(AudioCallCommand::Stop) | None => {
                        break;
                    }
                }
            }
        }
    }

    let _ = event_tx.send(AudioCallEvent::Stopped);
}

// =============================================================================
// Tests
// =============================================================================
