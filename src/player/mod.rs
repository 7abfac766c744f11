//! Receiver-side playout: pulls decoded audio out of the jitter buffer,
//! decodes it, and writes PCM to an audio output sink.
//!
//! One `Player` runs per active session, alongside the RTP receive task and
//! the retransmit timer. It never touches the network itself — it only
//! drains `RtpBuffer`.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::time::interval;

use crate::audio::format::{AudioFormat, ChannelConfig, SampleFormat, SampleRate};
use crate::audio::output::{AudioOutput, AudioOutputError};
use crate::protocol::rtp::RtpBuffer;
use crate::receiver::session::{AudioCodec, StreamParameters};

#[cfg(test)]
mod tests;

/// How often the player polls the jitter buffer for the next packet.
const POLL_INTERVAL: Duration = Duration::from_millis(4);

/// Errors raised while decoding a compressed audio packet.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The decoder rejected the packet as malformed.
    #[error("decode failed: {0}")]
    Malformed(String),
}

/// Black-box decoder contract for compressed codecs (ALAC, AAC). No
/// concrete ALAC/AAC implementation ships in this crate; an embedder with
/// access to a real decoder supplies one. [`PcmDecoder`] is the only
/// built-in implementation, for sessions negotiated as raw PCM.
pub trait AudioDecoder: Send {
    /// Decode one packet's payload into interleaved PCM frames matching the
    /// negotiated `AudioFormat`.
    ///
    /// # Errors
    /// Returns `DecodeError` if the packet can't be decoded.
    fn decode(&mut self, packet: &[u8]) -> Result<Vec<u8>, DecodeError>;
}

/// Decoder for the `Pcm`/L16 codec. RAOP's uncompressed option carries
/// network-byte-order (big-endian) 16-bit samples; this just byte-swaps
/// them into the host's native layout.
#[derive(Debug, Default)]
pub struct PcmDecoder;

impl AudioDecoder for PcmDecoder {
    fn decode(&mut self, packet: &[u8]) -> Result<Vec<u8>, DecodeError> {
        if packet.len() % 2 != 0 {
            return Err(DecodeError::Malformed("odd-length PCM packet".to_string()));
        }
        let mut pcm = Vec::with_capacity(packet.len());
        for sample in packet.chunks_exact(2) {
            pcm.push(sample[1]);
            pcm.push(sample[0]);
        }
        Ok(pcm)
    }
}

/// Build the built-in decoder for a negotiated codec, if one ships in this
/// crate. Returns `None` for ALAC/AAC — those require an embedder-supplied
/// `AudioDecoder`.
#[must_use]
pub fn default_decoder_for(codec: AudioCodec) -> Option<Box<dyn AudioDecoder>> {
    match codec {
        AudioCodec::Pcm => Some(Box::new(PcmDecoder)),
        AudioCodec::Alac | AudioCodec::AacLc | AudioCodec::AacEld => None,
    }
}

/// Derive the PCM `AudioFormat` a session's negotiated stream parameters
/// decode to.
#[must_use]
pub fn audio_format_from(params: &StreamParameters) -> AudioFormat {
    let sample_format = match params.bits_per_sample {
        24 => SampleFormat::I24,
        32 => SampleFormat::I32,
        _ => SampleFormat::I16,
    };
    let sample_rate = SampleRate::from_hz(params.sample_rate).unwrap_or_default();
    let channels = match params.channels {
        1 => ChannelConfig::Mono,
        6 => ChannelConfig::Surround51,
        8 => ChannelConfig::Surround71,
        _ => ChannelConfig::Stereo,
    };

    AudioFormat::new(sample_format, sample_rate, channels)
}

/// Errors from the player task.
#[derive(Debug, thiserror::Error)]
pub enum PlayerError {
    /// The decoder failed on a packet it can't recover from.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The output sink rejected a frame.
    #[error(transparent)]
    Output(#[from] AudioOutputError),
}

/// Pulls `Ready` slots from the jitter buffer in order, decodes them, and
/// writes PCM to an `AudioOutput` sink. One instance runs per session.
pub struct Player {
    buffer: Arc<Mutex<RtpBuffer>>,
    decoder: Box<dyn AudioDecoder>,
    output: Box<dyn AudioOutput>,
    format: AudioFormat,
    poll_interval: Duration,
    volume_rx: Option<mpsc::UnboundedReceiver<f32>>,
}

impl Player {
    /// Create a player for the given jitter buffer, decoder, and output
    /// sink. Call [`Player::open`] before [`Player::run`].
    #[must_use]
    pub fn new(
        buffer: Arc<Mutex<RtpBuffer>>,
        decoder: Box<dyn AudioDecoder>,
        output: Box<dyn AudioOutput>,
        format: AudioFormat,
    ) -> Self {
        Self {
            buffer,
            decoder,
            output,
            format,
            poll_interval: POLL_INTERVAL,
            volume_rx: None,
        }
    }

    /// Override the default buffer poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Receive volume changes (in dB) from `SET_PARAMETER` over this channel
    /// instead of only at construction time; applied between buffer polls.
    #[must_use]
    pub fn with_volume_channel(mut self, rx: mpsc::UnboundedReceiver<f32>) -> Self {
        self.volume_rx = Some(rx);
        self
    }

    /// Open the output sink for this player's negotiated format.
    ///
    /// # Errors
    /// Returns `AudioOutputError` if the sink rejects the device/format.
    pub fn open(&mut self, device: Option<&str>) -> Result<(), AudioOutputError> {
        self.output.open(device, self.format)
    }

    /// Apply a volume change (from `SET_PARAMETER`).
    ///
    /// # Errors
    /// Returns `AudioOutputError` if the sink isn't open.
    pub fn set_volume(&mut self, volume_db: f32) -> Result<(), AudioOutputError> {
        self.output.set_volume(volume_db)
    }

    /// Close the output sink, e.g. on TEARDOWN.
    ///
    /// # Errors
    /// Returns `AudioOutputError` if the sink fails to close cleanly.
    pub fn close(&mut self) -> Result<(), AudioOutputError> {
        self.output.close()
    }

    /// Run the playout loop until cancelled (e.g. via `JoinHandle::abort`).
    /// A packet the decoder rejects is logged and dropped; a packet the
    /// jitter buffer concealed as lost plays out as silence instead of being
    /// decoded. Only the output sink failing is treated as fatal.
    pub async fn run(mut self) -> Result<(), AudioOutputError> {
        let mut ticker = interval(self.poll_interval);

        loop {
            ticker.tick().await;

            if let Some(rx) = self.volume_rx.as_mut() {
                let mut latest = None;
                while let Ok(db) = rx.try_recv() {
                    latest = Some(db);
                }
                if let Some(db) = latest {
                    if let Err(e) = self.output.set_volume(db) {
                        tracing::warn!("failed to apply volume change: {}", e);
                    }
                }
            }

            let packet = {
                let mut buffer = self.buffer.lock().await;
                buffer.take_packet()
            };

            let Some(packet) = packet else {
                continue;
            };

            match self.play_packet(&packet) {
                Ok(()) => {}
                Err(PlayerError::Decode(e)) => tracing::warn!("player dropped a packet: {}", e),
                Err(PlayerError::Output(e)) => return Err(e),
            }
        }
    }

    fn play_packet(&mut self, packet: &[u8]) -> Result<(), PlayerError> {
        if packet.is_empty() {
            let silence = vec![0u8; self.format.bytes_per_frame()];
            self.output.play(&silence)?;
            return Ok(());
        }

        let pcm = self.decoder.decode(packet)?;
        self.output.play(&pcm)?;
        Ok(())
    }
}
