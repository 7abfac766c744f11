//! RTP packet receiver for audio data
//!
//! Handles incoming RTP packets on the audio UDP port, decrypts them, and
//! commits them into the shared jitter buffer. `RetransmitResponse` packets
//! reuse the standard 12-byte RTP header but carry the original (lost)
//! sequence number at datagram offset 6 and shift the audio payload 4
//! bytes further out than `AudioData`'s, so they fall through into the
//! same decode/decrypt/commit path once the sequence is patched and the
//! extra bytes skipped.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tokio::time::interval;

use crate::protocol::raop::AesSession;
use crate::protocol::rtp::{PayloadType, RetransmitRequest, RtpBuffer, RtpDecodeError, RtpHeader};
use crate::receiver::session::StreamParameters;

/// Maximum UDP packet size
const MAX_PACKET_SIZE: usize = 2048;

/// Default interval between retransmit-request sweeps over the jitter buffer.
pub const DEFAULT_RETRANSMIT_INTERVAL: Duration = Duration::from_millis(25);

/// Errors from RTP reception
#[derive(Debug, thiserror::Error)]
pub enum RtpReceiveError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid RTP packet
    #[error("Invalid RTP packet: {0}")]
    InvalidPacket(#[from] RtpDecodeError),

    /// Packet too short to contain the `RetransmitResponse` prefix
    #[error("retransmit response packet too short")]
    RetransmitTooShort,
}

/// Receives RTP audio packets on the audio UDP socket and commits decoded,
/// decrypted audio into the session's jitter buffer.
pub struct RtpAudioReceiver {
    socket: Arc<UdpSocket>,
    buffer: Arc<Mutex<RtpBuffer>>,
    cipher: Option<AesSession>,
}

impl RtpAudioReceiver {
    /// Create a new RTP audio receiver
    #[must_use]
    pub fn new(
        socket: Arc<UdpSocket>,
        stream_params: &StreamParameters,
        buffer: Arc<Mutex<RtpBuffer>>,
    ) -> Self {
        let cipher = match (stream_params.aes_key, stream_params.aes_iv) {
            (Some(key), Some(iv)) => Some(AesSession::new(key, iv)),
            _ => None,
        };

        Self {
            socket,
            buffer,
            cipher,
        }
    }

    /// Run the receive loop. Returns only when the socket errors; malformed
    /// or undecryptable packets are dropped and logged, never fatal.
    ///
    /// # Errors
    /// Returns `RtpReceiveError` if the socket itself fails.
    pub async fn run(self) -> Result<(), RtpReceiveError> {
        let mut buf = [0u8; MAX_PACKET_SIZE];

        loop {
            let (len, _src) = self.socket.recv_from(&mut buf).await?;

            if len < RtpHeader::SIZE {
                continue;
            }

            if let Err(e) = self.process_packet(&buf[..len]).await {
                tracing::warn!("RTP packet error: {}", e);
            }
        }
    }

    /// Decode, decrypt, and commit a single datagram if it carries audio.
    async fn process_packet(&self, data: &[u8]) -> Result<(), RtpReceiveError> {
        let header = RtpHeader::decode(data)?;
        let payload = &data[RtpHeader::SIZE..];

        match header.payload_type {
            PayloadType::AudioData => self.handle_audio_data(&header, payload).await,
            PayloadType::RetransmitResponse => self.handle_retransmit_response(data, &header).await,
            PayloadType::Sync | PayloadType::TimingRequest | PayloadType::TimingResponse => Ok(()),
            PayloadType::RetransmitRequest => Ok(()),
        }
    }

    async fn handle_audio_data(
        &self,
        header: &RtpHeader,
        payload: &[u8],
    ) -> Result<(), RtpReceiveError> {
        let mut audio_data = payload.to_vec();
        if let Some(cipher) = &self.cipher {
            cipher.decrypt(&mut audio_data);
        }

        let mut buffer = self.buffer.lock().await;
        let _ = buffer.commit_packet(header.sequence, audio_data);
        Ok(())
    }

    /// A `RetransmitResponse` datagram reuses the standard 12-byte RTP
    /// header, except the original (lost) sequence number is carried at
    /// absolute datagram offset 6 instead of the header's own sequence
    /// field, and the audio payload starts 4 bytes after where it would for
    /// plain `AudioData` (offset 16, not 12). There is no second RTP
    /// header to parse; overwrite `header.sequence` from that offset, skip
    /// the extra 4 bytes, and fall through to the same audio handling
    /// `AudioData` uses.
    async fn handle_retransmit_response(
        &self,
        data: &[u8],
        header: &RtpHeader,
    ) -> Result<(), RtpReceiveError> {
        const RESPONSE_PREFIX: usize = RtpHeader::SIZE + 4;
        if data.len() < RESPONSE_PREFIX {
            return Err(RtpReceiveError::RetransmitTooShort);
        }

        let mut header = *header;
        header.sequence = u16::from_be_bytes([data[6], data[7]]);
        let payload = &data[RESPONSE_PREFIX..];
        self.handle_audio_data(&header, payload).await
    }
}

/// Periodically scans the jitter buffer for gaps, reserves a `Filling`
/// slot for each so it starts aging toward its loss deadline, and sends
/// an 8-byte retransmit-request datagram for each contiguous run to the
/// sender's control port.
pub struct RetransmitTimer {
    control_socket: Arc<UdpSocket>,
    buffer: Arc<Mutex<RtpBuffer>>,
    sender_addr: SocketAddr,
    interval: Duration,
}

impl RetransmitTimer {
    /// Create a new retransmit timer.
    #[must_use]
    pub fn new(
        control_socket: Arc<UdpSocket>,
        buffer: Arc<Mutex<RtpBuffer>>,
        sender_addr: SocketAddr,
    ) -> Self {
        Self {
            control_socket,
            buffer,
            sender_addr,
            interval: DEFAULT_RETRANSMIT_INTERVAL,
        }
    }

    /// Override the default sweep interval.
    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Run the NACK sweep loop until cancelled (e.g. via `JoinHandle::abort`).
    pub async fn run(self) {
        let mut ticker = interval(self.interval);

        loop {
            ticker.tick().await;

            let missing = {
                let mut buffer = self.buffer.lock().await;
                let missing = buffer.missing_sequences();
                // Reserve a Filling slot for each gap so it starts counting
                // toward its loss deadline; a slot that never gets a
                // retransmit reply is conceded as silence once the deadline
                // passes instead of stalling the player forever.
                for &sequence in &missing {
                    buffer.obtain_packet(sequence);
                }
                missing
            };
            if missing.is_empty() {
                continue;
            }

            for request in RetransmitRequest::coalesce(&missing) {
                let datagram = request.encode();
                if let Err(e) = self.control_socket.send_to(&datagram, self.sender_addr).await {
                    tracing::warn!("failed to send retransmit request: {}", e);
                }
            }
        }
    }
}
