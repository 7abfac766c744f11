//! RTP/RAOP wire protocol: packet framing, the jitter/reorder buffer, the
//! retransmit-request datagram, and NTP-style timing exchange.

mod buffer;
mod packet;
mod retransmit;
mod timing;


pub use buffer::{BufferError, BufferStats, RtpBuffer, SlotState};
pub use packet::{PayloadType, RtpDecodeError, RtpHeader, RtpPacket};
pub use retransmit::{RetransmitDecodeError, RetransmitRequest, RETRANSMIT_REQUEST_SIZE};
pub use timing::{NtpTimestamp, TimingPacket, TimingRequest, TimingResponse};

/// RTP protocol constants for RAOP audio streaming.
pub mod constants {
    /// Default RTP audio port
    pub const AUDIO_PORT: u16 = 6000;
    /// Default RTP control port
    pub const CONTROL_PORT: u16 = 6001;
    /// Default RTP timing port
    pub const TIMING_PORT: u16 = 6002;

    /// Audio frames per RTP packet (352 samples at 44.1kHz ≈ 8ms)
    pub const FRAMES_PER_PACKET: usize = 352;

    /// Audio sample rate
    pub const SAMPLE_RATE: u32 = 44100;

    /// Audio channels (stereo)
    pub const CHANNELS: u8 = 2;

    /// Bits per sample
    pub const BITS_PER_SAMPLE: u8 = 16;
}
