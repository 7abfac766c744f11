//! `AirPlay` receiver configuration

use std::time::Duration;

use crate::discovery::advertiser::RaopCapabilities;

/// Default RTSP listen port for an `AirTunes` receiver.
pub const DEFAULT_PORT: u16 = 5002;

/// Receiver configuration
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Device name shown to senders
    pub name: String,

    /// RTSP listen port (0 = auto-assign)
    pub port: u16,

    /// Receiver capabilities
    pub capabilities: RaopCapabilities,

    /// Session timeout
    pub session_timeout: Duration,

    /// Allow session preemption
    pub allow_preemption: bool,

    /// Target audio latency in milliseconds
    pub latency_ms: u32,

    /// Jitter buffer depth, in packets
    pub jitter_buffer_depth: usize,

    /// Audio output device (None = default)
    pub audio_device: Option<String>,

    /// Initial volume (-144.0 to 0.0 dB)
    pub initial_volume: f32,

    /// PKCS#8 DER-encoded RSA private key used to answer `Apple-Challenge`
    /// probes with a signed `Apple-Response`. Senders that don't probe never
    /// notice its absence; `None` means the receiver answers OPTIONS with no
    /// `Apple-Response` header at all.
    pub apple_response_key: Option<Vec<u8>>,

    /// Enable debug logging
    pub debug: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            name: default_receiver_name(),
            port: DEFAULT_PORT,
            capabilities: RaopCapabilities::default(),
            session_timeout: Duration::from_secs(60),
            allow_preemption: true,
            latency_ms: 500,
            jitter_buffer_depth: 50,
            audio_device: None,
            initial_volume: 0.0,
            apple_response_key: None,
            debug: false,
        }
    }
}

impl ReceiverConfig {
    /// Create with custom name
    pub fn with_name(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Set port
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set latency
    #[must_use]
    pub fn latency_ms(mut self, ms: u32) -> Self {
        self.latency_ms = ms;
        self
    }

    /// Set audio device
    #[must_use]
    pub fn audio_device(mut self, device: impl Into<String>) -> Self {
        self.audio_device = Some(device.into());
        self
    }

    /// Set the RSA signing key (PKCS#8 DER) used for `Apple-Challenge` auth
    #[must_use]
    pub fn apple_response_key(mut self, der: Vec<u8>) -> Self {
        self.apple_response_key = Some(der);
        self
    }
}

/// Build the default advertised name: `AirTunes Receiver@<hostname>`.
fn default_receiver_name() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("AirTunes Receiver@{host}")
}
