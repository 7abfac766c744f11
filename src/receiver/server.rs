//! Main `AirPlay` receiver implementation

use super::config::ReceiverConfig;
use super::events::ReceiverEvent;
use super::rtp_receiver::{RetransmitTimer, RtpAudioReceiver};
use super::session_manager::{AllocatedSockets, SessionManager, SessionManagerConfig};
use super::set_parameter_handler::ParameterUpdate;
use crate::discovery::advertiser::{AdvertiserConfig, AsyncRaopAdvertiser};
#[cfg(feature = "raop")]
use crate::discovery::advertiser::get_device_mac;
use crate::net::{AsyncReadExt, AsyncWriteExt};
use crate::player::{Player, audio_format_from, default_decoder_for};
use crate::protocol::rtp::RtpBuffer;
use crate::protocol::rtsp::transport::TransportHeader;
use crate::protocol::rtsp::{RtspRequest, RtspServerCodec, encode_response};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{Mutex, RwLock, broadcast, mpsc};
use tokio::task::JoinHandle;

/// `AirPlay` 1 receiver
pub struct AirPlayReceiver {
    config: ReceiverConfig,
    state: Arc<RwLock<ReceiverState>>,
    event_tx: broadcast::Sender<ReceiverEvent>,
    shutdown_tx: Option<mpsc::Sender<()>>,
}

/// Receiver state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverState {
    /// Receiver is stopped
    Stopped,
    /// Receiver is starting
    Starting,
    /// Receiver is running and accepting connections
    Running,
    /// Receiver is stopping
    Stopping,
}

impl AirPlayReceiver {
    /// Create a new receiver with configuration
    #[must_use]
    pub fn new(config: ReceiverConfig) -> Self {
        let (event_tx, _) = broadcast::channel(64);

        Self {
            config,
            state: Arc::new(RwLock::new(ReceiverState::Stopped)),
            event_tx,
            shutdown_tx: None,
        }
    }

    /// Create with default configuration
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::new(ReceiverConfig::with_name(name))
    }

    /// Subscribe to events
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ReceiverEvent> {
        self.event_tx.subscribe()
    }

    /// Get current state
    pub async fn state(&self) -> ReceiverState {
        *self.state.read().await
    }

    /// Start the receiver
    ///
    /// # Errors
    ///
    /// Returns error if receiver cannot start (e.g. port already in use).
    pub async fn start(&mut self) -> Result<(), ReceiverError> {
        {
            let mut state = self.state.write().await;
            if *state != ReceiverState::Stopped {
                return Err(ReceiverError::AlreadyRunning);
            }
            *state = ReceiverState::Starting;
        }

        // Create shutdown channel
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        self.shutdown_tx = Some(shutdown_tx);

        // Start mDNS advertisement
        let advertiser_config = AdvertiserConfig {
            name: self.config.name.clone(),
            port: self.config.port,
            capabilities: self.config.capabilities.clone(),
            ..Default::default()
        };

        let advertiser = AsyncRaopAdvertiser::start(advertiser_config)
            .await
            .map_err(|e| ReceiverError::Advertisement(e.to_string()))?;

        // Start TCP listener
        let listener = TcpListener::bind(format!("0.0.0.0:{}", self.config.port))
            .await
            .map_err(|e| ReceiverError::Network(e.to_string()))?;

        let actual_port = listener.local_addr()?.port();

        // Create session manager
        let session_manager = Arc::new(SessionManager::new(SessionManagerConfig {
            idle_timeout: self.config.session_timeout,
            preemption_policy: if self.config.allow_preemption {
                super::session_manager::PreemptionPolicy::AllowPreempt
            } else {
                super::session_manager::PreemptionPolicy::Reject
            },
            ..Default::default()
        }));

        // Emit started event
        let _ = self.event_tx.send(ReceiverEvent::Started {
            name: self.config.name.clone(),
            port: actual_port,
        });

        *self.state.write().await = ReceiverState::Running;

        // Clone for async task
        let event_tx = self.event_tx.clone();
        let state = self.state.clone();
        let config = self.config.clone();

        // Main server loop
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, addr)) => {
                                let session_manager = session_manager.clone();
                                let event_tx = event_tx.clone();
                                let config = config.clone();

                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(
                                        stream,
                                        addr,
                                        session_manager,
                                        event_tx,
                                        config,
                                    ).await {
                                        tracing::error!("Connection error: {}", e);
                                    }
                                });
                            }
                            Err(e) => {
                                tracing::error!("Accept error: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            // Cleanup
            advertiser.shutdown().await;
            *state.write().await = ReceiverState::Stopped;
            let _ = event_tx.send(ReceiverEvent::Stopped);
        });

        Ok(())
    }

    /// Stop the receiver
    ///
    /// # Errors
    ///
    /// Returns error if receiver cannot stop (should not happen).
    pub async fn stop(&mut self) -> Result<(), ReceiverError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
            *self.state.write().await = ReceiverState::Stopping;
        }
        Ok(())
    }
}

/// Join handles and control channels for a session's audio pipeline
/// (RTP receive, retransmit sweep, and playout), spawned once SETUP
/// allocates sockets and torn down on TEARDOWN or connection close.
struct PlaybackTasks {
    rtp_receiver: JoinHandle<()>,
    retransmit_timer: JoinHandle<()>,
    player: JoinHandle<()>,
    volume_tx: mpsc::UnboundedSender<f32>,
    /// The session's jitter buffer, kept reachable here so a mid-stream
    /// FLUSH can discard stale audio and re-anchor the playout cursor.
    buffer: Arc<Mutex<RtpBuffer>>,
}

impl PlaybackTasks {
    fn abort(&self) {
        self.rtp_receiver.abort();
        self.retransmit_timer.abort();
        self.player.abort();
    }
}

/// Handle a single client connection
async fn handle_connection(
    mut stream: TcpStream,
    addr: SocketAddr,
    session_manager: Arc<SessionManager>,
    event_tx: broadcast::Sender<ReceiverEvent>,
    config: ReceiverConfig,
) -> Result<(), ReceiverError> {
    let _ = event_tx.send(ReceiverEvent::ClientConnected {
        address: addr,
        user_agent: None,
    });

    // Start session
    let _session_id = session_manager
        .start_session(addr)
        .await
        .map_err(|e| ReceiverError::Session(e.to_string()))?;

    #[cfg(feature = "raop")]
    let rsa_key = config
        .apple_response_key
        .as_ref()
        .and_then(|der| crate::protocol::crypto::RaopRsaPrivateKey::from_der(der).ok());
    #[cfg(feature = "raop")]
    let local_ip = stream
        .local_addr()
        .map(|a| a.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::UNSPECIFIED));
    #[cfg(feature = "raop")]
    let mac_address = get_device_mac().unwrap_or([0u8; 6]);

    let mut codec = RtspServerCodec::new();
    let mut buf = vec![0u8; 4096];
    let mut tasks: Option<PlaybackTasks> = None;

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => break, // Connection closed
            Ok(n) => n,
            Err(e) => {
                tracing::error!("Read error: {}", e);
                break;
            }
        };

        codec.feed(&buf[..n]);

        while let Ok(Some(request)) = codec.decode() {
            #[cfg(feature = "raop")]
            let responder = rsa_key
                .as_ref()
                .map(|key| crate::receiver::rtsp_handler::ChallengeResponder {
                    private_key: key,
                    ip_address: local_ip,
                    mac_address,
                });

            // Process request
            let mut result = session_manager
                .with_session(|session| {
                    #[cfg(feature = "raop")]
                    {
                        crate::receiver::rtsp_handler::handle_request(
                            &request,
                            session,
                            responder.as_ref(),
                        )
                    }
                    #[cfg(not(feature = "raop"))]
                    {
                        crate::receiver::rtsp_handler::handle_request(&request, session)
                    }
                })
                .await
                .map_err(|e| ReceiverError::Session(e.to_string()))?;

            // Handle parameter updates
            process_parameter_updates(&result.parameter_updates, &session_manager, &tasks, &event_tx)
                .await;

            // Handle port allocation for SETUP: bind sockets and spawn the
            // audio pipeline for this session.
            if let Some(ref ports_req) = result.allocated_ports {
                let new_tasks = handle_setup_ports(
                    ports_req,
                    &request,
                    &mut result.response,
                    &session_manager,
                    &config,
                    addr,
                )
                .await?;
                tasks = Some(new_tasks);
            }

            // FLUSH: discard stale audio and re-anchor the jitter buffer's
            // playout cursor before acknowledging the request, so the
            // consumer never observes a half-flushed state.
            if let Some(seq) = result.flush_sequence {
                if let Some(t) = &tasks {
                    t.buffer.lock().await.flush(seq);
                }
            }

            // Send response
            let response_bytes = encode_response(&result.response);
            if stream.write_all(&response_bytes).await.is_err() {
                break;
            }

            // Handle state changes
            if let Some(new_state) = result.new_state {
                let _ = session_manager.update_state(new_state).await;

                match new_state {
                    super::session::SessionState::Streaming => {
                        let _ = event_tx.send(ReceiverEvent::PlaybackStarted);
                    }
                    super::session::SessionState::Paused => {
                        let _ = event_tx.send(ReceiverEvent::PlaybackPaused);
                    }
                    super::session::SessionState::Teardown => {
                        if let Some(t) = tasks.take() {
                            t.abort();
                        }
                        let _ = event_tx.send(ReceiverEvent::PlaybackStopped);
                    }
                    _ => {}
                }
            }

            if result.stop_streaming {
                break;
            }
        }
    }

    // Cleanup
    if let Some(t) = tasks.take() {
        t.abort();
    }
    session_manager.end_session("Connection closed").await;
    let _ = event_tx.send(ReceiverEvent::ClientDisconnected {
        address: addr,
        reason: "Connection closed".to_string(),
    });

    Ok(())
}

async fn process_parameter_updates(
    updates: &[ParameterUpdate],
    session_manager: &SessionManager,
    tasks: &Option<PlaybackTasks>,
    event_tx: &broadcast::Sender<ReceiverEvent>,
) {
    for update in updates {
        match update {
            ParameterUpdate::Volume(vol_update) => {
                // Update session volume
                let vol_db = vol_update.db;
                session_manager.set_volume(vol_db).await;

                if let Some(t) = tasks {
                    let _ = t.volume_tx.send(vol_db);
                }

                let _ = event_tx.send(ReceiverEvent::VolumeChanged {
                    db: vol_db,
                    linear: vol_update.linear,
                    muted: vol_update.muted,
                });
            }
            ParameterUpdate::Unknown(_) => {}
        }
    }
}

/// Ring capacity, in packets, the jitter buffer is sized to: enough to
/// absorb ordinary network jitter at the configured latency.
fn jitter_capacity(config: &ReceiverConfig) -> usize {
    config.jitter_buffer_depth.max(8)
}

async fn handle_setup_ports(
    ports_req: &crate::receiver::rtsp_handler::AllocatedPorts,
    request: &RtspRequest,
    response: &mut crate::protocol::rtsp::RtspResponse,
    session_manager: &SessionManager,
    config: &ReceiverConfig,
    addr: SocketAddr,
) -> Result<PlaybackTasks, ReceiverError> {
    let (audio_port, control_port, timing_port) = session_manager
        .allocate_sockets()
        .await
        .map_err(|e| ReceiverError::Network(e.to_string()))?;

    // Store sockets and client info in session
    let stream_params = session_manager
        .with_session(|session| {
            session.set_sockets(crate::receiver::session::SessionSockets {
                audio_port,
                control_port,
                timing_port,
                client_control_port: ports_req.client_control_port,
                client_timing_port: ports_req.client_timing_port,
                client_addr: Some(addr),
            });
            session.stream_params().cloned()
        })
        .await
        .map_err(|e| ReceiverError::Session(e.to_string()))?
        .unwrap_or_default();

    // Update Transport header in response
    if let Some(transport_str) = request.headers.get("Transport") {
        if let Ok(transport) = TransportHeader::parse(transport_str) {
            let new_header = transport.to_response_header(audio_port, control_port, timing_port);
            response.headers.insert("Transport".to_string(), new_header);
        }
    }

    let sockets: AllocatedSockets = session_manager
        .current_sockets()
        .await
        .ok_or_else(|| ReceiverError::Network("sockets not allocated".to_string()))?;

    let frame_duration = Duration::from_secs_f64(
        f64::from(stream_params.frames_per_packet) / f64::from(stream_params.sample_rate),
    );
    let buffer = Arc::new(Mutex::new(RtpBuffer::new(
        jitter_capacity(config),
        jitter_capacity(config) / 2,
        frame_duration,
    )));

    let rtp_receiver = RtpAudioReceiver::new(sockets.audio.clone(), &stream_params, buffer.clone());
    let rtp_handle = tokio::spawn(async move {
        if let Err(e) = rtp_receiver.run().await {
            tracing::error!("RTP receiver stopped: {}", e);
        }
    });

    let sender_addr = SocketAddr::new(
        addr.ip(),
        ports_req.client_control_port.unwrap_or(addr.port()),
    );
    let retransmit_timer = RetransmitTimer::new(sockets.control.clone(), buffer.clone(), sender_addr);
    let retransmit_handle = tokio::spawn(retransmit_timer.run());

    let format = audio_format_from(&stream_params);
    let decoder = default_decoder_for(stream_params.codec).unwrap_or_else(|| {
        tracing::warn!(
            "no built-in decoder for {:?}; playing silence only",
            stream_params.codec
        );
        Box::new(crate::player::PcmDecoder)
    });
    let output = crate::audio::output::create_default_output();
    let (volume_tx, volume_rx) = mpsc::unbounded_channel();

    let mut player =
        Player::new(buffer.clone(), decoder, output, format).with_volume_channel(volume_rx);
    if let Err(e) = player.open(config.audio_device.as_deref()) {
        tracing::error!("failed to open audio output: {}", e);
    }
    let player_handle = tokio::spawn(async move {
        if let Err(e) = player.run().await {
            tracing::error!("player stopped: {}", e);
        }
    });

    Ok(PlaybackTasks {
        rtp_receiver: rtp_handle,
        retransmit_timer: retransmit_handle,
        player: player_handle,
        volume_tx,
        buffer,
    })
}

/// Receiver errors
#[derive(Debug, thiserror::Error)]
pub enum ReceiverError {
    /// Receiver already running
    #[error("Receiver already running")]
    AlreadyRunning,

    /// Advertisement error
    #[error("Advertisement error: {0}")]
    Advertisement(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Session error
    #[error("Session error: {0}")]
    Session(String),

    /// Audio error
    #[error("Audio error: {0}")]
    Audio(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
