//! RTSP request handlers for the receiver
//!
//! This module provides the logic for handling each RTSP method.
//! Handlers are pure functions that take a request and session state,
//! returning a response. No I/O is performed.

use crate::protocol::raop::auth;
use crate::protocol::rtsp::{
    Method, RtspRequest, RtspResponse, StatusCode, headers, server_codec::ResponseBuilder,
    transport::TransportHeader,
};
use crate::receiver::announce_handler::{self, AnnounceError};
use crate::receiver::session::{ReceiverSession, SessionState};
use crate::receiver::set_parameter_handler::{self, ParameterUpdate};

/// Identity used to answer an `Apple-Challenge` probe on OPTIONS.
#[cfg(feature = "raop")]
pub struct ChallengeResponder<'a> {
    /// Receiver's RSA signing key.
    pub private_key: &'a crate::protocol::crypto::RaopRsaPrivateKey,
    /// Receiver's own IP address, as seen by the client.
    pub ip_address: std::net::IpAddr,
    /// Receiver's MAC address.
    pub mac_address: [u8; 6],
}

/// Result of handling an RTSP request
#[derive(Debug)]
pub struct HandleResult {
    /// Response to send back
    pub response: RtspResponse,
    /// New session state (if changed)
    pub new_state: Option<SessionState>,
    /// Allocated ports (for SETUP)
    pub allocated_ports: Option<AllocatedPorts>,
    /// Should start streaming (for RECORD)
    pub start_streaming: bool,
    /// Should stop streaming (for TEARDOWN)
    pub stop_streaming: bool,
    /// Sequence number to resume playout from (for FLUSH), parsed from the
    /// request's `RTP-Info: seq=<n>` header.
    pub flush_sequence: Option<u16>,
    /// Parameter updates to apply (for `SET_PARAMETER`)
    pub parameter_updates: Vec<ParameterUpdate>,
}

/// Ports allocated during SETUP
#[derive(Debug, Clone, Copy)]
pub struct AllocatedPorts {
    /// UDP port for audio stream
    pub audio_port: u16,
    /// UDP port for control stream
    pub control_port: u16,
    /// UDP port for timing/sync
    pub timing_port: u16,
    /// Client's control port, from the request's Transport header
    pub client_control_port: Option<u16>,
    /// Client's timing port, from the request's Transport header
    pub client_timing_port: Option<u16>,
}

/// Handle an incoming RTSP request.
///
/// `responder`, when present, lets OPTIONS answer an `Apple-Challenge` probe
/// with a signed `Apple-Response`.
#[must_use]
pub fn handle_request(
    request: &RtspRequest,
    session: &mut ReceiverSession,
    #[cfg(feature = "raop")] responder: Option<&ChallengeResponder<'_>>,
) -> HandleResult {
    let cseq = request.headers.cseq().unwrap_or(0);

    match request.method {
        Method::Options => handle_options(
            request,
            cseq,
            #[cfg(feature = "raop")]
            responder,
        ),
        Method::Announce => handle_announce(request, cseq, session),
        Method::Setup => handle_setup(request, cseq, session),
        Method::Record => handle_record(request, cseq, session),
        Method::Pause => handle_pause(cseq, session),
        Method::Flush => handle_flush(request, cseq),
        Method::Teardown => handle_teardown(cseq, session),
        Method::GetParameter => handle_get_parameter(request, cseq, session),
        Method::SetParameter => handle_set_parameter(request, cseq, session),
        Method::Post => handle_post(request, cseq, session),
        _ => handle_unknown(cseq),
    }
}

/// Handle OPTIONS request
fn handle_options(
    request: &RtspRequest,
    cseq: u32,
    #[cfg(feature = "raop")] responder: Option<&ChallengeResponder<'_>>,
) -> HandleResult {
    let methods = [
        "ANNOUNCE",
        "SETUP",
        "RECORD",
        "PAUSE",
        "FLUSH",
        "TEARDOWN",
        "OPTIONS",
        "GET_PARAMETER",
        "SET_PARAMETER",
        "POST",
    ]
    .join(", ");

    let mut builder = ResponseBuilder::ok().cseq(cseq).header("Public", &methods);

    #[cfg(feature = "raop")]
    if let (Some(challenge_header), Some(responder)) = (
        request.headers.get(headers::APPLE_CHALLENGE),
        responder,
    ) {
        if let Ok(challenge) = auth::decode_challenge(challenge_header) {
            if let Ok(response_value) = auth::generate_response(
                responder.private_key,
                &challenge,
                &responder.ip_address,
                &responder.mac_address,
            ) {
                builder = builder.header(headers::APPLE_RESPONSE, &response_value);
            }
        }
    }

    HandleResult {
        response: builder.build(),
        new_state: None,
        allocated_ports: None,
        start_streaming: false,
        stop_streaming: false,
        flush_sequence: None,
        parameter_updates: Vec::new(),
    }
}

/// Handle ANNOUNCE request (SDP body with stream parameters)
fn handle_announce(request: &RtspRequest, cseq: u32, session: &mut ReceiverSession) -> HandleResult {
    if session.state() != SessionState::Connected {
        return error_result(StatusCode::METHOD_NOT_VALID, cseq);
    }

    let params = match announce_handler::process_announce(request, None) {
        Ok(params) => params,
        Err(AnnounceError::EmptyBody | AnnounceError::InvalidUtf8) => {
            return error_result(StatusCode::BAD_REQUEST, cseq);
        }
        Err(AnnounceError::SdpParse(_) | AnnounceError::UnsupportedCodec) => {
            return error_result(StatusCode::UNSUPPORTED_TRANSPORT, cseq);
        }
    };

    announce_handler::apply_to_session(session, params);

    let response = ResponseBuilder::ok().cseq(cseq).build();

    HandleResult {
        response,
        new_state: Some(SessionState::Announced),
        allocated_ports: None,
        start_streaming: false,
        stop_streaming: false,
        flush_sequence: None,
        parameter_updates: Vec::new(),
    }
}

/// Handle SETUP request
fn handle_setup(request: &RtspRequest, cseq: u32, _session: &mut ReceiverSession) -> HandleResult {
    // Parse Transport header
    let Some(transport_str) = request.headers.get("Transport") else {
        return error_result(StatusCode::BAD_REQUEST, cseq);
    };

    let Ok(client_transport) = TransportHeader::parse(transport_str) else {
        return error_result(StatusCode::BAD_REQUEST, cseq);
    };

    // Actual ports are allocated by the session manager once this result
    // reaches the caller; these are placeholders filled in afterward.
    let ports = AllocatedPorts {
        audio_port: 0,
        control_port: 0,
        timing_port: 0,
        client_control_port: client_transport.control_port,
        client_timing_port: client_transport.timing_port,
    };

    let session_id = generate_session_id();

    let response_transport = client_transport.to_response_header(
        ports.audio_port,
        ports.control_port,
        ports.timing_port,
    );

    let response = ResponseBuilder::ok()
        .cseq(cseq)
        .session(&session_id)
        .header("Transport", &response_transport)
        .build();

    HandleResult {
        response,
        new_state: Some(SessionState::Setup),
        allocated_ports: Some(ports),
        start_streaming: false,
        stop_streaming: false,
        flush_sequence: None,
        parameter_updates: Vec::new(),
    }
}

/// Handle RECORD request (start streaming)
fn handle_record(request: &RtspRequest, cseq: u32, session: &mut ReceiverSession) -> HandleResult {
    if session.state() != SessionState::Setup {
        return error_result(StatusCode::METHOD_NOT_VALID, cseq);
    }

    // Format: "seq=<n>;rtptime=<n>"
    if let Some(rtp_info) = request.headers.get("RTP-Info") {
        let seq = parse_rtp_info_seq(rtp_info);
        let rtptime = parse_rtp_info_field(rtp_info, "rtptime");
        if let (Some(seq), Some(rtptime)) = (seq, rtptime) {
            session.set_rtp_info(seq, rtptime);
        }
    }

    // Report our audio latency (in samples at 44.1kHz)
    // 2 seconds = 88200 samples
    let latency_samples: u32 = 88200;

    let response = ResponseBuilder::ok()
        .cseq(cseq)
        .audio_latency(latency_samples)
        .build();

    HandleResult {
        response,
        new_state: Some(SessionState::Streaming),
        allocated_ports: None,
        start_streaming: true,
        stop_streaming: false,
        flush_sequence: None,
        parameter_updates: Vec::new(),
    }
}

/// Handle PAUSE request
fn handle_pause(cseq: u32, _session: &mut ReceiverSession) -> HandleResult {
    let response = ResponseBuilder::ok().cseq(cseq).build();

    HandleResult {
        response,
        new_state: Some(SessionState::Paused),
        allocated_ports: None,
        start_streaming: false,
        stop_streaming: false, // Keep session alive, just pause output
        flush_sequence: None,
        parameter_updates: Vec::new(),
    }
}

/// Handle FLUSH request (clear buffer)
fn handle_flush(request: &RtspRequest, cseq: u32) -> HandleResult {
    // Format: "seq=<n>;rtptime=<n>", either field optional.
    let flush_sequence = request
        .headers
        .get("RTP-Info")
        .and_then(parse_rtp_info_seq);

    let response = ResponseBuilder::ok().cseq(cseq).build();

    HandleResult {
        response,
        new_state: None,
        allocated_ports: None,
        start_streaming: false,
        stop_streaming: false,
        flush_sequence,
        parameter_updates: Vec::new(),
    }
}

/// Parse the `seq=` field out of an `RTP-Info` header value.
fn parse_rtp_info_seq(rtp_info: &str) -> Option<u16> {
    parse_rtp_info_field(rtp_info, "seq")
}

/// Parse a named field (e.g. `seq`, `rtptime`) out of an `RTP-Info` header
/// value of the form `seq=<n>;rtptime=<n>`.
fn parse_rtp_info_field<T: std::str::FromStr>(rtp_info: &str, name: &str) -> Option<T> {
    let prefix = format!("{name}=");
    rtp_info.split(';').find_map(|field| {
        let field = field.trim();
        field.strip_prefix(prefix.as_str()).and_then(|v| v.parse().ok())
    })
}

/// Handle TEARDOWN request
fn handle_teardown(cseq: u32, _session: &mut ReceiverSession) -> HandleResult {
    let response = ResponseBuilder::ok().cseq(cseq).build();

    HandleResult {
        response,
        new_state: Some(SessionState::Teardown),
        allocated_ports: None,
        start_streaming: false,
        stop_streaming: true,
        flush_sequence: None,
        parameter_updates: Vec::new(),
    }
}

/// Handle `GET_PARAMETER` (keep-alive, status queries)
fn handle_get_parameter(
    request: &RtspRequest,
    cseq: u32,
    session: &ReceiverSession,
) -> HandleResult {
    // Body may contain parameter names to query
    // Empty body = keep-alive ping

    let body_str = String::from_utf8_lossy(&request.body);

    let response_body = if body_str.contains("volume") {
        format!("volume: {:.6}\r\n", session.volume())
    } else {
        String::new()
    };

    let response = if response_body.is_empty() {
        ResponseBuilder::ok().cseq(cseq).build()
    } else {
        ResponseBuilder::ok()
            .cseq(cseq)
            .text_body(&response_body)
            .build()
    };

    HandleResult {
        response,
        new_state: None,
        allocated_ports: None,
        start_streaming: false,
        stop_streaming: false,
        flush_sequence: None,
        parameter_updates: Vec::new(),
    }
}

/// Handle `SET_PARAMETER` (currently just volume control)
fn handle_set_parameter(
    request: &RtspRequest,
    cseq: u32,
    _session: &mut ReceiverSession,
) -> HandleResult {
    let parameter_updates = set_parameter_handler::process_set_parameter(request);

    let response = ResponseBuilder::ok().cseq(cseq).build();

    HandleResult {
        response,
        new_state: None,
        allocated_ports: None,
        start_streaming: false,
        stop_streaming: false,
        flush_sequence: None,
        parameter_updates,
    }
}

/// Handle POST (pairing, auth)
fn handle_post(_request: &RtspRequest, cseq: u32, _session: &mut ReceiverSession) -> HandleResult {
    // POST is used for pairing endpoints like /pair-setup, /pair-verify,
    // which belong to AirPlay 2's device-pairing handshake, not this
    // receiver's RAOP-v1 control plane.
    let response = ResponseBuilder::error(StatusCode::NOT_IMPLEMENTED)
        .cseq(cseq)
        .build();

    HandleResult {
        response,
        new_state: None,
        allocated_ports: None,
        start_streaming: false,
        stop_streaming: false,
        flush_sequence: None,
        parameter_updates: Vec::new(),
    }
}

/// Handle unknown method
fn handle_unknown(cseq: u32) -> HandleResult {
    error_result(StatusCode::METHOD_NOT_ALLOWED, cseq)
}

/// Generate an error result
fn error_result(status: StatusCode, cseq: u32) -> HandleResult {
    let response = ResponseBuilder::error(status).cseq(cseq).build();

    HandleResult {
        response,
        new_state: None,
        allocated_ports: None,
        start_streaming: false,
        stop_streaming: false,
        flush_sequence: None,
        parameter_updates: Vec::new(),
    }
}

/// Generate a random session ID
fn generate_session_id() -> String {
    use rand::Rng;
    let id: u64 = rand::thread_rng().r#gen();
    format!("{id:016X}")
}
