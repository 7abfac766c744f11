//! # airtunes-receiver
//!
//! A pure Rust `AirTunes`/RAOP (`AirPlay` 1) audio receiver.
//!
//! This crate implements the *receiver* side of the protocol: it accepts
//! RTSP control connections from a sender, negotiates a stream over SDP,
//! receives RTP audio over UDP (optionally AES-encrypted), reassembles it
//! through a jitter buffer that tolerates loss and reordering, and pushes
//! decoded PCM to an audio output sink.
//!
//! ## Features
//!
//! - mDNS (`_raop._tcp`) service advertisement
//! - RTSP/1.0 control plane (OPTIONS/ANNOUNCE/SETUP/RECORD/PAUSE/FLUSH/TEARDOWN/GET_PARAMETER/SET_PARAMETER)
//! - `Apple-Challenge`/`Apple-Response` authentication
//! - AES-128-CBC encrypted audio with per-packet IV reset
//! - RTP jitter buffer with retransmit requests for lost packets
//!
//! ## Example
//!
//! ```rust,no_run
//! use airtunes_receiver::{AirPlayReceiver, ReceiverConfig};
//!
//! # async fn example() -> Result<(), airtunes_receiver::ReceiverError> {
//! let mut receiver = AirPlayReceiver::new(ReceiverConfig::with_name("Living Room"));
//! receiver.start().await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Audio output sinks and format negotiation
pub mod audio;
/// Error types
pub mod error;
/// mDNS service discovery/advertisement
pub mod discovery;
/// Socket/stream abstractions
pub mod net;
/// Decoding and playout pipeline
pub mod player;
/// Wire protocol: RTSP, RTP, SDP, crypto
pub mod protocol;
/// RTSP session + RTP receive handling
pub mod receiver;

/// Test doubles for exercising the receiver without real hardware.
#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use error::ReceiverError;
pub use player::{Player, PlayerError};
pub use receiver::{AirPlayReceiver, ReceiverConfig, ReceiverEvent, ReceiverState};
