//! Audio output sink contract.
//!
//! No concrete backend (CoreAudio/ALSA/CPAL) is implemented — wiring a real
//! device is left to an embedder of this crate. `NullSink` is the only
//! built-in implementation, useful for running the full receive pipeline in
//! tests and headless deployments without real hardware.

use crate::audio::format::AudioFormat;

/// Errors from audio output
#[derive(Debug, thiserror::Error)]
pub enum AudioOutputError {
    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Format not supported
    #[error("Format not supported: {0:?}")]
    FormatNotSupported(AudioFormat),

    /// Generic device error
    #[error("Device error: {0}")]
    DeviceError(String),

    /// Output used before being opened
    #[error("Output not open")]
    NotOpen,
}

/// Audio output state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputState {
    /// Not yet opened, or closed
    #[default]
    Closed,
    /// Open and accepting frames
    Open,
}

/// Sink contract a `Player` writes decoded PCM frames to: `open` once per
/// session, `play` once per decoded packet, `set_volume` on SET_PARAMETER,
/// `close` on teardown.
pub trait AudioOutput: Send {
    /// Open the output for the given format. `device` names a specific
    /// output device; `None` selects the default.
    ///
    /// # Errors
    /// Returns `AudioOutputError` if the device or format can't be opened.
    fn open(&mut self, device: Option<&str>, format: AudioFormat) -> Result<(), AudioOutputError>;

    /// Play one packet's worth of decoded PCM frames.
    ///
    /// # Errors
    /// Returns `AudioOutputError` if the output isn't open.
    fn play(&mut self, frames: &[u8]) -> Result<(), AudioOutputError>;

    /// Set output volume in dB (-144.0 silence to 0.0 full volume).
    ///
    /// # Errors
    /// Returns `AudioOutputError` if the output isn't open.
    fn set_volume(&mut self, volume_db: f32) -> Result<(), AudioOutputError>;

    /// Current volume in dB.
    fn volume(&self) -> f32;

    /// Current output state.
    fn state(&self) -> OutputState;

    /// Close the output, releasing any device resources.
    ///
    /// # Errors
    /// Returns `AudioOutputError` if the device fails to close cleanly.
    fn close(&mut self) -> Result<(), AudioOutputError>;
}

/// A sink that discards every frame. Stands in for a real device backend;
/// also the receiver's own integration-test double.
#[derive(Debug, Default)]
pub struct NullSink {
    state: OutputState,
    volume_db: f32,
    format: Option<AudioFormat>,
    frames_played: u64,
}

impl NullSink {
    /// Create a closed sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total frames handed to `play` so far (a "frame" here is one `play`
    /// call's byte slice, not a sample count) — useful for test assertions.
    #[must_use]
    pub fn frames_played(&self) -> u64 {
        self.frames_played
    }
}

impl AudioOutput for NullSink {
    fn open(&mut self, _device: Option<&str>, format: AudioFormat) -> Result<(), AudioOutputError> {
        self.format = Some(format);
        self.state = OutputState::Open;
        Ok(())
    }

    fn play(&mut self, _frames: &[u8]) -> Result<(), AudioOutputError> {
        if self.state != OutputState::Open {
            return Err(AudioOutputError::NotOpen);
        }
        self.frames_played += 1;
        Ok(())
    }

    fn set_volume(&mut self, volume_db: f32) -> Result<(), AudioOutputError> {
        self.volume_db = volume_db.clamp(-144.0, 0.0);
        Ok(())
    }

    fn volume(&self) -> f32 {
        self.volume_db
    }

    fn state(&self) -> OutputState {
        self.state
    }

    fn close(&mut self) -> Result<(), AudioOutputError> {
        self.state = OutputState::Closed;
        Ok(())
    }
}

/// Create the default audio output for the current platform.
///
/// No backend is implemented in this crate; this always returns a
/// [`NullSink`] so the playout pipeline still runs end to end.
#[must_use]
pub fn create_default_output() -> Box<dyn AudioOutput> {
    Box::new(NullSink::new())
}
