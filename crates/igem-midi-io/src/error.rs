//! Error types for the hardware input subsystem.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MIDI device error: {0}")]
    MidiDevice(String),

    #[error("MIDI port error: {0}")]
    MidiPort(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Why a request for hardware access (or binding a device) did not succeed.
///
/// The listener folds these into a terminal [`ConnectionStatus`](crate::ConnectionStatus);
/// they never reach the note pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    /// The user refused the permission request.
    #[error("MIDI access not allowed: {0}")]
    NotAllowed(String),

    /// The platform's security policy rejected the request.
    #[error("MIDI access rejected by security policy: {0}")]
    Security(String),

    #[error("MIDI access failed: {0}")]
    Failed(String),
}

impl AccessError {
    /// Permission refusals and security rejections, as opposed to failures.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, AccessError::NotAllowed(_) | AccessError::Security(_))
    }
}

impl From<Error> for AccessError {
    fn from(e: Error) -> Self {
        AccessError::Failed(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::InitError> for Error {
    fn from(e: midir::InitError) -> Self {
        Error::MidiDevice(e.to_string())
    }
}

#[cfg(feature = "midi-io")]
impl From<midir::ConnectError<midir::MidiInput>> for Error {
    fn from(e: midir::ConnectError<midir::MidiInput>) -> Self {
        Error::MidiPort(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
