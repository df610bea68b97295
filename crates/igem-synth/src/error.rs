//! Error types for igem-synth.

use thiserror::Error;

/// Error type for output-engine operations.
///
/// These stay inside the synthesizer: [`ToneSynth`](crate::ToneSynth) folds
/// them into [`SynthStatus::Error`](crate::SynthStatus::Error).
#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Audio output not available: {0}")]
    Unavailable(String),

    #[error("Invalid device: {0}")]
    InvalidDevice(String),

    #[error("Unknown node: {0}")]
    UnknownNode(String),

    #[error("Invalid connection: {0}")]
    InvalidConnection(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Engine closed")]
    Closed,

    #[error("Failed to resume engine: {0}")]
    Resume(String),

    #[cfg(feature = "cpal-output")]
    #[error("Audio device not available")]
    DeviceNotAvailable(#[from] cpal::DefaultStreamConfigError),

    #[cfg(feature = "cpal-output")]
    #[error("Failed to build audio stream")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[cfg(feature = "cpal-output")]
    #[error("Failed to play audio stream")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[cfg(feature = "cpal-output")]
    #[error("Failed to pause audio stream")]
    PauseStream(#[from] cpal::PauseStreamError),

    #[cfg(feature = "cpal-output")]
    #[error("Failed to enumerate devices")]
    DevicesError(#[from] cpal::DevicesError),

    #[cfg(feature = "cpal-output")]
    #[error("Failed to get device name")]
    DeviceNameError(#[from] cpal::DeviceNameError),
}

/// Result type alias.
pub type Result<T> = std::result::Result<T, Error>;
