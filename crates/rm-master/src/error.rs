//! Mixer error type.

use rm_audio::DeviceError;
use rm_engine::NormalizeError;
use rm_formats::DecodeError;

/// Everything that can go wrong between loading a sound and hearing it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MixerError {
    /// The device failed to open, or failed mid-playback
    #[error(transparent)]
    Device(#[from] DeviceError),
    /// The input file could not be decoded
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// Decoded PCM has a layout the mixer cannot play
    #[error(transparent)]
    Format(#[from] NormalizeError),
    /// Out-of-range configuration
    #[error("invalid mixer configuration: {0}")]
    Validation(String),
    #[error("mixer is not running")]
    NotRunning,
    #[error("mixer is already running")]
    AlreadyRunning,
    /// The tick thread panicked and took the device with it
    #[error("mixer thread panicked")]
    WorkerPanicked,
}

pub type Result<T> = std::result::Result<T, MixerError>;
