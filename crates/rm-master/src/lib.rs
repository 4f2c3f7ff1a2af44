//! Mixer controller for ringmix.
//!
//! Owns a polled ring-buffer device and the mix engine, runs the tick loop
//! that keeps the device's look-ahead filled, and hands out handles for
//! controlling individual sounds.

mod config;
mod error;
mod handle;
mod mixer;
mod session;

pub use config::MixerConfig;
pub use error::{MixerError, Result};
pub use handle::SoundHandle;
pub use mixer::Mixer;

// Re-export common types so callers don't need the lower crates directly.
pub use rm_audio::{CpalDevice, Cursors, DeviceError, MemoryDevice, SoundDevice};
pub use rm_engine::{Frame, NormalizeError};
pub use rm_formats::{decode_wav, frames_to_wav, write_wav, DecodeError};
pub use rm_ir::{AudioChunk, PcmChunk};
