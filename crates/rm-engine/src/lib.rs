//! Mixing engine for ringmix.
//!
//! Converts decoded PCM to canonical float audio, tracks per-sound playback
//! state and renders the mixed look-ahead as 16-bit stereo bytes.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod codec;
mod frame;
mod mixer;
mod normalize;
pub mod resample;
mod source;

pub use frame::Frame;
pub use mixer::{ring_delta, MixEngine, SourceKey};
pub use normalize::{normalize, NormalizeError};
pub use resample::{resample, Resampler};
pub use source::{duration_to_frames, frames_to_duration, SoundSource};
