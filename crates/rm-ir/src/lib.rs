//! Core audio data types for the ringmix mixer.
//!
//! This crate defines the data shared between the decoder, the format
//! normalizer and the mix engine: raw decoded PCM chunks on the way in,
//! canonical float chunks on the way out.
//!
//! Designed to be `no_std` compatible with the `alloc` crate.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod audio_chunk;
mod pcm;

pub use audio_chunk::{AudioChunk, Channel};
pub use pcm::PcmChunk;

/// Bytes per output frame: 2 channels of 16-bit samples.
pub const FRAME_BYTES: usize = 4;

/// Default mixer output rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
