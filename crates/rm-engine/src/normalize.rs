//! Turns decoded PCM into canonical stereo float audio at the mixer rate.

use rm_ir::{AudioChunk, PcmChunk};

use crate::codec;
use crate::resample::Resampler;

/// Rejected input formats.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    /// Only mono and stereo are supported
    #[error("unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(u16),
    /// Only 8-bit unsigned and 16-bit signed samples are supported
    #[error("unsupported bit depth: {0} (expected 8 or 16)")]
    UnsupportedBitDepth(u16),
    /// Sample rate must be positive
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),
}

/// Normalize a decoded chunk to `target_rate`.
///
/// A trailing partial frame is dropped. Mono input stays single-storage
/// through decoding and resampling.
pub fn normalize(chunk: &PcmChunk, target_rate: u32) -> Result<AudioChunk, NormalizeError> {
    if !matches!(chunk.channels, 1 | 2) {
        return Err(NormalizeError::UnsupportedChannels(chunk.channels));
    }
    if !matches!(chunk.bits_per_sample, 8 | 16) {
        return Err(NormalizeError::UnsupportedBitDepth(chunk.bits_per_sample));
    }
    if chunk.sample_rate == 0 {
        return Err(NormalizeError::InvalidSampleRate(chunk.sample_rate));
    }
    if target_rate == 0 {
        return Err(NormalizeError::InvalidSampleRate(target_rate));
    }

    let whole = chunk.frames() * chunk.frame_bytes();
    let raw = &chunk.data[..whole];
    let resampler = Resampler::new(chunk.sample_rate, target_rate);

    let audio = match (chunk.channels, chunk.bits_per_sample) {
        (1, 8) => AudioChunk::mono(resampler.process(&codec::decode_8bit(raw))),
        (1, _) => AudioChunk::mono(resampler.process(&codec::decode_16bit(raw))),
        (_, 8) => {
            let (left, right) = codec::split_stereo_8bit(raw);
            AudioChunk::stereo(resampler.process(&left), resampler.process(&right))
        }
        _ => {
            let (left, right) = codec::split_stereo_16bit(raw);
            AudioChunk::stereo(resampler.process(&left), resampler.process(&right))
        }
    };
    Ok(audio)
}
