//! Raw decoded PCM data.

use alloc::vec::Vec;
use core::fmt;

/// One block of interleaved PCM as produced by a decoder.
///
/// Nothing here is validated; the normalizer decides which combinations
/// of channel count and bit depth it accepts.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PcmChunk {
    /// Interleaved channels per frame
    pub channels: u16,
    /// Frames per second
    pub sample_rate: u32,
    /// Bits per single channel sample
    pub bits_per_sample: u16,
    /// Little-endian interleaved sample bytes
    pub data: Vec<u8>,
}

impl PcmChunk {
    pub fn new(channels: u16, sample_rate: u32, bits_per_sample: u16, data: Vec<u8>) -> Self {
        Self {
            channels,
            sample_rate,
            bits_per_sample,
            data,
        }
    }

    /// Bytes per interleaved frame, 0 for a malformed header.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * (self.bits_per_sample as usize / 8)
    }

    /// Number of complete frames in `data`.
    pub fn frames(&self) -> usize {
        match self.frame_bytes() {
            0 => 0,
            n => self.data.len() / n,
        }
    }
}

impl fmt::Display for PcmChunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} channels, {} bits/sample, {} samples/sec, {} samples ({} bytes)",
            self.channels,
            self.bits_per_sample,
            self.sample_rate,
            self.frames(),
            self.data.len()
        )
    }
}
