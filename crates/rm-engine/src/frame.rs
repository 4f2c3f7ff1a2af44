//! Audio frame type.

use rm_ir::FRAME_BYTES;

use crate::codec;

/// A stereo audio frame (16-bit integer), the device's native unit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Frame {
    pub left: i16,
    pub right: i16,
}

impl Frame {
    /// Create a silent frame.
    pub const fn silence() -> Self {
        Self { left: 0, right: 0 }
    }

    /// Encode a pair of normalized samples with clipping.
    pub fn from_f32(left: f32, right: f32) -> Self {
        Self {
            left: codec::f32_to_i16(left),
            right: codec::f32_to_i16(right),
        }
    }

    /// Little-endian interleaved bytes as written to the device.
    pub fn to_le_bytes(self) -> [u8; FRAME_BYTES] {
        let (l0, l1) = codec::sample_to_bytes(self.left);
        let (r0, r1) = codec::sample_to_bytes(self.right);
        [l0, l1, r0, r1]
    }

    /// Decode one frame from little-endian interleaved bytes.
    pub fn from_le_bytes(bytes: [u8; FRAME_BYTES]) -> Self {
        Self {
            left: codec::bytes_to_sample(bytes[0], bytes[1]),
            right: codec::bytes_to_sample(bytes[2], bytes[3]),
        }
    }

    /// Decode a byte stream into frames; a trailing partial frame is ignored.
    pub fn decode_all(bytes: &[u8]) -> alloc::vec::Vec<Frame> {
        bytes
            .chunks_exact(FRAME_BYTES)
            .map(|c| Frame::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect()
    }
}
