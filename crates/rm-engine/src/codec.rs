//! Conversions between raw PCM bytes and normalized float samples.
//!
//! Normalization is asymmetric: positive values are scaled by the positive
//! extreme and negative values by the negative extreme, so both ends of the
//! integer range land exactly on `±1.0`.

use alloc::vec::Vec;

/// Distance kept from the i16 limits before rounding, so the rounded
/// value can never leave the representable range.
const CLIP_INSET: f32 = 0.1;

const I16_MIN: f32 = i16::MIN as f32;
const I16_MAX: f32 = i16::MAX as f32;

/// Decode a little-endian 16-bit signed sample.
#[inline]
pub fn bytes_to_sample(lo: u8, hi: u8) -> i16 {
    i16::from_le_bytes([lo, hi])
}

/// Encode a 16-bit signed sample as little-endian bytes.
#[inline]
pub fn sample_to_bytes(value: i16) -> (u8, u8) {
    let [lo, hi] = value.to_le_bytes();
    (lo, hi)
}

/// Normalize a 16-bit sample to `[-1.0, 1.0]`.
#[inline]
pub fn i16_to_f32(value: i16) -> f32 {
    if value >= 0 {
        value as f32 / I16_MAX
    } else {
        value as f32 / -I16_MIN
    }
}

/// Normalize an unsigned 8-bit sample (silence at 128) to `[-1.0, 1.0]`.
#[inline]
pub fn u8_to_f32(value: u8) -> f32 {
    let centered = value as f32 - 128.0;
    if value >= 128 {
        centered / 127.0
    } else {
        centered / 128.0
    }
}

/// Clip a value in i16 scale and round it half away from zero.
///
/// Out-of-range input is pulled to just inside the limits first, so the
/// result saturates at the limit with the correct sign. NaN encodes as 0.
#[inline]
pub fn clip_to_i16(value: f32) -> i16 {
    let mut v = value;
    if v < I16_MIN {
        v = I16_MIN + CLIP_INSET;
    }
    if v > I16_MAX {
        v = I16_MAX - CLIP_INSET;
    }
    let rounded = if v > 0.0 {
        libm::floorf(v + 0.5)
    } else {
        libm::ceilf(v - 0.5)
    };
    rounded as i16
}

/// Scale a normalized sample back to i16 and encode it with clipping.
#[inline]
pub fn f32_to_i16(value: f32) -> i16 {
    let scaled = if value > 0.0 {
        value * I16_MAX
    } else {
        value * -I16_MIN
    };
    clip_to_i16(scaled)
}

/// Decode interleaved little-endian 16-bit samples to normalized floats.
///
/// A trailing odd byte is ignored.
pub fn decode_16bit(raw: &[u8]) -> Vec<f32> {
    raw.chunks_exact(2)
        .map(|c| i16_to_f32(bytes_to_sample(c[0], c[1])))
        .collect()
}

/// Decode unsigned 8-bit samples to normalized floats.
pub fn decode_8bit(raw: &[u8]) -> Vec<f32> {
    raw.iter().map(|&b| u8_to_f32(b)).collect()
}

/// Widen unsigned 8-bit PCM to signed 16-bit little-endian PCM.
pub fn widen_8bit_to_16bit(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() * 2);
    for &b in raw {
        let (lo, hi) = sample_to_bytes(f32_to_i16(u8_to_f32(b)));
        out.push(lo);
        out.push(hi);
    }
    out
}

/// Duplicate every 16-bit mono sample into a stereo frame.
pub fn mono_to_stereo_16bit(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() * 2);
    for c in raw.chunks_exact(2) {
        out.extend_from_slice(&[c[0], c[1], c[0], c[1]]);
    }
    out
}

/// Split interleaved 16-bit stereo into normalized left and right channels.
pub fn split_stereo_16bit(raw: &[u8]) -> (Vec<f32>, Vec<f32>) {
    let frames = raw.len() / 4;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for c in raw.chunks_exact(4) {
        left.push(i16_to_f32(bytes_to_sample(c[0], c[1])));
        right.push(i16_to_f32(bytes_to_sample(c[2], c[3])));
    }
    (left, right)
}

/// Split interleaved 8-bit stereo into normalized left and right channels.
pub fn split_stereo_8bit(raw: &[u8]) -> (Vec<f32>, Vec<f32>) {
    let frames = raw.len() / 2;
    let mut left = Vec::with_capacity(frames);
    let mut right = Vec::with_capacity(frames);
    for c in raw.chunks_exact(2) {
        left.push(u8_to_f32(c[0]));
        right.push(u8_to_f32(c[1]));
    }
    (left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn byte_round_trip_covers_full_range() {
        for v in i16::MIN..=i16::MAX {
            let (lo, hi) = sample_to_bytes(v);
            assert_eq!(bytes_to_sample(lo, hi), v);
        }
    }

    #[test]
    fn extremes_normalize_to_unit() {
        assert_eq!(i16_to_f32(i16::MAX), 1.0);
        assert_eq!(i16_to_f32(i16::MIN), -1.0);
        assert_eq!(i16_to_f32(0), 0.0);
        assert_eq!(u8_to_f32(255), 1.0);
        assert_eq!(u8_to_f32(0), -1.0);
        assert_eq!(u8_to_f32(128), 0.0);
    }

    #[test]
    fn normalized_round_trip_is_exact() {
        for v in i16::MIN..=i16::MAX {
            assert_eq!(f32_to_i16(i16_to_f32(v)), v, "value {}", v);
        }
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(clip_to_i16(1.5), 2);
        assert_eq!(clip_to_i16(2.5), 3);
        assert_eq!(clip_to_i16(-1.5), -2);
        assert_eq!(clip_to_i16(-2.5), -3);
        assert_eq!(clip_to_i16(1.49), 1);
        assert_eq!(clip_to_i16(-0.4), 0);
    }

    #[test]
    fn clipping_never_wraps() {
        for v in [32767.4, 32767.6, 40000.0, 1.0e9, f32::INFINITY] {
            assert_eq!(clip_to_i16(v), i16::MAX, "input {}", v);
        }
        for v in [-32768.4, -32768.6, -40000.0, -1.0e9, f32::NEG_INFINITY] {
            assert_eq!(clip_to_i16(v), i16::MIN, "input {}", v);
        }
        assert_eq!(f32_to_i16(3.0), i16::MAX);
        assert_eq!(f32_to_i16(-3.0), i16::MIN);
    }

    #[test]
    fn nan_encodes_as_silence() {
        assert_eq!(clip_to_i16(f32::NAN), 0);
    }

    #[test]
    fn widen_8bit_maps_extremes() {
        assert_eq!(widen_8bit_to_16bit(&[0, 255]), vec![0x00, 0x80, 0xFF, 0x7F]);
        assert_eq!(widen_8bit_to_16bit(&[128]), vec![0, 0]);
    }

    #[test]
    fn mono_to_stereo_copies_each_sample() {
        let out = mono_to_stereo_16bit(&[1, 2, 3, 4, 5, 6]);
        assert_eq!(out, vec![1, 2, 1, 2, 3, 4, 3, 4, 5, 6, 5, 6]);
    }

    #[test]
    fn split_stereo_16bit_separates_channels() {
        let (left, right) = split_stereo_16bit(&[0, 0, 255, 255, 255, 127, 0, 128]);
        assert_eq!(left, vec![0.0, 1.0]);
        assert_eq!(right, vec![-1.0 / 32768.0, -1.0]);
        let back: Vec<i16> = right.iter().map(|&f| f32_to_i16(f)).collect();
        assert_eq!(back, vec![-1, -32768]);
    }

    #[test]
    fn split_stereo_8bit_separates_channels() {
        let (left, right) = split_stereo_8bit(&[255, 0, 128, 128, 7]);
        assert_eq!(left, vec![1.0, 0.0]);
        assert_eq!(right, vec![-1.0, 0.0]);
    }

    #[test]
    fn decode_16bit_ignores_odd_byte() {
        assert_eq!(decode_16bit(&[255, 127, 9]), vec![1.0]);
    }
}
