//! Endpoint-anchored linear interpolation resampler.
//!
//! The first and last output frames sit exactly on the first and last input
//! frames; everything in between is spread evenly across the input. Output
//! positions that land on an input index copy that sample unchanged.

use alloc::vec::Vec;

/// Converts a fixed-rate channel to another rate.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resampler {
    from_rate: u32,
    to_rate: u32,
}

impl Resampler {
    /// Create a resampler. Both rates must be non-zero.
    pub fn new(from_rate: u32, to_rate: u32) -> Self {
        debug_assert!(from_rate > 0 && to_rate > 0);
        Self { from_rate, to_rate }
    }

    /// True if input and output rates match.
    pub fn is_identity(&self) -> bool {
        self.from_rate == self.to_rate
    }

    /// Output length for `input_len` frames: `input_len * to / from`,
    /// rounded half up.
    pub fn output_len(&self, input_len: usize) -> usize {
        if self.is_identity() {
            return input_len;
        }
        let num = input_len as u128 * self.to_rate as u128;
        let den = self.from_rate as u128;
        ((2 * num + den) / (2 * den)) as usize
    }

    /// Resample one channel.
    pub fn process(&self, input: &[f32]) -> Vec<f32> {
        if self.is_identity() {
            return input.to_vec();
        }
        let out_len = self.output_len(input.len());
        if input.is_empty() || out_len == 0 {
            return Vec::new();
        }
        if out_len == 1 {
            return alloc::vec![input[0]];
        }

        // Output frame j maps to input position j * (n - 1) / (m - 1). The
        // ratio is kept as an integer quotient and remainder so exact hits
        // stay exact.
        let span = (input.len() - 1) as u64;
        let steps = (out_len - 1) as u64;
        (0..out_len as u64)
            .map(|j| {
                let num = j * span;
                let index = (num / steps) as usize;
                let rem = num % steps;
                if rem == 0 {
                    input[index]
                } else {
                    let frac = rem as f64 / steps as f64;
                    lerp(input[index], input[index + 1], frac)
                }
            })
            .collect()
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f64) -> f32 {
    (a as f64 + (b as f64 - a as f64) * t) as f32
}

/// Resample one channel from `from_rate` to `to_rate`.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    Resampler::new(from_rate, to_rate).process(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn two_frames_upsampled_hits_midpoint() {
        assert_eq!(resample(&[1.0, 3.0], 2, 3), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn three_frames_upsampled_anchor_both_ends() {
        assert_eq!(
            resample(&[1.0, 3.0, 5.0], 2, 3),
            vec![1.0, 2.0, 3.0, 4.0, 5.0]
        );
    }

    #[test]
    fn output_len_rounds_half_up() {
        let r = Resampler::new(2, 3);
        assert_eq!(r.output_len(2), 3);
        assert_eq!(r.output_len(3), 5); // 4.5
        assert_eq!(r.output_len(0), 0);
        assert_eq!(Resampler::new(44100, 22050).output_len(3), 2); // 1.5
        assert_eq!(Resampler::new(3, 1).output_len(1), 0); // 0.33
    }

    #[test]
    fn identity_passes_through() {
        assert_eq!(resample(&[0.25, -0.5], 44100, 44100), vec![0.25, -0.5]);
        assert_eq!(resample(&[0.75], 44100, 44100), vec![0.75]);
        assert!(resample(&[], 44100, 44100).is_empty());
    }

    #[test]
    fn empty_input_gives_empty_output() {
        assert!(resample(&[], 22050, 44100).is_empty());
    }

    #[test]
    fn single_frame_repeats() {
        assert_eq!(resample(&[0.5], 1, 3), vec![0.5, 0.5, 0.5]);
    }

    #[test]
    fn downsample_to_one_frame_keeps_first() {
        assert_eq!(resample(&[0.1, 0.9], 4, 2), vec![0.1]);
    }

    #[test]
    fn downsample_keeps_endpoints() {
        let input: Vec<f32> = (0..9).map(|i| i as f32).collect();
        let out = resample(&input, 9, 5);
        assert_eq!(out, vec![0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn exact_positions_are_not_interpolated() {
        let input = [0.1f32, 0.7, -0.3];
        // 3 -> 5 frames: even outputs land on inputs
        let out = resample(&input, 3, 5);
        assert_eq!(out[0], 0.1);
        assert_eq!(out[2], 0.7);
        assert_eq!(out[4], -0.3);
    }
}
