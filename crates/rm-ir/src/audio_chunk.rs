//! Canonical stereo float audio.

use alloc::sync::Arc;
use alloc::vec::Vec;

/// Output channel selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    /// Both channels in interleaving order.
    pub const BOTH: [Channel; 2] = [Channel::Left, Channel::Right];

    /// Position of this channel inside an interleaved frame.
    pub const fn index(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }
}

/// Immutable stereo audio at the mixer's output rate.
///
/// Samples are normalized floats, conceptually in `[-1.0, 1.0]`. Both
/// channels always have the same length. A mono chunk stores its samples
/// once and hands the same storage out as left and right.
///
/// Cloning is cheap: storage is reference counted and never mutated.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioChunk {
    left: Arc<[f32]>,
    right: Arc<[f32]>,
}

impl AudioChunk {
    /// Build a chunk from separate left and right channels.
    ///
    /// If the lengths differ, the longer channel is truncated.
    pub fn stereo(mut left: Vec<f32>, mut right: Vec<f32>) -> Self {
        let len = left.len().min(right.len());
        left.truncate(len);
        right.truncate(len);
        Self {
            left: left.into(),
            right: right.into(),
        }
    }

    /// Build a chunk that plays the same samples on both channels.
    pub fn mono(samples: Vec<f32>) -> Self {
        let shared: Arc<[f32]> = samples.into();
        Self {
            left: shared.clone(),
            right: shared,
        }
    }

    /// A chunk with no frames.
    pub fn empty() -> Self {
        Self::mono(Vec::new())
    }

    /// Join chunks end to end.
    ///
    /// Mono storage is preserved only when every part is mono.
    pub fn concat(parts: &[AudioChunk]) -> Self {
        match parts {
            [] => Self::empty(),
            [single] => single.clone(),
            _ => {
                let total: usize = parts.iter().map(AudioChunk::len).sum();
                if parts.iter().all(AudioChunk::is_mono) {
                    let mut samples = Vec::with_capacity(total);
                    for part in parts {
                        samples.extend_from_slice(part.left());
                    }
                    return Self::mono(samples);
                }
                let mut left = Vec::with_capacity(total);
                let mut right = Vec::with_capacity(total);
                for part in parts {
                    left.extend_from_slice(part.left());
                    right.extend_from_slice(part.right());
                }
                Self::stereo(left, right)
            }
        }
    }

    /// Left channel samples.
    pub fn left(&self) -> &[f32] {
        &self.left
    }

    /// Right channel samples.
    pub fn right(&self) -> &[f32] {
        &self.right
    }

    /// Samples of one channel.
    pub fn channel(&self, channel: Channel) -> &[f32] {
        match channel {
            Channel::Left => &self.left,
            Channel::Right => &self.right,
        }
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    /// Returns true if the chunk has no frames.
    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    /// Returns true if both channels share one storage.
    pub fn is_mono(&self) -> bool {
        Arc::ptr_eq(&self.left, &self.right)
    }
}
