//! Per-instance playback state of one sound.

use core::time::Duration;
use rm_ir::{AudioChunk, Channel};

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// Playback state for one sound: cursor, volume, pan and pause flag.
///
/// `cursor` counts frames the device has already played, so it always lies
/// in `[0, len]`; `cursor == len` means the sound is finished.
#[derive(Clone, Debug)]
pub struct SoundSource {
    audio: AudioChunk,
    cursor: usize,
    paused: bool,
    volume: f32,
    pan: f32,
    left_pan: f32,
    right_pan: f32,
}

impl SoundSource {
    /// A new source at full volume, centered, positioned at the start.
    pub fn new(audio: AudioChunk) -> Self {
        Self {
            audio,
            cursor: 0,
            paused: false,
            volume: 1.0,
            pan: 0.0,
            left_pan: 1.0,
            right_pan: 1.0,
        }
    }

    /// The audio this source plays.
    pub fn audio(&self) -> &AudioChunk {
        &self.audio
    }

    /// Current frame index.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Length in frames.
    pub fn len(&self) -> usize {
        self.audio.len()
    }

    /// Returns true if the source has no frames.
    pub fn is_empty(&self) -> bool {
        self.audio.is_empty()
    }

    /// True once the cursor has reached the end.
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.len()
    }

    /// True if not paused and not finished.
    pub fn is_playing(&self) -> bool {
        !self.paused && !self.is_finished()
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    /// Set the volume, clamped to `[0, 1]`.
    pub fn set_volume(&mut self, volume: f32) {
        self.volume = clamp_or_zero(volume, 0.0, 1.0);
    }

    pub fn pan(&self) -> f32 {
        self.pan
    }

    /// Set the balance, clamped to `[-1, 1]`.
    ///
    /// Positive pan attenuates the left channel, negative pan the right;
    /// the favored side always stays at full level.
    pub fn set_pan(&mut self, pan: f32) {
        let pan = clamp_or_zero(pan, -1.0, 1.0);
        self.pan = pan;
        self.left_pan = if pan > 0.0 { 1.0 - pan } else { 1.0 };
        self.right_pan = if pan < 0.0 { 1.0 + pan } else { 1.0 };
    }

    /// Attenuation applied to `channel` by the current pan.
    pub fn pan_factor(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Left => self.left_pan,
            Channel::Right => self.right_pan,
        }
    }

    pub fn paused(&self) -> bool {
        self.paused
    }

    /// Pause or resume without moving the cursor.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Move the cursor, clamped to `[0, len]`.
    pub fn set_cursor(&mut self, frame: usize) {
        self.cursor = frame.min(self.len());
    }

    /// Advance the cursor by `frames`, stopping at the end.
    ///
    /// Returns true if the source is finished afterwards.
    pub fn advance(&mut self, frames: usize) -> bool {
        self.cursor = self.cursor.saturating_add(frames).min(self.len());
        self.is_finished()
    }

    /// Playback position at `sample_rate`.
    pub fn position(&self, sample_rate: u32) -> Duration {
        frames_to_duration(self.cursor, sample_rate)
    }

    /// Total length at `sample_rate`.
    pub fn length(&self, sample_rate: u32) -> Duration {
        frames_to_duration(self.len(), sample_rate)
    }

    /// Seek to `position`, clamped to the length.
    pub fn set_position(&mut self, position: Duration, sample_rate: u32) {
        self.set_cursor(duration_to_frames(position, sample_rate));
    }
}

/// `f32::clamp` that maps NaN to zero instead of propagating it.
fn clamp_or_zero(value: f32, min: f32, max: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(min, max)
    }
}

/// Duration of `frames` at `sample_rate`, truncated to whole nanoseconds.
pub fn frames_to_duration(frames: usize, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    let nanos = frames as u128 * NANOS_PER_SEC / sample_rate as u128;
    Duration::from_nanos(nanos.min(u64::MAX as u128) as u64)
}

/// Nearest frame index for `duration` at `sample_rate`.
pub fn duration_to_frames(duration: Duration, sample_rate: u32) -> usize {
    let scaled = duration.as_nanos() * sample_rate as u128;
    let frames = (2 * scaled + NANOS_PER_SEC) / (2 * NANOS_PER_SEC);
    frames.min(usize::MAX as u128) as usize
}
