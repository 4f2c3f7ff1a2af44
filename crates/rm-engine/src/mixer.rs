//! Source arena and look-ahead renderer.

use alloc::vec;
use alloc::vec::Vec;
use rm_ir::{AudioChunk, Channel, FRAME_BYTES};
use slotmap::SlotMap;

use crate::frame::Frame;
use crate::source::SoundSource;

slotmap::new_key_type! {
    /// Stable key of a source in the engine's arena.
    pub struct SourceKey;
}

/// Arena entry: the source plus how many caller handles still refer to it.
#[derive(Clone, Debug)]
struct SourceSlot {
    source: SoundSource,
    handles: usize,
    active: bool,
    /// Added or moved since the last render; the device has not played
    /// any of it yet, so elapsed playback must not move its cursor.
    fresh: bool,
}

/// The mix engine: owns every source and renders the look-ahead.
///
/// Sources live in an arena keyed by [`SourceKey`]. The active list keeps
/// insertion order and only holds sources that still take part in mixing;
/// a finished source drops out of it but stays in the arena while a handle
/// refers to it.
pub struct MixEngine {
    /// All sources, active or not
    sources: SlotMap<SourceKey, SourceSlot>,
    /// Sources taking part in mixing, in play order
    active: Vec<SourceKey>,
    /// Output rate (e.g., 44100)
    sample_rate: u32,
    /// Gain applied after summing, in `[0, 1]`
    master_volume: f32,
    /// Interleaved float accumulator, two samples per look-ahead frame
    mix: Vec<f32>,
    /// Encoded look-ahead, four bytes per frame
    look_ahead: Vec<u8>,
    /// Bytes of elapsed playback not yet worth a whole frame
    residual_bytes: usize,
}

impl MixEngine {
    /// Create an engine rendering `look_ahead_frames` frames per pass.
    pub fn new(sample_rate: u32, look_ahead_frames: usize) -> Self {
        Self {
            sources: SlotMap::with_key(),
            active: Vec::new(),
            sample_rate,
            master_volume: 1.0,
            mix: vec![0.0; look_ahead_frames * 2],
            look_ahead: vec![0; look_ahead_frames * FRAME_BYTES],
            residual_bytes: 0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Look-ahead length in frames.
    pub fn look_ahead_frames(&self) -> usize {
        self.look_ahead.len() / FRAME_BYTES
    }

    /// Look-ahead length in bytes.
    pub fn look_ahead_bytes(&self) -> usize {
        self.look_ahead.len()
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// Set the master volume, clamped to `[0, 1]`.
    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
    }

    // --- Sources ---

    /// Add a source at cursor 0. The caller holds one handle to it.
    pub fn add(&mut self, audio: AudioChunk) -> SourceKey {
        let key = self.sources.insert(SourceSlot {
            source: SoundSource::new(audio),
            handles: 1,
            active: true,
            fresh: true,
        });
        self.active.push(key);
        key
    }

    /// Register another handle to `key`.
    pub fn retain(&mut self, key: SourceKey) {
        if let Some(slot) = self.sources.get_mut(key) {
            slot.handles += 1;
        }
    }

    /// Drop one handle to `key`.
    ///
    /// Once no handle is left the source is freed as soon as it can no
    /// longer be heard: immediately if it is finished or paused, otherwise
    /// when it finishes. Returns true if the source was freed now.
    pub fn release(&mut self, key: SourceKey) -> bool {
        let Some(slot) = self.sources.get_mut(key) else {
            return false;
        };
        slot.handles = slot.handles.saturating_sub(1);
        if slot.handles > 0 {
            return false;
        }
        if slot.active && !slot.source.paused() && !slot.source.is_finished() {
            return false;
        }
        if slot.active {
            self.active.retain(|&k| k != key);
        }
        self.sources.remove(key);
        true
    }

    /// Look up a source.
    pub fn source(&self, key: SourceKey) -> Option<&SoundSource> {
        self.sources.get(key).map(|slot| &slot.source)
    }

    /// Mutable access to a source's controls.
    pub fn source_mut(&mut self, key: SourceKey) -> Option<&mut SoundSource> {
        self.sources.get_mut(key).map(|slot| &mut slot.source)
    }

    /// Move a source's cursor to `frame` (clamped to its length).
    ///
    /// The next render starts exactly at `frame`. A finished source that is
    /// moved back before its end rejoins the mix at the back of the active
    /// list.
    pub fn seek(&mut self, key: SourceKey, frame: usize) {
        let Some(slot) = self.sources.get_mut(key) else {
            return;
        };
        slot.source.set_cursor(frame);
        slot.fresh = true;
        if !slot.active && !slot.source.is_finished() {
            slot.active = true;
            self.active.push(key);
        }
    }

    /// True if the source currently takes part in mixing.
    pub fn is_active(&self, key: SourceKey) -> bool {
        self.sources.get(key).is_some_and(|slot| slot.active)
    }

    /// Number of sources taking part in mixing.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of sources held in the arena, active or not.
    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    // --- Playback ---

    /// Account for `bytes` of elapsed device playback.
    ///
    /// Whole frames are applied to every unpaused source; a leftover
    /// fraction of a frame is carried into the next call. Returns the
    /// number of frames applied.
    pub fn advance_bytes(&mut self, bytes: usize) -> usize {
        let total = self.residual_bytes + bytes;
        self.residual_bytes = total % FRAME_BYTES;
        let frames = total / FRAME_BYTES;
        self.advance(frames);
        frames
    }

    /// Forget a partial frame carried over from an earlier run.
    pub fn reset_residual(&mut self) {
        self.residual_bytes = 0;
    }

    /// Advance every unpaused active source by `frames`, then drop
    /// finished sources from the mix.
    ///
    /// Sources that have not been rendered since they were added or moved
    /// keep their cursor: the elapsed playback predates them.
    pub fn advance(&mut self, frames: usize) {
        if frames > 0 {
            for &key in &self.active {
                if let Some(slot) = self.sources.get_mut(key) {
                    if !slot.fresh && !slot.source.paused() {
                        slot.source.advance(frames);
                    }
                }
            }
        }
        self.reap();
    }

    /// Drop finished sources, and paused sources nobody can resume, from
    /// the active list. Sources without handles are freed.
    fn reap(&mut self) {
        let sources = &mut self.sources;
        self.active.retain(|&key| {
            let Some(slot) = sources.get_mut(key) else {
                return false;
            };
            let detached = slot.handles == 0;
            let audible = !slot.source.is_finished() && !(detached && slot.source.paused());
            if audible {
                return true;
            }
            slot.active = false;
            if detached {
                sources.remove(key);
            }
            false
        });
    }

    /// Render the whole look-ahead from the sources' current cursors.
    ///
    /// Each output sample is the sum over unpaused active sources of
    /// `sample * volume * pan_factor`, scaled by the master volume and
    /// encoded with clipping. Frames past a source's end contribute
    /// silence. Every source rendered here counts as written to the device.
    pub fn render(&mut self) -> &[u8] {
        self.mix.fill(0.0);
        let frames = self.look_ahead.len() / FRAME_BYTES;

        for &key in &self.active {
            let Some(slot) = self.sources.get_mut(key) else {
                continue;
            };
            if slot.source.paused() {
                continue;
            }
            slot.fresh = false;
            let source = &slot.source;
            let audio = source.audio();
            let start = source.cursor().min(audio.len());
            for channel in Channel::BOTH {
                let gain = source.volume() * source.pan_factor(channel);
                let samples = &audio.channel(channel)[start..];
                let n = samples.len().min(frames);
                let offset = channel.index();
                for (i, &sample) in samples[..n].iter().enumerate() {
                    self.mix[i * 2 + offset] += sample * gain;
                }
            }
        }

        let master = self.master_volume;
        for (out, pair) in self
            .look_ahead
            .chunks_exact_mut(FRAME_BYTES)
            .zip(self.mix.chunks_exact(2))
        {
            let frame = Frame::from_f32(pair[0] * master, pair[1] * master);
            out.copy_from_slice(&frame.to_le_bytes());
        }
        &self.look_ahead
    }

    /// The most recently rendered look-ahead.
    pub fn look_ahead(&self) -> &[u8] {
        &self.look_ahead
    }
}

/// Bytes the device has consumed between two write cursor readings of a
/// ring buffer of `buffer_size` bytes.
///
/// A new cursor below the previous one means the device wrapped around.
pub fn ring_delta(previous: usize, current: usize, buffer_size: usize) -> usize {
    if current >= previous {
        current - previous
    } else {
        current + buffer_size - previous
    }
}
