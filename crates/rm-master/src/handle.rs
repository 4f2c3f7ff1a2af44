//! Caller-side handle to a playing sound.

use rm_engine::{duration_to_frames, SoundSource, SourceKey};
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::session::{lock, Session};

/// Controls one sound in a [`Mixer`](crate::Mixer).
///
/// Every call takes the mixer lock, so a change lands entirely before or
/// after a tick. Clones refer to the same sound. When the last handle is
/// dropped the sound keeps playing to its end and is then freed; a sound
/// that is paused at that moment is freed right away.
pub struct SoundHandle {
    key: SourceKey,
    session: Arc<Mutex<Session>>,
    sample_rate: u32,
}

impl SoundHandle {
    pub(crate) fn new(key: SourceKey, session: Arc<Mutex<Session>>, sample_rate: u32) -> Self {
        Self {
            key,
            session,
            sample_rate,
        }
    }

    fn read<R: Default>(&self, f: impl FnOnce(&SoundSource) -> R) -> R {
        lock(&self.session)
            .engine
            .source(self.key)
            .map(f)
            .unwrap_or_default()
    }

    fn update(&self, f: impl FnOnce(&mut SoundSource)) {
        if let Some(source) = lock(&self.session).engine.source_mut(self.key) {
            f(source);
        }
    }

    /// Set the volume, clamped to `[0, 1]`.
    pub fn set_volume(&self, volume: f32) {
        self.update(|s| s.set_volume(volume));
    }

    pub fn volume(&self) -> f32 {
        self.read(|s| s.volume())
    }

    /// Set the balance, clamped to `[-1, 1]`.
    pub fn set_pan(&self, pan: f32) {
        self.update(|s| s.set_pan(pan));
    }

    pub fn pan(&self) -> f32 {
        self.read(|s| s.pan())
    }

    /// Pause or resume without moving the playback position.
    ///
    /// Resuming a sound that already reached its end does not restart it;
    /// seek back with [`set_position`](Self::set_position) first.
    pub fn set_paused(&self, paused: bool) {
        self.update(|s| s.set_paused(paused));
    }

    pub fn paused(&self) -> bool {
        self.read(|s| s.paused())
    }

    /// True if the sound is unpaused and not yet at its end.
    pub fn playing(&self) -> bool {
        self.read(|s| s.is_playing())
    }

    /// Seek to `position`, clamped to the length.
    pub fn set_position(&self, position: Duration) {
        let frame = duration_to_frames(position, self.sample_rate);
        lock(&self.session).engine.seek(self.key, frame);
    }

    pub fn position(&self) -> Duration {
        self.read(|s| s.position(self.sample_rate))
    }

    pub fn length(&self) -> Duration {
        self.read(|s| s.length(self.sample_rate))
    }
}

impl Clone for SoundHandle {
    fn clone(&self) -> Self {
        lock(&self.session).engine.retain(self.key);
        Self::new(self.key, self.session.clone(), self.sample_rate)
    }
}

impl Drop for SoundHandle {
    fn drop(&mut self) {
        if lock(&self.session).engine.release(self.key) {
            log::debug!("released source {:?}", self.key);
        }
    }
}

impl fmt::Debug for SoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SoundHandle")
            .field("key", &self.key)
            .field("sample_rate", &self.sample_rate)
            .finish()
    }
}
