//! Shared mixer state and the tick protocol.
//!
//! One [`Session`] sits behind a mutex shared by the tick loop and every
//! control call. A tick holds the lock from delta computation through the
//! device write, so control calls land entirely before or after it.

use rm_audio::{Cursors, DeviceError, SoundDevice};
use rm_engine::{ring_delta, MixEngine};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Phase {
    Stopped,
    Running,
}

pub(crate) struct Session {
    pub(crate) engine: MixEngine,
    pub(crate) phase: Phase,
    /// Terminal error of the last run, if a tick failed
    pub(crate) error: Option<DeviceError>,
    /// Device write cursor seen by the previous tick
    write_cursor: usize,
    buffer_size: usize,
}

impl Session {
    pub(crate) fn new(engine: MixEngine, buffer_size: usize) -> Self {
        Self {
            engine,
            phase: Phase::Stopped,
            error: None,
            write_cursor: 0,
            buffer_size,
        }
    }

    pub(crate) fn write_cursor(&self) -> usize {
        self.write_cursor
    }

    /// Fill the ring before the device starts.
    ///
    /// With nothing to play the whole ring is cleared once; otherwise the
    /// first look-ahead is rendered at `offset`.
    pub(crate) fn prime<D: SoundDevice>(
        &mut self,
        device: &mut D,
        offset: usize,
    ) -> Result<(), DeviceError> {
        self.engine.reset_residual();
        if self.engine.active_count() == 0 {
            device.write(&vec![0; self.buffer_size], offset)?;
        } else {
            device.write(render_look_ahead(&mut self.engine), offset)?;
        }
        self.write_cursor = offset;
        Ok(())
    }

    /// One running tick against freshly read device cursors.
    ///
    /// Returns the number of bytes the device consumed since the previous
    /// tick; 0 means nothing was rendered.
    pub(crate) fn tick<D: SoundDevice>(
        &mut self,
        device: &mut D,
        cursors: Cursors,
    ) -> Result<usize, DeviceError> {
        let delta = ring_delta(self.write_cursor, cursors.write, self.buffer_size);
        if delta == 0 {
            return Ok(0);
        }

        let before = self.engine.active_count();
        let frames = self.engine.advance_bytes(delta);
        let finished = before - self.engine.active_count();
        if finished > 0 {
            log::debug!("{} source(s) left the mix", finished);
        }
        log::trace!(
            "tick: write cursor {} -> {}, delta {} bytes ({} frames)",
            self.write_cursor,
            cursors.write,
            delta,
            frames
        );

        device.write(render_look_ahead(&mut self.engine), cursors.write)?;
        self.write_cursor = cursors.write;
        Ok(delta)
    }
}

/// Query the device, then run one tick under the session lock.
pub(crate) fn step<D: SoundDevice>(
    device: &mut D,
    shared: &Mutex<Session>,
) -> Result<usize, DeviceError> {
    let cursors = device.cursors()?;
    lock(shared).tick(device, cursors)
}

/// Lock the session, recovering it if a control call panicked while
/// holding the lock.
pub(crate) fn lock(shared: &Mutex<Session>) -> MutexGuard<'_, Session> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(feature = "alloc_check")]
fn render_look_ahead(engine: &mut MixEngine) -> &[u8] {
    assert_no_alloc::assert_no_alloc(|| {
        engine.render();
    });
    engine.look_ahead()
}

#[cfg(not(feature = "alloc_check"))]
fn render_look_ahead(engine: &mut MixEngine) -> &[u8] {
    engine.render()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rm_audio::MemoryDevice;
    use rm_engine::Frame;
    use rm_ir::AudioChunk;

    const RING: usize = 64;

    fn setup(look_ahead_frames: usize) -> (Session, MemoryDevice) {
        let mut device = MemoryDevice::new(RING, 8);
        device.init(1000).unwrap();
        let session = Session::new(MixEngine::new(1000, look_ahead_frames), RING);
        (session, device)
    }

    #[test]
    fn prime_without_sources_clears_whole_ring() {
        let (mut session, mut device) = setup(4);
        device.write(&[0xAA; RING], 0).unwrap();
        session.prime(&mut device, 0).unwrap();
        assert!(device.buffer().iter().all(|&b| b == 0));
        assert_eq!(device.writes().last().unwrap().len, RING);
    }

    #[test]
    fn prime_renders_look_ahead_at_offset() {
        let (mut session, mut device) = setup(2);
        session.engine.add(AudioChunk::mono(vec![0.5; 8]));
        session.prime(&mut device, 0).unwrap();
        let frames = Frame::decode_all(&device.buffer()[..8]);
        assert_eq!(frames, vec![Frame::from_f32(0.5, 0.5); 2]);
        assert_eq!(session.write_cursor(), 0);
    }

    #[test]
    fn unchanged_cursor_skips_render() {
        let (mut session, mut device) = setup(2);
        session.prime(&mut device, 0).unwrap();
        let writes = device.writes().len();
        let delta = session.tick(&mut device, Cursors { play: 0, write: 0 }).unwrap();
        assert_eq!(delta, 0);
        assert_eq!(device.writes().len(), writes);
    }

    #[test]
    fn wrapped_cursor_advances_by_wrapped_delta() {
        let (mut session, mut device) = setup(2);
        let key = session.engine.add(AudioChunk::mono(vec![0.25; 100]));
        session.prime(&mut device, 48).unwrap();

        let delta = session.tick(&mut device, Cursors { play: 0, write: 8 }).unwrap();
        assert_eq!(delta, 8 + RING - 48);
        assert_eq!(session.engine.source(key).unwrap().cursor(), delta / 4);
        assert_eq!(session.write_cursor(), 8);
        assert_eq!(device.writes().last().unwrap().offset, 8);
    }

    #[test]
    fn prime_discards_partial_frame_of_previous_run() {
        let (mut session, mut device) = setup(2);
        let key = session.engine.add(AudioChunk::mono(vec![0.25; 100]));
        session.prime(&mut device, 0).unwrap();
        session.tick(&mut device, Cursors { play: 0, write: 6 }).unwrap();
        assert_eq!(session.engine.source(key).unwrap().cursor(), 1);

        session.prime(&mut device, 8).unwrap();
        session.tick(&mut device, Cursors { play: 8, write: 10 }).unwrap();
        assert_eq!(session.engine.source(key).unwrap().cursor(), 1);
    }

    #[test]
    fn source_added_between_ticks_starts_at_first_sample() {
        let (mut session, mut device) = setup(2);
        session.prime(&mut device, 0).unwrap();
        session.tick(&mut device, Cursors { play: 0, write: 8 }).unwrap();

        let key = session.engine.add(AudioChunk::mono(vec![0.5, 0.25, 0.0]));
        session.tick(&mut device, Cursors { play: 8, write: 24 }).unwrap();
        assert_eq!(session.engine.source(key).unwrap().cursor(), 0);
        let frames = Frame::decode_all(&device.buffer()[24..32]);
        assert_eq!(frames[0], Frame::from_f32(0.5, 0.5));
        assert_eq!(frames[1], Frame::from_f32(0.25, 0.25));
    }

    #[test]
    fn failed_write_keeps_previous_cursor() {
        let (mut session, mut device) = setup(2);
        session.prime(&mut device, 0).unwrap();
        device.fail_next_write(DeviceError::Io("unplugged".into()));
        let result = session.tick(&mut device, Cursors { play: 0, write: 16 });
        assert_eq!(result, Err(DeviceError::Io("unplugged".into())));
        assert_eq!(session.write_cursor(), 0);
    }
}
