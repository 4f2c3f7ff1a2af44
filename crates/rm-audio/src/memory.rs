//! In-memory ring buffer device.
//!
//! Behaves like a hardware ring buffer whose clock is driven by the caller:
//! nothing is consumed until [`MemoryDevice::advance`] is called. Clones share
//! the same ring, so a test or an offline renderer can keep one clone while
//! the mixer owns another.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::traits::{write_wrapped, Cursors, DeviceError, SoundDevice};

const FRAME_BYTES: usize = 4;

/// One recorded call to [`SoundDevice::write`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteRecord {
    pub offset: usize,
    pub len: usize,
}

#[derive(Debug)]
struct MemoryRing {
    size: usize,
    commit_gap: usize,
    buffer: Vec<u8>,
    play: usize,
    sample_rate: Option<u32>,
    running: bool,
    closed: bool,
    starts: usize,
    writes: Vec<WriteRecord>,
    fail_write: Option<DeviceError>,
    fail_cursors: Option<DeviceError>,
}

/// Ring buffer device advanced by hand.
#[derive(Clone, Debug)]
pub struct MemoryDevice {
    ring: Arc<Mutex<MemoryRing>>,
}

impl MemoryDevice {
    /// A device with a `size`-byte ring whose write cursor runs
    /// `commit_gap` bytes ahead of the play cursor. Both are rounded down
    /// to whole frames.
    pub fn new(size: usize, commit_gap: usize) -> Self {
        let size = size - size % FRAME_BYTES;
        let commit_gap = (commit_gap - commit_gap % FRAME_BYTES).min(size.saturating_sub(FRAME_BYTES));
        Self {
            ring: Arc::new(Mutex::new(MemoryRing {
                size,
                commit_gap,
                buffer: Vec::new(),
                play: 0,
                sample_rate: None,
                running: false,
                closed: false,
                starts: 0,
                writes: Vec::new(),
                fail_write: None,
                fail_cursors: None,
            })),
        }
    }

    fn ring(&self) -> MutexGuard<'_, MemoryRing> {
        self.ring.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Simulate the hardware playing `bytes` bytes.
    ///
    /// Returns the bytes that were played. A stopped device plays nothing.
    pub fn advance(&self, bytes: usize) -> Vec<u8> {
        let mut ring = self.ring();
        if !ring.running || ring.buffer.is_empty() {
            return Vec::new();
        }
        let size = ring.size;
        let mut played = Vec::with_capacity(bytes);
        let mut remaining = bytes;
        while remaining > 0 {
            let play = ring.play;
            let n = remaining.min(size - play);
            played.extend_from_slice(&ring.buffer[play..play + n]);
            ring.play = (play + n) % size;
            remaining -= n;
        }
        played
    }

    /// Place the play cursor directly, e.g. to stage a wraparound.
    pub fn set_play_cursor(&self, play: usize) {
        let mut ring = self.ring();
        if ring.size > 0 {
            ring.play = play % ring.size;
        }
    }

    /// Snapshot of the ring contents.
    pub fn buffer(&self) -> Vec<u8> {
        self.ring().buffer.clone()
    }

    /// Every write so far, oldest first.
    pub fn writes(&self) -> Vec<WriteRecord> {
        self.ring().writes.clone()
    }

    /// Rate passed to `init`, if initialized.
    pub fn sample_rate(&self) -> Option<u32> {
        self.ring().sample_rate
    }

    pub fn is_running(&self) -> bool {
        self.ring().running
    }

    pub fn is_closed(&self) -> bool {
        self.ring().closed
    }

    /// How many times `start` succeeded.
    pub fn start_count(&self) -> usize {
        self.ring().starts
    }

    /// Make the next `write` fail with `err`.
    pub fn fail_next_write(&self, err: DeviceError) {
        self.ring().fail_write = Some(err);
    }

    /// Make the next `cursors` query fail with `err`.
    pub fn fail_next_cursors(&self, err: DeviceError) {
        self.ring().fail_cursors = Some(err);
    }
}

impl SoundDevice for MemoryDevice {
    fn init(&mut self, sample_rate: u32) -> Result<(), DeviceError> {
        if sample_rate == 0 {
            return Err(DeviceError::InvalidSampleRate(sample_rate));
        }
        let mut ring = self.ring();
        if ring.size == 0 {
            return Err(DeviceError::Init("ring buffer size is zero".into()));
        }
        ring.buffer = vec![0; ring.size];
        ring.play = 0;
        ring.sample_rate = Some(sample_rate);
        ring.closed = false;
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        let mut ring = self.ring();
        if ring.sample_rate.is_none() {
            return Err(DeviceError::NotInitialized);
        }
        ring.running = true;
        ring.starts += 1;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        let mut ring = self.ring();
        if ring.sample_rate.is_none() {
            return Err(DeviceError::NotInitialized);
        }
        ring.running = false;
        Ok(())
    }

    fn close(&mut self) {
        let mut ring = self.ring();
        ring.running = false;
        ring.closed = true;
        ring.sample_rate = None;
    }

    fn buffer_size(&self) -> usize {
        let ring = self.ring();
        if ring.sample_rate.is_some() {
            ring.size
        } else {
            0
        }
    }

    fn write(&mut self, data: &[u8], offset: usize) -> Result<(), DeviceError> {
        let mut ring = self.ring();
        if ring.sample_rate.is_none() {
            return Err(DeviceError::NotInitialized);
        }
        if let Some(err) = ring.fail_write.take() {
            return Err(err);
        }
        write_wrapped(&mut ring.buffer, data, offset);
        ring.writes.push(WriteRecord {
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn cursors(&mut self) -> Result<Cursors, DeviceError> {
        let mut ring = self.ring();
        if ring.sample_rate.is_none() {
            return Err(DeviceError::NotInitialized);
        }
        if let Some(err) = ring.fail_cursors.take() {
            return Err(err);
        }
        Ok(Cursors {
            play: ring.play,
            write: (ring.play + ring.commit_gap) % ring.size,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ready(size: usize, gap: usize) -> MemoryDevice {
        let mut device = MemoryDevice::new(size, gap);
        device.init(44100).unwrap();
        device
    }

    #[test]
    fn sizes_round_down_to_frames() {
        let device = ready(18, 6);
        assert_eq!(device.buffer_size(), 16);
        let mut d = device.clone();
        assert_eq!(d.cursors().unwrap(), Cursors { play: 0, write: 4 });
    }

    #[test]
    fn uninitialized_device_rejects_io() {
        let mut device = MemoryDevice::new(16, 4);
        assert_eq!(device.buffer_size(), 0);
        assert_eq!(device.write(&[0; 4], 0), Err(DeviceError::NotInitialized));
        assert_eq!(device.cursors(), Err(DeviceError::NotInitialized));
        assert_eq!(device.init(0), Err(DeviceError::InvalidSampleRate(0)));
    }

    #[test]
    fn advance_plays_from_ring_and_wraps() {
        let mut device = ready(8, 4);
        device.write(&[1, 2, 3, 4, 5, 6, 7, 8], 0).unwrap();
        assert!(device.advance(4).is_empty(), "stopped device must not play");
        device.start().unwrap();
        assert_eq!(device.advance(6), vec![1, 2, 3, 4, 5, 6]);
        assert_eq!(device.advance(4), vec![7, 8, 1, 2]);
        assert_eq!(device.cursors().unwrap(), Cursors { play: 2, write: 6 });
    }

    #[test]
    fn write_cursor_wraps_past_end() {
        let mut device = ready(16, 8);
        device.set_play_cursor(12);
        assert_eq!(device.cursors().unwrap(), Cursors { play: 12, write: 4 });
    }

    #[test]
    fn clones_share_state() {
        let mut owner = ready(16, 4);
        let observer = owner.clone();
        owner.write(&[7; 4], 8).unwrap();
        assert_eq!(&observer.buffer()[8..12], &[7; 4]);
        assert_eq!(observer.writes(), vec![WriteRecord { offset: 8, len: 4 }]);
    }

    #[test]
    fn injected_faults_fire_once() {
        let mut device = ready(16, 4);
        device.fail_next_write(DeviceError::Io("lost".into()));
        assert_eq!(device.write(&[0; 4], 0), Err(DeviceError::Io("lost".into())));
        assert!(device.write(&[0; 4], 0).is_ok());

        device.fail_next_cursors(DeviceError::Io("gone".into()));
        assert!(device.cursors().is_err());
        assert!(device.cursors().is_ok());
    }

    #[test]
    fn close_stops_and_uninitializes() {
        let mut device = ready(16, 4);
        device.start().unwrap();
        device.close();
        assert!(!device.is_running());
        assert!(device.is_closed());
        assert_eq!(device.buffer_size(), 0);
    }
}
