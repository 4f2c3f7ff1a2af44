//! CPAL-based polled ring buffer device.
//!
//! CPAL pulls audio through a callback; this device hides that behind a
//! ring buffer with play and write cursors. The callback consumes the ring
//! at the play cursor and the write cursor is kept a fixed commit gap ahead
//! of it, the way a hardware buffer reports its committed region.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::traits::{Cursors, DeviceError, SoundDevice};

const FRAME_BYTES: usize = 4;

/// Default ring length.
pub const DEFAULT_BUFFER_DURATION: Duration = Duration::from_secs(2);

/// Default distance between play and write cursor.
pub const DEFAULT_COMMIT_GAP: Duration = Duration::from_millis(15);

/// Ring state shared with the stream callback.
struct SharedRing {
    frames: FrameRing,
    play: AtomicUsize,
    running: AtomicBool,
}

/// Ring of 16-bit stereo frames, one atomic word per frame.
///
/// The stream callback reads whole frames without taking a lock; the
/// single writer stores bytes into them.
struct FrameRing {
    slots: Box<[AtomicU32]>,
}

impl FrameRing {
    fn new(size: usize) -> Self {
        Self {
            slots: (0..size / FRAME_BYTES).map(|_| AtomicU32::new(0)).collect(),
        }
    }

    fn len_bytes(&self) -> usize {
        self.slots.len() * FRAME_BYTES
    }

    /// The frame starting at byte `offset`, as little-endian bytes.
    fn frame_at(&self, offset: usize) -> [u8; FRAME_BYTES] {
        self.slots[offset / FRAME_BYTES]
            .load(Ordering::Relaxed)
            .to_le_bytes()
    }

    /// Copy `data` in at byte `offset`, wrapping at the end of the ring.
    fn write(&self, data: &[u8], offset: usize) {
        let len = self.len_bytes();
        if len == 0 {
            return;
        }
        // Only the last `len` bytes can survive a write longer than the ring.
        let skipped = data.len().saturating_sub(len);
        let mut rest = &data[skipped..];
        let mut pos = (offset + skipped) % len;
        while !rest.is_empty() {
            let within = pos % FRAME_BYTES;
            let n = (FRAME_BYTES - within).min(rest.len());
            let slot = &self.slots[pos / FRAME_BYTES];
            let mut bytes = slot.load(Ordering::Relaxed).to_le_bytes();
            bytes[within..within + n].copy_from_slice(&rest[..n]);
            slot.store(u32::from_le_bytes(bytes), Ordering::Relaxed);
            rest = &rest[n..];
            pos = (pos + n) % len;
        }
    }
}

enum StreamCommand {
    Play(Sender<Result<(), DeviceError>>),
    Pause(Sender<Result<(), DeviceError>>),
    Close,
}

struct OpenStream {
    ring: Arc<SharedRing>,
    size: usize,
    gap: usize,
    commands: Sender<StreamCommand>,
    thread: Option<JoinHandle<()>>,
}

/// Polled ring buffer on top of the default CPAL output device.
///
/// CPAL streams are not `Send` on every platform, so the stream lives on a
/// dedicated thread and is driven through a command channel.
pub struct CpalDevice {
    buffer_duration: Duration,
    commit_gap: Duration,
    open: Option<OpenStream>,
}

impl CpalDevice {
    /// Create an unopened device with the default ring length and gap.
    pub fn new() -> Self {
        Self::with_timing(DEFAULT_BUFFER_DURATION, DEFAULT_COMMIT_GAP)
    }

    /// Create an unopened device with explicit ring length and commit gap.
    pub fn with_timing(buffer_duration: Duration, commit_gap: Duration) -> Self {
        Self {
            buffer_duration,
            commit_gap,
            open: None,
        }
    }

    fn open(&self) -> Result<&OpenStream, DeviceError> {
        self.open.as_ref().ok_or(DeviceError::NotInitialized)
    }

    fn command(
        &self,
        make: fn(Sender<Result<(), DeviceError>>) -> StreamCommand,
    ) -> Result<(), DeviceError> {
        let open = self.open()?;
        let (reply_tx, reply_rx) = mpsc::channel();
        open.commands
            .send(make(reply_tx))
            .map_err(|_| DeviceError::Io("audio stream thread is gone".into()))?;
        reply_rx
            .recv()
            .map_err(|_| DeviceError::Io("audio stream thread is gone".into()))?
    }
}

impl Default for CpalDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl SoundDevice for CpalDevice {
    fn init(&mut self, sample_rate: u32) -> Result<(), DeviceError> {
        if sample_rate == 0 {
            return Err(DeviceError::InvalidSampleRate(sample_rate));
        }
        if self.open.is_some() {
            self.close();
        }

        let size = bytes_for(self.buffer_duration, sample_rate).max(FRAME_BYTES);
        let gap = bytes_for(self.commit_gap, sample_rate).min(size - FRAME_BYTES);
        let ring = Arc::new(SharedRing {
            frames: FrameRing::new(size),
            play: AtomicUsize::new(0),
            running: AtomicBool::new(false),
        });

        let (commands, command_rx) = mpsc::channel();
        let (ready_tx, ready_rx) = mpsc::channel();
        let thread_ring = ring.clone();
        let thread = std::thread::Builder::new()
            .name("rm-cpal-stream".into())
            .spawn(move || stream_thread(sample_rate, thread_ring, command_rx, ready_tx))
            .map_err(|e| DeviceError::Init(e.to_string()))?;

        let ready = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(DeviceError::Init("audio stream thread exited".into())));
        if let Err(err) = ready {
            let _ = thread.join();
            return Err(err);
        }

        log::info!(
            "CPAL ring buffer ready: {} Hz, {} bytes, commit gap {} bytes",
            sample_rate,
            size,
            gap
        );
        self.open = Some(OpenStream {
            ring,
            size,
            gap,
            commands,
            thread: Some(thread),
        });
        Ok(())
    }

    fn start(&mut self) -> Result<(), DeviceError> {
        self.command(StreamCommand::Play)?;
        self.open()?.ring.running.store(true, Ordering::Release);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.open()?.ring.running.store(false, Ordering::Release);
        self.command(StreamCommand::Pause)
    }

    fn close(&mut self) {
        if let Some(mut open) = self.open.take() {
            open.ring.running.store(false, Ordering::Release);
            let _ = open.commands.send(StreamCommand::Close);
            if let Some(thread) = open.thread.take() {
                let _ = thread.join();
            }
            log::info!("CPAL ring buffer closed");
        }
    }

    fn buffer_size(&self) -> usize {
        self.open.as_ref().map_or(0, |open| open.size)
    }

    fn write(&mut self, data: &[u8], offset: usize) -> Result<(), DeviceError> {
        self.open()?.ring.frames.write(data, offset);
        Ok(())
    }

    fn cursors(&mut self) -> Result<Cursors, DeviceError> {
        let open = self.open()?;
        let play = open.ring.play.load(Ordering::Acquire);
        Ok(Cursors {
            play,
            write: (play + open.gap) % open.size,
        })
    }
}

impl Drop for CpalDevice {
    fn drop(&mut self) {
        self.close();
    }
}

/// Whole-frame byte count covering `duration` at `sample_rate`.
fn bytes_for(duration: Duration, sample_rate: u32) -> usize {
    let frames = duration.as_nanos() * sample_rate as u128 / 1_000_000_000;
    frames as usize * FRAME_BYTES
}

/// Owns the CPAL stream for its whole life.
fn stream_thread(
    sample_rate: u32,
    ring: Arc<SharedRing>,
    commands: Receiver<StreamCommand>,
    ready: Sender<Result<(), DeviceError>>,
) {
    let stream = match build_stream(sample_rate, ring) {
        Ok(stream) => {
            let _ = ready.send(Ok(()));
            stream
        }
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };

    while let Ok(command) = commands.recv() {
        match command {
            StreamCommand::Play(reply) => {
                let result = stream
                    .play()
                    .map_err(|e| DeviceError::Io(e.to_string()));
                let _ = reply.send(result);
            }
            StreamCommand::Pause(reply) => {
                let result = stream
                    .pause()
                    .map_err(|e| DeviceError::Io(e.to_string()));
                let _ = reply.send(result);
            }
            StreamCommand::Close => break,
        }
    }
}

fn build_stream(sample_rate: u32, ring: Arc<SharedRing>) -> Result<cpal::Stream, DeviceError> {
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(DeviceError::NoDevice)?;
    let name = device.name().unwrap_or_else(|_| "<unnamed>".into());
    log::info!("Using audio device: {}", name);

    let default = device
        .default_output_config()
        .map_err(|e| DeviceError::Init(e.to_string()))?;
    let mut config: StreamConfig = default.into();
    // The ring is always 16-bit stereo at the mixer's rate.
    config.channels = 2;
    config.sample_rate = SampleRate(sample_rate);
    let channels = config.channels as usize;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                if !ring.running.load(Ordering::Acquire) {
                    data.fill(0.0);
                    return;
                }
                let size = ring.frames.len_bytes();
                let mut play = ring.play.load(Ordering::Relaxed);
                for chunk in data.chunks_mut(channels) {
                    let bytes = ring.frames.frame_at(play);
                    let left = i16::from_le_bytes([bytes[0], bytes[1]]);
                    let right = i16::from_le_bytes([bytes[2], bytes[3]]);
                    for (i, sample) in chunk.iter_mut().enumerate() {
                        *sample = match i {
                            0 => left as f32 / 32768.0,
                            1 => right as f32 / 32768.0,
                            _ => 0.0,
                        };
                    }
                    play = (play + FRAME_BYTES) % size;
                }
                ring.play.store(play, Ordering::Release);
            },
            |err| log::error!("Audio stream error: {}", err),
            None,
        )
        .map_err(|e| match e {
            cpal::BuildStreamError::StreamConfigNotSupported => {
                DeviceError::UnsupportedFormat(format!("{} Hz stereo", sample_rate))
            }
            other => DeviceError::Init(other.to_string()),
        })?;

    Ok(stream)
}
