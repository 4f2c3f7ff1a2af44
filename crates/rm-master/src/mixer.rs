//! The mixer: device lifecycle, tick loop and sound loading.

use rm_audio::{DeviceError, SoundDevice};
use rm_engine::{normalize, MixEngine};
use rm_formats::decode_wav;
use rm_ir::{AudioChunk, PcmChunk, FRAME_BYTES};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::config::MixerConfig;
use crate::error::{MixerError, Result};
use crate::handle::SoundHandle;
use crate::session::{lock, step, Phase, Session};

/// Software mixer writing into a polled ring-buffer device.
///
/// `start` runs the tick loop on a background thread; `start_polled`
/// leaves ticking to the caller through [`poll`](Self::poll). Sounds can
/// be added and controlled from any thread in either mode.
pub struct Mixer<D: SoundDevice + 'static> {
    shared: Arc<Mutex<Session>>,
    /// `None` while the tick thread owns the device
    device: Option<D>,
    worker: Option<Worker<D>>,
    config: MixerConfig,
    /// Set after the first successful start
    started: bool,
    closed: bool,
}

struct Worker<D> {
    stop_signal: Sender<()>,
    thread: JoinHandle<D>,
}

impl<D: SoundDevice + 'static> Mixer<D> {
    /// Open `device` at the configured rate.
    ///
    /// Fails if the configuration is out of range, if the device cannot be
    /// opened, or if the look-ahead does not fit in the device's ring.
    pub fn new(mut device: D, config: MixerConfig) -> Result<Self> {
        config.validate()?;
        device.init(config.sample_rate)?;

        let buffer_size = device.buffer_size();
        let look_ahead_frames = config.look_ahead_frames();
        let look_ahead_bytes = look_ahead_frames * FRAME_BYTES;
        if look_ahead_bytes >= buffer_size {
            device.close();
            return Err(MixerError::Validation(format!(
                "look-ahead of {} bytes does not fit in a {} byte device buffer",
                look_ahead_bytes, buffer_size
            )));
        }

        log::info!(
            "mixer ready: {} Hz, {} byte ring, {} frame look-ahead, {:?} tick",
            config.sample_rate,
            buffer_size,
            look_ahead_frames,
            config.tick_interval
        );

        let engine = MixEngine::new(config.sample_rate, look_ahead_frames);
        Ok(Self {
            shared: Arc::new(Mutex::new(Session::new(engine, buffer_size))),
            device: Some(device),
            worker: None,
            config,
            started: false,
            closed: false,
        })
    }

    pub fn config(&self) -> &MixerConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    // --- Sounds ---

    /// Normalize `chunk` and start playing it on the next tick.
    pub fn play(&self, chunk: &PcmChunk) -> Result<SoundHandle> {
        let audio = normalize(chunk, self.sample_rate())?;
        Ok(self.play_audio(audio))
    }

    /// Start playing already normalized audio. The samples are shared, not
    /// copied, so one loaded sound can be played many times at once.
    pub fn play_audio(&self, audio: AudioChunk) -> SoundHandle {
        let frames = audio.len();
        let key = lock(&self.shared).engine.add(audio);
        log::debug!("added source {:?} ({} frames)", key, frames);
        SoundHandle::new(key, self.shared.clone(), self.sample_rate())
    }

    /// Normalize several decoded chunks into one sound, in order.
    pub fn load(&self, chunks: &[PcmChunk]) -> Result<AudioChunk> {
        let parts = chunks
            .iter()
            .map(|chunk| normalize(chunk, self.sample_rate()))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(AudioChunk::concat(&parts))
    }

    /// Decode a WAV file into one playable sound.
    pub fn load_wav(&self, bytes: &[u8]) -> Result<AudioChunk> {
        let chunks = decode_wav(bytes)?;
        self.load(&chunks)
    }

    /// Set the master volume, clamped to `[0, 1]`.
    pub fn set_master_volume(&self, volume: f32) {
        lock(&self.shared).engine.set_master_volume(volume);
    }

    pub fn master_volume(&self) -> f32 {
        lock(&self.shared).engine.master_volume()
    }

    /// Number of sounds currently taking part in the mix.
    pub fn active_sources(&self) -> usize {
        lock(&self.shared).engine.active_count()
    }

    // --- Lifecycle ---

    /// True between a successful start and `stop`, unless a tick failed.
    pub fn is_running(&self) -> bool {
        let session = lock(&self.shared);
        session.phase == Phase::Running && session.error.is_none()
    }

    /// The device error that ended the current or last run.
    pub fn error(&self) -> Option<DeviceError> {
        lock(&self.shared).error.clone()
    }

    /// Prime the device and start the tick loop on a background thread.
    pub fn start(&mut self) -> Result<()> {
        let device = self.begin()?;
        let (stop_signal, stop_rx) = mpsc::channel();
        let shared = self.shared.clone();
        let tick = self.config.tick_interval;
        let thread = std::thread::spawn(move || tick_loop(device, shared, stop_rx, tick));
        self.worker = Some(Worker {
            stop_signal,
            thread,
        });
        log::info!("mixer started");
        Ok(())
    }

    /// Prime the device and start it, leaving ticks to [`poll`](Self::poll).
    pub fn start_polled(&mut self) -> Result<()> {
        let device = self.begin()?;
        self.device = Some(device);
        log::info!("mixer started in polled mode");
        Ok(())
    }

    /// Run one tick in polled mode. Returns the bytes the device consumed
    /// since the previous tick.
    ///
    /// A device error ends the run: it is returned here, kept as the
    /// terminal error, and returned again by `stop`.
    pub fn poll(&mut self) -> Result<usize> {
        if self.worker.is_some() {
            return Err(MixerError::AlreadyRunning);
        }
        {
            let session = lock(&self.shared);
            if session.phase != Phase::Running {
                return Err(MixerError::NotRunning);
            }
            if let Some(err) = &session.error {
                return Err(err.clone().into());
            }
        }
        let device = self.device.as_mut().ok_or(MixerError::NotRunning)?;
        step(device, &self.shared).map_err(|err| {
            log::error!("mixer tick failed: {}", err);
            lock(&self.shared).error = Some(err.clone());
            MixerError::Device(err)
        })
    }

    /// Stop the tick loop, then halt the device.
    ///
    /// Blocks until the loop has finished its current tick. If a tick
    /// failed during the run, that error is returned after the device has
    /// been stopped.
    pub fn stop(&mut self) -> Result<()> {
        if lock(&self.shared).phase == Phase::Stopped {
            return Err(MixerError::NotRunning);
        }

        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_signal.send(());
            match worker.thread.join() {
                Ok(device) => self.device = Some(device),
                Err(_) => {
                    lock(&self.shared).phase = Phase::Stopped;
                    log::error!("mixer thread panicked; device lost");
                    return Err(MixerError::WorkerPanicked);
                }
            }
        }

        let terminal = {
            let mut session = lock(&self.shared);
            session.phase = Phase::Stopped;
            session.error.clone()
        };
        if let Some(device) = self.device.as_mut() {
            device.stop()?;
        }
        log::info!("mixer stopped");

        match terminal {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Stop if running and release the device.
    pub fn close(mut self) -> Result<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let result = if lock(&self.shared).phase == Phase::Running {
            self.stop()
        } else {
            Ok(())
        };
        if let Some(device) = self.device.as_mut() {
            device.close();
        }
        log::info!("mixer closed");
        result
    }

    /// The Starting step shared by both modes. Returns the started device.
    fn begin(&mut self) -> Result<D> {
        if lock(&self.shared).phase == Phase::Running {
            return Err(MixerError::AlreadyRunning);
        }
        let mut device = self.device.take().ok_or(MixerError::WorkerPanicked)?;

        match self.prime(&mut device) {
            Ok(()) => {
                self.started = true;
                Ok(device)
            }
            Err(err) => {
                self.device = Some(device);
                Err(err)
            }
        }
    }

    fn prime(&self, device: &mut D) -> Result<()> {
        // A fresh ring is primed from its start; a restarted one after the
        // region the device already committed.
        let offset = if self.started {
            device.cursors()?.write
        } else {
            0
        };
        {
            let mut session = lock(&self.shared);
            session.error = None;
            session.prime(device, offset)?;
        }
        device.start()?;
        lock(&self.shared).phase = Phase::Running;
        Ok(())
    }
}

impl<D: SoundDevice + 'static> Drop for Mixer<D> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            log::warn!("error while closing mixer: {}", err);
        }
    }
}

/// Body of the tick thread. Hands the device back when it exits.
fn tick_loop<D: SoundDevice>(
    mut device: D,
    shared: Arc<Mutex<Session>>,
    stop_signal: Receiver<()>,
    tick: Duration,
) -> D {
    let mut next = Instant::now() + tick;
    loop {
        let wait = next.saturating_duration_since(Instant::now());
        match stop_signal.recv_timeout(wait) {
            Err(RecvTimeoutError::Timeout) => {}
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
        }

        if let Err(err) = step(&mut device, &shared) {
            log::error!("mixer tick failed, stopping the loop: {}", err);
            lock(&shared).error = Some(err);
            break;
        }

        next += tick;
        let now = Instant::now();
        if next < now {
            // Fell behind by more than a tick; don't try to catch up.
            next = now + tick;
        }
    }
    device
}

#[cfg(test)]
mod tests {
    use super::*;
    use rm_audio::MemoryDevice;

    fn config() -> MixerConfig {
        MixerConfig {
            sample_rate: 1000,
            tick_interval: Duration::from_millis(1),
            look_ahead: Duration::from_millis(10),
        }
    }

    #[test]
    fn look_ahead_must_fit_device_buffer() {
        let device = MemoryDevice::new(40, 4);
        let observer = device.clone();
        let result = Mixer::new(device, config());
        assert!(matches!(result, Err(MixerError::Validation(_))));
        assert!(observer.is_closed());
    }

    #[test]
    fn invalid_config_never_touches_device() {
        let device = MemoryDevice::new(400, 4);
        let observer = device.clone();
        let bad = MixerConfig {
            sample_rate: 0,
            ..config()
        };
        assert!(matches!(Mixer::new(device, bad), Err(MixerError::Validation(_))));
        assert_eq!(observer.sample_rate(), None);
    }

    #[test]
    fn lifecycle_errors() {
        let mut mixer = Mixer::new(MemoryDevice::new(400, 16), config()).unwrap();
        assert_eq!(mixer.stop(), Err(MixerError::NotRunning));
        assert_eq!(mixer.poll(), Err(MixerError::NotRunning));
        mixer.start_polled().unwrap();
        assert_eq!(mixer.start_polled(), Err(MixerError::AlreadyRunning));
        assert_eq!(mixer.start(), Err(MixerError::AlreadyRunning));
        mixer.stop().unwrap();
    }

    #[test]
    fn unsupported_pcm_is_rejected_at_play() {
        let mixer = Mixer::new(MemoryDevice::new(400, 16), config()).unwrap();
        let chunk = PcmChunk::new(3, 1000, 16, vec![0; 6]);
        assert!(matches!(mixer.play(&chunk), Err(MixerError::Format(_))));
        assert_eq!(mixer.active_sources(), 0);
    }

    #[test]
    fn load_concatenates_chunks_at_mixer_rate() {
        let mixer = Mixer::new(MemoryDevice::new(400, 16), config()).unwrap();
        let chunks = [
            PcmChunk::new(1, 1000, 8, vec![128, 255]),
            PcmChunk::new(1, 1000, 16, vec![0, 0, 0, 0x80]),
        ];
        let audio = mixer.load(&chunks).unwrap();
        assert_eq!(audio.len(), 4);
        assert_eq!(audio.left(), &[0.0f32, 1.0, 0.0, -1.0]);
    }

    #[test]
    fn close_releases_device() {
        let device = MemoryDevice::new(400, 16);
        let observer = device.clone();
        let mut mixer = Mixer::new(device, config()).unwrap();
        mixer.start_polled().unwrap();
        mixer.close().unwrap();
        assert!(!observer.is_running());
        assert!(observer.is_closed());
    }

    #[test]
    fn drop_closes_device() {
        let device = MemoryDevice::new(400, 16);
        let observer = device.clone();
        {
            let mut mixer = Mixer::new(device, config()).unwrap();
            mixer.start().unwrap();
        }
        assert!(observer.is_closed());
    }
}
