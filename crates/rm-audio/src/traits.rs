//! Sound device trait and error types.

/// Error type for device operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    /// Failed to initialize the device
    #[error("device init error: {0}")]
    Init(String),
    /// No audio device available
    #[error("no audio device available")]
    NoDevice,
    /// The hardware rejected the requested format
    #[error("unsupported device format: {0}")]
    UnsupportedFormat(String),
    /// A write or cursor query failed mid-playback
    #[error("device I/O error: {0}")]
    Io(String),
    /// Sample rate must be positive
    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),
    /// Operation needs an initialized device
    #[error("device not initialized")]
    NotInitialized,
}

/// Play and write cursors of a ring buffer, as byte offsets.
///
/// The region from `play` up to `write` is committed to the hardware and
/// must not be overwritten; writing at `write` is always safe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cursors {
    pub play: usize,
    pub write: usize,
}

/// A 16-bit stereo output device exposing a fixed-size ring buffer whose
/// progress can only be observed by polling its cursors.
pub trait SoundDevice: Send {
    /// Open the device at `sample_rate` and allocate its ring buffer.
    fn init(&mut self, sample_rate: u32) -> Result<(), DeviceError>;

    /// Start consuming the ring buffer.
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Stop consuming the ring buffer.
    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Release the device. Stops playback if it is still running.
    fn close(&mut self);

    /// Ring buffer size in bytes; fixed after `init`, 0 before.
    fn buffer_size(&self) -> usize;

    /// Copy `data` into the ring at `offset`, wrapping past the end.
    fn write(&mut self, data: &[u8], offset: usize) -> Result<(), DeviceError>;

    /// Current play and write cursors.
    fn cursors(&mut self) -> Result<Cursors, DeviceError>;
}

/// Copy `data` into `ring` starting at `offset`, wrapping around the end.
pub(crate) fn write_wrapped(ring: &mut [u8], data: &[u8], offset: usize) {
    if ring.is_empty() {
        return;
    }
    let len = ring.len();
    // Only the last `len` bytes can survive a write longer than the ring.
    let skipped = data.len().saturating_sub(len);
    let data = &data[skipped..];
    let start = (offset + skipped) % len;
    let first = data.len().min(len - start);
    ring[start..start + first].copy_from_slice(&data[..first]);
    let rest = data.len() - first;
    ring[..rest].copy_from_slice(&data[first..]);
}
