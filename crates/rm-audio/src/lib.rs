//! Polled ring-buffer sound devices for ringmix.
//!
//! A device exposes a fixed-size 16-bit stereo ring buffer. The mixer never
//! gets a callback; it polls the play and write cursors and writes ahead of
//! the write cursor.

mod cpal_backend;
mod memory;
mod traits;

pub use cpal_backend::{CpalDevice, DEFAULT_BUFFER_DURATION, DEFAULT_COMMIT_GAP};
pub use memory::{MemoryDevice, WriteRecord};
pub use traits::{Cursors, DeviceError, SoundDevice};
