//! Mixer configuration.

use rm_engine::duration_to_frames;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{MixerError, Result};

/// Timing parameters of a [`Mixer`](crate::Mixer).
///
/// Durations are written in milliseconds when serialized:
///
/// ```toml
/// sample_rate = 44100
/// tick_interval_ms = 10
/// look_ahead_ms = 100
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Output rate every sound is converted to
    pub sample_rate: u32,
    /// Period of the tick loop
    #[serde(rename = "tick_interval_ms", with = "millis")]
    pub tick_interval: Duration,
    /// Audio rendered ahead of the device's write cursor on every tick
    #[serde(rename = "look_ahead_ms", with = "millis")]
    pub look_ahead: Duration,
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sample_rate: rm_ir::DEFAULT_SAMPLE_RATE,
            tick_interval: Duration::from_millis(10),
            look_ahead: Duration::from_millis(100),
        }
    }
}

impl MixerConfig {
    /// Look-ahead length in frames at the configured rate.
    pub fn look_ahead_frames(&self) -> usize {
        duration_to_frames(self.look_ahead, self.sample_rate)
    }

    /// Reject configurations the tick loop cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(MixerError::Validation("sample rate must be positive".into()));
        }
        if self.tick_interval.is_zero() {
            return Err(MixerError::Validation("tick interval must be positive".into()));
        }
        if self.look_ahead_frames() == 0 {
            return Err(MixerError::Validation(format!(
                "look-ahead of {:?} is shorter than one frame at {} Hz",
                self.look_ahead, self.sample_rate
            )));
        }
        if self.tick_interval >= self.look_ahead {
            return Err(MixerError::Validation(format!(
                "tick interval {:?} must be shorter than the look-ahead {:?}",
                self.tick_interval, self.look_ahead
            )));
        }
        Ok(())
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
