//! Player configuration

use serde::{Deserialize, Serialize};

use crate::synth::Waveform;
use crate::{CosoError, Result};

/// Output sample rate in Hz.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
/// Tick length in milliseconds. The authentic value is 20 ms, but existing
/// tunings were made against 120 ms.
pub const DEFAULT_TICK_TIME_MS: f64 = 120.0;
/// Tone generator input clock in Hz.
pub const DEFAULT_TONE_CLOCK_HZ: f64 = 3_546_894.6;

/// When a song counts as finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndPolicy {
    /// The first voice that wraps around ends the song
    #[default]
    AnyVoice,
    /// The song ends once every voice has wrapped around
    AllVoices,
}

/// Playback parameters of a [`Song`](super::Song)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Samples per emitted chunk
    pub buffer_size: usize,
    /// Tick length in milliseconds
    pub tick_time_ms: f64,
    /// Tone generator input clock in Hz
    pub tone_clock_hz: f64,
    /// Tone waveform
    pub waveform: Waveform,
    /// End-of-song rule
    pub end_policy: EndPolicy,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            buffer_size: DEFAULT_SAMPLE_RATE as usize / 4,
            tick_time_ms: DEFAULT_TICK_TIME_MS,
            tone_clock_hz: DEFAULT_TONE_CLOCK_HZ,
            waveform: Waveform::Sine,
            end_policy: EndPolicy::AnyVoice,
        }
    }
}

impl PlayerConfig {
    /// Parse a configuration from JSON; missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CosoError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the replayer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(CosoError::Config("sample_rate must be positive".into()));
        }
        if self.buffer_size == 0 {
            return Err(CosoError::Config("buffer_size must be positive".into()));
        }
        if !(self.tick_time_ms.is_finite() && self.tick_time_ms > 0.0) {
            return Err(CosoError::Config("tick_time_ms must be positive".into()));
        }
        if !(self.tone_clock_hz.is_finite() && self.tone_clock_hz > 0.0) {
            return Err(CosoError::Config("tone_clock_hz must be positive".into()));
        }
        Ok(())
    }

    /// Duration of one chunk in milliseconds
    pub fn buffer_time_ms(&self) -> f64 {
        self.buffer_size as f64 * 1000.0 / self.sample_rate as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn defaults_match_quarter_second_buffers() {
        let config = PlayerConfig::default();
        assert_eq!(config.buffer_size, 11_025);
        assert_relative_eq!(config.buffer_time_ms(), 250.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn json_overrides_selected_fields() {
        let config = PlayerConfig::from_json_str(
            r#"{"tick_time_ms": 20.0, "waveform": "square", "end_policy": "all_voices"}"#,
        )
        .unwrap();
        assert_relative_eq!(config.tick_time_ms, 20.0);
        assert_eq!(config.waveform, Waveform::Square);
        assert_eq!(config.end_policy, EndPolicy::AllVoices);
        assert_eq!(config.sample_rate, DEFAULT_SAMPLE_RATE);
    }

    #[test]
    fn rejects_invalid_values() {
        assert!(matches!(
            PlayerConfig::from_json_str(r#"{"sample_rate": 0}"#),
            Err(CosoError::Config(_))
        ));
        assert!(PlayerConfig::from_json_str(r#"{"tick_time_ms": -1.0}"#).is_err());
        assert!(PlayerConfig::from_json_str("not json").is_err());
    }
}
