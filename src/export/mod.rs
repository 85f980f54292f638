//! Audio export of rendered songs
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use hippel_coso::export::{export_to_wav, ExportConfig};
//! use hippel_coso::{load_file, PlayerConfig, Song};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let module = Arc::new(load_file("song.coso")?);
//! let mut song = Song::new(module, 0, PlayerConfig::default())?;
//!
//! export_to_wav(&mut song, "output.wav", ExportConfig::default())?;
//! # Ok(())
//! # }
//! ```

mod wav;
pub use wav::*;

/// Longest render when the song never signals its end.
pub const DEFAULT_MAX_SECONDS: f64 = 600.0;

/// Export configuration options
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExportConfig {
    /// Fixed duration in seconds; `None` renders one pass of the song
    pub duration_secs: Option<f64>,
    /// Upper bound for songs that never end
    pub max_secs: f64,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            duration_secs: None,
            max_secs: DEFAULT_MAX_SECONDS,
        }
    }
}

impl ExportConfig {
    /// Render exactly `seconds` of audio, looping the song if needed.
    pub fn duration(seconds: f64) -> Self {
        Self {
            duration_secs: Some(seconds),
            ..Self::default()
        }
    }

    /// Samples to render at `sample_rate`.
    pub(crate) fn sample_limit(&self, sample_rate: u32) -> usize {
        let seconds = self.duration_secs.unwrap_or(self.max_secs).max(0.0);
        (seconds * sample_rate as f64) as usize
    }
}

/// Outcome of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Samples written
    pub samples: usize,
    /// `true` when the song's end was reached
    pub reached_end: bool,
}
