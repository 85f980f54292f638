//! Hippel COSO replayer
//!
//! Decoder and software synthesizer for the music format written by Jochen
//! Hippel's composer tools on the ATARI ST: `COSO` compressed songs wrapping a
//! `TFMX` or `MMME` payload. Songs are bytecode programs; the replayer
//! interprets them tick by tick and renders the resulting tone and noise
//! voices into unsigned 8-bit PCM.
//!
//! # Features
//! - `COSO`/`TFMX`/`MMME` header detection and structural validation
//! - Full module decoding (instruments, timbres, monopatterns, divisions, songs)
//! - Three command interpreters per voice (pattern, instrument, volume envelope)
//! - PSG-style 17-bit LFSR noise generator
//! - Event-driven tone/noise renderer and chunked PCM output
//!
//! # Crate feature flags
//! - `export-wav` (default): render songs to WAV files (`export`)
//! - `cli` (opt-in): the `coso-replayer` command line tool
//!
//! # Quick start
//! ```no_run
//! use std::sync::Arc;
//! use hippel_coso::{load_module, PlayerConfig, SliceReader, Song};
//!
//! let data = std::fs::read("song.coso").unwrap();
//! let module = Arc::new(load_module(&mut SliceReader::new(&data)).unwrap());
//! let mut song = Song::new(module, 0, PlayerConfig::default()).unwrap();
//! song.play();
//! song.update(250.0, &mut |pcm: &[u8], end: bool| {
//!     // hand the unsigned 8-bit mono chunk to the audio device
//!     let _ = (pcm, end);
//! });
//! ```

#![warn(missing_docs)]

pub mod coso_loader; // File I/O
pub mod coso_parser; // Format detection and module decoding
#[cfg(feature = "export-wav")]
pub mod export; // WAV rendering
pub mod module; // Decoded module tables
pub mod reader; // Byte reader interface
pub mod replayer; // Interpreters, channels and song orchestration
pub mod synth; // Noise generator and per-voice rendering

/// Error types for COSO parsing and playback
#[derive(thiserror::Error, Debug)]
pub enum CosoError {
    /// The 4-byte tag is not one of `COSO`, `TFMX` or `MMME`
    #[error("unknown module tag '{}'", String::from_utf8_lossy(.tag))]
    UnknownTag {
        /// Tag bytes found at the module start.
        tag: [u8; 4],
    },

    /// A header field failed validation
    #[error("invalid {format} file: {reason}")]
    InvalidHeader {
        /// Container or payload name (`COSO`, `TFMX`, `MMME`).
        format: &'static str,
        /// Which check failed.
        reason: &'static str,
    },

    /// Sample-compressed modules are not supported
    #[error("LSMP modules are not supported")]
    UnsupportedLsmp,

    /// Section offsets and the declared total size disagree
    #[error("sample table ends at {actual} but total size is {expected}")]
    SizeMismatch {
        /// Total size declared by the header.
        expected: usize,
        /// End of the sample table computed from the header.
        actual: usize,
    },

    /// An index table is misaligned or truncated
    #[error("invalid {section} index table: {reason}")]
    InvalidIndexTable {
        /// Table name.
        section: &'static str,
        /// What was wrong with the offsets.
        reason: String,
    },

    /// An opcode is not part of the command set
    #[error("invalid {program} command 0x{opcode:02x} in entry {entry} at byte {offset}")]
    InvalidCommand {
        /// Program kind (`instrument`, `volume envelope`, `pattern`).
        program: &'static str,
        /// Entry index inside its table.
        entry: usize,
        /// Byte offset of the opcode inside the entry.
        offset: usize,
        /// Offending opcode.
        opcode: u8,
    },

    /// An opcode is missing its argument bytes
    #[error("truncated {program} command in entry {entry} at byte {offset}")]
    TruncatedCommand {
        /// Program kind.
        program: &'static str,
        /// Entry index inside its table.
        entry: usize,
        /// Byte offset of the opcode inside the entry.
        offset: usize,
    },

    /// A decoded reference points outside its table
    #[error("{kind} index {index} out of range (count {count})")]
    IndexOutOfRange {
        /// Referenced table.
        kind: &'static str,
        /// Referenced index.
        index: usize,
        /// Number of entries available.
        count: usize,
    },

    /// Read past the end of the data
    #[error("unexpected end of data at offset 0x{offset:04x} (wanted {len} bytes)")]
    UnexpectedEof {
        /// Read position.
        offset: usize,
        /// Requested length.
        len: usize,
    },

    /// Requested song does not exist in the module
    #[error("song {index} is not available (module has {count} songs)")]
    UnknownSong {
        /// Requested song.
        index: usize,
        /// Songs in the module.
        count: usize,
    },

    /// Invalid player configuration
    #[error("invalid configuration: {0}")]
    Config(String),

    /// IO error from filesystem
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// WAV writer error
    #[cfg(feature = "export-wav")]
    #[error("WAV export error: {0}")]
    Wav(#[from] hound::Error),

    /// Generic validation error
    #[error("{msg}")]
    InvalidData {
        /// Human-readable explanation of the failure.
        msg: String,
    },
}

impl CosoError {
    /// Returns `true` for errors caused by malformed or unsupported module data.
    pub fn is_format_error(&self) -> bool {
        !matches!(
            self,
            CosoError::Config(_) | CosoError::Io(_) | CosoError::UnknownSong { .. }
        ) && !self.is_export_error()
    }

    #[cfg(feature = "export-wav")]
    fn is_export_error(&self) -> bool {
        matches!(self, CosoError::Wav(_))
    }

    #[cfg(not(feature = "export-wav"))]
    fn is_export_error(&self) -> bool {
        false
    }
}

impl From<String> for CosoError {
    fn from(msg: String) -> Self {
        CosoError::InvalidData { msg }
    }
}

impl From<&str> for CosoError {
    fn from(msg: &str) -> Self {
        CosoError::InvalidData {
            msg: msg.to_string(),
        }
    }
}

/// Result type for COSO operations
pub type Result<T> = std::result::Result<T, CosoError>;

// Public API exports
pub use coso_loader::load_file;
pub use coso_parser::{load_module, ModuleLoader};
pub use module::{Module, ModuleSummary, SongInfo, Variant};
pub use reader::{DataReader, SliceReader};
pub use replayer::{EndPolicy, PcmSink, PlaybackState, PlayerConfig, Song, Waveform};
pub use synth::{ChannelPlayer, NoiseGenerator};
