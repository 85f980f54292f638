//! Synthesis
//!
//! Per-voice rendering of timestamped note and noise events:
//! - [`tables`]: note period table
//! - [`noise`]: LFSR noise generator
//! - [`channel_player`]: event queues and waveform rendering

pub mod channel_player;
pub mod noise;
pub mod tables;

pub use channel_player::{ChannelPlayer, NoiseEvent, NoteEvent, Waveform, FULL_VOLUME};
pub use noise::NoiseGenerator;
pub use tables::{note_period, NOTE_PERIODS};
