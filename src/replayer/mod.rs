//! Song replayer
//!
//! - [`interpreter`]: pattern, instrument and volume envelope cursors
//! - [`channel`]: per-voice bindings and period/volume/noise derivation
//! - [`song`]: tick scheduling, mixing and chunked PCM output
//! - [`config`]: sample rate, buffer size and timing parameters
//!
//! The replayer is single threaded and advances only inside
//! [`Song::update`]. The sink must not call back into the song.

pub mod channel;
pub mod config;
pub mod interpreter;
pub mod song;

pub use channel::Channel;
pub use config::{
    EndPolicy, PlayerConfig, DEFAULT_SAMPLE_RATE, DEFAULT_TICK_TIME_MS, DEFAULT_TONE_CLOCK_HZ,
};
pub use interpreter::{
    CommandInterpreter, EnvelopeCursor, InstrumentCursor, PatternCursor, PortandoState, Signal,
    VibratoState, VoiceMix, VoiceState,
};
pub use song::{PcmSink, PlaybackState, Song};

pub use crate::synth::Waveform;
