//! Instrument programs
//!
//! An instrument is a small bytecode program that controls pitch, tone/noise
//! enablement, vibrato and portando of a voice independently of its volume.

/// One decoded instrument opcode.
///
/// `Loop` targets are command indices; the parser translates the byte
/// offsets stored in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstrumentCommand {
    /// Set the pitch offset. Bit 7 set selects an absolute note.
    SetPitch(u8),
    /// Jump to a command index.
    Loop(usize),
    /// End of program; the last pitch is held.
    Complete,
    /// Select a sample.
    SetSample(u8),
    /// Restore full volume.
    ResetVolume,
    /// Return to the timbre assigned by the current division.
    ResetTimbre,
    /// Enable tone and noise, with an explicit noise period register value.
    EnableToneAndNoise(u8),
    /// Noise only; the noise period follows the pitch.
    DisableToneEnableNoise,
    /// Tone only.
    EnableToneDisableNoise,
    /// Start a pitch slide with a signed slope.
    Portando(i8),
    /// Override the timbre's vibrato parameters.
    Vibrato {
        /// Phase step per tick.
        slope: u8,
        /// Half range of the triangle wave.
        depth: u8,
    },
    /// Filler; continues with the next command.
    NextCommand,
    /// Wait for a number of ticks.
    Delay(u8),
    /// Switch to another timbre.
    SetTimbre(u8),
}

impl InstrumentCommand {
    /// Number of bytes the command occupies in the file.
    pub fn encoded_len(&self) -> usize {
        match self {
            InstrumentCommand::SetPitch(_)
            | InstrumentCommand::Complete
            | InstrumentCommand::ResetVolume
            | InstrumentCommand::ResetTimbre
            | InstrumentCommand::DisableToneEnableNoise
            | InstrumentCommand::EnableToneDisableNoise => 1,
            InstrumentCommand::Loop(_)
            | InstrumentCommand::SetSample(_)
            | InstrumentCommand::EnableToneAndNoise(_)
            | InstrumentCommand::Portando(_)
            | InstrumentCommand::NextCommand
            | InstrumentCommand::Delay(_)
            | InstrumentCommand::SetTimbre(_) => 2,
            InstrumentCommand::Vibrato { .. } => 3,
        }
    }
}

/// Immutable instrument program, shared by every channel that plays it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Instrument {
    commands: Vec<InstrumentCommand>,
}

impl Instrument {
    /// Create an instrument from decoded commands.
    pub fn new(commands: Vec<InstrumentCommand>) -> Self {
        Self { commands }
    }

    /// Decoded commands.
    pub fn commands(&self) -> &[InstrumentCommand] {
        &self.commands
    }
}
