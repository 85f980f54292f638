//! Timbres and volume envelopes

/// Number of header bytes in front of a timbre's envelope program.
pub const TIMBRE_HEADER_LEN: usize = 5;

/// Vibrato parameters of a timbre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Vibrato {
    /// Phase step per tick.
    pub slope: u8,
    /// Half range of the triangle wave (phase runs over `0..=2*depth`).
    pub depth: u8,
    /// Ticks before the vibrato starts.
    pub delay: u8,
}

/// One decoded volume envelope opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvelopeCommand {
    /// Set the voice volume, then wait `speed` ticks.
    SetVolume(u8),
    /// End of envelope; the last volume is held.
    Hold,
    /// Wait for a number of ticks.
    Sustain(u8),
    /// Jump to a command index.
    Loop(usize),
}

impl EnvelopeCommand {
    /// Number of bytes the command occupies in the file.
    pub fn encoded_len(&self) -> usize {
        match self {
            EnvelopeCommand::SetVolume(_) | EnvelopeCommand::Hold => 1,
            EnvelopeCommand::Sustain(_) | EnvelopeCommand::Loop(_) => 2,
        }
    }
}

/// Volume envelope program of a timbre.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VolumeEnvelope {
    commands: Vec<EnvelopeCommand>,
}

impl VolumeEnvelope {
    /// Create an envelope from decoded commands.
    pub fn new(commands: Vec<EnvelopeCommand>) -> Self {
        Self { commands }
    }

    /// Decoded commands.
    pub fn commands(&self) -> &[EnvelopeCommand] {
        &self.commands
    }

    /// Byte offset of command `index` relative to the envelope start, as it
    /// would be encoded without filler bytes.
    pub fn byte_offset(&self, index: usize) -> usize {
        self.commands
            .iter()
            .take(index)
            .map(EnvelopeCommand::encoded_len)
            .sum()
    }
}

/// Base instrument, speed, vibrato and volume envelope of a sound.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Timbre {
    /// Tick multiplier for the pattern and the volume envelope.
    pub speed: u8,
    /// Instrument program index.
    pub instrument: usize,
    /// Vibrato parameters.
    pub vibrato: Vibrato,
    /// Volume envelope program.
    pub envelope: VolumeEnvelope,
}
