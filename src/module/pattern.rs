//! Monopatterns

/// One decoded pattern opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternCommand {
    /// Start a note, optionally adjusting the timbre and overriding the instrument.
    SetNote {
        /// Note number added to the instrument pitch.
        note: u8,
        /// Offset added to the division's timbre.
        timbre_adjust: Option<u8>,
        /// Instrument to use instead of the timbre's one.
        instrument: Option<u8>,
    },
    /// Pattern finished; the voice moves to the next division.
    EndPattern,
    /// Change the note speed and continue immediately.
    SetSpeed(u8),
    /// Change the note speed and wait for it.
    SetSpeedWithDelay(u8),
}

/// Note sequence shared by every division that references it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Pattern {
    commands: Vec<PatternCommand>,
}

impl Pattern {
    /// Create a pattern from decoded commands.
    pub fn new(commands: Vec<PatternCommand>) -> Self {
        Self { commands }
    }

    /// Decoded commands.
    pub fn commands(&self) -> &[PatternCommand] {
        &self.commands
    }
}
