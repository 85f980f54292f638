//! Command interpreters
//!
//! Each voice runs three programs: its pattern, its instrument and the volume
//! envelope of its timbre. They share one execution contract:
//!
//! 1. A tick first decrements the cursor's countdown; while it stays
//!    positive nothing else happens.
//! 2. Otherwise commands are executed from the program counter, chaining
//!    through commands that take no time until one that waits, holds or
//!    needs the channel.
//!
//! Interpreters only touch the [`VoiceState`] they are handed. Anything that
//! involves the channel's bindings (timbre switches, note starts, division
//! changes) is returned as a [`Signal`].

use bitflags::bitflags;

use crate::module::{
    EnvelopeCommand, Instrument, InstrumentCommand, Pattern, PatternCommand, Timbre,
};
use crate::synth::FULL_VOLUME;

bitflags! {
    /// Sound sources enabled on a voice
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct VoiceMix: u8 {
        /// Square/sine tone
        const TONE = 0x01;
        /// LFSR noise
        const NOISE = 0x02;
    }
}

/// Vibrato runtime of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VibratoState {
    /// Phase step per tick.
    pub slope: u8,
    /// Half range of the phase.
    pub depth: u8,
    /// Ticks left before the vibrato starts.
    pub delay: u8,
    /// Current phase in `0..=2*depth`.
    pub phase: i32,
    /// Phase direction, `1` or `-1`.
    pub direction: i32,
}

impl Default for VibratoState {
    fn default() -> Self {
        Self {
            slope: 0,
            depth: 0,
            delay: 0,
            phase: 0,
            direction: -1,
        }
    }
}

/// Portando (pitch slide) runtime of a voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PortandoState {
    /// Slide is running.
    pub active: bool,
    /// Added to `delta` every tick.
    pub slope: i8,
    /// Accumulated slide.
    pub delta: i32,
}

/// Mutable per-voice values the interpreters write to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceState {
    /// Envelope volume (64 = full scale).
    pub volume: u8,
    /// Instrument pitch; bit 7 selects an absolute note.
    pub pitch: u8,
    /// Pattern note.
    pub note: u8,
    /// Selected sample.
    pub sample: u8,
    /// Enabled sound sources.
    pub mix: VoiceMix,
    /// Noise register value given by the instrument.
    pub noise_period: u8,
    /// Vibrato runtime.
    pub vibrato: VibratoState,
    /// Portando runtime.
    pub portando: PortandoState,
}

impl Default for VoiceState {
    fn default() -> Self {
        Self {
            volume: FULL_VOLUME,
            pitch: 0,
            note: 0,
            sample: 0,
            mix: VoiceMix::empty(),
            noise_period: 0,
            vibrato: VibratoState::default(),
            portando: PortandoState::default(),
        }
    }
}

/// Channel-level action requested by an interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Nothing for the channel to do.
    Idle,
    /// Switch to a timbre.
    SetTimbre(usize),
    /// Switch back to the division's base timbre.
    ResetTimbre,
    /// The pattern is done.
    EndPattern,
    /// A note starts.
    Note {
        /// Note number (already stored in the voice).
        note: u8,
        /// Offset to the division's base timbre.
        timbre_adjust: Option<u8>,
        /// Instrument override.
        instrument: Option<u8>,
    },
}

/// Shared execution contract of the three program kinds.
pub trait CommandInterpreter {
    /// Program type the cursor walks.
    type Program: ?Sized;

    /// Count down one tick. Returns `true` while the cursor is still waiting.
    fn countdown(&mut self) -> bool;

    /// Run commands from the program counter until one consumes the tick or
    /// needs the channel.
    fn resume(&mut self, program: &Self::Program, voice: &mut VoiceState) -> Signal;

    /// Index of the next command.
    fn position(&self) -> usize;

    /// Advance by one tick.
    fn tick(&mut self, program: &Self::Program, voice: &mut VoiceState) -> Signal {
        if self.countdown() {
            return Signal::Idle;
        }
        self.resume(program, voice)
    }
}

#[inline]
fn count_down(counter: &mut u32) -> bool {
    *counter = counter.saturating_sub(1);
    *counter > 0
}

fn runaway(program: &'static str, position: usize) -> Signal {
    tracing::warn!(program, position, "command chain does not settle, holding");
    Signal::Idle
}

/// Cursor over an instrument program
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentCursor {
    pc: usize,
    counter: u32,
}

impl InstrumentCursor {
    /// Start over from the first command.
    pub fn restart(&mut self) {
        self.pc = 0;
        self.counter = 0;
    }
}

impl CommandInterpreter for InstrumentCursor {
    type Program = Instrument;

    fn countdown(&mut self) -> bool {
        count_down(&mut self.counter)
    }

    fn resume(&mut self, program: &Instrument, voice: &mut VoiceState) -> Signal {
        let commands = program.commands();

        for _ in 0..=commands.len() {
            // Running off the end holds the last state.
            let Some(&command) = commands.get(self.pc) else {
                return Signal::Idle;
            };

            match command {
                InstrumentCommand::SetPitch(pitch) => {
                    voice.pitch = pitch;
                    self.pc += 1;
                    return Signal::Idle;
                }
                InstrumentCommand::Loop(target) => self.pc = target,
                InstrumentCommand::Complete => return Signal::Idle,
                InstrumentCommand::SetSample(sample) => {
                    voice.sample = sample;
                    self.pc += 1;
                }
                InstrumentCommand::ResetVolume => {
                    voice.volume = FULL_VOLUME;
                    self.pc += 1;
                }
                InstrumentCommand::ResetTimbre => {
                    self.pc += 1;
                    return Signal::ResetTimbre;
                }
                InstrumentCommand::EnableToneAndNoise(period) => {
                    voice.noise_period = period;
                    voice.mix = VoiceMix::TONE | VoiceMix::NOISE;
                    self.pc += 1;
                }
                InstrumentCommand::DisableToneEnableNoise => {
                    voice.mix = VoiceMix::NOISE;
                    self.pc += 1;
                }
                InstrumentCommand::EnableToneDisableNoise => {
                    voice.mix = VoiceMix::TONE;
                    self.pc += 1;
                }
                InstrumentCommand::Portando(slope) => {
                    voice.portando.active = true;
                    voice.portando.slope = slope;
                    self.pc += 1;
                }
                InstrumentCommand::Vibrato { slope, depth } => {
                    voice.vibrato.slope = slope;
                    voice.vibrato.depth = depth;
                    voice.vibrato.phase = depth as i32;
                    voice.vibrato.direction = -1;
                    self.pc += 1;
                }
                InstrumentCommand::NextCommand => self.pc += 1,
                InstrumentCommand::Delay(ticks) => {
                    self.counter = ticks as u32;
                    self.pc += 1;
                    return Signal::Idle;
                }
                InstrumentCommand::SetTimbre(timbre) => {
                    self.pc += 1;
                    return Signal::SetTimbre(timbre as usize);
                }
            }
        }

        runaway("instrument", self.pc)
    }

    fn position(&self) -> usize {
        self.pc
    }
}

/// Cursor over the volume envelope of a timbre
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvelopeCursor {
    pc: usize,
    counter: u32,
}

impl EnvelopeCursor {
    /// Start over from the first command.
    pub fn restart(&mut self) {
        self.pc = 0;
        self.counter = 0;
    }
}

impl CommandInterpreter for EnvelopeCursor {
    type Program = Timbre;

    fn countdown(&mut self) -> bool {
        count_down(&mut self.counter)
    }

    fn resume(&mut self, timbre: &Timbre, voice: &mut VoiceState) -> Signal {
        let commands = timbre.envelope.commands();

        for _ in 0..=commands.len() {
            let Some(&command) = commands.get(self.pc) else {
                return Signal::Idle;
            };

            match command {
                EnvelopeCommand::SetVolume(volume) => {
                    voice.volume = volume;
                    self.pc += 1;
                    self.counter = timbre.speed as u32;
                    return Signal::Idle;
                }
                EnvelopeCommand::Sustain(ticks) => {
                    self.pc += 1;
                    self.counter = ticks as u32;
                    return Signal::Idle;
                }
                EnvelopeCommand::Loop(target) => self.pc = target,
                EnvelopeCommand::Hold => return Signal::Idle,
            }
        }

        runaway("volume envelope", self.pc)
    }

    fn position(&self) -> usize {
        self.pc
    }
}

/// Cursor over a monopattern
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternCursor {
    pc: usize,
    counter: u32,
    speed: u32,
}

impl PatternCursor {
    /// Start over from the first command with the given note speed.
    pub fn restart(&mut self, speed: u32) {
        self.pc = 0;
        self.counter = 0;
        self.speed = speed;
    }

    /// Change the note speed without moving the cursor.
    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed;
    }

    /// Current note speed.
    pub fn speed(&self) -> u32 {
        self.speed
    }
}

impl CommandInterpreter for PatternCursor {
    type Program = Pattern;

    fn countdown(&mut self) -> bool {
        count_down(&mut self.counter)
    }

    fn resume(&mut self, pattern: &Pattern, voice: &mut VoiceState) -> Signal {
        let commands = pattern.commands();

        for _ in 0..=commands.len() {
            let Some(&command) = commands.get(self.pc) else {
                return Signal::EndPattern;
            };

            match command {
                PatternCommand::SetNote {
                    note,
                    timbre_adjust,
                    instrument,
                } => {
                    voice.note = note;
                    self.pc += 1;
                    self.counter = self.speed;
                    return Signal::Note {
                        note,
                        timbre_adjust,
                        instrument,
                    };
                }
                PatternCommand::SetSpeed(speed) => {
                    self.speed = speed as u32;
                    self.pc += 1;
                }
                PatternCommand::SetSpeedWithDelay(speed) => {
                    self.speed = speed as u32;
                    self.pc += 1;
                    self.counter = self.speed;
                    return Signal::Idle;
                }
                PatternCommand::EndPattern => return Signal::EndPattern,
            }
        }

        runaway("pattern", self.pc)
    }

    fn position(&self) -> usize {
        self.pc
    }
}
