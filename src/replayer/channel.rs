//! Channel (voice) runtime
//!
//! A channel binds one voice to the module: its current division, timbre and
//! instrument. Every tick it advances the pattern, instrument and volume
//! envelope cursors (in that order), derives the final period, volume and
//! noise setting and queues the changes on its [`ChannelPlayer`].

use std::sync::Arc;

use super::interpreter::{
    CommandInterpreter, EnvelopeCursor, InstrumentCursor, PatternCursor, Signal, VoiceMix,
    VoiceState,
};
use crate::module::{DivisionChannel, Module, Pattern, SongInfo, Timbre};
use crate::synth::{note_period, ChannelPlayer};

/// Runtime of one voice
#[derive(Debug, Clone)]
pub struct Channel {
    index: usize,
    module: Arc<Module>,
    song: SongInfo,

    voice: VoiceState,
    division_index: usize,
    division: Option<DivisionChannel>,
    timbre_index: usize,
    instrument_index: usize,

    pattern: PatternCursor,
    instrument: InstrumentCursor,
    envelope: EnvelopeCursor,

    playing: bool,
    finished: bool,
}

impl Channel {
    /// Create the channel for voice `index` of `song`
    pub fn new(index: usize, module: Arc<Module>, song: SongInfo) -> Self {
        debug_assert!(index < module.voice_count());
        Self {
            index,
            module,
            song,
            voice: VoiceState::default(),
            division_index: song.start_division,
            division: None,
            timbre_index: 0,
            instrument_index: 0,
            pattern: PatternCursor::default(),
            instrument: InstrumentCursor::default(),
            envelope: EnvelopeCursor::default(),
            playing: false,
            finished: false,
        }
    }

    /// Return to the state right after construction
    pub fn reset(&mut self) {
        self.voice = VoiceState::default();
        self.division_index = self.song.start_division;
        self.division = None;
        self.timbre_index = 0;
        self.instrument_index = 0;
        self.pattern = PatternCursor::default();
        self.instrument = InstrumentCursor::default();
        self.envelope = EnvelopeCursor::default();
        self.playing = false;
        self.finished = false;
    }

    /// Advance one tick at song time `time` (ms) and queue the resulting
    /// events on `player`.
    pub fn tick(&mut self, time: f64, player: &mut ChannelPlayer) {
        if self.division.is_none() {
            self.playing = true;
            self.division_index = self.song.start_division;
            self.load_division();
        } else if !self.playing {
            return;
        }

        self.advance_pattern();
        if self.finished {
            player.mute(time);
            player.change_noise(time, None);
            return;
        }

        self.advance_instrument();

        let module = Arc::clone(&self.module);
        self.envelope
            .tick(&module.timbres()[self.timbre_index], &mut self.voice);

        self.emit(time, player);
    }

    fn advance_pattern(&mut self) {
        let module = Arc::clone(&self.module);
        let pattern = self.current_pattern(&module);
        let mut signal = self.pattern.tick(pattern, &mut self.voice);

        loop {
            match signal {
                Signal::EndPattern => {
                    if !self.next_division() {
                        return;
                    }
                    // The new pattern starts within the same tick.
                    let pattern = self.current_pattern(&module);
                    signal = self.pattern.resume(pattern, &mut self.voice);
                }
                Signal::Note {
                    timbre_adjust,
                    instrument,
                    ..
                } => {
                    self.start_note(timbre_adjust, instrument);
                    return;
                }
                _ => return,
            }
        }
    }

    fn current_pattern<'m>(&self, module: &'m Module) -> &'m Pattern {
        &module.patterns()[self.division().pattern_index]
    }

    fn start_note(&mut self, timbre_adjust: Option<u8>, instrument: Option<u8>) {
        if let Some(adjust) = timbre_adjust.filter(|&adjust| adjust != 0) {
            // Relative to the division's timbre, not the currently selected one.
            let base = self.division().timbre_index as usize;
            self.set_timbre(base + adjust as usize);
        }
        if let Some(instrument) = instrument {
            self.instrument_index = instrument as usize;
        }
        self.instrument.restart();
        self.envelope.restart();
    }

    fn advance_instrument(&mut self) {
        let module = Arc::clone(&self.module);
        let program = &module.instruments()[self.instrument_index];
        let mut signal = self.instrument.tick(program, &mut self.voice);

        for _ in 0..=program.commands().len() {
            let target = match signal {
                Signal::SetTimbre(timbre) => timbre,
                Signal::ResetTimbre => self.division().timbre_index as usize,
                _ => return,
            };
            if self.set_timbre(target) {
                return;
            }
            let program = &module.instruments()[self.instrument_index];
            signal = self.instrument.resume(program, &mut self.voice);
        }

        tracing::warn!(
            voice = self.index,
            instrument = self.instrument_index,
            "timbre switches do not settle, holding"
        );
    }

    /// Switch timbre. Returns `false` if `index` is already selected.
    fn set_timbre(&mut self, index: usize) -> bool {
        let index = if index < self.module.timbres().len() {
            index
        } else {
            tracing::debug!(voice = self.index, timbre = index, "timbre out of range, using 0");
            0
        };
        if index == self.timbre_index {
            return false;
        }

        let module = Arc::clone(&self.module);
        let timbre = &module.timbres()[index];
        self.timbre_index = index;
        if timbre.instrument != self.instrument_index {
            self.instrument_index = timbre.instrument;
            self.instrument.restart();
        }
        self.pattern.set_speed(self.pattern_speed(timbre));
        self.envelope.restart();
        self.reset_vibrato(timbre);
        true
    }

    /// Move to the next division. Returns `false` when the song range is
    /// exhausted and the voice has finished.
    fn next_division(&mut self) -> bool {
        self.division_index += 1;
        if self.division_index >= self.song.end_division {
            self.division_index = self.song.start_division;
            self.playing = false;
            self.finished = true;
            tracing::trace!(voice = self.index, "voice reached end of song");
            return false;
        }
        self.load_division();
        true
    }

    fn load_division(&mut self) {
        let module = Arc::clone(&self.module);
        let division = module.divisions()[self.division_index].channels[self.index];
        let timbre_index = division.initial_timbre();
        let timbre = &module.timbres()[timbre_index];

        self.division = Some(division);
        self.timbre_index = timbre_index;
        self.instrument_index = timbre.instrument;
        self.pattern.restart(self.pattern_speed(timbre));
        self.instrument.restart();
        self.envelope.restart();
        self.reset_vibrato(timbre);

        tracing::trace!(
            voice = self.index,
            division = self.division_index,
            pattern = division.pattern_index,
            timbre = timbre_index,
            "division change"
        );
    }

    fn pattern_speed(&self, timbre: &Timbre) -> u32 {
        self.song.initial_speed as u32 * timbre.speed as u32 * self.division().speed_factor as u32
    }

    fn reset_vibrato(&mut self, timbre: &Timbre) {
        let vibrato = &mut self.voice.vibrato;
        vibrato.slope = timbre.vibrato.slope;
        vibrato.depth = timbre.vibrato.depth;
        vibrato.delay = timbre.vibrato.delay;
        vibrato.phase = timbre.vibrato.depth as i32;
        vibrato.direction = -1;
    }

    fn division(&self) -> DivisionChannel {
        self.division.expect("division is loaded on the first tick")
    }

    fn emit(&mut self, time: f64, player: &mut ChannelPlayer) {
        let division = self.division();
        let voice = &mut self.voice;

        let pitch = voice.pitch;
        let note = if pitch & 0x80 != 0 {
            pitch & 0x7f
        } else {
            pitch
                .wrapping_add(voice.note)
                .wrapping_add(division.transpose as u8)
                & 0x7f
        };
        let mut period = note_period(note) as i64;

        let vibrato = &mut voice.vibrato;
        if vibrato.delay == 0 {
            let range = 2 * vibrato.depth as i32;
            vibrato.phase += vibrato.direction * vibrato.slope.max(1) as i32;
            if vibrato.phase <= 0 || vibrato.phase >= range {
                vibrato.direction = -vibrato.direction;
            }
            vibrato.phase = vibrato.phase.clamp(0, range);
            period += period * (vibrato.phase - vibrato.depth as i32) as i64 / 1024;
        } else {
            vibrato.delay -= 1;
        }

        let portando = &mut voice.portando;
        if portando.active {
            portando.delta = portando.delta.saturating_add(portando.slope as i32);
            period *= 1 - portando.delta as i64 * period / 1024;
        }

        let period = period.clamp(0, u16::MAX as i64) as u16;
        let volume = voice.volume.saturating_sub(division.volume_reduction);

        player.play_note(time, voice.mix.contains(VoiceMix::TONE).then_some(period), volume);

        if voice.mix.contains(VoiceMix::NOISE) {
            let register = if voice.mix.contains(VoiceMix::TONE) {
                voice.noise_period
            } else if pitch & 0x80 == 0 {
                !voice.note.wrapping_add(pitch)
            } else {
                !(pitch & 0x7f)
            };
            // A zero register keeps the current noise period.
            if register != 0 {
                player.change_noise(time, Some(!register & 0x1f));
            }
        } else {
            player.change_noise(time, None);
        }
    }

    /// Voice index
    pub fn index(&self) -> usize {
        self.index
    }

    /// Interpreter-owned voice values
    pub fn voice(&self) -> &VoiceState {
        &self.voice
    }

    /// Current instrument pitch
    pub fn pitch(&self) -> u8 {
        self.voice.pitch
    }

    /// Current pattern note
    pub fn note(&self) -> u8 {
        self.voice.note
    }

    /// Current envelope volume (before the division's reduction)
    pub fn volume(&self) -> u8 {
        self.voice.volume
    }

    /// Enabled sound sources
    pub fn mix(&self) -> VoiceMix {
        self.voice.mix
    }

    /// Index of the division being played
    pub fn division_index(&self) -> usize {
        self.division_index
    }

    /// Selected timbre
    pub fn timbre_index(&self) -> usize {
        self.timbre_index
    }

    /// Selected instrument
    pub fn instrument_index(&self) -> usize {
        self.instrument_index
    }

    /// Next pattern command
    pub fn pattern_position(&self) -> usize {
        self.pattern.position()
    }

    /// Next instrument command
    pub fn instrument_position(&self) -> usize {
        self.instrument.position()
    }

    /// Next volume envelope command
    pub fn envelope_position(&self) -> usize {
        self.envelope.position()
    }

    /// `true` between the first tick and the end of the song range
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// `true` once the voice has wrapped around its song range
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}
