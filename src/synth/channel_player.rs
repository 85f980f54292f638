//! Channel Player - renders one voice from its timestamped events
//!
//! The replayer side of a voice only decides *what* plays and *when*; it
//! pushes [`NoteEvent`]s and [`NoiseEvent`]s into the voice's player. The
//! player turns them into signed 8-bit samples at the output rate:
//! - tone: sine or square wave at `tone_clock / period`
//! - noise: ±1 from the voice's own [`NoiseGenerator`]
//! - both: averaged, then scaled by `volume / 64`
//!
//! Events only describe changes. Redundant events are dropped on enqueue.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::noise::NoiseGenerator;

/// Volume that maps to full scale.
pub const FULL_VOLUME: u8 = 64;

/// Tone waveform used for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Waveform {
    /// Sine wave
    #[default]
    Sine,
    /// 50% duty square wave
    Square,
}

/// Tone change of a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoteEvent {
    /// Song time in milliseconds.
    pub time: f64,
    /// Tone period; `None` mutes the tone.
    pub period: Option<u16>,
    /// Voice volume (64 = full scale).
    pub volume: u8,
}

/// Noise change of a voice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NoiseEvent {
    /// Song time in milliseconds.
    pub time: f64,
    /// Noise period register; `None` disables noise.
    pub period: Option<u8>,
}

/// Event queues and synthesis state of one voice
#[derive(Debug, Clone)]
pub struct ChannelPlayer {
    notes: VecDeque<NoteEvent>,
    noise_events: VecDeque<NoiseEvent>,

    // Last enqueued values, for de-duplication
    last_note: Option<(Option<u16>, u8)>,
    last_noise: Option<u8>,

    // Currently sounding values
    period: Option<u16>,
    volume: u8,
    noise_enabled: bool,
    noise: NoiseGenerator,
    phase: f64,

    sample_rate: u32,
    tone_clock_hz: f64,
    waveform: Waveform,
}

impl ChannelPlayer {
    /// Create a silent player
    pub fn new(sample_rate: u32, tone_clock_hz: f64, waveform: Waveform) -> Self {
        Self {
            notes: VecDeque::new(),
            noise_events: VecDeque::new(),
            last_note: None,
            last_noise: None,
            period: None,
            volume: FULL_VOLUME,
            noise_enabled: false,
            noise: NoiseGenerator::new(1, sample_rate),
            phase: 0.0,
            sample_rate: sample_rate.max(1),
            tone_clock_hz,
            waveform,
        }
    }

    /// Queue a tone change. Returns `false` if nothing changed.
    pub fn play_note(&mut self, time: f64, period: Option<u16>, volume: u8) -> bool {
        if self.last_note == Some((period, volume)) {
            return false;
        }
        self.last_note = Some((period, volume));
        self.notes.push_back(NoteEvent {
            time,
            period,
            volume,
        });
        true
    }

    /// Queue a muting event, keeping the last volume.
    pub fn mute(&mut self, time: f64) -> bool {
        let volume = self.last_note.map_or(FULL_VOLUME, |(_, volume)| volume);
        self.play_note(time, None, volume)
    }

    /// Queue a noise change. Returns `false` if nothing changed.
    pub fn change_noise(&mut self, time: f64, period: Option<u8>) -> bool {
        if self.last_noise == period {
            return false;
        }
        self.last_noise = period;
        self.noise_events.push_back(NoiseEvent { time, period });
        true
    }

    /// Render `out.len()` samples starting at `start_ms`.
    ///
    /// `active[i]` is set when the voice contributes to sample `i`; silent
    /// samples are written as 0.
    pub fn render(&mut self, out: &mut [i8], active: &mut [bool], start_ms: f64) {
        debug_assert_eq!(out.len(), active.len());
        let ms_per_sample = 1000.0 / self.sample_rate as f64;

        for (i, (sample, contributes)) in out.iter_mut().zip(active.iter_mut()).enumerate() {
            let time = start_ms + i as f64 * ms_per_sample;
            self.apply_due_events(time);

            let tone = self.period.filter(|&period| period != 0);
            let sources = tone.is_some() as u8 + self.noise_enabled as u8;
            if sources == 0 {
                *sample = 0;
                *contributes = false;
                continue;
            }

            let mut value = 0.0;
            if let Some(period) = tone {
                value += self.next_tone(period);
            }
            if self.noise_enabled {
                value += if self.noise.tick() != 0 { 1.0 } else { -1.0 };
            }

            let scaled = value / sources as f64 * self.volume as f64 / FULL_VOLUME as f64;
            *sample = (scaled * 127.0).clamp(-127.0, 127.0) as i8;
            *contributes = true;
        }
    }

    fn apply_due_events(&mut self, time: f64) {
        while let Some(event) = self.notes.front().copied() {
            if event.time > time {
                break;
            }
            self.notes.pop_front();
            self.period = event.period;
            self.volume = event.volume;
        }

        while let Some(event) = self.noise_events.front().copied() {
            if event.time > time {
                break;
            }
            self.noise_events.pop_front();
            match event.period {
                Some(period) => {
                    self.noise.set_period(period);
                    self.noise_enabled = true;
                }
                None => self.noise_enabled = false,
            }
        }
    }

    #[inline]
    fn next_tone(&mut self, period: u16) -> f64 {
        let frequency = self.tone_clock_hz / period as f64;
        let value = match self.waveform {
            Waveform::Sine => (self.phase * std::f64::consts::TAU).sin(),
            Waveform::Square => {
                if self.phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        };
        self.phase = (self.phase + frequency / self.sample_rate as f64).fract();
        value
    }

    /// Tone events not yet rendered
    pub fn queued_notes(&self) -> impl ExactSizeIterator<Item = &NoteEvent> {
        self.notes.iter()
    }

    /// Noise events not yet rendered
    pub fn queued_noise(&self) -> impl ExactSizeIterator<Item = &NoiseEvent> {
        self.noise_events.iter()
    }

    /// Currently sounding tone period
    pub fn period(&self) -> Option<u16> {
        self.period
    }

    /// Currently sounding volume
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Whether noise is currently sounding
    pub fn noise_enabled(&self) -> bool {
        self.noise_enabled
    }

    /// Reset to the freshly constructed state, keeping queue capacity
    pub fn reset(&mut self) {
        self.notes.clear();
        self.noise_events.clear();
        self.last_note = None;
        self.last_noise = None;
        self.period = None;
        self.volume = FULL_VOLUME;
        self.noise_enabled = false;
        self.noise.set_period(1);
        self.noise.reset();
        self.phase = 0.0;
    }
}
