//! Decoded module tables
//!
//! A [`Module`] owns every table of one music file. Songs only reference
//! entries by index, so one module (behind an `Arc`) can drive any number of
//! songs and channels without copying programs.

pub mod instrument;
pub mod pattern;
pub mod timbre;

pub use instrument::{Instrument, InstrumentCommand};
pub use pattern::{Pattern, PatternCommand};
pub use timbre::{EnvelopeCommand, Timbre, Vibrato, VolumeEnvelope, TIMBRE_HEADER_LEN};

use crate::{CosoError, Result};
use serde::Serialize;
use std::fmt;

/// Payload variant behind the (optional) COSO wrapper.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Variant {
    /// The Final Musicsystem eXtended
    Tfmx,
    /// Mad Max Music Editor
    Mmme,
}

impl Variant {
    /// Four-byte tag of the variant.
    pub fn tag(&self) -> &'static [u8; 4] {
        match self {
            Variant::Tfmx => b"TFMX",
            Variant::Mmme => b"MMME",
        }
    }

    /// Size of one sample record in bytes.
    pub fn sample_record_size(&self) -> usize {
        match self {
            Variant::Tfmx => 10,
            Variant::Mmme => 6,
        }
    }

    /// Display name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Tfmx => "TFMX",
            Variant::Mmme => "MMME",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Division range and base tempo of one song.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SongInfo {
    /// First division of the song (and loop target).
    pub start_division: usize,
    /// Division index at which the song wraps.
    pub end_division: usize,
    /// Base speed multiplier.
    pub initial_speed: u16,
}

/// Per-voice binding of one division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DivisionChannel {
    /// Monopattern played by the voice.
    pub pattern_index: usize,
    /// Semitones added to every note.
    pub transpose: i8,
    /// Base timbre.
    pub timbre_index: u8,
    /// Subtracted from the envelope volume.
    pub volume_reduction: u8,
    /// Multiplies the pattern speed.
    pub speed_factor: u8,
    /// Added to the base timbre when the division starts.
    pub timbre_adjust: u8,
}

impl Default for DivisionChannel {
    fn default() -> Self {
        Self::from_raw(0, 0, 0, 0)
    }
}

impl DivisionChannel {
    /// Decode the effect byte of a raw division entry.
    ///
    /// `0xFx` reduces the volume, `0xEx` multiplies the speed, values below
    /// `0x80` adjust the timbre; anything else has no effect.
    pub fn from_raw(pattern_index: u8, transpose: i8, timbre_index: u8, effect: u8) -> Self {
        let mut channel = Self {
            pattern_index: pattern_index as usize,
            transpose,
            timbre_index,
            volume_reduction: 0,
            speed_factor: 1,
            timbre_adjust: 0,
        };

        if effect & 0xf0 == 0xf0 {
            channel.volume_reduction = effect & 0x0f;
        } else if effect & 0xf0 == 0xe0 {
            channel.speed_factor = 1 + (effect & 0x0f);
        } else if effect & 0x80 == 0 {
            channel.timbre_adjust = effect;
        }

        channel
    }

    /// Timbre selected when the division starts.
    pub fn initial_timbre(&self) -> usize {
        self.timbre_index as usize + self.timbre_adjust as usize
    }
}

/// One row of the song timeline: a binding for every voice.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Division {
    /// One entry per voice.
    pub channels: Vec<DivisionChannel>,
}

/// Serializable overview of a module.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleSummary {
    /// Payload variant.
    pub variant: Variant,
    /// Number of voices.
    pub voices: usize,
    /// Instrument count.
    pub instruments: usize,
    /// Timbre count.
    pub timbres: usize,
    /// Monopattern count.
    pub patterns: usize,
    /// Division count.
    pub divisions: usize,
    /// Declared monopattern size.
    pub bytes_per_monopattern: u16,
    /// Sample record count.
    pub samples: usize,
    /// Songs in the module.
    pub songs: Vec<SongInfo>,
}

/// All decoded tables of one music file.
#[derive(Debug, Clone)]
pub struct Module {
    variant: Variant,
    instruments: Vec<Instrument>,
    timbres: Vec<Timbre>,
    patterns: Vec<Pattern>,
    divisions: Vec<Division>,
    songs: Vec<SongInfo>,
    voice_count: usize,
    bytes_per_monopattern: u16,
    sample_count: usize,
}

impl Module {
    /// Assemble a module and validate every cross-table reference.
    pub fn from_parts(
        variant: Variant,
        instruments: Vec<Instrument>,
        timbres: Vec<Timbre>,
        patterns: Vec<Pattern>,
        divisions: Vec<Division>,
        songs: Vec<SongInfo>,
    ) -> Result<Self> {
        let voice_count = divisions.first().map_or(0, |d| d.channels.len());
        let module = Self {
            variant,
            instruments,
            timbres,
            patterns,
            divisions,
            songs,
            voice_count,
            bytes_per_monopattern: 0,
            sample_count: 0,
        };
        module.validate()?;
        Ok(module)
    }

    pub(crate) fn with_layout(mut self, bytes_per_monopattern: u16, sample_count: usize) -> Self {
        self.bytes_per_monopattern = bytes_per_monopattern;
        self.sample_count = sample_count;
        self
    }

    fn validate(&self) -> Result<()> {
        for (index, division) in self.divisions.iter().enumerate() {
            if division.channels.len() != self.voice_count {
                return Err(CosoError::InvalidData {
                    msg: format!(
                        "division {} has {} voices, expected {}",
                        index,
                        division.channels.len(),
                        self.voice_count
                    ),
                });
            }
            for channel in &division.channels {
                check_index("pattern", channel.pattern_index, self.patterns.len())?;
                check_index("timbre", channel.initial_timbre(), self.timbres.len())?;
            }
        }

        for timbre in &self.timbres {
            check_index("instrument", timbre.instrument, self.instruments.len())?;
            let len = timbre.envelope.commands().len();
            for command in timbre.envelope.commands() {
                if let EnvelopeCommand::Loop(target) = *command {
                    check_index("envelope loop", target, len)?;
                }
            }
        }

        for instrument in &self.instruments {
            let len = instrument.commands().len();
            for command in instrument.commands() {
                match *command {
                    InstrumentCommand::Loop(target) => check_index("instrument loop", target, len)?,
                    InstrumentCommand::SetTimbre(timbre) => {
                        check_index("timbre", timbre as usize, self.timbres.len())?
                    }
                    _ => {}
                }
            }
        }

        for pattern in &self.patterns {
            for command in pattern.commands() {
                if let PatternCommand::SetNote {
                    instrument: Some(instrument),
                    ..
                } = *command
                {
                    check_index("instrument", instrument as usize, self.instruments.len())?;
                }
            }
        }

        for song in &self.songs {
            check_index("division", song.start_division, self.divisions.len())?;
            if song.end_division > self.divisions.len() {
                return Err(CosoError::IndexOutOfRange {
                    kind: "end division",
                    index: song.end_division,
                    count: self.divisions.len(),
                });
            }
        }

        Ok(())
    }

    /// Payload variant.
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// Number of voices, fixed by the first division.
    pub fn voice_count(&self) -> usize {
        self.voice_count
    }

    /// Instrument table.
    pub fn instruments(&self) -> &[Instrument] {
        &self.instruments
    }

    /// Timbre table.
    pub fn timbres(&self) -> &[Timbre] {
        &self.timbres
    }

    /// Monopattern table.
    pub fn patterns(&self) -> &[Pattern] {
        &self.patterns
    }

    /// Division table.
    pub fn divisions(&self) -> &[Division] {
        &self.divisions
    }

    /// Songs of the module.
    pub fn songs(&self) -> &[SongInfo] {
        &self.songs
    }

    /// Look up a song, failing for unknown indices.
    pub fn song(&self, index: usize) -> Result<SongInfo> {
        self.songs
            .get(index)
            .copied()
            .ok_or(CosoError::UnknownSong {
                index,
                count: self.songs.len(),
            })
    }

    /// Overview for tooling.
    pub fn summary(&self) -> ModuleSummary {
        ModuleSummary {
            variant: self.variant,
            voices: self.voice_count,
            instruments: self.instruments.len(),
            timbres: self.timbres.len(),
            patterns: self.patterns.len(),
            divisions: self.divisions.len(),
            bytes_per_monopattern: self.bytes_per_monopattern,
            samples: self.sample_count,
            songs: self.songs.clone(),
        }
    }
}

fn check_index(kind: &'static str, index: usize, count: usize) -> Result<()> {
    if index < count {
        Ok(())
    } else {
        Err(CosoError::IndexOutOfRange { kind, index, count })
    }
}
