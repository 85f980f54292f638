//! Module parsing
//!
//! Detects the container, reads the section table and decodes every table of
//! a `TFMX`/`MMME` payload into a [`Module`]:
//! - [`header`]: tag detection and `COSO` unwrapping
//! - [`index_table`]: offset-addressed program blocks
//! - [`commands`]: instrument, envelope and pattern opcode decoding
//! - [`divisions`]: division and song records

pub mod commands;
pub mod divisions;
pub mod header;
pub mod index_table;

pub use header::{sniff, Container, ModuleHeader};
pub use index_table::IndexTable;

use crate::module::Module;
use crate::reader::{DataReader, SliceReader};
use crate::{CosoError, Result};

/// Voices of the ATARI ST sound chip.
pub const DEFAULT_VOICES: usize = 3;

const LSMP_OFFSET: usize = 0x1c;
const SECTION_TABLE_OFFSET: usize = 0x04;
const COUNT_TABLE_OFFSET: usize = 0x24;

/// Trait for parsing raw module bytes
pub trait FormatParser {
    /// Parse a complete module from memory.
    fn parse(&self, data: &[u8]) -> Result<Module>;

    /// Get parser name
    fn name(&self) -> &str;
}

/// Section offsets, relative to the module start.
#[derive(Debug, Clone, Copy)]
struct Sections {
    instruments: usize,
    timbres: usize,
    patterns: usize,
    divisions: usize,
    songs: usize,
    samples: usize,
    total_size: usize,
}

/// Table sizes from the header.
#[derive(Debug, Clone, Copy)]
struct Counts {
    instruments: usize,
    timbres: usize,
    patterns: usize,
    divisions: usize,
    bytes_per_monopattern: u16,
    songs: usize,
    samples: usize,
}

/// Parser for `COSO`, `TFMX` and `MMME` modules.
#[derive(Debug, Clone, Copy)]
pub struct ModuleLoader {
    voices: usize,
}

impl Default for ModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader {
    /// Loader for 3-voice modules.
    pub fn new() -> Self {
        Self {
            voices: DEFAULT_VOICES,
        }
    }

    /// Set the number of voices stored per division record.
    pub fn voice_count(mut self, voices: usize) -> Self {
        self.voices = voices;
        self
    }

    /// Parse the module starting at the reader's current position.
    pub fn load<R: DataReader + ?Sized>(&self, reader: &mut R) -> Result<Module> {
        if self.voices == 0 {
            return Err(CosoError::Config("voice count must be positive".into()));
        }

        let header = sniff(reader)?;
        let base = header.start;
        let variant = header.variant;

        reader.set_position(base + LSMP_OFFSET);
        if &header::read_tag(reader)? == header::LSMP_TAG {
            return Err(CosoError::UnsupportedLsmp);
        }

        reader.set_position(base + SECTION_TABLE_OFFSET);
        let sections = Sections {
            instruments: reader.read_u32()? as usize,
            timbres: reader.read_u32()? as usize,
            patterns: reader.read_u32()? as usize,
            divisions: reader.read_u32()? as usize,
            songs: reader.read_u32()? as usize,
            samples: reader.read_u32()? as usize,
            total_size: reader.read_u32()? as usize,
        };

        reader.set_position(base + COUNT_TABLE_OFFSET);
        let instruments = reader.read_u16()? as usize + 1;
        let timbres = reader.read_u16()? as usize + 1;
        let patterns = reader.read_u16()? as usize + 1;
        let divisions = reader.read_u16()? as usize + 1;
        let bytes_per_monopattern = reader.read_u16()?;
        reader.skip(2);
        let counts = Counts {
            instruments,
            timbres,
            patterns,
            divisions,
            bytes_per_monopattern,
            songs: reader.read_u16()? as usize,
            samples: reader.read_u16()? as usize,
        };

        if counts.songs == 0 {
            return Err(CosoError::InvalidHeader {
                format: variant.as_str(),
                reason: "song count is zero",
            });
        }

        let record_size = variant.sample_record_size();
        let samples_end = sections.samples + (counts.samples + 1) * record_size;
        if samples_end != sections.total_size {
            return Err(CosoError::SizeMismatch {
                expected: sections.total_size,
                actual: samples_end,
            });
        }

        reader.set_position(base + sections.instruments);
        let instrument_table = IndexTable::read(
            reader,
            "instrument",
            base,
            counts.instruments,
            sections.timbres,
        )?;

        reader.set_position(base + sections.timbres);
        let timbre_table =
            IndexTable::read(reader, "timbre", base, counts.timbres, sections.patterns)?;

        reader.set_position(base + sections.patterns);
        let pattern_table = IndexTable::read(
            reader,
            "monopattern",
            base,
            counts.patterns,
            sections.divisions,
        )?;

        reader.set_position(base + sections.divisions);
        let division_list = divisions::read_divisions(reader, counts.divisions, self.voices)?;

        reader.set_position(base + sections.songs);
        let songs = divisions::read_songs(reader, counts.songs)?;

        // Sample records are not decoded, but they must be present.
        reader.set_position(base + sections.samples);
        reader.read_bytes(counts.samples * record_size)?;

        let instrument_list = instrument_table
            .entries()
            .iter()
            .enumerate()
            .map(|(i, data)| commands::decode_instrument(i, data))
            .collect::<Result<Vec<_>>>()?;
        let timbre_list = timbre_table
            .entries()
            .iter()
            .enumerate()
            .map(|(i, data)| commands::decode_timbre(i, data))
            .collect::<Result<Vec<_>>>()?;
        let pattern_list = pattern_table
            .entries()
            .iter()
            .enumerate()
            .map(|(i, data)| commands::decode_pattern(i, data))
            .collect::<Result<Vec<_>>>()?;

        let module = Module::from_parts(
            variant,
            instrument_list,
            timbre_list,
            pattern_list,
            division_list,
            songs,
        )?
        .with_layout(counts.bytes_per_monopattern, counts.samples);

        tracing::debug!(
            variant = %variant,
            container = ?header.container,
            instruments = counts.instruments,
            timbres = counts.timbres,
            patterns = counts.patterns,
            divisions = counts.divisions,
            songs = counts.songs,
            samples = counts.samples,
            "parsed module"
        );

        Ok(module)
    }
}

impl FormatParser for ModuleLoader {
    fn parse(&self, data: &[u8]) -> Result<Module> {
        self.load(&mut SliceReader::new(data))
    }

    fn name(&self) -> &str {
        "COSO/TFMX/MMME"
    }
}

/// Parse a 3-voice module at the reader's current position.
pub fn load_module<R: DataReader + ?Sized>(reader: &mut R) -> Result<Module> {
    ModuleLoader::new().load(reader)
}
