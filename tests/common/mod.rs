//! Byte-level module builder shared by the integration tests.

#![allow(dead_code)]

const HEADER_LEN: usize = 0x34;

/// Builds `COSO`/`TFMX`/`MMME` images section by section.
#[derive(Debug, Clone)]
pub struct ModuleBuilder {
    payload: [u8; 4],
    coso: bool,
    voices: usize,
    instruments: Vec<Vec<u8>>,
    timbres: Vec<Vec<u8>>,
    patterns: Vec<Vec<u8>>,
    divisions: Vec<Vec<[u8; 4]>>,
    songs: Vec<[u16; 3]>,
    samples: usize,
    bytes_per_monopattern: u16,
}

impl ModuleBuilder {
    /// Bare `MMME` payload with `voices` channels per division.
    pub fn mmme(voices: usize) -> Self {
        Self::new(*b"MMME", false, voices)
    }

    /// `COSO` wrapper around a payload.
    pub fn coso(payload: &[u8; 4], voices: usize) -> Self {
        Self::new(*payload, true, voices)
    }

    /// Bare `TFMX` payload.
    pub fn tfmx(voices: usize) -> Self {
        Self::new(*b"TFMX", false, voices)
    }

    fn new(payload: [u8; 4], coso: bool, voices: usize) -> Self {
        Self {
            payload,
            coso,
            voices,
            instruments: Vec::new(),
            timbres: Vec::new(),
            patterns: Vec::new(),
            divisions: Vec::new(),
            songs: Vec::new(),
            samples: 0,
            bytes_per_monopattern: 0x40,
        }
    }

    pub fn instrument(mut self, bytes: &[u8]) -> Self {
        self.instruments.push(bytes.to_vec());
        self
    }

    /// Timbre: speed, instrument, vibrato (slope, depth, delay), envelope bytes.
    pub fn timbre(mut self, speed: u8, instrument: u8, envelope: &[u8]) -> Self {
        let mut bytes = vec![speed, instrument, 0, 0, 0];
        bytes.extend_from_slice(envelope);
        self.timbres.push(bytes);
        self
    }

    /// Timbre given as raw bytes, header included.
    pub fn raw_timbre(mut self, bytes: &[u8]) -> Self {
        self.timbres.push(bytes.to_vec());
        self
    }

    pub fn pattern(mut self, bytes: &[u8]) -> Self {
        self.patterns.push(bytes.to_vec());
        self
    }

    /// One division; `channels` holds (pattern, transpose, timbre, effect)
    /// per voice.
    pub fn division(mut self, channels: &[[u8; 4]]) -> Self {
        assert_eq!(channels.len(), self.voices);
        self.divisions.push(channels.to_vec());
        self
    }

    pub fn song(mut self, start: u16, end: u16, speed: u16) -> Self {
        self.songs.push([start, end, speed]);
        self
    }

    pub fn samples(mut self, count: usize) -> Self {
        self.samples = count;
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let record_size = if &self.payload == b"TFMX" { 10 } else { 6 };
        let mut out = vec![0u8; HEADER_LEN];

        let instruments = out.len();
        write_index_table(&mut out, &self.instruments);
        let timbres = out.len();
        write_index_table(&mut out, &self.timbres);
        let patterns = out.len();
        write_index_table(&mut out, &self.patterns);

        let divisions = out.len();
        for division in &self.divisions {
            for channel in division {
                out.extend_from_slice(channel);
            }
        }

        let songs = out.len();
        for song in &self.songs {
            for word in song {
                out.extend_from_slice(&word.to_be_bytes());
            }
        }

        let samples = out.len();
        out.resize(samples + (self.samples + 1) * record_size, 0);
        let total = out.len();

        let tag = if self.coso { *b"COSO" } else { self.payload };
        out[0..4].copy_from_slice(&tag);
        for (i, offset) in [
            instruments,
            timbres,
            patterns,
            divisions,
            songs,
            samples,
            total,
        ]
        .iter()
        .enumerate()
        {
            put_u32(&mut out, 0x04 + i * 4, *offset as u32);
        }
        if self.coso {
            out[0x20..0x24].copy_from_slice(&self.payload);
        }

        put_u16(&mut out, 0x24, count_word(self.instruments.len()));
        put_u16(&mut out, 0x26, count_word(self.timbres.len()));
        put_u16(&mut out, 0x28, count_word(self.patterns.len()));
        put_u16(&mut out, 0x2a, count_word(self.divisions.len()));
        put_u16(&mut out, 0x2c, self.bytes_per_monopattern);
        put_u16(&mut out, 0x30, self.songs.len() as u16);
        put_u16(&mut out, 0x32, self.samples as u16);
        out
    }
}

fn count_word(count: usize) -> u16 {
    assert!(count > 0, "tables hold at least one entry");
    (count - 1) as u16
}

fn write_index_table(out: &mut Vec<u8>, entries: &[Vec<u8>]) {
    let mut offset = out.len() + entries.len() * 2;
    for entry in entries {
        out.extend_from_slice(&(offset as u16).to_be_bytes());
        offset += entry.len();
    }
    for entry in entries {
        out.extend_from_slice(entry);
    }
}

pub fn put_u16(out: &mut [u8], at: usize, value: u16) {
    out[at..at + 2].copy_from_slice(&value.to_be_bytes());
}

pub fn put_u32(out: &mut [u8], at: usize, value: u32) {
    out[at..at + 4].copy_from_slice(&value.to_be_bytes());
}

/// Three voices on one pattern (speed 4, note 24, end) over three
/// divisions. Voice 0 plays a tone, the other two use an instrument that
/// never enables a source.
pub fn three_voice_tune() -> ModuleBuilder {
    let lead = [0, 0, 0, 0];
    let silent = [0, 0, 1, 0];
    ModuleBuilder::mmme(3)
        // tone on, hold
        .instrument(&[0xe6, 0xe1])
        // hold
        .instrument(&[0xe1])
        .timbre(1, 0, &[0x30, 0xe1])
        .timbre(1, 1, &[0x30, 0xe1])
        .pattern(&[0xfe, 0x04, 0x18, 0x00, 0xff])
        .division(&[lead, silent, silent])
        .division(&[lead, silent, silent])
        .division(&[lead, silent, silent])
        .song(0, 3, 1)
}
