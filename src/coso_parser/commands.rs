//! Opcode decoding for instrument, volume envelope and pattern programs
//!
//! Every program is stored as a raw byte block (see [`IndexTable`]). Jump
//! targets inside instruments and envelopes are byte offsets in the file; they
//! are translated to command indices here so the interpreters only ever deal
//! with indices.
//!
//! [`IndexTable`]: super::index_table::IndexTable

use num_derive::FromPrimitive;
use num_traits::FromPrimitive;

use crate::module::{
    EnvelopeCommand, Instrument, InstrumentCommand, Pattern, PatternCommand, Timbre, Vibrato,
    VolumeEnvelope, TIMBRE_HEADER_LEN,
};
use crate::{CosoError, Result};

/// Instrument opcodes. Bytes outside `0xE0..=0xEF` set the pitch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
enum InstrumentOpcode {
    Loop = 0xe0,
    Complete = 0xe1,
    ResetTimbre = 0xe2,
    Vibrato = 0xe3,
    EnableToneAndNoise = 0xe4,
    DisableToneEnableNoise = 0xe5,
    EnableToneDisableNoise = 0xe6,
    SetTimbre = 0xe7,
    Delay = 0xe8,
    NextCommand = 0xe9,
    Portando = 0xea,
    SetSample = 0xeb,
    ResetVolume = 0xec,
}

/// Volume envelope opcodes. Bytes below `0xE0` set the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
enum EnvelopeOpcode {
    Loop = 0xe0,
    Hold = 0xe1,
    Sustain = 0xe8,
}

/// Pattern opcodes. Any other byte starts a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromPrimitive)]
enum PatternOpcode {
    SetSpeedWithDelay = 0xfd,
    SetSpeed = 0xfe,
    EndPattern = 0xff,
}

const INSTRUMENT_OPCODES: std::ops::RangeInclusive<u8> = 0xe0..=0xef;
const ENVELOPE_FILLER: std::ops::RangeInclusive<u8> = 0xe2..=0xe7;

/// Sequential reader over one table entry.
struct EntryCursor<'a> {
    program: &'static str,
    entry: usize,
    data: &'a [u8],
    pos: usize,
}

impl<'a> EntryCursor<'a> {
    fn new(program: &'static str, entry: usize, data: &'a [u8], pos: usize) -> Self {
        Self {
            program,
            entry,
            data,
            pos,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn next(&mut self) -> u8 {
        let byte = self.data[self.pos];
        self.pos += 1;
        byte
    }

    /// Argument byte of the opcode that started at `opcode_at`.
    fn arg(&mut self, opcode_at: usize) -> Result<u8> {
        if self.at_end() {
            return Err(CosoError::TruncatedCommand {
                program: self.program,
                entry: self.entry,
                offset: opcode_at,
            });
        }
        Ok(self.next())
    }

    fn invalid(&self, opcode_at: usize, opcode: u8) -> CosoError {
        CosoError::InvalidCommand {
            program: self.program,
            entry: self.entry,
            offset: opcode_at,
            opcode,
        }
    }
}

/// Map from byte position to the index of the command found there.
///
/// Filler bytes resolve to the command that follows them; positions inside
/// a multi-byte command resolve to nothing.
#[derive(Default)]
struct ByteMap {
    slots: Vec<Option<usize>>,
}

impl ByteMap {
    fn command(&mut self, index: usize, len: usize) {
        self.slots.push(Some(index));
        self.slots.extend(std::iter::repeat(None).take(len - 1));
    }

    fn filler(&mut self, next_index: usize) {
        self.slots.push(Some(next_index));
    }

    fn resolve(&self, kind: &'static str, target: usize, command_count: usize) -> Result<usize> {
        match self.slots.get(target).copied().flatten() {
            Some(index) if index < command_count => Ok(index),
            _ => Err(CosoError::IndexOutOfRange {
                kind,
                index: target,
                count: self.slots.len(),
            }),
        }
    }
}

/// Decode one instrument program.
pub fn decode_instrument(entry: usize, data: &[u8]) -> Result<Instrument> {
    let mut cursor = EntryCursor::new("instrument", entry, data, 0);
    let mut commands = Vec::new();
    let mut map = ByteMap::default();

    while !cursor.at_end() {
        let at = cursor.pos;
        let byte = cursor.next();

        let command = if INSTRUMENT_OPCODES.contains(&byte) {
            let opcode = InstrumentOpcode::from_u8(byte).ok_or_else(|| cursor.invalid(at, byte))?;
            match opcode {
                InstrumentOpcode::Loop => InstrumentCommand::Loop(cursor.arg(at)? as usize),
                InstrumentOpcode::Complete => InstrumentCommand::Complete,
                InstrumentOpcode::ResetTimbre => InstrumentCommand::ResetTimbre,
                InstrumentOpcode::Vibrato => {
                    let slope = cursor.arg(at)?;
                    let depth = cursor.arg(at)?;
                    InstrumentCommand::Vibrato { slope, depth }
                }
                InstrumentOpcode::EnableToneAndNoise => {
                    InstrumentCommand::EnableToneAndNoise(cursor.arg(at)?)
                }
                InstrumentOpcode::DisableToneEnableNoise => {
                    InstrumentCommand::DisableToneEnableNoise
                }
                InstrumentOpcode::EnableToneDisableNoise => {
                    InstrumentCommand::EnableToneDisableNoise
                }
                InstrumentOpcode::SetTimbre => InstrumentCommand::SetTimbre(cursor.arg(at)?),
                InstrumentOpcode::Delay => InstrumentCommand::Delay(cursor.arg(at)?),
                InstrumentOpcode::NextCommand => {
                    cursor.arg(at)?;
                    InstrumentCommand::NextCommand
                }
                InstrumentOpcode::Portando => InstrumentCommand::Portando(cursor.arg(at)? as i8),
                InstrumentOpcode::SetSample => InstrumentCommand::SetSample(cursor.arg(at)?),
                InstrumentOpcode::ResetVolume => InstrumentCommand::ResetVolume,
            }
        } else {
            InstrumentCommand::SetPitch(byte)
        };

        map.command(commands.len(), command.encoded_len());
        commands.push(command);
    }

    let count = commands.len();
    for command in &mut commands {
        if let InstrumentCommand::Loop(target) = command {
            *target = map.resolve("instrument loop", *target, count)?;
        }
    }

    Ok(Instrument::new(commands))
}

/// Decode one timbre: the five header bytes followed by its volume envelope.
pub fn decode_timbre(entry: usize, data: &[u8]) -> Result<Timbre> {
    if data.len() < TIMBRE_HEADER_LEN {
        return Err(CosoError::TruncatedCommand {
            program: "timbre",
            entry,
            offset: data.len(),
        });
    }

    let speed = data[0];
    let instrument = data[1] as usize;
    let vibrato = Vibrato {
        slope: data[2],
        depth: data[3],
        delay: data[4],
    };

    let envelope = &data[TIMBRE_HEADER_LEN..];
    let mut cursor = EntryCursor::new("volume envelope", entry, envelope, 0);
    let mut commands = Vec::new();
    let mut map = ByteMap::default();

    while !cursor.at_end() {
        let at = cursor.pos;
        let byte = cursor.next();

        if byte < 0xe0 {
            map.command(commands.len(), 1);
            commands.push(EnvelopeCommand::SetVolume(byte));
            continue;
        }
        if ENVELOPE_FILLER.contains(&byte) {
            map.filler(commands.len());
            continue;
        }

        let command = match EnvelopeOpcode::from_u8(byte) {
            Some(EnvelopeOpcode::Loop) => {
                let raw = cursor.arg(at)? as usize;
                let target = raw
                    .checked_sub(TIMBRE_HEADER_LEN)
                    .ok_or(CosoError::IndexOutOfRange {
                        kind: "envelope loop",
                        index: raw,
                        count: data.len(),
                    })?;
                EnvelopeCommand::Loop(target)
            }
            Some(EnvelopeOpcode::Hold) => EnvelopeCommand::Hold,
            Some(EnvelopeOpcode::Sustain) => EnvelopeCommand::Sustain(cursor.arg(at)?),
            None => return Err(cursor.invalid(at, byte)),
        };

        map.command(commands.len(), command.encoded_len());
        commands.push(command);
    }

    let count = commands.len();
    for command in &mut commands {
        if let EnvelopeCommand::Loop(target) = command {
            *target = map.resolve("envelope loop", *target, count)?;
        }
    }

    Ok(Timbre {
        speed,
        instrument,
        vibrato,
        envelope: VolumeEnvelope::new(commands),
    })
}

/// Decode one monopattern.
pub fn decode_pattern(entry: usize, data: &[u8]) -> Result<Pattern> {
    let mut cursor = EntryCursor::new("pattern", entry, data, 0);
    let mut commands = Vec::new();

    while !cursor.at_end() {
        let at = cursor.pos;
        let byte = cursor.next();

        let command = match PatternOpcode::from_u8(byte) {
            Some(PatternOpcode::EndPattern) => PatternCommand::EndPattern,
            Some(PatternOpcode::SetSpeed) => PatternCommand::SetSpeed(cursor.arg(at)?),
            Some(PatternOpcode::SetSpeedWithDelay) => {
                PatternCommand::SetSpeedWithDelay(cursor.arg(at)?)
            }
            None => {
                let info = cursor.arg(at)?;
                let mut instrument = None;
                let mut timbre_adjust = None;

                if info & 0xe0 != 0 {
                    instrument = Some(cursor.arg(at)?);
                }
                if info & 0x80 == 0 {
                    timbre_adjust = Some(info & 0x1f);
                    if info & 0x40 != 0 {
                        instrument = None;
                    }
                }

                PatternCommand::SetNote {
                    note: byte,
                    timbre_adjust,
                    instrument,
                }
            }
        };

        commands.push(command);
    }

    Ok(Pattern::new(commands))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_instrument_opcodes() {
        let data = [
            0x0c, 0xe3, 0x02, 0x04, 0xe4, 0x11, 0xe5, 0xe6, 0xe7, 0x01, 0xe8, 0x03, 0xe9, 0x99,
            0xea, 0xfe, 0xeb, 0x02, 0xec, 0xe2, 0x85, 0xe1,
        ];
        let instrument = decode_instrument(0, &data).unwrap();
        assert_eq!(
            instrument.commands(),
            &[
                InstrumentCommand::SetPitch(0x0c),
                InstrumentCommand::Vibrato { slope: 2, depth: 4 },
                InstrumentCommand::EnableToneAndNoise(0x11),
                InstrumentCommand::DisableToneEnableNoise,
                InstrumentCommand::EnableToneDisableNoise,
                InstrumentCommand::SetTimbre(1),
                InstrumentCommand::Delay(3),
                InstrumentCommand::NextCommand,
                InstrumentCommand::Portando(-2),
                InstrumentCommand::SetSample(2),
                InstrumentCommand::ResetVolume,
                InstrumentCommand::ResetTimbre,
                InstrumentCommand::SetPitch(0x85),
                InstrumentCommand::Complete,
            ]
        );
    }

    #[test]
    fn instrument_loop_targets_become_indices() {
        // pitch, delay 2, pitch, loop -> byte 1 (the delay)
        let data = [0x00, 0xe8, 0x02, 0x03, 0xe0, 0x01];
        let instrument = decode_instrument(0, &data).unwrap();
        assert_eq!(instrument.commands()[3], InstrumentCommand::Loop(1));

        // byte 2 is the delay argument
        let data = [0x00, 0xe8, 0x02, 0x03, 0xe0, 0x02];
        assert!(matches!(
            decode_instrument(0, &data),
            Err(CosoError::IndexOutOfRange {
                kind: "instrument loop",
                ..
            })
        ));
    }

    #[test]
    fn rejects_reserved_instrument_opcodes() {
        for opcode in [0xed, 0xee, 0xef] {
            let err = decode_instrument(4, &[0x01, opcode]).unwrap_err();
            assert!(matches!(
                err,
                CosoError::InvalidCommand {
                    program: "instrument",
                    entry: 4,
                    offset: 1,
                    opcode: o,
                } if o == opcode
            ));
        }
    }

    #[test]
    fn truncated_argument_is_an_error() {
        assert!(matches!(
            decode_instrument(0, &[0xe3, 0x01]),
            Err(CosoError::TruncatedCommand { offset: 0, .. })
        ));
        assert!(matches!(
            decode_pattern(0, &[0x20]),
            Err(CosoError::TruncatedCommand { .. })
        ));
        assert!(decode_timbre(0, &[1, 2, 3]).is_err());
    }

    #[test]
    fn decodes_timbre_header_and_envelope() {
        let data = [3, 1, 2, 5, 7, 0x40, 0x30, 0xe8, 0x04, 0xe1];
        let timbre = decode_timbre(0, &data).unwrap();
        assert_eq!(timbre.speed, 3);
        assert_eq!(timbre.instrument, 1);
        assert_eq!(
            timbre.vibrato,
            Vibrato {
                slope: 2,
                depth: 5,
                delay: 7
            }
        );
        assert_eq!(
            timbre.envelope.commands(),
            &[
                EnvelopeCommand::SetVolume(0x40),
                EnvelopeCommand::SetVolume(0x30),
                EnvelopeCommand::Sustain(4),
                EnvelopeCommand::Hold,
            ]
        );
    }

    #[test]
    fn envelope_loop_lands_on_encoded_index() {
        let commands = vec![
            EnvelopeCommand::SetVolume(10),
            EnvelopeCommand::Sustain(2),
            EnvelopeCommand::SetVolume(20),
            EnvelopeCommand::SetVolume(30),
            EnvelopeCommand::Sustain(1),
        ];
        let layout = VolumeEnvelope::new(commands.clone());

        for k in 0..commands.len() {
            let mut data = vec![1, 0, 0, 0, 0];
            for command in &commands {
                match *command {
                    EnvelopeCommand::SetVolume(v) => data.push(v),
                    EnvelopeCommand::Sustain(t) => data.extend_from_slice(&[0xe8, t]),
                    _ => unreachable!(),
                }
            }
            data.extend_from_slice(&[0xe0, (layout.byte_offset(k) + TIMBRE_HEADER_LEN) as u8]);

            let timbre = decode_timbre(0, &data).unwrap();
            assert_eq!(
                timbre.envelope.commands().last(),
                Some(&EnvelopeCommand::Loop(k))
            );
        }
    }

    #[test]
    fn envelope_filler_is_skipped() {
        // filler byte at envelope offset 1 resolves to the following command
        let data = [1, 0, 0, 0, 0, 0x10, 0xe5, 0x20, 0xe0, 0x06];
        let timbre = decode_timbre(0, &data).unwrap();
        assert_eq!(
            timbre.envelope.commands(),
            &[
                EnvelopeCommand::SetVolume(0x10),
                EnvelopeCommand::SetVolume(0x20),
                EnvelopeCommand::Loop(1),
            ]
        );
    }

    #[test]
    fn envelope_rejects_bad_bytes() {
        assert!(matches!(
            decode_timbre(2, &[1, 0, 0, 0, 0, 0xe9]),
            Err(CosoError::InvalidCommand {
                program: "volume envelope",
                entry: 2,
                opcode: 0xe9,
                ..
            })
        ));
        // loop target inside the timbre header
        assert!(decode_timbre(0, &[1, 0, 0, 0, 0, 0xe0, 0x03]).is_err());
    }

    #[test]
    fn decodes_pattern_notes() {
        let data = [
            0x28, 0x00, // plain note
            0x2a, 0x03, // timbre adjust 3
            0x2c, 0x83, 0x02, // instrument override 2
            0x2e, 0x45, 0x01, // timbre adjust 5, override cancelled
            0xfe, 0x06, 0xfd, 0x02, 0xff,
        ];
        let pattern = decode_pattern(0, &data).unwrap();
        assert_eq!(
            pattern.commands(),
            &[
                PatternCommand::SetNote {
                    note: 0x28,
                    timbre_adjust: Some(0),
                    instrument: None
                },
                PatternCommand::SetNote {
                    note: 0x2a,
                    timbre_adjust: Some(3),
                    instrument: None
                },
                PatternCommand::SetNote {
                    note: 0x2c,
                    timbre_adjust: None,
                    instrument: Some(2)
                },
                PatternCommand::SetNote {
                    note: 0x2e,
                    timbre_adjust: Some(5),
                    instrument: None
                },
                PatternCommand::SetSpeed(6),
                PatternCommand::SetSpeedWithDelay(2),
                PatternCommand::EndPattern,
            ]
        );
    }
}
