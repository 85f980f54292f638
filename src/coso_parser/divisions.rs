//! Division and song records

use crate::module::{Division, DivisionChannel, SongInfo};
use crate::reader::DataReader;
use crate::Result;

/// Bytes per voice in a division record.
pub const DIVISION_CHANNEL_LEN: usize = 4;

/// Read `count` division records of `voices` channels each.
pub fn read_divisions<R: DataReader + ?Sized>(
    reader: &mut R,
    count: usize,
    voices: usize,
) -> Result<Vec<Division>> {
    let mut divisions = Vec::with_capacity(count);
    for _ in 0..count {
        let record = reader.read_bytes(voices * DIVISION_CHANNEL_LEN)?;
        let channels = record
            .chunks_exact(DIVISION_CHANNEL_LEN)
            .map(|raw| DivisionChannel::from_raw(raw[0], raw[1] as i8, raw[2], raw[3]))
            .collect();
        divisions.push(Division { channels });
    }
    Ok(divisions)
}

/// Read `count` `(start, end, speed)` word triples.
pub fn read_songs<R: DataReader + ?Sized>(reader: &mut R, count: usize) -> Result<Vec<SongInfo>> {
    let mut songs = Vec::with_capacity(count);
    for _ in 0..count {
        let start_division = reader.read_u16()? as usize;
        let end_division = reader.read_u16()? as usize;
        let initial_speed = reader.read_u16()?;
        songs.push(SongInfo {
            start_division,
            end_division,
            initial_speed,
        });
    }
    Ok(songs)
}
