//! Offset-addressed tables of variable-length blocks
//!
//! Instruments, timbres and monopatterns are each stored as an array of
//! 16-bit offsets followed by the blocks themselves. Offsets are relative to
//! the module start, the first block starts right after the offset array and
//! the last block runs up to the next section.

use crate::reader::DataReader;
use crate::{CosoError, Result};

/// Raw blocks of one section, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexTable {
    entries: Vec<Vec<u8>>,
}

impl IndexTable {
    /// Read `count` offsets at the reader position and slice the section up to
    /// `end` (relative to `base`).
    pub fn read<R: DataReader + ?Sized>(
        reader: &mut R,
        section: &'static str,
        base: usize,
        count: usize,
        end: usize,
    ) -> Result<Self> {
        let mut offsets = Vec::with_capacity(count);
        for _ in 0..count {
            offsets.push(reader.read_u16()? as usize);
        }

        let data_start = reader.position() - base;
        if let Some(&first) = offsets.first() {
            if first != data_start {
                return Err(CosoError::InvalidIndexTable {
                    section,
                    reason: format!("first entry at 0x{first:x}, data starts at 0x{data_start:x}"),
                });
            }
        }
        let len = end
            .checked_sub(data_start)
            .ok_or_else(|| CosoError::InvalidIndexTable {
                section,
                reason: format!("section end 0x{end:x} lies inside the offset array"),
            })?;

        let relative = offsets
            .iter()
            .map(|&offset| {
                offset
                    .checked_sub(data_start)
                    .ok_or_else(|| CosoError::InvalidIndexTable {
                        section,
                        reason: format!("entry offset 0x{offset:x} precedes the table data"),
                    })
            })
            .collect::<Result<Vec<_>>>()?;

        let data = reader.read_bytes(len)?;
        let table = Self::split(section, &data, &relative)?;

        if reader.position() != base + end {
            return Err(CosoError::InvalidIndexTable {
                section,
                reason: "table does not end at the next section".to_string(),
            });
        }

        Ok(table)
    }

    /// Slice `data` at `offsets` (relative to `data`). Offsets must start at 0
    /// and never decrease; the last entry ends at the end of `data`.
    pub fn split(section: &'static str, data: &[u8], offsets: &[usize]) -> Result<Self> {
        match offsets.first() {
            Some(&0) => {}
            Some(&first) => {
                return Err(CosoError::InvalidIndexTable {
                    section,
                    reason: format!("first entry at {first}, expected 0"),
                })
            }
            None if data.is_empty() => return Ok(Self::default()),
            None => {
                return Err(CosoError::InvalidIndexTable {
                    section,
                    reason: format!("{} bytes of data without entries", data.len()),
                })
            }
        }

        let mut entries = Vec::with_capacity(offsets.len());
        for (i, &start) in offsets.iter().enumerate() {
            let end = offsets.get(i + 1).copied().unwrap_or(data.len());
            if start > end || end > data.len() {
                return Err(CosoError::InvalidIndexTable {
                    section,
                    reason: format!(
                        "entry {i} spans {start}..{end} outside {} bytes of data",
                        data.len()
                    ),
                });
            }
            entries.push(data[start..end].to_vec());
        }

        Ok(Self { entries })
    }

    /// Blocks in table order.
    pub fn entries(&self) -> &[Vec<u8>] {
        &self.entries
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` when the table has no blocks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::SliceReader;

    #[test]
    fn split_covers_whole_section() {
        let data: Vec<u8> = (0..10).collect();
        let table = IndexTable::split("test", &data, &[0, 3, 3, 7]).unwrap();
        let lengths: Vec<usize> = table.entries().iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![3, 0, 4, 3]);
        assert_eq!(lengths.iter().sum::<usize>(), data.len());
        assert_eq!(table.entries()[2], vec![3, 4, 5, 6]);
    }

    #[test]
    fn split_rejects_bad_offsets() {
        let data = [0u8; 8];
        assert!(IndexTable::split("test", &data, &[1, 4]).is_err());
        assert!(IndexTable::split("test", &data, &[0, 5, 4]).is_err());
        assert!(IndexTable::split("test", &data, &[0, 9]).is_err());
        assert!(IndexTable::split("test", &data, &[]).is_err());
        assert!(IndexTable::split("test", &[], &[]).unwrap().is_empty());
    }

    #[test]
    fn read_checks_first_offset_against_position() {
        // 4 bytes of padding (module start at 0), table at 4 with 2 entries.
        let mut data = vec![0u8; 4];
        data.extend_from_slice(&8u16.to_be_bytes());
        data.extend_from_slice(&10u16.to_be_bytes());
        data.extend_from_slice(&[1, 2, 3, 4, 5]);
        let mut reader = SliceReader::new(&data);
        reader.set_position(4);
        let table = IndexTable::read(&mut reader, "test", 0, 2, 13).unwrap();
        assert_eq!(table.entries(), &[vec![1, 2], vec![3, 4, 5]]);
        assert_eq!(reader.position(), 13);

        let mut broken = data.clone();
        broken[4..6].copy_from_slice(&9u16.to_be_bytes());
        let mut reader = SliceReader::new(&broken);
        reader.set_position(4);
        assert!(matches!(
            IndexTable::read(&mut reader, "test", 0, 2, 13),
            Err(CosoError::InvalidIndexTable { .. })
        ));
    }

    #[test]
    fn read_fails_on_truncated_section() {
        let mut data = vec![0u8; 0];
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&[7, 7]);
        let mut reader = SliceReader::new(&data);
        assert!(IndexTable::read(&mut reader, "test", 0, 1, 8).is_err());
    }
}
