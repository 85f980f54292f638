//! Container detection
//!
//! A module either starts directly with its `TFMX`/`MMME` payload tag or is
//! wrapped in a `COSO` (COmpressed SOng) header that names the payload at
//! offset `0x20`. In both cases the section table is read relative to the
//! very first tag.

use crate::module::Variant;
use crate::reader::DataReader;
use crate::{CosoError, Result};

/// COmpressed SOng wrapper tag
pub const COSO_TAG: &[u8; 4] = b"COSO";
/// The Final Musicsystem eXtended payload tag
pub const TFMX_TAG: &[u8; 4] = b"TFMX";
/// Mad Max Music Editor payload tag
pub const MMME_TAG: &[u8; 4] = b"MMME";
/// Sample-compressed variant tag (unsupported)
pub const LSMP_TAG: &[u8; 4] = b"LSMP";

const COSO_SONG_COUNT: usize = 0x30;
const COSO_SAMPLE_OFFSET: usize = 0x18;
const COSO_PAYLOAD_TAG: usize = 0x20;

/// How the payload was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Container {
    /// `COSO` wrapper around the payload
    Coso,
    /// Bare payload
    Bare,
}

/// Result of header detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleHeader {
    /// Wrapper kind.
    pub container: Container,
    /// Payload variant.
    pub variant: Variant,
    /// Reader position of the first tag; all section offsets are relative to it.
    pub start: usize,
}

/// Identify the module at the reader's current position.
///
/// The reader is left at the module start.
pub fn sniff<R: DataReader + ?Sized>(reader: &mut R) -> Result<ModuleHeader> {
    let start = reader.position();
    let tag = read_tag(reader)?;

    let header = match &tag {
        COSO_TAG => sniff_coso(reader, start)?,
        TFMX_TAG => {
            let first = read_word_at(reader, start + 0x04)?;
            let second = read_word_at(reader, start + 0x10)?;
            if first >= 0x200 {
                return Err(CosoError::InvalidHeader {
                    format: "TFMX",
                    reason: "header word at 0x04 out of range",
                });
            }
            if second == 0 {
                return Err(CosoError::InvalidHeader {
                    format: "TFMX",
                    reason: "header word at 0x10 is zero",
                });
            }
            ModuleHeader {
                container: Container::Bare,
                variant: Variant::Tfmx,
                start,
            }
        }
        MMME_TAG => ModuleHeader {
            container: Container::Bare,
            variant: Variant::Mmme,
            start,
        },
        _ => return Err(CosoError::UnknownTag { tag }),
    };

    reader.set_position(start);
    Ok(header)
}

fn sniff_coso<R: DataReader + ?Sized>(reader: &mut R, start: usize) -> Result<ModuleHeader> {
    if read_word_at(reader, start + COSO_SONG_COUNT)? == 0 {
        return Err(CosoError::InvalidHeader {
            format: "COSO",
            reason: "song count is zero",
        });
    }

    reader.set_position(start + COSO_SAMPLE_OFFSET);
    if reader.read_u32()? == 0 {
        return Err(CosoError::InvalidHeader {
            format: "COSO",
            reason: "sample table offset is zero",
        });
    }

    reader.set_position(start + COSO_PAYLOAD_TAG);
    let variant = match &read_tag(reader)? {
        TFMX_TAG => Variant::Tfmx,
        MMME_TAG => Variant::Mmme,
        _ => {
            return Err(CosoError::InvalidHeader {
                format: "COSO",
                reason: "payload is neither TFMX nor MMME",
            })
        }
    };

    Ok(ModuleHeader {
        container: Container::Coso,
        variant,
        start,
    })
}

pub(crate) fn read_tag<R: DataReader + ?Sized>(reader: &mut R) -> Result<[u8; 4]> {
    let bytes = reader.read_bytes(4)?;
    let mut tag = [0u8; 4];
    tag.copy_from_slice(&bytes);
    Ok(tag)
}

fn read_word_at<R: DataReader + ?Sized>(reader: &mut R, offset: usize) -> Result<u16> {
    reader.set_position(offset);
    reader.read_u16()
}
