//! Module File Loader
//!
//! Loads module files from disk. Some rips keep a 68000 player stub in front
//! of the payload; such files open with a `BRA` instruction and the loader
//! searches past it for the first known tag.

use crate::coso_parser::header::{COSO_TAG, MMME_TAG, TFMX_TAG};
use crate::coso_parser::ModuleLoader;
use crate::module::Module;
use crate::reader::{DataReader, SliceReader};
use crate::Result;
use std::fs;
use std::path::Path;

/// High byte of a 68000 `BRA` instruction.
const BRA_OPCODE: u8 = 0x60;

/// Loads module files from disk
pub struct CosoFileLoader;

impl CosoFileLoader {
    /// Load a module file from disk with the default 3-voice layout
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Module> {
        Self::load_with(path, &ModuleLoader::new())
    }

    /// Load a module file from disk with a custom parser configuration
    pub fn load_with<P: AsRef<Path>>(path: P, loader: &ModuleLoader) -> Result<Module> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        tracing::debug!(path = %path.display(), bytes = data.len(), "read module file");

        let mut reader = SliceReader::new(&data);
        reader.set_position(Self::detect_start(&data));
        loader.load(&mut reader)
    }

    /// Offset of the payload tag. Files that open with a known tag start at 0,
    /// as does anything that is not a branch stub (the parser then reports
    /// the unknown tag).
    fn detect_start(data: &[u8]) -> usize {
        let is_tag = |window: &[u8]| window == COSO_TAG || window == TFMX_TAG || window == MMME_TAG;
        if data.len() < 4 || is_tag(&data[..4]) || data[0] != BRA_OPCODE {
            return 0;
        }
        match data.windows(4).position(is_tag) {
            Some(start) => {
                tracing::debug!(skipped = start, "skipping player stub");
                start
            }
            None => 0,
        }
    }
}
