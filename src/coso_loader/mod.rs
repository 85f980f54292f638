//! Module File Loader Domain
//!
//! Reads COSO/TFMX/MMME modules from disk and hands them to the parser.

pub mod loader;

pub use loader::CosoFileLoader;

use crate::module::Module;
use crate::Result;
use std::path::Path;

/// Convenience function to load a module file from disk
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<Module> {
    CosoFileLoader::load(path)
}
