use crate::SymbolizeError;
use memmap::Mmap;
use std::fs::File;
use std::path::Path;

/// Maps the image at `x` read-only. The mapping outlives the file handle.
pub fn map<T: AsRef<Path>>(x: T) -> Result<Mmap, SymbolizeError> {
    let file = File::open(x)?;
    // The image is only read while the mapping is alive and never written.
    let map = unsafe { Mmap::map(&file)? };
    Ok(map)
}
