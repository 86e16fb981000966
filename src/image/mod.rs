mod debug_info;
mod die;
mod line_info;
mod raw_image;
mod session;
mod symbol_map;

pub use debug_info::{DebugInfo, ImageReader};
pub use line_info::clean_path;
pub use session::ElfSession;
pub use symbol_map::{ExportedSymbol, ExportedSymbols};

use crate::SymbolizeError;
use findshlibs::{SharedLibrary, TargetSharedLibrary};
use log::debug;
use object::{Object, ObjectSection, ObjectSegment};
use std::path::{Path, PathBuf};

/// One reported module: an ELF image placed at `bias`.
pub struct Image {
    pub filename: String,
    pub bias: u64,
    pub start_address: u64,
    pub length: u64,
    pub symbol_map: ExportedSymbols,
    pub debug_info: DebugInfo,
}

impl Image {
    pub fn load<P: AsRef<Path>>(path: P, bias: u64) -> Result<Self, SymbolizeError> {
        let path = path.as_ref();
        let filename = path.to_string_lossy().to_string();
        let map = raw_image::map(path)?;
        let object = object::File::parse(&*map)?;

        let (low, high) =
            extent(&object).ok_or_else(|| SymbolizeError::NoLoadableSegments(filename.clone()))?;
        let symbol_map = symbol_map::load(&object);
        let debug_info = debug_info::load(&object)?;
        debug!(
            "{}: {} symbols, {} units, loaded at {:#x}",
            filename,
            symbol_map.symbols().len(),
            debug_info.units.len(),
            bias.wrapping_add(low)
        );

        Ok(Image {
            filename,
            bias,
            start_address: bias.wrapping_add(low),
            length: high - low,
            symbol_map,
            debug_info,
        })
    }

    pub fn has(&self, avma: u64) -> bool {
        self.start_address <= avma && avma < self.end_address()
    }

    pub fn end_address(&self) -> u64 {
        self.start_address.saturating_add(self.length)
    }

    /// On-disk address of a runtime address.
    pub fn svma(&self, avma: u64) -> u64 {
        avma.wrapping_sub(self.bias)
    }
}

/// On-disk span of the loadable segments, or of the allocated sections for
/// images without a program header table.
fn extent(object: &object::File) -> Option<(u64, u64)> {
    let span = |acc: Option<(u64, u64)>, (address, size): (u64, u64)| {
        if size == 0 {
            return acc;
        }
        let end = address.saturating_add(size);
        Some(acc.map_or((address, end), |(low, high)| {
            (low.min(address), high.max(end))
        }))
    };
    object
        .segments()
        .map(|s| (s.address(), s.size()))
        .fold(None, span)
        .or_else(|| {
            object
                .sections()
                .filter(|s| s.address() != 0)
                .map(|s| (s.address(), s.size()))
                .fold(None, span)
        })
}

/// Images mapped into the current process, with their load bias.
pub fn loaded_images() -> Vec<(PathBuf, u64)> {
    let mut vec = Vec::new();
    TargetSharedLibrary::each(|x| {
        let name = PathBuf::from(x.name());
        // The loader reports the main executable without a name.
        let path = if name.as_os_str().is_empty() {
            match std::env::current_exe() {
                Ok(exe) => exe,
                Err(_) => return,
            }
        } else {
            name
        };
        vec.push((path, x.virtual_memory_bias().0 as u64));
    });
    vec
}
