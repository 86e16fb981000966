use crate::image::{die, line_info, symbol_map, Image, ImageReader};
use crate::session::{
    DebugSession, DieHandle, ModuleHandle, ModuleInfo, NearestSymbol, SourcePosition, UnitHandle,
};
use crate::SymbolizeError;
use gimli::{DwTag, Unit};
use log::{debug, warn};
use std::path::Path;

struct Module {
    handle: ModuleHandle,
    image: Image,
}

enum Reported {
    Kept(ModuleHandle),
    Loaded(Module),
}

/// [`DebugSession`] over ELF images on disk and their DWARF sections.
#[derive(Default)]
pub struct ElfSession {
    /// Registered modules, sorted by start address.
    modules: Vec<Module>,
    batch: Option<Vec<Reported>>,
    last_handle: u64,
}

impl ElfSession {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn image(&self, module: ModuleHandle) -> Option<&Image> {
        self.modules
            .iter()
            .find(|m| m.handle == module)
            .map(|m| &m.image)
    }

    pub fn modules(&self) -> impl Iterator<Item = (ModuleHandle, &Image)> + '_ {
        self.modules.iter().map(|m| (m.handle, &m.image))
    }

    /// Adds an already parsed image to the open batch under a fresh handle.
    pub fn report_image(&mut self, image: Image) -> Result<ModuleHandle, SymbolizeError> {
        let batch = self.batch.as_mut().ok_or(SymbolizeError::NotReporting)?;
        self.last_handle += 1;
        let handle = ModuleHandle(self.last_handle);
        batch.push(Reported::Loaded(Module { handle, image }));
        Ok(handle)
    }

    fn unit(&self, unit: UnitHandle) -> Option<(&Image, &Unit<ImageReader>)> {
        let image = self.image(unit.module)?;
        image
            .debug_info
            .units
            .get(unit.index)
            .map(|dw_unit| (image, dw_unit))
    }

    fn with_entry<T, F>(&self, die: DieHandle, f: F) -> Option<T>
    where
        F: FnOnce(&Image, &Unit<ImageReader>, &gimli::DebuggingInformationEntry<ImageReader>) -> T,
    {
        let (image, unit) = self.unit(die.unit)?;
        let entry = die::entry(unit, die.offset)?;
        Some(f(image, unit, &entry))
    }
}

impl DebugSession for ElfSession {
    fn report_begin(&mut self) {
        if self.batch.is_some() {
            debug!("discarding unfinished report batch");
        }
        self.batch = Some(Vec::new());
    }

    fn report_module(
        &mut self,
        path: &Path,
        load_address: u64,
    ) -> Result<ModuleHandle, SymbolizeError> {
        let batch = self.batch.as_mut().ok_or(SymbolizeError::NotReporting)?;
        let filename = path.to_string_lossy();

        let same = |image: &Image| image.filename == filename && image.bias == load_address;
        let pending = batch.iter().find_map(|reported| match reported {
            Reported::Kept(handle) => Some(*handle).filter(|_| {
                self.modules
                    .iter()
                    .any(|m| m.handle == *handle && same(&m.image))
            }),
            Reported::Loaded(m) => Some(m.handle).filter(|_| same(&m.image)),
        });
        if let Some(handle) = pending {
            return Ok(handle);
        }
        if let Some(m) = self.modules.iter().find(|m| same(&m.image)) {
            batch.push(Reported::Kept(m.handle));
            return Ok(m.handle);
        }

        let image = Image::load(path, load_address)?;
        self.report_image(image)
    }

    fn report_end(&mut self) -> Result<(), SymbolizeError> {
        let batch = self.batch.take().ok_or(SymbolizeError::NotReporting)?;
        let mut previous = std::mem::take(&mut self.modules);
        for reported in batch {
            match reported {
                Reported::Kept(handle) => {
                    if let Some(i) = previous.iter().position(|m| m.handle == handle) {
                        self.modules.push(previous.swap_remove(i));
                    }
                }
                Reported::Loaded(module) => self.modules.push(module),
            }
        }
        for dropped in previous {
            debug!("{} is no longer reported", dropped.image.filename);
        }
        self.modules.sort_by_key(|m| m.image.start_address);

        match self
            .modules
            .windows(2)
            .find(|pair| pair[0].image.end_address() > pair[1].image.start_address)
        {
            Some(pair) => Err(SymbolizeError::OverlappingModules {
                first: pair[0].image.filename.clone(),
                second: pair[1].image.filename.clone(),
            }),
            None => Ok(()),
        }
    }

    fn module_for_address(&self, address: u64) -> Option<ModuleHandle> {
        let end = self
            .modules
            .partition_point(|m| m.image.start_address <= address);
        self.modules[..end]
            .iter()
            .rev()
            .find(|m| m.image.has(address))
            .map(|m| m.handle)
    }

    fn module_info(&self, module: ModuleHandle) -> Option<ModuleInfo> {
        self.image(module).map(|image| ModuleInfo {
            name: image.filename.clone(),
            load_start: image.start_address,
        })
    }

    fn nearest_symbol(&self, module: ModuleHandle, address: u64) -> Option<NearestSymbol> {
        let image = self.image(module)?;
        symbol_map::nearest(&image.symbol_map, image.svma(address)).map(|(name, offset)| {
            NearestSymbol {
                name: name.to_string(),
                offset,
            }
        })
    }

    fn compilation_unit(&self, module: ModuleHandle, address: u64) -> Option<(UnitHandle, u64)> {
        let image = self.image(module)?;
        let index = image.debug_info.unit_for_address(image.svma(address))?;
        Some((UnitHandle { module, index }, image.bias))
    }

    fn compilation_units(&self, module: ModuleHandle) -> Vec<(UnitHandle, u64)> {
        match self.image(module) {
            Some(image) => (0..image.debug_info.units.len())
                .map(|index| (UnitHandle { module, index }, image.bias))
                .collect(),
            None => {
                warn!("unit enumeration for unknown module {:?}", module);
                Vec::new()
            }
        }
    }

    fn unit_die(&self, unit: UnitHandle) -> Option<DieHandle> {
        let (_, dw_unit) = self.unit(unit)?;
        let mut entries = dw_unit.entries();
        let (_, root) = entries.next_dfs().ok()??;
        Some(DieHandle {
            unit,
            offset: root.offset().0,
        })
    }

    fn children(&self, die: DieHandle) -> Vec<DieHandle> {
        self.unit(die.unit)
            .map(|(_, unit)| die::children(unit, die.offset))
            .unwrap_or_default()
            .into_iter()
            .map(|offset| DieHandle {
                unit: die.unit,
                offset,
            })
            .collect()
    }

    fn tag(&self, die: DieHandle) -> Option<DwTag> {
        self.with_entry(die, |_, _, entry| entry.tag())
    }

    fn is_declaration(&self, die: DieHandle) -> bool {
        self.with_entry(die, |_, _, entry| die::is_declaration(entry))
            .unwrap_or(false)
    }

    fn ranges(&self, die: DieHandle) -> Vec<(u64, u64)> {
        self.with_entry(die, |image, unit, entry| {
            die::ranges(&image.debug_info.dwarf, unit, entry)
        })
        .unwrap_or_default()
    }

    fn linkage_name(&self, die: DieHandle) -> Option<String> {
        self.with_entry(die, |image, unit, entry| {
            die::name(&image.debug_info, unit, entry)
        })?
    }

    fn call_site(&self, die: DieHandle) -> SourcePosition {
        self.with_entry(die, |image, unit, entry| {
            die::call_site(&image.debug_info.dwarf, unit, entry)
        })
        .unwrap_or_default()
    }

    fn source_position(&self, unit: UnitHandle, offset: u64) -> Option<SourcePosition> {
        let (image, dw_unit) = self.unit(unit)?;
        line_info::position(&image.debug_info.dwarf, dw_unit, offset)
    }

    fn scopes(&self, unit: UnitHandle, offset: u64) -> Vec<DieHandle> {
        match self.unit(unit) {
            Some((image, dw_unit)) => die::scopes(&image.debug_info.dwarf, dw_unit, offset)
                .into_iter()
                .map(|offset| DieHandle { unit, offset })
                .collect(),
            None => Vec::new(),
        }
    }
}
