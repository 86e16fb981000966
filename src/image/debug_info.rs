use crate::SymbolizeError;
use gimli::{
    DebugInfoOffset, Dwarf, EndianRcSlice, RunTimeEndian, SectionId, Unit, UnitOffset,
    UnitSectionOffset,
};
use log::{debug, warn};
use object::{File, Object, ObjectSection};
use std::rc::Rc;

pub type ImageReader = EndianRcSlice<RunTimeEndian>;

pub struct DebugInfo {
    pub dwarf: Dwarf<ImageReader>,
    pub units: Vec<Unit<ImageReader>>,
    /// `.debug_aranges` content as `(begin, end, unit index)`, sorted by
    /// begin. Empty when the producer did not emit the table.
    pub aranges: Vec<(u64, u64, usize)>,
}

pub fn load(f: &File) -> Result<DebugInfo, SymbolizeError> {
    let endian = if f.is_little_endian() {
        RunTimeEndian::Little
    } else {
        RunTimeEndian::Big
    };
    DebugInfo::from_sections(endian, |id| {
        let data = f
            .section_by_name(id.name())
            .and_then(|x| x.uncompressed_data().ok())
            .unwrap_or_default();
        Rc::from(&*data)
    })
}

impl DebugInfo {
    /// Parses the DWARF sections handed out by `section`. Missing sections
    /// are passed as empty slices.
    pub fn from_sections<F>(
        endian: RunTimeEndian,
        mut section: F,
    ) -> Result<Self, SymbolizeError>
    where
        F: FnMut(SectionId) -> Rc<[u8]>,
    {
        let dwarf = Dwarf::load(|id| -> Result<ImageReader, gimli::Error> {
            Ok(EndianRcSlice::new(section(id), endian))
        })?;

        let mut units = Vec::new();
        let mut headers = dwarf.units();
        loop {
            let header = match headers.next() {
                Ok(Some(header)) => header,
                Ok(None) => break,
                Err(e) => {
                    warn!("stopping at unreadable unit header: {}", e);
                    break;
                }
            };
            let offset = header.offset();
            match dwarf.unit(header) {
                Ok(unit) => units.push(unit),
                Err(e) => warn!("skipping unreadable unit at {:?}: {}", offset, e),
            }
        }

        let aranges = read_aranges(&dwarf, &units).unwrap_or_else(|e| {
            warn!("ignoring malformed .debug_aranges: {}", e);
            Vec::new()
        });
        debug!(
            "loaded {} units, {} address range table entries",
            units.len(),
            aranges.len()
        );

        Ok(DebugInfo {
            dwarf,
            units,
            aranges,
        })
    }

    /// Index of the unit the range table assigns `svma` to.
    pub fn unit_for_address(&self, svma: u64) -> Option<usize> {
        let end = self.aranges.partition_point(|&(begin, _, _)| begin <= svma);
        self.aranges[..end]
            .iter()
            .rev()
            .find(|&&(begin, end, _)| begin <= svma && svma < end)
            .map(|&(_, _, index)| index)
    }

    /// The unit holding the entry at a section-relative offset, with the
    /// offset rebased onto that unit.
    pub fn unit_at(&self, offset: DebugInfoOffset) -> Option<(&Unit<ImageReader>, UnitOffset)> {
        self.units.iter().find_map(|unit| {
            offset
                .to_unit_offset(&unit.header)
                .map(|unit_offset| (unit, unit_offset))
        })
    }
}

fn read_aranges(
    dwarf: &Dwarf<ImageReader>,
    units: &[Unit<ImageReader>],
) -> Result<Vec<(u64, u64, usize)>, gimli::Error> {
    let mut aranges = Vec::new();
    let mut headers = dwarf.debug_aranges.headers();
    while let Some(header) = headers.next()? {
        let target = UnitSectionOffset::DebugInfoOffset(header.debug_info_offset());
        let index = match units.iter().position(|unit| unit.header.offset() == target) {
            Some(index) => index,
            None => continue,
        };
        let mut entries = header.entries();
        while let Some(entry) = entries.next()? {
            let begin = entry.address();
            let end = begin.wrapping_add(entry.length());
            if begin < end {
                aranges.push((begin, end, index));
            }
        }
    }
    aranges.sort_by_key(|&(begin, _, _)| begin);
    Ok(aranges)
}
