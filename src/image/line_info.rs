use crate::image::debug_info::ImageReader;
use crate::session::SourcePosition;
use gimli::{
    AttributeValue, ColumnType, Dwarf, FileEntry, LineProgramHeader, LineRow, Reader, Unit,
};
use std::path::{Component, Path, PathBuf};

/// Folds `.` and `..` components without touching the filesystem.
pub fn clean_path<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    if path.as_os_str().is_empty() {
        return String::new();
    }
    let mut parts: Vec<Component> = Vec::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            _ => parts.push(component),
        }
    }
    if parts.is_empty() {
        return ".".to_string();
    }
    parts
        .iter()
        .collect::<PathBuf>()
        .to_string_lossy()
        .into_owned()
}

fn lossy(
    dwarf: &Dwarf<ImageReader>,
    unit: &Unit<ImageReader>,
    value: AttributeValue<ImageReader>,
) -> Option<String> {
    let raw = dwarf.attr_string(unit, value).ok()?;
    let text = raw.to_string_lossy().ok()?;
    Some(text.into_owned())
}

fn render_file(
    dwarf: &Dwarf<ImageReader>,
    unit: &Unit<ImageReader>,
    header: &LineProgramHeader<ImageReader>,
    file: &FileEntry<ImageReader>,
) -> Option<String> {
    let mut path = PathBuf::new();
    if let Some(comp_dir) = unit.comp_dir.as_ref() {
        path.push(comp_dir.to_string_lossy().ok()?.as_ref());
    }
    if let Some(directory) = file.directory(header) {
        path.push(lossy(dwarf, unit, directory)?);
    }
    path.push(lossy(dwarf, unit, file.path_name())?);
    Some(path.to_string_lossy().into_owned())
}

/// Path of entry `index` in the unit's line-program file table.
pub fn file_name(
    dwarf: &Dwarf<ImageReader>,
    unit: &Unit<ImageReader>,
    index: u64,
) -> Option<String> {
    let header = unit.line_program.as_ref()?.header();
    let file = header.file(index)?;
    render_file(dwarf, unit, header, file)
}

/// Line-table row covering the unbiased `offset`: the last row at or
/// below it inside a sequence that extends past it.
pub fn position(
    dwarf: &Dwarf<ImageReader>,
    unit: &Unit<ImageReader>,
    offset: u64,
) -> Option<SourcePosition> {
    let program = unit.line_program.clone()?;
    let mut rows = program.rows();
    let mut previous: Option<LineRow> = None;
    let mut found: Option<LineRow> = None;
    while let Ok(Some((_, row))) = rows.next_row() {
        if let Some(prev) = previous {
            if prev.address() <= offset && offset < row.address() {
                found = Some(prev);
                break;
            }
        }
        previous = if row.end_sequence() { None } else { Some(*row) };
    }

    let row = found?;
    let header = rows.header();
    Some(SourcePosition {
        file: row
            .file(header)
            .and_then(|file| render_file(dwarf, unit, header, file)),
        line: row.line().map_or(0, |line| to_u32(line.get())),
        column: match row.column() {
            ColumnType::LeftEdge => 0,
            ColumnType::Column(column) => to_u32(column.get()),
        },
    })
}

#[inline]
pub(crate) fn to_u32(value: u64) -> u32 {
    u32::try_from(value).unwrap_or(0)
}
