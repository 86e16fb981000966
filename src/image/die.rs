//! Per-entry reads over a parsed unit. Malformed attributes read as absent.

use crate::image::debug_info::{DebugInfo, ImageReader};
use crate::image::line_info::{self, to_u32};
use crate::session::{is_scope_tag, SourcePosition};
use gimli::{AttributeValue, DebuggingInformationEntry, DwAt, Dwarf, Unit, UnitOffset};

type Entry<'a> = DebuggingInformationEntry<'a, 'a, ImageReader>;

/// How many `DW_AT_abstract_origin`/`DW_AT_specification` hops a name
/// lookup follows.
const MAX_ORIGIN_DEPTH: usize = 8;

pub fn entry(unit: &Unit<ImageReader>, offset: usize) -> Option<Entry<'_>> {
    unit.entry(UnitOffset(offset)).ok()
}

pub fn children(unit: &Unit<ImageReader>, offset: usize) -> Vec<usize> {
    let mut children = Vec::new();
    let mut tree = match unit.entries_tree(Some(UnitOffset(offset))) {
        Ok(tree) => tree,
        Err(_) => return children,
    };
    let root = match tree.root() {
        Ok(root) => root,
        Err(_) => return children,
    };
    let mut iter = root.children();
    while let Ok(Some(child)) = iter.next() {
        children.push(child.entry().offset().0);
    }
    children
}

pub fn is_declaration(entry: &Entry) -> bool {
    matches!(
        entry.attr_value(gimli::DW_AT_declaration),
        Ok(Some(AttributeValue::Flag(true)))
    )
}

pub fn ranges(
    dwarf: &Dwarf<ImageReader>,
    unit: &Unit<ImageReader>,
    entry: &Entry,
) -> Vec<(u64, u64)> {
    let mut ranges = Vec::new();
    if let Ok(mut iter) = dwarf.die_ranges(unit, entry) {
        while let Ok(Some(range)) = iter.next() {
            ranges.push((range.begin, range.end));
        }
    }
    ranges
}

fn contains(
    dwarf: &Dwarf<ImageReader>,
    unit: &Unit<ImageReader>,
    entry: &Entry,
    offset: u64,
) -> bool {
    ranges(dwarf, unit, entry)
        .into_iter()
        .any(|(begin, end)| begin <= offset && offset < end)
}

/// Linkage name of the entry, else its plain name, looking through
/// abstract origins and specifications. Links given as section offsets may
/// lead into other units.
pub fn name(info: &DebugInfo, unit: &Unit<ImageReader>, entry: &Entry) -> Option<String> {
    [
        gimli::DW_AT_linkage_name,
        gimli::DW_AT_MIPS_linkage_name,
        gimli::DW_AT_name,
    ]
    .into_iter()
    .find_map(|attr| integrated_string(info, unit, entry, attr, MAX_ORIGIN_DEPTH))
}

fn integrated_string(
    info: &DebugInfo,
    unit: &Unit<ImageReader>,
    entry: &Entry,
    attr: DwAt,
    depth: usize,
) -> Option<String> {
    if let Ok(Some(value)) = entry.attr_value(attr) {
        if let Ok(raw) = info.dwarf.attr_string(unit, value) {
            if let Ok(text) = gimli::Reader::to_string_lossy(&raw) {
                return Some(text.into_owned());
            }
        }
    }
    if depth == 0 {
        return None;
    }
    [gimli::DW_AT_abstract_origin, gimli::DW_AT_specification]
        .into_iter()
        .find_map(|link| match entry.attr_value(link) {
            Ok(Some(AttributeValue::UnitRef(offset))) => {
                let origin = unit.entry(offset).ok()?;
                integrated_string(info, unit, &origin, attr, depth - 1)
            }
            Ok(Some(AttributeValue::DebugInfoRef(offset))) => {
                let (target, offset) = info.unit_at(offset)?;
                let origin = target.entry(offset).ok()?;
                integrated_string(info, target, &origin, attr, depth - 1)
            }
            _ => None,
        })
}

fn udata(entry: &Entry, attr: DwAt) -> u32 {
    match entry.attr(attr) {
        Ok(Some(attr)) => attr.udata_value().map_or(0, to_u32),
        _ => 0,
    }
}

pub fn call_site(
    dwarf: &Dwarf<ImageReader>,
    unit: &Unit<ImageReader>,
    entry: &Entry,
) -> SourcePosition {
    let index = match entry.attr_value(gimli::DW_AT_call_file) {
        Ok(Some(AttributeValue::FileIndex(index))) => Some(index),
        Ok(Some(value)) => value.udata_value(),
        _ => None,
    };
    SourcePosition {
        file: index.and_then(|index| line_info::file_name(dwarf, unit, index)),
        line: udata(entry, gimli::DW_AT_call_line),
        column: udata(entry, gimli::DW_AT_call_column),
    }
}

/// Offsets of the scopes enclosing `offset`, innermost first.
///
/// Walks the unit flat rather than recursively. Scope entries that miss
/// the offset have their subtrees skipped.
pub fn scopes(
    dwarf: &Dwarf<ImageReader>,
    unit: &Unit<ImageReader>,
    offset: u64,
) -> Vec<usize> {
    let mut path: Vec<(isize, usize)> = Vec::new();
    let mut innermost: Vec<usize> = Vec::new();
    let mut innermost_depth = -1;
    let mut skip_below: Option<isize> = None;
    let mut depth = 0;

    let mut entries = unit.entries();
    while let Ok(Some((delta, entry))) = entries.next_dfs() {
        depth += delta;
        if let Some(limit) = skip_below {
            if depth > limit {
                continue;
            }
            skip_below = None;
        }
        while path.last().map_or(false, |&(d, _)| d >= depth) {
            path.pop();
        }
        path.push((depth, entry.offset().0));

        if !is_scope_tag(entry.tag()) {
            continue;
        }
        if !contains(dwarf, unit, entry, offset) {
            skip_below = Some(depth);
            continue;
        }
        if depth > innermost_depth {
            innermost_depth = depth;
            innermost = path.iter().rev().map(|&(_, o)| o).collect();
        }
    }
    innermost
}
