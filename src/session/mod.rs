//! The debug-information access layer the resolver talks to.
//!
//! Handles handed out by a session are plain identifiers. They stay valid
//! only while the session that issued them keeps the owning module
//! registered; using a stale handle yields absent data, never a panic.

use crate::SymbolizeError;
use gimli::DwTag;
use std::path::Path;

#[cfg(test)]
pub mod mock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleHandle(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnitHandle {
    pub module: ModuleHandle,
    pub index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DieHandle {
    pub unit: UnitHandle,
    pub offset: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourcePosition {
    pub file: Option<String>,
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    pub name: String,
    pub load_start: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NearestSymbol {
    pub name: String,
    /// Distance from the symbol's start to the queried address.
    pub offset: u64,
}

/// Entry kinds that enclose code and take part in scope lookups.
pub fn is_scope_tag(tag: DwTag) -> bool {
    matches!(
        tag,
        gimli::DW_TAG_subprogram
            | gimli::DW_TAG_inlined_subroutine
            | gimli::DW_TAG_lexical_block
            | gimli::DW_TAG_entry_point
            | gimli::DW_TAG_try_block
            | gimli::DW_TAG_catch_block
            | gimli::DW_TAG_with_stmt
    )
}

pub trait DebugSession {
    /// Opens a registration batch. Modules not reported again before
    /// [`DebugSession::report_end`] are dropped.
    fn report_begin(&mut self);

    /// Registers the image at `path`, with `load_address` added to every
    /// on-disk address.
    fn report_module(
        &mut self,
        path: &Path,
        load_address: u64,
    ) -> Result<ModuleHandle, SymbolizeError>;

    fn report_end(&mut self) -> Result<(), SymbolizeError>;

    fn module_for_address(&self, address: u64) -> Option<ModuleHandle>;

    fn module_info(&self, module: ModuleHandle) -> Option<ModuleInfo>;

    /// Nearest exported symbol at or below the runtime `address`.
    fn nearest_symbol(&self, module: ModuleHandle, address: u64) -> Option<NearestSymbol>;

    /// Direct unit lookup through the module's address range table.
    /// Returns the unit and its load bias.
    fn compilation_unit(&self, module: ModuleHandle, address: u64) -> Option<(UnitHandle, u64)>;

    /// Every unit of the module, in enumeration order, with its load bias.
    fn compilation_units(&self, module: ModuleHandle) -> Vec<(UnitHandle, u64)>;

    fn unit_die(&self, unit: UnitHandle) -> Option<DieHandle>;

    fn children(&self, die: DieHandle) -> Vec<DieHandle>;

    fn tag(&self, die: DieHandle) -> Option<DwTag>;

    /// True for entries that only declare a name and own no code.
    fn is_declaration(&self, die: DieHandle) -> bool;

    /// Address ranges of the entry as `(begin, end)` on-disk addresses.
    fn ranges(&self, die: DieHandle) -> Vec<(u64, u64)>;

    fn linkage_name(&self, die: DieHandle) -> Option<String>;

    /// Where, in the caller, an inlined-call entry was inlined.
    fn call_site(&self, die: DieHandle) -> SourcePosition;

    /// Exact line-table position of a unit-relative (unbiased) offset.
    fn source_position(&self, unit: UnitHandle, offset: u64) -> Option<SourcePosition>;

    /// Scopes enclosing `offset`, innermost first: the deepest scope whose
    /// ranges contain the offset followed by all of its ancestors. Scopes
    /// missing the offset hide their whole subtree.
    fn scopes(&self, unit: UnitHandle, offset: u64) -> Vec<DieHandle>;
}
