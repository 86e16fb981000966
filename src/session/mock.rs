//! In-memory [`DebugSession`] over hand-built DIE trees.

use crate::session::{
    is_scope_tag, DebugSession, DieHandle, ModuleHandle, ModuleInfo, NearestSymbol,
    SourcePosition, UnitHandle,
};
use crate::SymbolizeError;
use gimli::DwTag;
use std::cell::Cell;
use std::io::{Error, ErrorKind};
use std::path::Path;

#[derive(Debug, Clone)]
pub struct MockDie {
    tag: DwTag,
    name: Option<String>,
    ranges: Vec<(u64, u64)>,
    declaration: bool,
    call_site: SourcePosition,
}

impl MockDie {
    pub fn new(tag: DwTag) -> Self {
        MockDie {
            tag,
            name: None,
            ranges: Vec::new(),
            declaration: false,
            call_site: SourcePosition::default(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_ranges(mut self, ranges: &[(u64, u64)]) -> Self {
        self.ranges.extend_from_slice(ranges);
        self
    }

    pub fn declaration(mut self) -> Self {
        self.declaration = true;
        self
    }

    pub fn with_call_site(mut self, file: Option<&str>, line: u32, column: u32) -> Self {
        self.call_site = SourcePosition {
            file: file.map(str::to_string),
            line,
            column,
        };
        self
    }
}

struct Node {
    die: MockDie,
    parent: Option<usize>,
    children: Vec<usize>,
}

struct MockUnit {
    bias: u64,
    nodes: Vec<Node>,
    lines: Vec<(u64, SourcePosition)>,
}

struct MockModule {
    handle: ModuleHandle,
    name: String,
    start: u64,
    end: u64,
    bias: u64,
    visible: bool,
    symbols: Vec<(u64, String)>,
    aranges: Vec<(u64, u64, usize)>,
    units: Vec<MockUnit>,
}

#[derive(Default)]
pub struct MockSession {
    modules: Vec<MockModule>,
    batch: Option<Vec<ModuleHandle>>,
    unit_enumerations: Cell<usize>,
}

impl MockSession {
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a registered module spanning `[start, end)` at runtime whose
    /// on-disk addresses are shifted by `bias`.
    pub fn add_module(&mut self, name: &str, bias: u64, start: u64, end: u64) -> ModuleHandle {
        let handle = ModuleHandle(self.modules.len() as u64 + 1);
        self.modules.push(MockModule {
            handle,
            name: name.to_string(),
            start,
            end,
            bias,
            visible: true,
            symbols: Vec::new(),
            aranges: Vec::new(),
            units: Vec::new(),
        });
        handle
    }

    pub fn add_unit(&mut self, module: ModuleHandle, bias: u64) -> UnitHandle {
        let units = &mut self.module_mut(module).units;
        units.push(MockUnit {
            bias,
            nodes: vec![Node {
                die: MockDie::new(gimli::DW_TAG_compile_unit),
                parent: None,
                children: Vec::new(),
            }],
            lines: Vec::new(),
        });
        UnitHandle {
            module,
            index: units.len() - 1,
        }
    }

    pub fn root(&self, unit: UnitHandle) -> DieHandle {
        DieHandle { unit, offset: 0 }
    }

    pub fn add_die(&mut self, parent: DieHandle, die: MockDie) -> DieHandle {
        let unit = self.unit_mut(parent.unit);
        let offset = unit.nodes.len();
        unit.nodes.push(Node {
            die,
            parent: Some(parent.offset),
            children: Vec::new(),
        });
        unit.nodes[parent.offset].children.push(offset);
        DieHandle {
            unit: parent.unit,
            offset,
        }
    }

    /// Adds an exported symbol at an on-disk address.
    pub fn add_symbol(&mut self, module: ModuleHandle, address: u64, name: &str) {
        let symbols = &mut self.module_mut(module).symbols;
        symbols.push((address, name.to_string()));
        symbols.sort();
    }

    /// Adds a line-table row at an on-disk address.
    pub fn add_line(&mut self, unit: UnitHandle, address: u64, file: &str, line: u32, column: u32) {
        let lines = &mut self.unit_mut(unit).lines;
        lines.push((
            address,
            SourcePosition {
                file: Some(file.to_string()),
                line,
                column,
            },
        ));
        lines.sort_by_key(|(address, _)| *address);
    }

    /// Adds an address range table entry, enabling the direct unit lookup.
    pub fn add_arange(&mut self, unit: UnitHandle, low: u64, high: u64) {
        self.module_mut(unit.module)
            .aranges
            .push((low, high, unit.index));
    }

    pub fn unit_enumerations(&self) -> usize {
        self.unit_enumerations.get()
    }

    fn module(&self, module: ModuleHandle) -> Option<&MockModule> {
        self.modules.iter().find(|m| m.handle == module)
    }

    fn module_mut(&mut self, module: ModuleHandle) -> &mut MockModule {
        self.modules
            .iter_mut()
            .find(|m| m.handle == module)
            .expect("unknown mock module")
    }

    fn unit(&self, unit: UnitHandle) -> Option<&MockUnit> {
        self.module(unit.module)?.units.get(unit.index)
    }

    fn unit_mut(&mut self, unit: UnitHandle) -> &mut MockUnit {
        &mut self.module_mut(unit.module).units[unit.index]
    }

    fn node(&self, die: DieHandle) -> Option<&Node> {
        self.unit(die.unit)?.nodes.get(die.offset)
    }
}

impl DebugSession for MockSession {
    fn report_begin(&mut self) {
        self.batch = Some(Vec::new());
    }

    fn report_module(
        &mut self,
        path: &Path,
        load_address: u64,
    ) -> Result<ModuleHandle, SymbolizeError> {
        let batch = self.batch.as_mut().ok_or(SymbolizeError::NotReporting)?;
        let module = self
            .modules
            .iter()
            .find(|m| Path::new(&m.name) == path && m.bias == load_address)
            .ok_or_else(|| Error::new(ErrorKind::NotFound, path.display().to_string()))?;
        batch.push(module.handle);
        Ok(module.handle)
    }

    fn report_end(&mut self) -> Result<(), SymbolizeError> {
        let batch = self.batch.take().ok_or(SymbolizeError::NotReporting)?;
        for module in &mut self.modules {
            module.visible = batch.contains(&module.handle);
        }
        Ok(())
    }

    fn module_for_address(&self, address: u64) -> Option<ModuleHandle> {
        self.modules
            .iter()
            .find(|m| m.visible && m.start <= address && address < m.end)
            .map(|m| m.handle)
    }

    fn module_info(&self, module: ModuleHandle) -> Option<ModuleInfo> {
        self.module(module).map(|m| ModuleInfo {
            name: m.name.clone(),
            load_start: m.start,
        })
    }

    fn nearest_symbol(&self, module: ModuleHandle, address: u64) -> Option<NearestSymbol> {
        let module = self.module(module)?;
        let svma = address.checked_sub(module.bias)?;
        module
            .symbols
            .iter()
            .rev()
            .find(|(start, _)| *start <= svma)
            .map(|(start, name)| NearestSymbol {
                name: name.clone(),
                offset: svma - start,
            })
    }

    fn compilation_unit(&self, module: ModuleHandle, address: u64) -> Option<(UnitHandle, u64)> {
        let m = self.module(module)?;
        let svma = address.checked_sub(m.bias)?;
        m.aranges
            .iter()
            .find(|(low, high, _)| *low <= svma && svma < *high)
            .map(|&(_, _, index)| (UnitHandle { module, index }, m.units[index].bias))
    }

    fn compilation_units(&self, module: ModuleHandle) -> Vec<(UnitHandle, u64)> {
        self.unit_enumerations.set(self.unit_enumerations.get() + 1);
        self.module(module)
            .map(|m| {
                m.units
                    .iter()
                    .enumerate()
                    .map(|(index, unit)| (UnitHandle { module, index }, unit.bias))
                    .collect()
            })
            .unwrap_or_default()
    }

    fn unit_die(&self, unit: UnitHandle) -> Option<DieHandle> {
        self.unit(unit).map(|_| DieHandle { unit, offset: 0 })
    }

    fn children(&self, die: DieHandle) -> Vec<DieHandle> {
        self.node(die)
            .map(|node| {
                node.children
                    .iter()
                    .map(|&offset| DieHandle {
                        unit: die.unit,
                        offset,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn tag(&self, die: DieHandle) -> Option<DwTag> {
        self.node(die).map(|node| node.die.tag)
    }

    fn is_declaration(&self, die: DieHandle) -> bool {
        self.node(die).map_or(false, |node| node.die.declaration)
    }

    fn ranges(&self, die: DieHandle) -> Vec<(u64, u64)> {
        self.node(die)
            .map(|node| node.die.ranges.clone())
            .unwrap_or_default()
    }

    fn linkage_name(&self, die: DieHandle) -> Option<String> {
        self.node(die)?.die.name.clone()
    }

    fn call_site(&self, die: DieHandle) -> SourcePosition {
        self.node(die)
            .map(|node| node.die.call_site.clone())
            .unwrap_or_default()
    }

    fn source_position(&self, unit: UnitHandle, offset: u64) -> Option<SourcePosition> {
        self.unit(unit)?
            .lines
            .iter()
            .rev()
            .find(|(address, _)| *address <= offset)
            .map(|(_, position)| position.clone())
    }

    fn scopes(&self, unit: UnitHandle, offset: u64) -> Vec<DieHandle> {
        let nodes = match self.unit(unit) {
            Some(unit) => &unit.nodes,
            None => return Vec::new(),
        };

        // Pre-order walk; scopes that miss the offset are not descended into.
        let mut innermost: Option<(usize, usize)> = None;
        let mut pending = vec![(0usize, 0usize)];
        while let Some((index, depth)) = pending.pop() {
            let die = &nodes[index].die;
            if is_scope_tag(die.tag) {
                if !die
                    .ranges
                    .iter()
                    .any(|&(low, high)| low <= offset && offset < high)
                {
                    continue;
                }
                if innermost.map_or(true, |(_, best)| depth > best) {
                    innermost = Some((index, depth));
                }
            }
            for &child in nodes[index].children.iter().rev() {
                pending.push((child, depth + 1));
            }
        }

        let mut scopes = Vec::new();
        let mut current = innermost.map(|(index, _)| index);
        while let Some(offset) = current {
            scopes.push(DieHandle { unit, offset });
            current = nodes[offset].parent;
        }
        scopes
    }
}

#[cfg(test)]
mod tests {
    use super::{MockDie, MockSession};
    use crate::session::DebugSession;
    use gimli::{DW_TAG_inlined_subroutine, DW_TAG_lexical_block, DW_TAG_subprogram};

    #[test]
    fn it_hides_scopes_below_a_missed_scope() {
        let mut session = MockSession::new();
        let module = session.add_module("libfoo.so", 0, 0, 0x1000);
        let unit = session.add_unit(module, 0);
        let root = session.root(unit);
        let func = session.add_die(
            root,
            MockDie::new(DW_TAG_subprogram).with_ranges(&[(0x0, 0x100)]),
        );
        let block = session.add_die(func, MockDie::new(DW_TAG_lexical_block));
        session.add_die(
            block,
            MockDie::new(DW_TAG_inlined_subroutine).with_ranges(&[(0x0, 0x100)]),
        );
        let call = session.add_die(
            func,
            MockDie::new(DW_TAG_inlined_subroutine).with_ranges(&[(0x40, 0x80)]),
        );

        assert_eq!(session.scopes(unit, 0x10), vec![func, root]);
        assert_eq!(session.scopes(unit, 0x40), vec![call, func, root]);
        assert!(session.scopes(unit, 0x100).is_empty());
    }
}
