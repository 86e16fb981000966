use crate::range::ModuleRangeIndex;
use crate::session::{DebugSession, ModuleHandle, UnitHandle};
use std::collections::HashMap;

/// Per-module fallback indexes, built on the first miss of the direct
/// unit lookup and reused afterwards.
#[derive(Debug, Default)]
pub struct RangeIndexCache {
    indexes: HashMap<ModuleHandle, ModuleRangeIndex>,
}

impl RangeIndexCache {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn resolve<S: DebugSession + ?Sized>(
        &mut self,
        session: &S,
        module: ModuleHandle,
        addr: u64,
    ) -> Option<(UnitHandle, u64)> {
        self.indexes
            .entry(module)
            .or_insert_with(|| ModuleRangeIndex::build(session, module))
            .find_unit(addr)
    }

    /// Drops the indexes of every module `keep` rejects.
    pub fn retain<F: FnMut(ModuleHandle) -> bool>(&mut self, mut keep: F) {
        self.indexes.retain(|module, _| keep(*module));
    }

    pub fn contains(&self, module: ModuleHandle) -> bool {
        self.indexes.contains_key(&module)
    }

    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}
