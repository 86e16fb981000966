use crate::range::{AddressInterval, RangeSet};
use crate::session::{DebugSession, ModuleHandle, UnitHandle};
use log::debug;

/// Fallback unit lookup table for one module, built from the debug-info
/// tree itself.
#[derive(Debug, Clone, Default)]
pub struct ModuleRangeIndex {
    bounds: AddressInterval,
    sets: Vec<RangeSet>,
}

impl ModuleRangeIndex {
    pub fn build<S: DebugSession + ?Sized>(session: &S, module: ModuleHandle) -> Self {
        let mut index = ModuleRangeIndex::default();
        for (unit, bias) in session.compilation_units(module) {
            let set = RangeSet::build(session, unit, bias);
            if set.is_empty() {
                continue;
            }
            index.bounds.expand_to_cover(set.bounds());
            index.sets.push(set);
        }
        debug!(
            "built range index for {:?}: {} units covering {:#x}..{:#x}",
            module,
            index.sets.len(),
            index.bounds.low,
            index.bounds.high
        );
        index
    }

    /// Unit owning `addr`. Units are expected to be disjoint; should they
    /// overlap, the first one in enumeration order wins.
    pub fn find_unit(&self, addr: u64) -> Option<(UnitHandle, u64)> {
        if !self.bounds.contains(addr) {
            return None;
        }
        self.sets
            .iter()
            .find(|set| set.contains(addr))
            .map(|set| (set.unit(), set.bias()))
    }

    #[inline]
    pub fn bounds(&self) -> AddressInterval {
        self.bounds
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.sets.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}
