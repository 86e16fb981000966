use crate::range::AddressInterval;
use crate::session::{DebugSession, UnitHandle};

/// Code ranges of one compilation unit, gathered from its function and
/// inlined-call entries rather than from the module's range table.
#[derive(Debug, Clone)]
pub struct RangeSet {
    /// Bounding box of `ranges`; may span gaps.
    bounds: AddressInterval,
    ranges: Vec<AddressInterval>,
    unit: UnitHandle,
    bias: u64,
}

impl RangeSet {
    pub fn build<S: DebugSession + ?Sized>(session: &S, unit: UnitHandle, bias: u64) -> Self {
        let mut set = RangeSet {
            bounds: AddressInterval::default(),
            ranges: Vec::new(),
            unit,
            bias,
        };

        let root = match session.unit_die(unit) {
            Some(root) => root,
            None => return set,
        };

        // Functions may sit at any depth below namespaces, classes and
        // the like, so walk the whole tree except declaration subtrees.
        let mut pending = vec![root];
        while let Some(parent) = pending.pop() {
            for child in session.children(parent) {
                let tag = session.tag(child);
                if let Some(gimli::DW_TAG_subprogram | gimli::DW_TAG_inlined_subroutine) = tag {
                    for (low, high) in session.ranges(child) {
                        set.add(low, high);
                    }
                }
                if !session.is_declaration(child) {
                    pending.push(child);
                }
            }
        }
        set
    }

    fn add(&mut self, low: u64, high: u64) {
        let range = AddressInterval::new(
            low.wrapping_add(self.bias),
            high.wrapping_add(self.bias),
        );
        if range.low >= range.high {
            return;
        }
        self.bounds.expand_to_cover(range);
        self.ranges.push(range);
    }

    pub fn contains(&self, addr: u64) -> bool {
        self.bounds.contains(addr) && self.ranges.iter().any(|r| r.contains(addr))
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    #[inline]
    pub fn bounds(&self) -> AddressInterval {
        self.bounds
    }

    #[inline]
    pub fn ranges(&self) -> &[AddressInterval] {
        &self.ranges
    }

    #[inline]
    pub fn unit(&self) -> UnitHandle {
        self.unit
    }

    #[inline]
    pub fn bias(&self) -> u64 {
        self.bias
    }
}
