/// Half-open address range `[low, high)`.
///
/// Zero is the unset sentinel on both ends, so a default interval is empty
/// and never contributes to a bounding box.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AddressInterval {
    pub low: u64,
    pub high: u64,
}

impl AddressInterval {
    pub fn new(low: u64, high: u64) -> Self {
        AddressInterval { low, high }
    }

    #[inline]
    pub fn contains(&self, addr: u64) -> bool {
        self.low <= addr && addr < self.high
    }

    #[inline]
    pub fn is_unset(&self) -> bool {
        self.low == 0 && self.high == 0
    }

    /// Grows `self` so that it also covers `other`, ignoring zero bounds.
    pub fn expand_to_cover(&mut self, other: AddressInterval) {
        if other.low != 0 && (self.low == 0 || self.low > other.low) {
            self.low = other.low;
        }
        if other.high != 0 && (self.high == 0 || self.high < other.high) {
            self.high = other.high;
        }
    }
}
