//! Fallback address-range index.
//!
//! Some producers emit no (or broken) `.debug_aranges`, which leaves the
//! direct address-to-unit lookup empty-handed. The types here rebuild that
//! mapping from the function and inlined-call entries of every unit.

mod cache;
mod index;
mod interval;
mod set;

pub use cache::RangeIndexCache;
pub use index::ModuleRangeIndex;
pub use interval::AddressInterval;
pub use set::RangeSet;
