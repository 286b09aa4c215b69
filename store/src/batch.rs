//! Change batches handed to `Store::persist`.

use donordb_core::{Donator, DonatorId, Province, ProvinceId};

/// A batch of staged rows to be applied atomically.
///
/// Added rows carry identities already assigned by the mutation
/// coordinator. The store applies removals child-first (donators before
/// provinces) and insertions parent-first (provinces before donators).
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub added_provinces: Vec<Province>,
    pub added_donators: Vec<Donator>,
    pub modified_provinces: Vec<Province>,
    pub modified_donators: Vec<Donator>,
    pub removed_donators: Vec<DonatorId>,
    pub removed_provinces: Vec<ProvinceId>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the batch stages no work at all.
    pub fn is_empty(&self) -> bool {
        self.added_provinces.is_empty()
            && self.added_donators.is_empty()
            && self.modified_provinces.is_empty()
            && self.modified_donators.is_empty()
            && self.removed_donators.is_empty()
            && self.removed_provinces.is_empty()
    }

    /// Total number of staged row operations.
    pub fn total_staged(&self) -> usize {
        self.added_provinces.len()
            + self.added_donators.len()
            + self.modified_provinces.len()
            + self.modified_donators.len()
            + self.removed_donators.len()
            + self.removed_provinces.len()
    }
}
