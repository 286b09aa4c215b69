//! The backing-store trait.

use donordb_core::{Donator, DonatorId, Province, ProvinceId};

use crate::batch::ChangeSet;
use crate::error::StoreResult;

/// Boundary between the engine and a backing relational store.
///
/// `persist` must be atomic: either the whole batch is applied or the
/// store is left untouched. Identity allocation is monotonic per entity
/// type; allocated values may be discarded by a failed commit.
pub trait Store {
    /// Load every donator row.
    fn load_donators(&self) -> StoreResult<Vec<Donator>>;

    /// Load every province row.
    fn load_provinces(&self) -> StoreResult<Vec<Province>>;

    /// Allocate the next donator identity.
    fn next_donator_id(&mut self) -> StoreResult<DonatorId>;

    /// Allocate the next province identity.
    fn next_province_id(&mut self) -> StoreResult<ProvinceId>;

    /// Apply a batch of staged rows atomically.
    fn persist(&mut self, batch: &ChangeSet) -> StoreResult<()>;
}
