//! In-memory store.

use donordb_core::{Donator, DonatorId, EntityKind, Province, ProvinceId};
use indexmap::IndexMap;
use tracing::debug;

use crate::batch::ChangeSet;
use crate::error::{StoreError, StoreResult};
use crate::store::Store;

/// An in-memory store with id-ordered tables.
///
/// Rows are kept in insertion order, which for store-assigned identities
/// is ascending id order. `persist` validates the whole batch before
/// touching any row, so a rejected batch leaves the tables unchanged.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    donators: IndexMap<DonatorId, Donator>,
    provinces: IndexMap<ProvinceId, Province>,
    next_donator_id: u64,
    next_province_id: u64,
    fail_next_persist: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            donators: IndexMap::new(),
            provinces: IndexMap::new(),
            next_donator_id: 1,
            next_province_id: 1,
            fail_next_persist: false,
        }
    }

    /// Insert a province directly, assigning its identity. Seeding only.
    pub fn seed_province(&mut self, mut province: Province) -> ProvinceId {
        let id = ProvinceId::new(self.next_province_id);
        self.next_province_id += 1;
        province.id = Some(id);
        self.provinces.insert(id, province);
        id
    }

    /// Insert a donator directly, assigning its identity. Seeding only.
    pub fn seed_donator(&mut self, mut donator: Donator) -> DonatorId {
        let id = DonatorId::new(self.next_donator_id);
        self.next_donator_id += 1;
        donator.id = Some(id);
        self.donators.insert(id, donator);
        id
    }

    /// Make the next `persist` call fail with `Unavailable`. Test hook.
    pub fn fail_next_persist(&mut self) {
        self.fail_next_persist = true;
    }

    pub fn donator_count(&self) -> usize {
        self.donators.len()
    }

    pub fn province_count(&self) -> usize {
        self.provinces.len()
    }

    /// Validate a batch against the current tables without applying it.
    fn validate(&self, batch: &ChangeSet) -> StoreResult<()> {
        for province in &batch.added_provinces {
            let id = province
                .id
                .ok_or_else(|| StoreError::unavailable("added province carries no identity"))?;
            if self.provinces.contains_key(&id) {
                return Err(StoreError::identity_conflict(
                    EntityKind::Province,
                    id.value(),
                ));
            }
        }
        for donator in &batch.added_donators {
            let id = donator
                .id
                .ok_or_else(|| StoreError::unavailable("added donator carries no identity"))?;
            if self.donators.contains_key(&id) {
                return Err(StoreError::identity_conflict(
                    EntityKind::Donator,
                    id.value(),
                ));
            }
        }
        Ok(())
    }

    /// Apply a validated batch. Removals child-first, insertions parent-first.
    fn apply(&mut self, batch: &ChangeSet) {
        for id in &batch.removed_donators {
            self.donators.shift_remove(id);
        }
        for id in &batch.removed_provinces {
            self.provinces.shift_remove(id);
        }
        // `validate` already rejected identity-less added rows.
        for province in &batch.added_provinces {
            if let Some(id) = province.id {
                self.next_province_id = self.next_province_id.max(id.value() + 1);
                self.provinces.insert(id, province.clone());
            }
        }
        for donator in &batch.added_donators {
            if let Some(id) = donator.id {
                self.next_donator_id = self.next_donator_id.max(id.value() + 1);
                self.donators.insert(id, donator.clone());
            }
        }
        for province in &batch.modified_provinces {
            if let Some(id) = province.id {
                self.provinces.insert(id, province.clone());
            }
        }
        for donator in &batch.modified_donators {
            if let Some(id) = donator.id {
                self.donators.insert(id, donator.clone());
            }
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Store for MemoryStore {
    fn load_donators(&self) -> StoreResult<Vec<Donator>> {
        Ok(self.donators.values().cloned().collect())
    }

    fn load_provinces(&self) -> StoreResult<Vec<Province>> {
        Ok(self.provinces.values().cloned().collect())
    }

    fn next_donator_id(&mut self) -> StoreResult<DonatorId> {
        let id = DonatorId::new(self.next_donator_id);
        self.next_donator_id += 1;
        Ok(id)
    }

    fn next_province_id(&mut self) -> StoreResult<ProvinceId> {
        let id = ProvinceId::new(self.next_province_id);
        self.next_province_id += 1;
        Ok(id)
    }

    fn persist(&mut self, batch: &ChangeSet) -> StoreResult<()> {
        if self.fail_next_persist {
            self.fail_next_persist = false;
            return Err(StoreError::unavailable("injected persist failure"));
        }

        self.validate(batch)?;
        self.apply(batch);
        debug!(staged = batch.total_staged(), "persisted batch");
        Ok(())
    }
}
