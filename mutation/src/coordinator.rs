//! Coordinates staged mutations across both entity types.

use donordb_core::{Donator, DonatorId, EntityKind, Province, ProvinceId};
use donordb_store::{ChangeSet, Store};
use tracing::debug;

use crate::error::{MutationError, MutationResult};
use crate::state::EntityState;
use crate::tracker::{ChangeTracker, TrackKey};

/// A commit prepared against the store but not yet acknowledged.
///
/// Holds the batch handed to `Store::persist` plus the identity
/// assignments needed to re-key staged inserts once persistence
/// succeeds. Building it mutates nothing in the trackers, so a failed
/// persist leaves every staged change intact and retryable.
#[derive(Debug)]
pub struct PreparedCommit {
    pub changeset: ChangeSet,
    pub assigned_provinces: Vec<(TrackKey<ProvinceId>, ProvinceId, Province)>,
    pub assigned_donators: Vec<(TrackKey<DonatorId>, DonatorId, Donator)>,
}

/// The cascade mutation coordinator.
///
/// Owns one change tracker per entity type plus the cross-entity
/// bookkeeping neither tracker can do alone: parent-child links for
/// donators added under a not-yet-persisted province, and cascading
/// province deletion.
#[derive(Debug)]
pub struct MutationCoordinator {
    pub donators: ChangeTracker<DonatorId, Donator>,
    pub provinces: ChangeTracker<ProvinceId, Province>,
    pending_links: Vec<(TrackKey<DonatorId>, TrackKey<ProvinceId>)>,
    cascade_delete: bool,
}

impl MutationCoordinator {
    pub fn new() -> Self {
        Self {
            donators: ChangeTracker::new(),
            provinces: ChangeTracker::new(),
            pending_links: Vec::new(),
            cascade_delete: true,
        }
    }

    pub fn cascade_delete(&self) -> bool {
        self.cascade_delete
    }

    pub fn set_cascade_delete(&mut self, enabled: bool) {
        self.cascade_delete = enabled;
    }

    /// Stage a donator for insertion.
    pub fn add_donator(&mut self, donator: Donator) -> TrackKey<DonatorId> {
        self.donators.stage_add(donator)
    }

    /// Stage a province for insertion.
    pub fn add_province(&mut self, province: Province) -> TrackKey<ProvinceId> {
        self.provinces.stage_add(province)
    }

    /// Stage a donator for insertion under a tracked province.
    ///
    /// A persisted parent already has an identity, so the reference is
    /// written immediately. A staged parent has none yet; the link is
    /// recorded and resolved when the commit assigns identities. A
    /// parent staged for removal rejects the add, as committing it
    /// would orphan the donator.
    pub fn add_donator_to(
        &mut self,
        mut donator: Donator,
        parent: TrackKey<ProvinceId>,
    ) -> MutationResult<TrackKey<DonatorId>> {
        match self.provinces.state_at(parent) {
            None => {
                let id = match parent {
                    TrackKey::Persisted(id) => Some(id.value()),
                    TrackKey::Pending(_) => None,
                };
                return Err(MutationError::not_attached(EntityKind::Province, id));
            }
            Some(EntityState::Deleted) => {
                return Err(MutationError::invalid_transition(
                    "attach a donator to",
                    EntityState::Deleted,
                ));
            }
            Some(_) => {}
        }

        match parent {
            TrackKey::Persisted(id) => {
                donator.province_id = Some(id);
                Ok(self.donators.stage_add(donator))
            }
            TrackKey::Pending(_) => {
                let key = self.donators.stage_add(donator);
                self.pending_links.push((key, parent));
                Ok(key)
            }
        }
    }

    /// Stage new field values for an attached donator.
    pub fn update_donator(&mut self, donator: Donator) -> MutationResult<()> {
        let id = donator
            .id
            .ok_or_else(|| MutationError::not_attached(EntityKind::Donator, None))?;
        self.donators.stage_update(id, donator)
    }

    /// Stage new field values for an attached province.
    pub fn update_province(&mut self, province: Province) -> MutationResult<()> {
        let id = province
            .id
            .ok_or_else(|| MutationError::not_attached(EntityKind::Province, None))?;
        self.provinces.stage_update(id, province)
    }

    /// Stage new field values for a donator addressed by key. This is
    /// the update path for staged inserts, which carry no identity yet.
    pub fn update_donator_at(
        &mut self,
        key: TrackKey<DonatorId>,
        donator: Donator,
    ) -> MutationResult<()> {
        self.donators.stage_update_at(key, donator)
    }

    /// Stage new field values for a province addressed by key.
    pub fn update_province_at(
        &mut self,
        key: TrackKey<ProvinceId>,
        province: Province,
    ) -> MutationResult<()> {
        self.provinces.stage_update_at(key, province)
    }

    /// Stage removal of a donator.
    pub fn remove_donator(&mut self, id: DonatorId) -> MutationResult<bool> {
        self.donators.stage_remove(id)
    }

    /// Stage removal of a province, cascading over its donators.
    ///
    /// With cascade enabled, every visible child is staged for removal
    /// too; staged-insert children are simply unstaged. With cascade
    /// disabled and live children present, nothing is staged and a
    /// constraint violation is returned.
    pub fn remove_province(&mut self, id: ProvinceId) -> MutationResult<()> {
        if self.provinces.state_of(id).is_none() {
            return Err(MutationError::not_attached(
                EntityKind::Province,
                Some(id.value()),
            ));
        }

        let children: Vec<TrackKey<DonatorId>> = self
            .donators
            .iter()
            .filter(|(_, entry)| {
                entry.state.is_visible() && entry.value.province_id == Some(id)
            })
            .map(|(key, _)| *key)
            .collect();

        if !self.cascade_delete && !children.is_empty() {
            return Err(MutationError::constraint_violation(id, children.len()));
        }

        debug!(province = %id, children = children.len(), "cascading province removal");

        for child in children {
            match child {
                TrackKey::Persisted(child_id) => {
                    self.donators.stage_remove(child_id)?;
                }
                TrackKey::Pending(_) => {
                    self.donators.unstage(child);
                    self.pending_links.retain(|(key, _)| *key != child);
                }
            }
        }
        self.provinces.stage_remove(id)?;
        Ok(())
    }

    /// Build the commit batch and assign identities to staged inserts.
    ///
    /// Provinces are assigned first so pending parent links can be
    /// resolved for donators in the same batch. The trackers are not
    /// touched; `apply_commit` does that after the store accepts the
    /// batch.
    pub fn prepare_commit(&self, store: &mut dyn Store) -> MutationResult<PreparedCommit> {
        let mut changeset = ChangeSet::new();
        let mut assigned_provinces = Vec::new();
        let mut assigned_donators = Vec::new();

        for (key, entry) in self.provinces.iter() {
            match entry.state {
                EntityState::Added => {
                    let id = store.next_province_id()?;
                    let mut province = entry.value.clone();
                    province.id = Some(id);
                    changeset.added_provinces.push(province.clone());
                    assigned_provinces.push((*key, id, province));
                }
                EntityState::Modified => {
                    changeset.modified_provinces.push(entry.value.clone());
                }
                EntityState::Deleted => {
                    if let TrackKey::Persisted(id) = key {
                        changeset.removed_provinces.push(*id);
                    }
                }
                EntityState::Unchanged => {}
            }
        }

        for (key, entry) in self.donators.iter() {
            match entry.state {
                EntityState::Added => {
                    let mut donator = entry.value.clone();
                    if let Some((_, parent)) =
                        self.pending_links.iter().find(|(child, _)| child == key)
                    {
                        let resolved = assigned_provinces
                            .iter()
                            .find(|(province_key, _, _)| province_key == parent)
                            .map(|(_, id, _)| *id)
                            .ok_or_else(|| {
                                MutationError::not_attached(EntityKind::Province, None)
                            })?;
                        donator.province_id = Some(resolved);
                    }
                    let id = store.next_donator_id()?;
                    donator.id = Some(id);
                    changeset.added_donators.push(donator.clone());
                    assigned_donators.push((*key, id, donator));
                }
                EntityState::Modified => {
                    changeset.modified_donators.push(entry.value.clone());
                }
                EntityState::Deleted => {
                    if let TrackKey::Persisted(id) = key {
                        changeset.removed_donators.push(*id);
                    }
                }
                EntityState::Unchanged => {}
            }
        }

        debug!(staged = changeset.total_staged(), "prepared commit batch");
        Ok(PreparedCommit {
            changeset,
            assigned_provinces,
            assigned_donators,
        })
    }

    /// Settle tracked state after the store accepted the batch.
    pub fn apply_commit(&mut self, prepared: PreparedCommit) {
        for (key, id, province) in prepared.assigned_provinces {
            self.provinces.promote(key, id, province);
        }
        for (key, id, donator) in prepared.assigned_donators {
            self.donators.promote(key, id, donator);
        }
        self.provinces.settle();
        self.donators.settle();
        self.pending_links.clear();
    }
}

impl Default for MutationCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use donordb_store::MemoryStore;
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn donator(name: &str, amount: i64) -> Donator {
        Donator::new(name, Decimal::from(amount), date(2016, 5, 30))
    }

    fn coordinator_with_persisted_province() -> (MutationCoordinator, ProvinceId) {
        let mut coordinator = MutationCoordinator::new();
        let id = ProvinceId::new(1);
        coordinator.provinces.attach_loaded(
            id,
            Province {
                id: Some(id),
                name: "Shandong".into(),
            },
        );
        (coordinator, id)
    }

    #[test]
    fn test_add_donator_to_persisted_parent_sets_reference() {
        // GIVEN a loaded province
        let (mut coordinator, id) = coordinator_with_persisted_province();

        // WHEN a donator is added under it
        coordinator
            .add_donator_to(donator("Alice", 50), TrackKey::Persisted(id))
            .unwrap();

        // THEN the reference is written immediately
        let staged: Vec<_> = coordinator.donators.visible().collect();
        assert_eq!(staged[0].province_id, Some(id));
    }

    #[test]
    fn test_add_donator_to_untracked_parent_fails() {
        let mut coordinator = MutationCoordinator::new();

        let result = coordinator.add_donator_to(
            donator("Alice", 50),
            TrackKey::Persisted(ProvinceId::new(9)),
        );

        assert!(matches!(result, Err(MutationError::NotAttached { .. })));
    }

    #[test]
    fn test_add_donator_to_removed_province_is_rejected() {
        // GIVEN a province staged for removal
        let (mut coordinator, id) = coordinator_with_persisted_province();
        coordinator.remove_province(id).unwrap();

        // WHEN a donator is added under it
        let result = coordinator.add_donator_to(donator("Alice", 50), TrackKey::Persisted(id));

        // THEN the add is rejected and nothing is staged
        assert!(matches!(
            result,
            Err(MutationError::InvalidStateTransition {
                state: EntityState::Deleted,
                ..
            })
        ));
        assert_eq!(coordinator.donators.visible().count(), 0);
    }

    #[test]
    fn test_staged_insert_can_be_amended_before_commit() {
        // GIVEN a staged donator
        let mut coordinator = MutationCoordinator::new();
        let key = coordinator.add_donator(donator("Alice", 50));

        // WHEN its values are amended through the key
        coordinator
            .update_donator_at(key, donator("Alice", 75))
            .unwrap();

        // THEN the commit batch carries the amended values as one insert
        let mut store = MemoryStore::new();
        let prepared = coordinator.prepare_commit(&mut store).unwrap();
        assert_eq!(prepared.changeset.added_donators.len(), 1);
        assert_eq!(
            prepared.changeset.added_donators[0].amount,
            Decimal::from(75)
        );
        assert!(prepared.changeset.modified_donators.is_empty());
    }

    #[test]
    fn test_pending_parent_resolved_at_prepare() {
        // GIVEN a donator linked to a staged province
        let mut coordinator = MutationCoordinator::new();
        let parent = coordinator.add_province(Province::new("Zhejiang"));
        coordinator
            .add_donator_to(donator("Alice", 50), parent)
            .unwrap();

        // WHEN the commit is prepared
        let mut store = MemoryStore::new();
        let prepared = coordinator.prepare_commit(&mut store).unwrap();

        // THEN the donator references the assigned province identity
        let province_id = prepared.changeset.added_provinces[0].id.unwrap();
        assert_eq!(
            prepared.changeset.added_donators[0].province_id,
            Some(province_id)
        );
    }

    #[test]
    fn test_cascade_removes_children() {
        // GIVEN a province with a persisted child and a staged child
        let (mut coordinator, id) = coordinator_with_persisted_province();
        let child_id = DonatorId::new(7);
        let mut persisted_child = donator("Alice", 50);
        persisted_child.id = Some(child_id);
        persisted_child.province_id = Some(id);
        coordinator.donators.attach_loaded(child_id, persisted_child);
        coordinator
            .add_donator_to(donator("Bob", 30), TrackKey::Persisted(id))
            .unwrap();

        // WHEN the province is removed
        coordinator.remove_province(id).unwrap();

        // THEN no donator remains visible and the batch removes both rows
        assert_eq!(coordinator.donators.visible().count(), 0);
        let mut store = MemoryStore::new();
        let prepared = coordinator.prepare_commit(&mut store).unwrap();
        assert_eq!(prepared.changeset.removed_donators, vec![child_id]);
        assert_eq!(prepared.changeset.removed_provinces, vec![id]);
        assert!(prepared.changeset.added_donators.is_empty());
    }

    #[test]
    fn test_cascade_disabled_rejects_and_stages_nothing() {
        // GIVEN cascade disabled and a province with a child
        let (mut coordinator, id) = coordinator_with_persisted_province();
        coordinator.set_cascade_delete(false);
        coordinator
            .add_donator_to(donator("Alice", 50), TrackKey::Persisted(id))
            .unwrap();

        // WHEN
        let result = coordinator.remove_province(id);

        // THEN the violation names the child count and nothing changed
        assert!(matches!(
            result,
            Err(MutationError::ConstraintViolation { children: 1, .. })
        ));
        assert_eq!(coordinator.provinces.state_of(id), Some(EntityState::Unchanged));
        assert_eq!(coordinator.donators.visible().count(), 1);
    }

    #[test]
    fn test_update_detached_donator_fails() {
        let mut coordinator = MutationCoordinator::new();

        let result = coordinator.update_donator(donator("Alice", 50));

        assert!(matches!(result, Err(MutationError::NotAttached { .. })));
    }

    #[test]
    fn test_prepare_leaves_trackers_untouched() {
        // GIVEN a staged insert
        let mut coordinator = MutationCoordinator::new();
        let key = coordinator.add_province(Province::new("Zhejiang"));

        // WHEN the commit is prepared but never applied
        let mut store = MemoryStore::new();
        let _prepared = coordinator.prepare_commit(&mut store).unwrap();

        // THEN the insert is still staged under its pending key
        assert!(coordinator.provinces.contains(key));
        let staged: Vec<_> = coordinator.provinces.visible().collect();
        assert_eq!(staged[0].id, None);
    }

    #[test]
    fn test_apply_commit_promotes_and_settles() {
        // GIVEN a prepared commit covering an insert and an update
        let (mut coordinator, id) = coordinator_with_persisted_province();
        coordinator
            .update_province(Province {
                id: Some(id),
                name: "Shandong East".into(),
            })
            .unwrap();
        let key = coordinator.add_province(Province::new("Zhejiang"));
        let mut store = MemoryStore::new();
        let prepared = coordinator.prepare_commit(&mut store).unwrap();
        let new_id = prepared.assigned_provinces[0].1;

        // WHEN
        coordinator.apply_commit(prepared);

        // THEN everything tracked is unchanged under its identity
        assert!(!coordinator.provinces.contains(key));
        assert_eq!(
            coordinator.provinces.state_of(new_id),
            Some(EntityState::Unchanged)
        );
        assert_eq!(coordinator.provinces.state_of(id), Some(EntityState::Unchanged));
    }
}
