//! Per-entity-type change tracking.

use std::hash::Hash;

use donordb_core::{DonatorId, EntityKind, ProvinceId};
use indexmap::IndexMap;

use crate::error::{MutationError, MutationResult};
use crate::state::EntityState;

/// Identity types a tracker can be keyed by.
pub trait TrackedId: Copy + Eq + Hash {
    /// Entity kind carried into error messages.
    const KIND: EntityKind;

    /// Raw identity value.
    fn raw(self) -> u64;
}

impl TrackedId for DonatorId {
    const KIND: EntityKind = EntityKind::Donator;

    fn raw(self) -> u64 {
        self.value()
    }
}

impl TrackedId for ProvinceId {
    const KIND: EntityKind = EntityKind::Province;

    fn raw(self) -> u64 {
        self.value()
    }
}

/// Tracking key: persisted rows are keyed by their store identity,
/// staged inserts by a unit-of-work-local pending counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKey<Id> {
    Persisted(Id),
    Pending(u64),
}

/// A tracked entity with its state.
#[derive(Debug, Clone)]
pub struct Entry<T> {
    pub state: EntityState,
    pub value: T,
}

/// Identity map plus state machine for one entity type.
///
/// Entries keep insertion order, so the visible view of loaded rows
/// follows store order with staged inserts at the end.
#[derive(Debug)]
pub struct ChangeTracker<Id, T> {
    entries: IndexMap<TrackKey<Id>, Entry<T>>,
    next_pending: u64,
    loaded: bool,
}

impl<Id: TrackedId, T: Clone> ChangeTracker<Id, T> {
    pub fn new() -> Self {
        Self {
            entries: IndexMap::new(),
            next_pending: 1,
            loaded: false,
        }
    }

    /// Whether the backing table has been loaded into this tracker.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn mark_loaded(&mut self) {
        self.loaded = true;
    }

    /// Attach a row loaded from the store as `Unchanged`.
    ///
    /// Identity-map semantics: if the id is already tracked the local
    /// entry wins and the loaded row is ignored.
    pub fn attach_loaded(&mut self, id: Id, value: T) {
        self.entries
            .entry(TrackKey::Persisted(id))
            .or_insert(Entry {
                state: EntityState::Unchanged,
                value,
            });
    }

    /// Stage an entity for insertion under a fresh pending key.
    pub fn stage_add(&mut self, value: T) -> TrackKey<Id> {
        let key = TrackKey::Pending(self.next_pending);
        self.next_pending += 1;
        self.entries.insert(
            key,
            Entry {
                state: EntityState::Added,
                value,
            },
        );
        key
    }

    /// Stage new field values for an attached entity.
    pub fn stage_update(&mut self, id: Id, value: T) -> MutationResult<()> {
        self.stage_update_at(TrackKey::Persisted(id), value)
    }

    /// Stage new field values for an entry addressed by key.
    ///
    /// Staged inserts stay `Added` with the new values; loaded entries
    /// move to `Modified`.
    pub fn stage_update_at(&mut self, key: TrackKey<Id>, value: T) -> MutationResult<()> {
        let entry = self.entries.get_mut(&key).ok_or_else(|| {
            let id = match key {
                TrackKey::Persisted(id) => Some(id.raw()),
                TrackKey::Pending(_) => None,
            };
            MutationError::not_attached(Id::KIND, id)
        })?;

        match entry.state {
            EntityState::Added => {
                entry.value = value;
                Ok(())
            }
            EntityState::Unchanged | EntityState::Modified => {
                entry.state = EntityState::Modified;
                entry.value = value;
                Ok(())
            }
            EntityState::Deleted => Err(MutationError::invalid_transition("update", entry.state)),
        }
    }

    /// Stage removal of an attached entity.
    ///
    /// Returns `false` when the entity was already `Deleted` (no-op).
    pub fn stage_remove(&mut self, id: Id) -> MutationResult<bool> {
        let entry = self
            .entries
            .get_mut(&TrackKey::Persisted(id))
            .ok_or_else(|| MutationError::not_attached(Id::KIND, Some(id.raw())))?;

        match entry.state {
            EntityState::Deleted => Ok(false),
            _ => {
                entry.state = EntityState::Deleted;
                Ok(true)
            }
        }
    }

    /// Drop a staged insert from tracking entirely.
    pub fn unstage(&mut self, key: TrackKey<Id>) {
        self.entries.shift_remove(&key);
    }

    pub fn contains(&self, key: TrackKey<Id>) -> bool {
        self.entries.contains_key(&key)
    }

    /// Current value of a tracked, non-deleted entity.
    pub fn get(&self, id: Id) -> Option<&T> {
        self.entries
            .get(&TrackKey::Persisted(id))
            .filter(|entry| entry.state.is_visible())
            .map(|entry| &entry.value)
    }

    /// Tracked state of an entity, if tracked at all.
    pub fn state_of(&self, id: Id) -> Option<EntityState> {
        self.state_at(TrackKey::Persisted(id))
    }

    /// Tracked state of an entry addressed by key.
    pub fn state_at(&self, key: TrackKey<Id>) -> Option<EntityState> {
        self.entries.get(&key).map(|entry| entry.state)
    }

    /// Iterate all entries, including deleted ones.
    pub fn iter(&self) -> impl Iterator<Item = (&TrackKey<Id>, &Entry<T>)> {
        self.entries.iter()
    }

    /// Current values of every non-deleted entry. This is the live view
    /// the materializer consumes.
    pub fn visible(&self) -> impl Iterator<Item = &T> {
        self.entries
            .values()
            .filter(|entry| entry.state.is_visible())
            .map(|entry| &entry.value)
    }

    /// Re-key a committed insert under its store identity, `Unchanged`.
    pub fn promote(&mut self, key: TrackKey<Id>, id: Id, value: T) {
        self.entries.shift_remove(&key);
        self.entries.insert(
            TrackKey::Persisted(id),
            Entry {
                state: EntityState::Unchanged,
                value,
            },
        );
    }

    /// Post-commit settlement: `Modified` entries become `Unchanged`,
    /// `Deleted` entries leave tracking.
    pub fn settle(&mut self) {
        self.entries
            .retain(|_, entry| entry.state != EntityState::Deleted);
        for entry in self.entries.values_mut() {
            if entry.state == EntityState::Modified {
                entry.state = EntityState::Unchanged;
            }
        }
    }
}

impl<Id: TrackedId, T: Clone> Default for ChangeTracker<Id, T> {
    fn default() -> Self {
        Self::new()
    }
}
