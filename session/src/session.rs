//! The database handle and its units of work.

use std::cell::RefCell;
use std::rc::Rc;

use donordb_core::{Donator, DonatorId, Province, ProvinceId};
use donordb_mutation::{MutationCoordinator, TrackKey};
use donordb_query::{Query, QueryResult};
use donordb_store::Store;
use tracing::debug;

use crate::error::SessionResult;
use crate::navigator::Navigator;
use crate::result::CommitSummary;

/// Handle over a backing store from which units of work are opened.
///
/// Units of work opened on the same database share the store; each one
/// carries independent change tracking.
pub struct Database<S> {
    store: Rc<RefCell<S>>,
}

impl<S: Store + 'static> Database<S> {
    pub fn new(store: S) -> Self {
        Self {
            store: Rc::new(RefCell::new(store)),
        }
    }

    /// Open a unit of work with empty tracking and unloaded tables.
    pub fn open_unit_of_work(&self) -> UnitOfWork<S> {
        UnitOfWork {
            store: Rc::clone(&self.store),
            state: Rc::new(RefCell::new(MutationCoordinator::new())),
        }
    }
}

/// One unit of work: queries see the live tracked view, mutations stage
/// against it, and `commit` persists the whole batch atomically.
///
/// Tables load lazily; the first query or find against an entity type
/// pulls its rows from the store into tracking. Queries produced here
/// hold the unit of work's state, so they re-read the tracked view on
/// every materialization.
pub struct UnitOfWork<S> {
    store: Rc<RefCell<S>>,
    state: Rc<RefCell<MutationCoordinator>>,
}

impl<S: Store + 'static> UnitOfWork<S> {
    /// All visible donators as a query source.
    pub fn donators(&self) -> Query<Donator> {
        let store = Rc::clone(&self.store);
        let state = Rc::clone(&self.state);
        Query::from_producer(move || {
            ensure_donators_loaded(&store, &state)?;
            let state = state.borrow();
            Ok(state.donators.visible().cloned().collect())
        })
    }

    /// All visible provinces as a query source.
    pub fn provinces(&self) -> Query<Province> {
        let store = Rc::clone(&self.store);
        let state = Rc::clone(&self.state);
        Query::from_producer(move || {
            ensure_provinces_loaded(&store, &state)?;
            let state = state.borrow();
            Ok(state.provinces.visible().cloned().collect())
        })
    }

    /// A navigator over this unit of work's view, for use in pipelines.
    pub fn navigator(&self) -> Navigator<S> {
        Navigator::new(Rc::clone(&self.store), Rc::clone(&self.state))
    }

    /// Load and track a donator by identity.
    pub fn find_donator(&self, id: DonatorId) -> SessionResult<Option<Donator>> {
        ensure_donators_loaded(&self.store, &self.state)?;
        Ok(self.state.borrow().donators.get(id).cloned())
    }

    /// Load and track a province by identity.
    pub fn find_province(&self, id: ProvinceId) -> SessionResult<Option<Province>> {
        ensure_provinces_loaded(&self.store, &self.state)?;
        Ok(self.state.borrow().provinces.get(id).cloned())
    }

    /// Stage a donator for insertion.
    pub fn add_donator(&self, donator: Donator) -> TrackKey<DonatorId> {
        self.state.borrow_mut().add_donator(donator)
    }

    /// Stage a province for insertion.
    pub fn add_province(&self, province: Province) -> TrackKey<ProvinceId> {
        self.state.borrow_mut().add_province(province)
    }

    /// Stage a donator for insertion under a tracked province.
    pub fn add_donator_to(
        &self,
        donator: Donator,
        parent: TrackKey<ProvinceId>,
    ) -> SessionResult<TrackKey<DonatorId>> {
        Ok(self.state.borrow_mut().add_donator_to(donator, parent)?)
    }

    /// Stage new field values for a donator tracked by this unit of work.
    pub fn update_donator(&self, donator: Donator) -> SessionResult<()> {
        Ok(self.state.borrow_mut().update_donator(donator)?)
    }

    /// Stage new field values for a province tracked by this unit of work.
    pub fn update_province(&self, province: Province) -> SessionResult<()> {
        Ok(self.state.borrow_mut().update_province(province)?)
    }

    /// Stage new field values for a donator addressed by its tracking
    /// key, including staged inserts that carry no identity yet.
    pub fn update_donator_at(
        &self,
        key: TrackKey<DonatorId>,
        donator: Donator,
    ) -> SessionResult<()> {
        Ok(self.state.borrow_mut().update_donator_at(key, donator)?)
    }

    /// Stage new field values for a province addressed by its tracking key.
    pub fn update_province_at(
        &self,
        key: TrackKey<ProvinceId>,
        province: Province,
    ) -> SessionResult<()> {
        Ok(self.state.borrow_mut().update_province_at(key, province)?)
    }

    /// Stage removal of a donator, loading the table if needed.
    ///
    /// Returns `false` when the donator was already staged for removal.
    pub fn remove_donator(&self, id: DonatorId) -> SessionResult<bool> {
        ensure_donators_loaded(&self.store, &self.state)?;
        Ok(self.state.borrow_mut().remove_donator(id)?)
    }

    /// Stage removal of a province and, with cascade enabled, of every
    /// donator referencing it. Both tables load first so the cascade
    /// sees all children.
    pub fn remove_province(&self, id: ProvinceId) -> SessionResult<()> {
        ensure_provinces_loaded(&self.store, &self.state)?;
        ensure_donators_loaded(&self.store, &self.state)?;
        Ok(self.state.borrow_mut().remove_province(id)?)
    }

    pub fn cascade_delete(&self) -> bool {
        self.state.borrow().cascade_delete()
    }

    pub fn set_cascade_delete(&self, enabled: bool) {
        self.state.borrow_mut().set_cascade_delete(enabled);
    }

    /// Persist every staged change as one atomic batch.
    ///
    /// On success the tracked state settles: inserts take their assigned
    /// identities, updates become unchanged, removals leave tracking. On
    /// failure nothing settles and the commit can be retried.
    pub fn commit(&self) -> SessionResult<CommitSummary> {
        let prepared = {
            let state = self.state.borrow();
            let mut store = self.store.borrow_mut();
            state.prepare_commit(&mut *store)?
        };
        let summary = CommitSummary::from_changeset(&prepared.changeset);
        self.store.borrow_mut().persist(&prepared.changeset)?;
        self.state.borrow_mut().apply_commit(prepared);
        debug!(rows = summary.total(), "commit applied");
        Ok(summary)
    }

    /// Drop the unit of work, abandoning every staged change.
    pub fn discard(self) {}
}

pub(crate) fn ensure_donators_loaded<S: Store>(
    store: &Rc<RefCell<S>>,
    state: &Rc<RefCell<MutationCoordinator>>,
) -> QueryResult<()> {
    if state.borrow().donators.is_loaded() {
        return Ok(());
    }
    let rows = store.borrow().load_donators()?;
    let mut state = state.borrow_mut();
    for row in rows {
        if let Some(id) = row.id {
            state.donators.attach_loaded(id, row);
        }
    }
    state.donators.mark_loaded();
    Ok(())
}

pub(crate) fn ensure_provinces_loaded<S: Store>(
    store: &Rc<RefCell<S>>,
    state: &Rc<RefCell<MutationCoordinator>>,
) -> QueryResult<()> {
    if state.borrow().provinces.is_loaded() {
        return Ok(());
    }
    let rows = store.borrow().load_provinces()?;
    let mut state = state.borrow_mut();
    for row in rows {
        if let Some(id) = row.id {
            state.provinces.attach_loaded(id, row);
        }
    }
    state.provinces.mark_loaded();
    Ok(())
}
