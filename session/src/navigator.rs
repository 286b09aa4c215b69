//! Relationship navigation against a unit of work's live view.

use std::cell::RefCell;
use std::rc::Rc;

use donordb_core::{Donator, Province, ProvinceId};
use donordb_mutation::MutationCoordinator;
use donordb_query::QueryResult;
use donordb_store::Store;

use crate::session::{ensure_donators_loaded, ensure_provinces_loaded};

/// Resolves the donator-province relationship from inside a query
/// pipeline.
///
/// Both directions are derived from `Donator::province_id` against the
/// unit of work's visible view, so staged adds and removals are
/// reflected immediately. Cloneable so it can be moved into `navigate`
/// and `navigate_many` selectors.
pub struct Navigator<S> {
    store: Rc<RefCell<S>>,
    state: Rc<RefCell<MutationCoordinator>>,
}

impl<S> Clone for Navigator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Rc::clone(&self.store),
            state: Rc::clone(&self.state),
        }
    }
}

impl<S: Store> Navigator<S> {
    pub(crate) fn new(store: Rc<RefCell<S>>, state: Rc<RefCell<MutationCoordinator>>) -> Self {
        Self { store, state }
    }

    /// Visible donators referencing the given province, in view order.
    pub fn donators_of(&self, province: ProvinceId) -> QueryResult<Vec<Donator>> {
        ensure_donators_loaded(&self.store, &self.state)?;
        let state = self.state.borrow();
        Ok(state
            .donators
            .visible()
            .filter(|donator| donator.province_id == Some(province))
            .cloned()
            .collect())
    }

    /// The province a donator references, if any is assigned and visible.
    pub fn province_of(&self, donator: &Donator) -> QueryResult<Option<Province>> {
        ensure_provinces_loaded(&self.store, &self.state)?;
        let state = self.state.borrow();
        Ok(donator
            .province_id
            .and_then(|id| state.provinces.get(id).cloned()))
    }
}
