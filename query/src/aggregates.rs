//! Terminal aggregates.
//!
//! Aggregates are eager: they materialize the pipeline immediately and
//! return a scalar, terminating composition.

use rust_decimal::Decimal;

use crate::error::QueryResult;
use crate::query::Query;

impl<T: 'static> Query<T> {
    /// Materialize and return the first element, if any.
    pub fn first(&self) -> QueryResult<Option<T>> {
        Ok(self.collect()?.into_iter().next())
    }

    /// Number of elements the pipeline yields.
    pub fn count(&self) -> QueryResult<usize> {
        Ok(self.collect()?.len())
    }

    /// Sum of the selected values. Zero-valued for an empty input.
    pub fn sum<V, S>(&self, selector: S) -> QueryResult<V>
    where
        V: std::iter::Sum<V>,
        S: Fn(&T) -> V,
    {
        Ok(self.collect()?.iter().map(selector).sum())
    }

    /// Minimum of the selected keys, `None` for an empty input.
    pub fn min<K, S>(&self, selector: S) -> QueryResult<Option<K>>
    where
        K: Ord,
        S: Fn(&T) -> K,
    {
        Ok(self.collect()?.iter().map(selector).min())
    }

    /// Maximum of the selected keys, `None` for an empty input.
    pub fn max<K, S>(&self, selector: S) -> QueryResult<Option<K>>
    where
        K: Ord,
        S: Fn(&T) -> K,
    {
        Ok(self.collect()?.iter().map(selector).max())
    }

    /// Arithmetic mean of the selected decimal values, `None` for an
    /// empty input.
    pub fn average<S>(&self, selector: S) -> QueryResult<Option<Decimal>>
    where
        S: Fn(&T) -> Decimal,
    {
        let items = self.collect()?;
        if items.is_empty() {
            return Ok(None);
        }
        let total: Decimal = items.iter().map(selector).sum();
        Ok(Some(total / Decimal::from(items.len() as u64)))
    }
}
