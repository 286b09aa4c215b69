//! The deferred query pipeline.

use std::hash::Hash;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::QueryResult;

/// Sort direction for `order_by`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// One partition produced by `group_by`.
///
/// Elements keep their source order; groups are emitted in
/// first-occurrence order of their keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Group<K, T> {
    pub key: K,
    pub elements: Vec<T>,
}

/// A deferred sequence-transformation pipeline over an entity source.
///
/// Each combinator wraps the previous stage's producer in a new closure,
/// so the builder stays a pure description until materialized. `Query`
/// is cheaply cloneable: a pipeline prefix can be reused and extended in
/// several directions.
pub struct Query<T> {
    producer: Rc<dyn Fn() -> QueryResult<Vec<T>>>,
}

impl<T> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            producer: Rc::clone(&self.producer),
        }
    }
}

impl<T: 'static> Query<T> {
    /// Create a query over a producer that yields the source's live view.
    ///
    /// The producer runs once per materialization; it is the point where
    /// deferred loading and staged-change visibility happen.
    pub fn from_producer<F>(producer: F) -> Self
    where
        F: Fn() -> QueryResult<Vec<T>> + 'static,
    {
        Self {
            producer: Rc::new(producer),
        }
    }

    /// Create a query over a fixed sequence. Mostly for tests and
    /// composing already-materialized data back into a pipeline.
    pub fn from_vec(items: Vec<T>) -> Self
    where
        T: Clone,
    {
        Self::from_producer(move || Ok(items.clone()))
    }

    /// Materialize the pipeline against the source's current state.
    pub fn collect(&self) -> QueryResult<Vec<T>> {
        (self.producer)()
    }

    /// Keep only elements satisfying `predicate`.
    pub fn filter<P>(self, predicate: P) -> Query<T>
    where
        P: Fn(&T) -> bool + 'static,
    {
        let input = self.producer;
        Query::from_producer(move || {
            Ok(input()?.into_iter().filter(|item| predicate(item)).collect())
        })
    }

    /// Map every element through `selector`, changing the element type.
    pub fn project<U, S>(self, selector: S) -> Query<U>
    where
        U: 'static,
        S: Fn(&T) -> U + 'static,
    {
        let input = self.producer;
        Query::from_producer(move || Ok(input()?.iter().map(|item| selector(item)).collect()))
    }

    /// Follow a single-valued navigation (e.g. donator to province).
    ///
    /// The selector is fallible because navigation may trigger a deferred
    /// load. Elements whose navigation target is unset yield no row.
    pub fn navigate<U, S>(self, selector: S) -> Query<U>
    where
        U: 'static,
        S: Fn(&T) -> QueryResult<Option<U>> + 'static,
    {
        let input = self.producer;
        Query::from_producer(move || {
            let mut out = Vec::new();
            for item in input()? {
                if let Some(target) = selector(&item)? {
                    out.push(target);
                }
            }
            Ok(out)
        })
    }

    /// Follow a collection navigation and flatten the per-element
    /// sequences, preserving source order then per-item order.
    pub fn navigate_many<U, S>(self, selector: S) -> Query<U>
    where
        U: 'static,
        S: Fn(&T) -> QueryResult<Vec<U>> + 'static,
    {
        let input = self.producer;
        Query::from_producer(move || {
            let mut out = Vec::new();
            for item in input()? {
                out.extend(selector(&item)?);
            }
            Ok(out)
        })
    }

    /// Totally order the sequence by the extracted key.
    ///
    /// The sort is stable in both directions: elements with equal keys
    /// keep their relative source order.
    pub fn order_by<K, S>(self, key: S, direction: Direction) -> Query<T>
    where
        K: Ord + 'static,
        S: Fn(&T) -> K + 'static,
    {
        let input = self.producer;
        Query::from_producer(move || {
            let mut keyed: Vec<(K, T)> = input()?
                .into_iter()
                .map(|item| (key(&item), item))
                .collect();
            keyed.sort_by(|a, b| match direction {
                Direction::Ascending => a.0.cmp(&b.0),
                Direction::Descending => b.0.cmp(&a.0),
            });
            Ok(keyed.into_iter().map(|(_, item)| item).collect())
        })
    }

    /// Partition the sequence into groups keyed by `key`.
    ///
    /// Groups are exhaustive and disjoint: every source element lands in
    /// exactly one group.
    pub fn group_by<K, S>(self, key: S) -> Query<Group<K, T>>
    where
        K: Eq + Hash + Clone + 'static,
        S: Fn(&T) -> K + 'static,
    {
        let input = self.producer;
        Query::from_producer(move || {
            let mut partitions: IndexMap<K, Vec<T>> = IndexMap::new();
            for item in input()? {
                partitions.entry(key(&item)).or_default().push(item);
            }
            Ok(partitions
                .into_iter()
                .map(|(key, elements)| Group { key, elements })
                .collect())
        })
    }

    /// Left-preserving group join.
    ///
    /// Produces exactly one result per left element, paired with the
    /// (possibly empty) group of right elements whose key matches. This
    /// is not an inner join: unmatched left elements still appear.
    pub fn group_join<R, K, O, LK, RK, RS>(
        self,
        right: Query<R>,
        left_key: LK,
        right_key: RK,
        result: RS,
    ) -> Query<O>
    where
        R: Clone + 'static,
        K: PartialEq + 'static,
        O: 'static,
        LK: Fn(&T) -> K + 'static,
        RK: Fn(&R) -> K + 'static,
        RS: Fn(&T, Vec<R>) -> O + 'static,
    {
        let input = self.producer;
        Query::from_producer(move || {
            let left_items = input()?;
            let right_keyed: Vec<(K, R)> = right
                .collect()?
                .into_iter()
                .map(|item| (right_key(&item), item))
                .collect();

            let mut out = Vec::with_capacity(left_items.len());
            for left in &left_items {
                let k = left_key(left);
                let matched: Vec<R> = right_keyed
                    .iter()
                    .filter(|(rk, _)| *rk == k)
                    .map(|(_, r)| r.clone())
                    .collect();
                out.push(result(left, matched));
            }
            Ok(out)
        })
    }

    /// Skip the first `n` elements of the current pipeline order.
    ///
    /// Only deterministic after an explicit `order_by`.
    pub fn skip(self, n: usize) -> Query<T> {
        let input = self.producer;
        Query::from_producer(move || Ok(input()?.into_iter().skip(n).collect()))
    }

    /// Take at most `n` elements of the current pipeline order.
    pub fn take(self, n: usize) -> Query<T> {
        let input = self.producer;
        Query::from_producer(move || Ok(input()?.into_iter().take(n).collect()))
    }
}
