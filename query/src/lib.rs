//! DonorDB Query
//!
//! The composable query pipeline and its materializer. A `Query<T>` is a
//! pure transformation description over an entity source: building one
//! performs no store access and has no side effects. Materializing it
//! (`collect` or a terminal aggregate) executes the whole pipeline once
//! against the source's live view; nothing is cached across
//! materializations.

mod aggregates;
mod error;
mod query;

pub use error::{QueryError, QueryResult};
pub use query::{Direction, Group, Query};
