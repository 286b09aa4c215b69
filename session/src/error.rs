//! Session error types.

use donordb_mutation::MutationError;
use donordb_query::QueryError;
use donordb_store::StoreError;
use thiserror::Error;

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by a unit of work.
#[derive(Debug, Error)]
pub enum SessionError {
    /// A query pipeline failed to materialize.
    #[error("query failed: {0}")]
    Query(#[from] QueryError),

    /// A staged mutation was rejected.
    #[error("mutation rejected: {0}")]
    Mutation(#[from] MutationError),

    /// The backing store failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
