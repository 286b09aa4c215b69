//! Query error types.

use donordb_store::StoreError;
use thiserror::Error;

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

/// Errors that can occur while materializing a query pipeline.
#[derive(Debug, Error)]
pub enum QueryError {
    /// The entity source (or a navigation inside the pipeline) failed to load.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
