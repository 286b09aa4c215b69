//! Store error types.

use donordb_core::EntityKind;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a backing store.
///
/// Stores never retry internally; retry policy is a caller concern.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not service the request.
    #[error("store unavailable: {message}")]
    Unavailable { message: String },

    /// An inserted row's identity already exists in the store.
    #[error("identity conflict: {kind} id {id} already exists")]
    IdentityConflict { kind: EntityKind, id: u64 },

    /// I/O failure in a file-backed store.
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Snapshot (de)serialization failure in a file-backed store.
    #[error("store serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    pub fn identity_conflict(kind: EntityKind, id: u64) -> Self {
        Self::IdentityConflict { kind, id }
    }
}
