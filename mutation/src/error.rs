//! Mutation error types.

use donordb_core::{EntityKind, ProvinceId};
use donordb_store::StoreError;
use thiserror::Error;

use crate::state::EntityState;

/// Result type for mutation operations.
pub type MutationResult<T> = Result<T, MutationError>;

/// Errors that can occur while staging or committing mutations.
#[derive(Debug, Error)]
pub enum MutationError {
    /// The entity was never loaded or staged through this unit of work.
    #[error("not attached to this unit of work: {entity}")]
    NotAttached { entity: String },

    /// Deleting a province with live children while cascade is disabled.
    #[error(
        "cannot delete {province}: {children} donator(s) still reference it \
         and cascade delete is disabled"
    )]
    ConstraintViolation {
        province: ProvinceId,
        children: usize,
    },

    /// The operation is illegal for the entity's current tracked state.
    #[error("invalid state transition: cannot {operation} an entity in state {state:?}")]
    InvalidStateTransition {
        operation: &'static str,
        state: EntityState,
    },

    /// Store failure, including identity conflicts at persist time.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl MutationError {
    pub fn not_attached(kind: EntityKind, id: Option<u64>) -> Self {
        let entity = match id {
            Some(id) => format!("{kind} {id}"),
            None => format!("{kind} without identity"),
        };
        Self::NotAttached { entity }
    }

    pub fn constraint_violation(province: ProvinceId, children: usize) -> Self {
        Self::ConstraintViolation { province, children }
    }

    pub fn invalid_transition(operation: &'static str, state: EntityState) -> Self {
        Self::InvalidStateTransition { operation, state }
    }
}
