//! DonorDB Mutation
//!
//! The cascade mutation coordinator: per-entity change tracking with the
//! `Unchanged -> {Added | Modified | Deleted}` state machine, cascading
//! province deletion, parent-child insert linking, and two-phase commit
//! preparation (identities assigned and the changeset built before any
//! tracker state is touched).

mod coordinator;
mod error;
mod state;
mod tracker;

pub use coordinator::{MutationCoordinator, PreparedCommit};
pub use error::{MutationError, MutationResult};
pub use state::EntityState;
pub use tracker::{ChangeTracker, Entry, TrackedId, TrackKey};
