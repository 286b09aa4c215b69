//! DonorDB Session
//!
//! Units of work over a backing store. A `Database` owns the store; each
//! `UnitOfWork` opened on it carries its own change tracking and sees its
//! own staged mutations through every query it produces. Nothing reaches
//! the store until `commit`, which persists the whole batch atomically.

mod error;
mod navigator;
mod result;
mod session;

pub use donordb_mutation::{EntityState, MutationError, TrackKey};
pub use error::{SessionError, SessionResult};
pub use navigator::Navigator;
pub use result::CommitSummary;
pub use session::{Database, UnitOfWork};
