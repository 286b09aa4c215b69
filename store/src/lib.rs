//! DonorDB Store
//!
//! The backing-store boundary consumed by the materializer and the
//! cascade mutation coordinator:
//! - The `Store` trait (load, identity allocation, atomic persist)
//! - `ChangeSet`, the batch of staged rows handed to `persist`
//! - `MemoryStore`, an in-memory store with id-ordered tables
//! - `JsonStore`, the same tables snapshotted to a JSON file

mod batch;
mod error;
mod file;
mod memory;
mod store;

pub use batch::ChangeSet;
pub use error::{StoreError, StoreResult};
pub use file::JsonStore;
pub use memory::MemoryStore;
pub use store::Store;
