//! File-backed store.
//!
//! Persists the same tables as `MemoryStore` to a JSON snapshot after
//! every accepted batch. The snapshot is rewritten whole; there is no
//! write-ahead log or incremental journal.

use std::fs;
use std::path::{Path, PathBuf};

use donordb_core::{Donator, DonatorId, Province, ProvinceId};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::batch::ChangeSet;
use crate::error::StoreResult;
use crate::memory::MemoryStore;
use crate::store::Store;

/// On-disk snapshot layout.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    donators: Vec<Donator>,
    provinces: Vec<Province>,
    next_donator_id: u64,
    next_province_id: u64,
}

/// A store persisted as a JSON snapshot file.
///
/// Opening reads the snapshot into an in-memory working set; every
/// accepted `persist` batch rewrites the file before the working set
/// advances, so disk and memory never disagree. A missing file opens
/// as an empty store.
#[derive(Debug)]
pub struct JsonStore {
    inner: MemoryStore,
    path: PathBuf,
    next_donator_id: u64,
    next_province_id: u64,
}

impl JsonStore {
    /// Open the store at `path`, creating an empty one if absent.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let mut inner = MemoryStore::new();
        let (mut next_donator_id, mut next_province_id) = (1, 1);

        if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&raw)?;
            let mut batch = ChangeSet::new();
            batch.added_provinces = snapshot.provinces;
            batch.added_donators = snapshot.donators;
            inner.persist(&batch)?;
            next_donator_id = snapshot.next_donator_id;
            next_province_id = snapshot.next_province_id;
        }

        Ok(Self {
            inner,
            path,
            next_donator_id,
            next_province_id,
        })
    }

    fn write_snapshot(&self, tables: &MemoryStore) -> StoreResult<()> {
        let snapshot = Snapshot {
            donators: tables.load_donators()?,
            provinces: tables.load_provinces()?,
            next_donator_id: self.next_donator_id,
            next_province_id: self.next_province_id,
        };
        let raw = serde_json::to_string_pretty(&snapshot)?;
        fs::write(&self.path, raw)?;
        debug!(path = %self.path.display(), "wrote store snapshot");
        Ok(())
    }
}

impl Store for JsonStore {
    fn load_donators(&self) -> StoreResult<Vec<Donator>> {
        self.inner.load_donators()
    }

    fn load_provinces(&self) -> StoreResult<Vec<Province>> {
        self.inner.load_provinces()
    }

    fn next_donator_id(&mut self) -> StoreResult<DonatorId> {
        let id = DonatorId::new(self.next_donator_id);
        self.next_donator_id += 1;
        Ok(id)
    }

    fn next_province_id(&mut self) -> StoreResult<ProvinceId> {
        let id = ProvinceId::new(self.next_province_id);
        self.next_province_id += 1;
        Ok(id)
    }

    fn persist(&mut self, batch: &ChangeSet) -> StoreResult<()> {
        // The working set only advances once the snapshot is on disk,
        // so a failed write leaves the whole batch unapplied.
        let mut applied = self.inner.clone();
        applied.persist(batch)?;
        self.write_snapshot(&applied)?;
        self.inner = applied;
        Ok(())
    }
}
