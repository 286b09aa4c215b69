//! Tracked entity states.

/// State of an entity within a unit of work.
///
/// Lifecycle: a detached entity becomes tracked as `Unchanged` (loaded)
/// or `Added` (staged insert); tracked entities move to `Modified` or
/// `Deleted`. Commit turns `Added` and `Modified` into `Unchanged` and
/// drops `Deleted` entries from tracking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Loaded from the store, no local changes.
    Unchanged,
    /// Staged for insertion; carries no identity until commit.
    Added,
    /// Loaded and locally changed; current values persist on commit.
    Modified,
    /// Staged for removal; dropped from tracking on commit.
    Deleted,
}

impl EntityState {
    /// Whether the entry contributes to the unit of work's visible view.
    pub fn is_visible(self) -> bool {
        !matches!(self, EntityState::Deleted)
    }
}
