//! Commit reporting.

use std::fmt;

use donordb_store::ChangeSet;

/// Row counts applied by a successful commit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub provinces_added: usize,
    pub donators_added: usize,
    pub provinces_modified: usize,
    pub donators_modified: usize,
    pub provinces_removed: usize,
    pub donators_removed: usize,
}

impl CommitSummary {
    pub(crate) fn from_changeset(batch: &ChangeSet) -> Self {
        Self {
            provinces_added: batch.added_provinces.len(),
            donators_added: batch.added_donators.len(),
            provinces_modified: batch.modified_provinces.len(),
            donators_modified: batch.modified_donators.len(),
            provinces_removed: batch.removed_provinces.len(),
            donators_removed: batch.removed_donators.len(),
        }
    }

    /// Total number of applied row operations.
    pub fn total(&self) -> usize {
        self.provinces_added
            + self.donators_added
            + self.provinces_modified
            + self.donators_modified
            + self.provinces_removed
            + self.donators_removed
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

impl fmt::Display for CommitSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "committed {} row(s): +{} province(s), +{} donator(s), \
             ~{} province(s), ~{} donator(s), -{} province(s), -{} donator(s)",
            self.total(),
            self.provinces_added,
            self.donators_added,
            self.provinces_modified,
            self.donators_modified,
            self.provinces_removed,
            self.donators_removed,
        )
    }
}
