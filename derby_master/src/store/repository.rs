//! Snapshot repository trait and the in-memory implementation.
//!
//! A repository keeps exactly one [`TournamentState`] together with a
//! change sequence. Saving requires the sequence the caller loaded, so two
//! writers racing from the same snapshot cannot silently overwrite each
//! other: the second one gets [`StoreError::StaleSnapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::errors::{StoreError, StoreResult};
use crate::tournament::TournamentState;

/// A persisted snapshot with its change sequence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSnapshot {
    /// Monotonic change counter, bumped on every save and clear
    pub sequence: u64,
    /// Time of the save
    pub saved_at: DateTime<Utc>,
    /// Tournament state
    pub state: TournamentState,
}

/// Trait for snapshot persistence
pub trait SnapshotRepository: Send + Sync {
    /// Load the current snapshot, `None` if nothing was saved
    fn load(&self) -> StoreResult<Option<StoredSnapshot>>;

    /// Current change sequence (0 when the store has never been written)
    fn sequence(&self) -> StoreResult<u64>;

    /// Save `state` if the store is still at `expected_sequence`
    ///
    /// Returns the new sequence.
    fn save(&self, expected_sequence: u64, state: &TournamentState) -> StoreResult<u64>;

    /// Remove the snapshot; the sequence still advances
    fn clear(&self) -> StoreResult<u64>;

    /// Whether a newer snapshot than `sequence` exists
    fn has_changed_since(&self, sequence: u64) -> StoreResult<bool> {
        Ok(self.sequence()? != sequence)
    }
}

pub(super) fn check_sequence(expected: u64, actual: u64) -> StoreResult<()> {
    if expected != actual {
        log::warn!(
            "Rejected stale save: expected sequence {}, store at {}",
            expected,
            actual
        );
        return Err(StoreError::StaleSnapshot { expected, actual });
    }
    Ok(())
}

#[derive(Debug, Default)]
struct MemoryInner {
    sequence: u64,
    snapshot: Option<StoredSnapshot>,
}

/// In-process snapshot repository
#[derive(Debug, Default)]
pub struct MemorySnapshotStore {
    inner: Mutex<MemoryInner>,
}

impl MemorySnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SnapshotRepository for MemorySnapshotStore {
    fn load(&self) -> StoreResult<Option<StoredSnapshot>> {
        Ok(self.lock().snapshot.clone())
    }

    fn sequence(&self) -> StoreResult<u64> {
        Ok(self.lock().sequence)
    }

    fn save(&self, expected_sequence: u64, state: &TournamentState) -> StoreResult<u64> {
        let mut inner = self.lock();
        check_sequence(expected_sequence, inner.sequence)?;

        inner.sequence += 1;
        inner.snapshot = Some(StoredSnapshot {
            sequence: inner.sequence,
            saved_at: Utc::now(),
            state: state.clone(),
        });
        Ok(inner.sequence)
    }

    fn clear(&self) -> StoreResult<u64> {
        let mut inner = self.lock();
        inner.sequence += 1;
        inner.snapshot = None;
        Ok(inner.sequence)
    }
}
