//! JSON file snapshot repository.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use super::config::StoreConfig;
use super::errors::StoreResult;
use super::repository::{SnapshotRepository, StoredSnapshot, check_sequence};
use crate::tournament::TournamentState;

/// On-disk layout; `state` is absent after a clear so the sequence survives
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileEnvelope {
    sequence: u64,
    saved_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    state: Option<TournamentState>,
}

/// Snapshot repository backed by a single JSON file
///
/// Writes go to a sibling temp file which is then renamed over the
/// snapshot, so readers never observe a half-written file.
#[derive(Debug)]
pub struct FileSnapshotStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSnapshotStore {
    /// Open a store at the given path; the file is created on first save
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Open the store described by `config`
    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.state_path.clone())
    }

    /// Snapshot file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_envelope(&self) -> StoreResult<Option<FileEnvelope>> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write_envelope(&self, envelope: &FileEnvelope) -> StoreResult<()> {
        let json = serde_json::to_string_pretty(envelope)?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn current_sequence(&self) -> StoreResult<u64> {
        Ok(self
            .read_envelope()?
            .map(|envelope| envelope.sequence)
            .unwrap_or(0))
    }
}

impl SnapshotRepository for FileSnapshotStore {
    fn load(&self) -> StoreResult<Option<StoredSnapshot>> {
        let snapshot = self.read_envelope()?.and_then(|envelope| {
            envelope.state.map(|state| StoredSnapshot {
                sequence: envelope.sequence,
                saved_at: envelope.saved_at,
                state,
            })
        });

        if let Some(snapshot) = &snapshot {
            log::debug!(
                "Loaded tournament snapshot {} from {}",
                snapshot.sequence,
                self.path.display()
            );
        }
        Ok(snapshot)
    }

    fn sequence(&self) -> StoreResult<u64> {
        self.current_sequence()
    }

    fn save(&self, expected_sequence: u64, state: &TournamentState) -> StoreResult<u64> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let current = self.current_sequence()?;
        check_sequence(expected_sequence, current)?;

        let envelope = FileEnvelope {
            sequence: current + 1,
            saved_at: Utc::now(),
            state: Some(state.clone()),
        };
        self.write_envelope(&envelope)?;

        log::info!(
            "Saved tournament snapshot {} to {}",
            envelope.sequence,
            self.path.display()
        );
        Ok(envelope.sequence)
    }

    fn clear(&self) -> StoreResult<u64> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let envelope = FileEnvelope {
            sequence: self.current_sequence()? + 1,
            saved_at: Utc::now(),
            state: None,
        };
        self.write_envelope(&envelope)?;

        log::info!("Cleared tournament snapshot at {}", self.path.display());
        Ok(envelope.sequence)
    }
}
