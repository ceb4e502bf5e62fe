//! Snapshot persistence for tournament state.
//!
//! The tournament core never touches storage; callers load a snapshot,
//! apply operations, and save the result with the sequence they loaded.
//!
//! ## Example
//!
//! ```
//! use derby_master::store::{MemorySnapshotStore, SnapshotRepository};
//! use derby_master::tournament::{TournamentState, roster};
//!
//! let store = MemorySnapshotStore::new();
//! let state = roster::add_racer(&TournamentState::default(), "Alice", None, None);
//! let sequence = store.save(0, &state).unwrap();
//!
//! let loaded = store.load().unwrap().unwrap();
//! assert_eq!(loaded.sequence, sequence);
//! assert_eq!(loaded.state, state);
//! ```

pub mod config;
pub mod errors;
pub mod file;
pub mod repository;

pub use config::StoreConfig;
pub use errors::{StoreError, StoreResult};
pub use file::FileSnapshotStore;
pub use repository::{MemorySnapshotStore, SnapshotRepository, StoredSnapshot};
