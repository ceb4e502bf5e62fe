//! # Derby Master
//!
//! A points-elimination race tournament engine for lane-based tracks.
//!
//! Racers collect penalty points across repeated heats (`placement - 1` per
//! race). Anyone at or above the elimination threshold stops being
//! scheduled, and once the remaining field fits on the track a single final
//! race decides the ranking.
//!
//! ## Core Modules
//!
//! - [`tournament`]: Data model, roster management, heat generation, and
//!   standings
//! - [`store`]: Snapshot persistence with optimistic concurrency
//! - [`report`]: Printable text reports
//!
//! ## Example
//!
//! ```
//! use derby_master::tournament::{self, RaceResults, TournamentConfig, TournamentState};
//!
//! let mut state = TournamentState::new(TournamentConfig::new(4, 5));
//! for name in ["Alice", "Bob", "Cara"] {
//!     state = tournament::add_racer(&state, name, None, None);
//! }
//!
//! // Three racers fit on a four-lane track, so the final is scheduled
//! let state = tournament::generate_next_heat(&state).unwrap();
//! let final_race = state.r#final.clone().unwrap();
//!
//! let results = RaceResults::from([(1, 3), (2, 1), (3, 2)]);
//! let state = tournament::complete_race(&state, final_race.id, results).unwrap();
//! assert!(state.is_complete);
//! ```

/// Snapshot persistence for tournament state.
pub mod store;

/// Tournament state machine and algorithms.
pub mod tournament;

/// Printable reports.
pub mod report;

pub use report::{Report, format_placement, render_report};
pub use store::{FileSnapshotStore, MemorySnapshotStore, SnapshotRepository, StoreError};
pub use tournament::{TournamentConfig, TournamentError, TournamentResult, TournamentState};
