//! Points-elimination race tournament core.
//!
//! This module provides the tournament state machine:
//! - Roster management and car numbering
//! - Heat generation with round-robin race composition and lane balancing
//! - Race completion, penalty scoring, and elimination
//! - Final race scheduling and terminal standings
//!
//! Every operation borrows a [`TournamentState`] snapshot and returns a new
//! one, leaving the input untouched.
//!
//! ## Example
//!
//! ```
//! use derby_master::tournament::{TournamentConfig, TournamentState, heats, roster};
//!
//! let mut state = TournamentState::new(TournamentConfig::new(4, 5));
//! for name in ["Alice", "Bob", "Cara", "Dan", "Eve"] {
//!     state = roster::add_racer(&state, name, None, None);
//! }
//!
//! let state = heats::generate_next_heat(&state).unwrap();
//! assert_eq!(state.heats[0].races.len(), 2);
//! ```

pub mod errors;
pub mod heats;
pub mod models;
pub mod roster;
pub mod standings;

pub use errors::{TournamentError, TournamentResult};
pub use heats::{
    LaneUsage, can_generate_next_heat, current_race, generate_final_race, generate_heat,
    generate_next_heat, lane_usage, regenerate_current_heat, should_trigger_final_race,
};
pub use models::{
    ConfigUpdate, Heat, Lane, LaneAssignments, Placement, Race, RaceFormat, RaceId, RaceResults,
    Racer, RacerId, RacerUpdate, TournamentConfig, TournamentState,
};
pub use roster::{
    active_racers, add_racer, delete_racer, racer_by_id, update_config, update_racer,
};
pub use standings::{
    RacerHistoryEntry, calculate_final_standings, complete_race, current_standings,
    points_for_placement, racer_history,
};
