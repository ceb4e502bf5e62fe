//! Tournament error types.

use thiserror::Error;

use super::models::{Placement, RaceId, RacerId};

/// Tournament errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TournamentError {
    /// Heat or final generation with zero eligible racers
    #[error("No active racers to schedule")]
    NoActiveRacers,

    /// Final requested with more active racers than lanes
    #[error("Too many racers for the final: {active} active, {lanes} lanes")]
    TooManyFinalists { active: usize, lanes: u32 },

    /// Racer deletion after any race has completed
    #[error("Racers cannot be deleted once races have been run")]
    PrecondMustBeZeroRaces,

    /// Two lanes share a placement
    #[error("Duplicate placement in results: {0}")]
    DuplicatePlacement(Placement),

    /// Unknown race ID
    #[error("Race not found: {0}")]
    RaceNotFound(RaceId),

    /// Race already has results
    #[error("Race already completed: {0}")]
    RaceAlreadyCompleted(RaceId),

    /// Final standings requested before the final has results
    #[error("Final standings require final race results")]
    MissingFinalResults,

    /// Unknown racer ID
    #[error("Racer not found: {0}")]
    RacerNotFound(RacerId),

    /// Configuration would break lane/threshold invariants
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Next heat requested while the current heat has pending races
    #[error("Heat {heat_number} still has races to run")]
    HeatInProgress { heat_number: u32 },

    /// Next heat requested after the final was scheduled
    #[error("The final race has already been scheduled")]
    FinalAlreadyScheduled,

    /// Heat regeneration after one of its races completed
    #[error("Heat {heat_number} already has completed races")]
    HeatAlreadyStarted { heat_number: u32 },

    /// Heat regeneration before any heat exists
    #[error("No heat has been generated yet")]
    NoCurrentHeat,
}

impl TournamentError {
    /// Get an operator-facing message without internal identifiers
    pub fn client_message(&self) -> String {
        match self {
            TournamentError::RaceNotFound(_) => "That race does not exist".to_string(),
            TournamentError::RacerNotFound(_) => "That racer does not exist".to_string(),
            TournamentError::RaceAlreadyCompleted(_) => {
                "Results for that race were already recorded".to_string()
            }
            _ => self.to_string(),
        }
    }
}

/// Result type for tournament operations
pub type TournamentResult<T> = Result<T, TournamentError>;
