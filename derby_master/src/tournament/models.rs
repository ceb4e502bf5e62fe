//! Tournament data models for points-elimination races.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use super::errors::{TournamentError, TournamentResult};

/// Racer ID type
pub type RacerId = Uuid;

/// Race ID type
pub type RaceId = Uuid;

/// Lane number (1-indexed)
pub type Lane = u32;

/// Finishing placement within a race (1 = first)
pub type Placement = u32;

/// Lane number → assigned racer (`None` for an empty lane)
pub type LaneAssignments = BTreeMap<Lane, Option<RacerId>>;

/// Lane number → placement
pub type RaceResults = BTreeMap<Lane, Placement>;

/// Default number of physical lanes on the track
pub const DEFAULT_LANE_COUNT: u32 = 4;

/// Default point total at which a racer is eliminated
pub const DEFAULT_ELIMINATION_THRESHOLD: u32 = 6;

/// Heat number reserved for the final race
pub const FINAL_HEAT_NUMBER: u32 = 0;

/// Race format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RaceFormat {
    /// Penalty points accumulate until a field small enough for one final remains
    #[default]
    Ladderless,
}

impl std::fmt::Display for RaceFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RaceFormat::Ladderless => write!(f, "ladderless"),
        }
    }
}

/// Tournament configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentConfig {
    /// Physical lane count of the track (>= 2)
    pub lane_count: u32,

    /// Points at which a racer stops receiving new races (>= 1)
    pub elimination_threshold: u32,

    /// Race format
    pub race_format: RaceFormat,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self {
            lane_count: DEFAULT_LANE_COUNT,
            elimination_threshold: DEFAULT_ELIMINATION_THRESHOLD,
            race_format: RaceFormat::Ladderless,
            created_at: Utc::now(),
        }
    }
}

impl TournamentConfig {
    /// Create a configuration with the given lane count and threshold
    pub fn new(lane_count: u32, elimination_threshold: u32) -> Self {
        Self {
            lane_count,
            elimination_threshold,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> TournamentResult<()> {
        if self.lane_count < 2 {
            return Err(TournamentError::InvalidConfig(format!(
                "lane count must be at least 2, got {}",
                self.lane_count
            )));
        }

        if self.elimination_threshold < 1 {
            return Err(TournamentError::InvalidConfig(
                "elimination threshold must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

/// Partial configuration update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub lane_count: Option<u32>,
    pub elimination_threshold: Option<u32>,
}

/// A registered racer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Racer {
    /// Stable racer ID
    pub id: RacerId,
    /// Car number, unique and never reused
    pub car_number: u32,
    /// Racer name
    pub name: String,
    /// Team name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team: Option<String>,
    /// Car weight in ounces
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    /// Accumulated penalty points
    pub points: u32,
    /// Completed race count
    pub races: u32,
    /// Withdrawn from future races
    pub withdrawn: bool,
}

impl Racer {
    /// Create a fresh racer with zeroed counters
    pub fn new(car_number: u32, name: String, team: Option<String>, weight: Option<f64>) -> Self {
        Self {
            id: Uuid::new_v4(),
            car_number,
            name,
            team,
            weight,
            points: 0,
            races: 0,
            withdrawn: false,
        }
    }

    /// Whether this racer has reached the elimination threshold
    pub fn is_eliminated(&self, threshold: u32) -> bool {
        self.points >= threshold
    }

    /// Whether this racer may be scheduled into new races
    pub fn is_active(&self, threshold: u32) -> bool {
        !self.is_eliminated(threshold) && !self.withdrawn
    }
}

/// Partial racer update; `Some` fields overwrite, `None` fields are left alone.
///
/// `team` and `weight` are doubly optional so a caller can clear them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RacerUpdate {
    pub name: Option<String>,
    pub team: Option<Option<String>>,
    pub weight: Option<Option<f64>>,
    pub withdrawn: Option<bool>,
}

/// A single race
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Race {
    /// Race ID
    pub id: RaceId,
    /// Heat this race belongs to (0 for the final)
    pub heat_number: u32,
    /// Tournament-wide race number
    pub race_number: u32,
    /// Whether this is the final race
    pub is_final_race: bool,
    /// Lane → racer
    pub lane_assignments: LaneAssignments,
    /// Lane → placement, present once completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<RaceResults>,
    /// Completion timestamp
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Race {
    /// Whether results have been recorded
    pub fn is_completed(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Lane the given racer is assigned to
    pub fn lane_of(&self, racer_id: RacerId) -> Option<Lane> {
        self.lane_assignments
            .iter()
            .find(|(_, assigned)| **assigned == Some(racer_id))
            .map(|(&lane, _)| lane)
    }

    /// Racers assigned to this race, in lane order
    pub fn racer_ids(&self) -> impl Iterator<Item = RacerId> + '_ {
        self.lane_assignments.values().filter_map(|id| *id)
    }

    /// Recorded placement for a lane
    pub fn placement_for_lane(&self, lane: Lane) -> Option<Placement> {
        self.results.as_ref()?.get(&lane).copied()
    }
}

/// A round of races generated together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Heat {
    pub heat_number: u32,
    pub races: Vec<Race>,
    pub is_complete: bool,
    pub generated_at: DateTime<Utc>,
}

impl Heat {
    /// Whether every race in the heat has completed
    pub fn all_races_completed(&self) -> bool {
        self.races.iter().all(Race::is_completed)
    }

    /// Whether any race in the heat has completed
    pub fn any_race_completed(&self) -> bool {
        self.races.iter().any(Race::is_completed)
    }
}

/// Full tournament snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TournamentState {
    pub config: TournamentConfig,
    pub racers: Vec<Racer>,
    pub heats: Vec<Heat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub r#final: Option<Race>,
    pub current_heat_number: u32,
    pub current_race_number: u32,
    /// Highest car number ever issued, including deleted racers
    #[serde(default)]
    pub last_car_number: u32,
    pub is_complete: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_standings: Option<Vec<RacerId>>,
}

impl Default for TournamentState {
    fn default() -> Self {
        Self::new(TournamentConfig::default())
    }
}

impl TournamentState {
    /// Create an empty tournament with the given configuration
    pub fn new(config: TournamentConfig) -> Self {
        Self {
            config,
            racers: Vec::new(),
            heats: Vec::new(),
            r#final: None,
            current_heat_number: 0,
            current_race_number: 0,
            last_car_number: 0,
            is_complete: false,
            final_standings: None,
        }
    }

    /// Whether any race in any heat has completed
    pub fn any_race_completed(&self) -> bool {
        self.heats.iter().any(Heat::any_race_completed)
    }

    /// The heat with the current heat number
    pub fn current_heat(&self) -> Option<&Heat> {
        if self.current_heat_number == 0 {
            return None;
        }
        self.heats
            .iter()
            .find(|heat| heat.heat_number == self.current_heat_number)
    }

    /// All races (heat races then the final), ordered by race number
    pub fn all_races(&self) -> Vec<&Race> {
        let mut races: Vec<&Race> = self
            .heats
            .iter()
            .flat_map(|heat| heat.races.iter())
            .chain(self.r#final.iter())
            .collect();
        races.sort_by_key(|race| race.race_number);
        races
    }

    /// Look up a race by ID, checking the final first
    pub fn find_race(&self, race_id: RaceId) -> Option<&Race> {
        self.r#final
            .as_ref()
            .filter(|race| race.id == race_id)
            .or_else(|| {
                self.heats
                    .iter()
                    .flat_map(|heat| heat.races.iter())
                    .find(|race| race.id == race_id)
            })
    }
}
