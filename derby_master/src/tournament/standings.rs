//! Race completion, scoring, and standings.
//!
//! Scoring is penalty based: a racer earns `placement - 1` points per race,
//! so lower totals are better.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    Lane, Placement, Race, RaceId, RaceResults, Racer, RacerId, TournamentState,
};

/// Points earned for a placement
pub fn points_for_placement(placement: Placement) -> u32 {
    placement.saturating_sub(1)
}

/// Record results for a pending race and score its racers
///
/// Placements must be pairwise distinct; gaps and out-of-range values are
/// accepted. The final race is checked before the heats. Completing the
/// final closes the tournament and fixes the final standings.
pub fn complete_race(
    state: &TournamentState,
    race_id: RaceId,
    results: RaceResults,
) -> TournamentResult<TournamentState> {
    validate_placements(&results)?;

    let race = state
        .find_race(race_id)
        .ok_or(TournamentError::RaceNotFound(race_id))?;
    if race.is_completed() {
        return Err(TournamentError::RaceAlreadyCompleted(race_id));
    }

    let now = Utc::now();
    let mut next = state.clone();

    let (completed, is_final) = match next.r#final.as_mut().filter(|race| race.id == race_id) {
        Some(race) => (stamp(race, results, now), true),
        None => {
            let heat = next
                .heats
                .iter_mut()
                .find(|heat| heat.races.iter().any(|race| race.id == race_id))
                .ok_or(TournamentError::RaceNotFound(race_id))?;
            let race = heat
                .races
                .iter_mut()
                .find(|race| race.id == race_id)
                .ok_or(TournamentError::RaceNotFound(race_id))?;
            let completed = stamp(race, results, now);
            heat.is_complete = heat.all_races_completed();
            if heat.is_complete {
                log::info!("Heat {} complete", heat.heat_number);
            }
            (completed, false)
        }
    };

    apply_race_results(&mut next.racers, &completed);
    next.current_race_number = next.current_race_number.max(completed.race_number);

    log::info!(
        "Completed race #{} (heat {})",
        completed.race_number,
        completed.heat_number
    );

    if is_final {
        next.is_complete = true;
        next.final_standings = Some(calculate_final_standings(&next)?);
        log::info!("Tournament complete after final race #{}", completed.race_number);
    }

    Ok(next)
}

/// Final ranking: finalists by placement, then everyone else by points
///
/// Racers who never reached the final rank below every finalist, fewest
/// points first; equal points keep roster order.
pub fn calculate_final_standings(state: &TournamentState) -> TournamentResult<Vec<RacerId>> {
    let final_race = state
        .r#final
        .as_ref()
        .filter(|race| race.results.is_some())
        .ok_or(TournamentError::MissingFinalResults)?;

    let mut finalists: Vec<(RacerId, Placement)> = final_race
        .lane_assignments
        .iter()
        .filter_map(|(&lane, racer_id)| {
            let racer_id = (*racer_id)?;
            final_race
                .placement_for_lane(lane)
                .map(|placement| (racer_id, placement))
        })
        .collect();
    finalists.sort_by_key(|&(_, placement)| placement);

    let finalist_ids: HashSet<RacerId> = finalists.iter().map(|&(id, _)| id).collect();
    let mut others: Vec<&Racer> = state
        .racers
        .iter()
        .filter(|racer| !finalist_ids.contains(&racer.id))
        .collect();
    others.sort_by_key(|racer| racer.points);

    Ok(finalists
        .into_iter()
        .map(|(id, _)| id)
        .chain(others.into_iter().map(|racer| racer.id))
        .collect())
}

/// Live standings: fewest points first, ties by car number
pub fn current_standings(state: &TournamentState) -> Vec<&Racer> {
    let mut racers: Vec<&Racer> = state.racers.iter().collect();
    racers.sort_by_key(|racer| (racer.points, racer.car_number));
    racers
}

/// One race in a racer's history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RacerHistoryEntry {
    /// Heat number (0 for the final)
    pub heat_number: u32,
    pub race_number: u32,
    pub lane: Lane,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points_earned: Option<u32>,
    /// Other racers in the same race, in lane order
    pub opponents: Vec<RacerId>,
}

/// Every heat race and the final a racer was assigned to
pub fn racer_history(state: &TournamentState, racer_id: RacerId) -> Vec<RacerHistoryEntry> {
    state
        .heats
        .iter()
        .flat_map(|heat| heat.races.iter())
        .chain(state.r#final.iter())
        .filter_map(|race| {
            let lane = race.lane_of(racer_id)?;
            let placement = race.placement_for_lane(lane);
            Some(RacerHistoryEntry {
                heat_number: race.heat_number,
                race_number: race.race_number,
                lane,
                placement,
                points_earned: placement.map(points_for_placement),
                opponents: race.racer_ids().filter(|&id| id != racer_id).collect(),
            })
        })
        .collect()
}

fn validate_placements(results: &RaceResults) -> TournamentResult<()> {
    let mut seen = HashSet::new();
    for &placement in results.values() {
        if !seen.insert(placement) {
            return Err(TournamentError::DuplicatePlacement(placement));
        }
    }
    Ok(())
}

fn stamp(race: &mut Race, results: RaceResults, now: DateTime<Utc>) -> Race {
    race.results = Some(results);
    race.completed_at = Some(now);
    race.clone()
}

fn apply_race_results(racers: &mut [Racer], race: &Race) {
    for (&lane, racer_id) in &race.lane_assignments {
        let Some(racer_id) = racer_id else {
            continue;
        };

        let Some(placement) = race.placement_for_lane(lane) else {
            log::warn!(
                "Race #{} lane {} has no placement, racer {} left unscored",
                race.race_number,
                lane,
                racer_id
            );
            continue;
        };

        match racers.iter_mut().find(|racer| racer.id == *racer_id) {
            Some(racer) => {
                racer.points = racer.points.saturating_add(points_for_placement(placement));
                racer.races = racer.races.saturating_add(1);
            }
            None => log::warn!(
                "Race #{} lane {} refers to unknown racer {}",
                race.race_number,
                lane,
                racer_id
            ),
        }
    }
}
