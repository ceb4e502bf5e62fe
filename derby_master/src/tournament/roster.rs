//! Roster management: registering, editing, and removing racers.
//!
//! Every operation borrows the current snapshot and returns a new one;
//! the input is never modified.

use super::errors::{TournamentError, TournamentResult};
use super::models::{ConfigUpdate, Racer, RacerId, RacerUpdate, TournamentState};

/// Register a new racer with the next car number
///
/// Car numbers are `max(existing) + 1`, and never drop back to a number
/// already issued to a deleted racer.
pub fn add_racer(
    state: &TournamentState,
    name: &str,
    team: Option<&str>,
    weight: Option<f64>,
) -> TournamentState {
    let car_number = next_car_number(state);
    let racer = Racer::new(
        car_number,
        name.to_string(),
        team.map(str::to_string),
        weight,
    );

    log::info!("Registered racer #{} '{}' ({})", car_number, racer.name, racer.id);

    let mut next = state.clone();
    next.racers.push(racer);
    next.last_car_number = car_number;
    next
}

/// Merge a partial update onto a racer
///
/// Unknown IDs fail with [`TournamentError::RacerNotFound`].
pub fn update_racer(
    state: &TournamentState,
    racer_id: RacerId,
    update: RacerUpdate,
) -> TournamentResult<TournamentState> {
    let mut next = state.clone();
    let racer = next
        .racers
        .iter_mut()
        .find(|racer| racer.id == racer_id)
        .ok_or(TournamentError::RacerNotFound(racer_id))?;

    if let Some(name) = update.name {
        racer.name = name;
    }
    if let Some(team) = update.team {
        racer.team = team;
    }
    if let Some(weight) = update.weight {
        racer.weight = weight;
    }
    if let Some(withdrawn) = update.withdrawn {
        if withdrawn != racer.withdrawn {
            log::info!(
                "Racer #{} {}",
                racer.car_number,
                if withdrawn { "withdrawn" } else { "reinstated" }
            );
        }
        racer.withdrawn = withdrawn;
    }

    Ok(next)
}

/// Remove a racer from the roster
///
/// Only allowed while no race anywhere in the tournament has completed,
/// whether or not the target racer took part. Other car numbers are kept.
pub fn delete_racer(
    state: &TournamentState,
    racer_id: RacerId,
) -> TournamentResult<TournamentState> {
    if state.any_race_completed() {
        return Err(TournamentError::PrecondMustBeZeroRaces);
    }

    if !state.racers.iter().any(|racer| racer.id == racer_id) {
        return Err(TournamentError::RacerNotFound(racer_id));
    }

    let mut next = state.clone();
    next.racers.retain(|racer| racer.id != racer_id);
    log::info!("Deleted racer {}", racer_id);
    Ok(next)
}

/// Merge a partial configuration update
///
/// Pending heats are not revalidated; a new lane count simply applies to
/// the next generated heat. Only the lane/threshold minimums are enforced.
pub fn update_config(
    state: &TournamentState,
    update: ConfigUpdate,
) -> TournamentResult<TournamentState> {
    let mut config = state.config.clone();
    if let Some(lane_count) = update.lane_count {
        config.lane_count = lane_count;
    }
    if let Some(threshold) = update.elimination_threshold {
        config.elimination_threshold = threshold;
    }
    config.validate()?;

    log::info!(
        "Configuration updated: {} lanes, elimination at {} points",
        config.lane_count,
        config.elimination_threshold
    );

    let mut next = state.clone();
    next.config = config;
    Ok(next)
}

/// Racers below the elimination threshold and not withdrawn, in roster order
pub fn active_racers(state: &TournamentState) -> Vec<&Racer> {
    let threshold = state.config.elimination_threshold;
    state
        .racers
        .iter()
        .filter(|racer| racer.is_active(threshold))
        .collect()
}

/// Look up a racer by ID
pub fn racer_by_id(state: &TournamentState, racer_id: RacerId) -> Option<&Racer> {
    state.racers.iter().find(|racer| racer.id == racer_id)
}

fn next_car_number(state: &TournamentState) -> u32 {
    state
        .racers
        .iter()
        .map(|racer| racer.car_number)
        .max()
        .unwrap_or(0)
        .max(state.last_car_number)
        + 1
}
