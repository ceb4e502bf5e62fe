//! Heat generation and lane balancing.
//!
//! A heat splits the active roster into `ceil(active / lanes)` races by
//! dealing racers round-robin in ascending point order, so the leaders end
//! up in different races. Within a race each racer greedily takes the free
//! lane they have used least so far in the tournament (lowest lane number
//! on ties). The final race puts every remaining active racer on the track
//! once the field fits in a single race.

use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

use super::errors::{TournamentError, TournamentResult};
use super::models::{
    FINAL_HEAT_NUMBER, Heat, Lane, LaneAssignments, Race, Racer, RacerId, TournamentState,
};
use super::roster::active_racers;

/// Racer → lane → number of times assigned to that lane
pub type LaneUsage = HashMap<RacerId, BTreeMap<Lane, u32>>;

/// Count lane assignments per racer across every race of every heat
///
/// Pending races count as well: a racer scheduled into lane 3 has already
/// "used" lane 3. Every rostered racer gets an entry with all current lanes
/// present, so absent lanes read as zero.
pub fn lane_usage(state: &TournamentState) -> LaneUsage {
    let mut usage: LaneUsage = state
        .racers
        .iter()
        .map(|racer| {
            let lanes = (1..=state.config.lane_count).map(|lane| (lane, 0)).collect();
            (racer.id, lanes)
        })
        .collect();

    for race in state.heats.iter().flat_map(|heat| heat.races.iter()) {
        for (&lane, racer_id) in &race.lane_assignments {
            if let Some(racer_id) = racer_id {
                *usage.entry(*racer_id).or_default().entry(lane).or_insert(0) += 1;
            }
        }
    }

    usage
}

/// Assign lanes to one race's racers, in the given order
///
/// Each racer takes the available lane with the lowest usage count for
/// them, ties going to the lowest lane number. The chosen lane is removed
/// from availability and the racer's count in `usage` is bumped. Leftover
/// lanes are recorded as empty.
pub fn assign_lanes(
    racer_ids: &[RacerId],
    usage: &mut LaneUsage,
    lane_count: u32,
) -> LaneAssignments {
    let mut available: Vec<Lane> = (1..=lane_count).collect();
    let mut assignments = LaneAssignments::new();

    for &racer_id in racer_ids {
        let racer_usage = usage.entry(racer_id).or_default();

        let Some((index, lane)) = available
            .iter()
            .copied()
            .enumerate()
            .min_by_key(|(_, lane)| racer_usage.get(lane).copied().unwrap_or(0))
        else {
            log::warn!(
                "No lane left for racer {}, {} lanes on track",
                racer_id,
                lane_count
            );
            break;
        };

        available.remove(index);
        *racer_usage.entry(lane).or_insert(0) += 1;
        assignments.insert(lane, Some(racer_id));
    }

    for lane in available {
        assignments.insert(lane, None);
    }

    assignments
}

/// Generate the next regular heat from the active roster
///
/// Does not modify the state; the caller appends the heat (see
/// [`generate_next_heat`]). A configuration that fails
/// [`TournamentConfig::validate`](super::models::TournamentConfig::validate)
/// is rejected before any racer is placed.
pub fn generate_heat(state: &TournamentState) -> TournamentResult<Heat> {
    state.config.validate()?;

    let mut sorted = active_racers(state);
    if sorted.is_empty() {
        return Err(TournamentError::NoActiveRacers);
    }

    let lane_count = state.config.lane_count;
    let heat_number = state.current_heat_number + 1;

    // Stable: equal points keep roster order
    sorted.sort_by_key(|racer| racer.points);

    let num_races = sorted.len().div_ceil(lane_count as usize);
    let mut buckets: Vec<Vec<RacerId>> = vec![Vec::new(); num_races];
    for (index, racer) in sorted.iter().enumerate() {
        buckets[index % num_races].push(racer.id);
    }

    let mut usage = lane_usage(state);
    let races: Vec<Race> = buckets
        .iter()
        .enumerate()
        .map(|(index, racer_ids)| {
            let lane_assignments = assign_lanes(racer_ids, &mut usage, lane_count);
            Race {
                id: Uuid::new_v4(),
                heat_number,
                race_number: state.current_race_number + index as u32 + 1,
                is_final_race: false,
                lane_assignments,
                results: None,
                completed_at: None,
            }
        })
        .collect();

    log::info!(
        "Generated heat {} with {} race(s) for {} active racer(s)",
        heat_number,
        races.len(),
        sorted.len()
    );
    for race in &races {
        log::debug!("Race #{} lanes: {:?}", race.race_number, race.lane_assignments);
    }

    Ok(Heat {
        heat_number,
        races,
        is_complete: false,
        generated_at: Utc::now(),
    })
}

/// Generate the final race holding every active racer
pub fn generate_final_race(state: &TournamentState) -> TournamentResult<Race> {
    state.config.validate()?;

    let finalists: Vec<&Racer> = active_racers(state);
    if finalists.is_empty() {
        return Err(TournamentError::NoActiveRacers);
    }

    let lane_count = state.config.lane_count;
    if finalists.len() > lane_count as usize {
        return Err(TournamentError::TooManyFinalists {
            active: finalists.len(),
            lanes: lane_count,
        });
    }

    let racer_ids: Vec<RacerId> = finalists.iter().map(|racer| racer.id).collect();
    let mut usage = lane_usage(state);
    let lane_assignments = assign_lanes(&racer_ids, &mut usage, lane_count);

    let race = Race {
        id: Uuid::new_v4(),
        heat_number: FINAL_HEAT_NUMBER,
        race_number: state.current_race_number + 1,
        is_final_race: true,
        lane_assignments,
        results: None,
        completed_at: None,
    };

    log::info!(
        "Generated final race #{} with {} finalist(s)",
        race.race_number,
        racer_ids.len()
    );

    Ok(race)
}

/// Whether the active field is small enough for the final race
pub fn should_trigger_final_race(state: &TournamentState) -> bool {
    let active = active_racers(state).len();
    active > 0 && active <= state.config.lane_count as usize
}

/// Whether the operator may generate the next heat or final right now
pub fn can_generate_next_heat(state: &TournamentState) -> bool {
    state.r#final.is_none()
        && state
            .current_heat()
            .is_none_or(|heat| heat.all_races_completed())
        && !active_racers(state).is_empty()
}

/// Advance the tournament by one heat, or schedule the final
///
/// Refuses while the current heat has pending races or once the final
/// exists. `current_race_number` moves to the highest race number handed
/// out so the next heat continues the sequence.
pub fn generate_next_heat(state: &TournamentState) -> TournamentResult<TournamentState> {
    if state.r#final.is_some() {
        return Err(TournamentError::FinalAlreadyScheduled);
    }

    if let Some(heat) = state.current_heat().filter(|heat| !heat.all_races_completed()) {
        return Err(TournamentError::HeatInProgress {
            heat_number: heat.heat_number,
        });
    }

    let mut next = state.clone();

    if should_trigger_final_race(state) {
        let race = generate_final_race(state)?;
        next.current_race_number = next.current_race_number.max(race.race_number);
        next.r#final = Some(race);
        return Ok(next);
    }

    let heat = generate_heat(state)?;
    next.current_heat_number = heat.heat_number;
    if let Some(last) = heat.races.last() {
        next.current_race_number = next.current_race_number.max(last.race_number);
    }
    next.heats.push(heat);
    Ok(next)
}

/// Replace the current heat with a freshly generated one
///
/// Only allowed while none of its races have completed. The replacement
/// keeps the heat number, ignores the discarded heat's lane usage, and
/// takes new race numbers past the ones already issued.
pub fn regenerate_current_heat(state: &TournamentState) -> TournamentResult<TournamentState> {
    let current = state.current_heat().ok_or(TournamentError::NoCurrentHeat)?;
    if current.any_race_completed() {
        return Err(TournamentError::HeatAlreadyStarted {
            heat_number: current.heat_number,
        });
    }

    let heat_number = current.heat_number;
    let mut next = state.clone();
    next.heats.retain(|heat| heat.heat_number != heat_number);
    next.current_heat_number = heat_number - 1;

    let heat = generate_heat(&next)?;
    next.current_heat_number = heat.heat_number;
    if let Some(last) = heat.races.last() {
        next.current_race_number = next.current_race_number.max(last.race_number);
    }
    next.heats.push(heat);

    log::info!("Regenerated heat {}", heat_number);
    Ok(next)
}

/// The race to run next: first pending race of the current heat, else the
/// pending final
pub fn current_race(state: &TournamentState) -> Option<&Race> {
    state
        .current_heat()
        .and_then(|heat| heat.races.iter().find(|race| !race.is_completed()))
        .or_else(|| state.r#final.as_ref().filter(|race| !race.is_completed()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::models::{RaceResults, RacerUpdate, TournamentConfig};
    use crate::tournament::roster::{add_racer, update_racer};
    use crate::tournament::standings::complete_race;
    use std::collections::HashSet;

    fn tournament(racers: usize, lanes: u32, threshold: u32) -> TournamentState {
        (0..racers).fold(
            TournamentState::new(TournamentConfig::new(lanes, threshold)),
            |state, i| add_racer(&state, &format!("Racer {}", i + 1), None, None),
        )
    }

    fn lane_order_results(race: &Race) -> RaceResults {
        race.lane_assignments
            .iter()
            .filter(|(_, id)| id.is_some())
            .enumerate()
            .map(|(idx, (&lane, _))| (lane, idx as u32 + 1))
            .collect()
    }

    fn occupied(race: &Race) -> usize {
        race.racer_ids().count()
    }

    #[test]
    fn test_generate_heat_no_active_racers() {
        let state = TournamentState::default();
        assert_eq!(generate_heat(&state), Err(TournamentError::NoActiveRacers));
        assert_eq!(generate_final_race(&state), Err(TournamentError::NoActiveRacers));
    }

    #[test]
    fn test_invalid_lane_count_rejected() {
        let mut state = tournament(5, 4, 5);
        state.config.lane_count = 0;
        assert!(matches!(generate_heat(&state), Err(TournamentError::InvalidConfig(_))));
        assert!(matches!(
            generate_next_heat(&state),
            Err(TournamentError::InvalidConfig(_))
        ));

        state.config.lane_count = 1;
        let state = (0..4).fold(state, |state, _| {
            let id = state.racers[0].id;
            crate::tournament::roster::delete_racer(&state, id).unwrap()
        });
        assert_eq!(state.racers.len(), 1);
        assert!(matches!(
            generate_final_race(&state),
            Err(TournamentError::InvalidConfig(_))
        ));
        assert!(matches!(
            generate_next_heat(&state),
            Err(TournamentError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_odd_field_splits_three_and_two() {
        let state = tournament(5, 4, 5);
        let heat = generate_heat(&state).unwrap();

        assert_eq!(heat.heat_number, 1);
        assert_eq!(heat.races.len(), 2);
        assert_eq!(occupied(&heat.races[0]), 3);
        assert_eq!(occupied(&heat.races[1]), 2);

        let seen: Vec<RacerId> = heat.races.iter().flat_map(Race::racer_ids).collect();
        let unique: HashSet<RacerId> = seen.iter().copied().collect();
        assert_eq!(seen.len(), 5);
        assert_eq!(unique.len(), 5);
    }

    #[test]
    fn test_round_robin_bucketing_on_point_order() {
        let mut state = tournament(6, 4, 20);
        for (racer, points) in state.racers.iter_mut().zip([5, 0, 4, 1, 3, 2]) {
            racer.points = points;
        }
        let heat = generate_heat(&state).unwrap();

        // Sorted by points: #2(0) #4(1) #6(2) #5(3) #3(4) #1(5)
        let cars = |race: &Race| -> Vec<u32> {
            race.racer_ids()
                .map(|id| state.racers.iter().find(|r| r.id == id).unwrap().car_number)
                .collect()
        };
        // First-time lanes fill in bucket order
        assert_eq!(cars(&heat.races[0]), vec![2, 6, 3]);
        assert_eq!(cars(&heat.races[1]), vec![4, 5, 1]);
    }

    #[test]
    fn test_race_numbers_sequential_from_watermark() {
        let mut state = tournament(9, 4, 5);
        state.current_heat_number = 2;
        state.current_race_number = 7;

        let heat = generate_heat(&state).unwrap();
        assert_eq!(heat.heat_number, 3);
        let numbers: Vec<u32> = heat.races.iter().map(|r| r.race_number).collect();
        assert_eq!(numbers, vec![8, 9, 10]);
        assert!(heat.races.iter().all(|r| r.heat_number == 3 && !r.is_final_race));
        assert!(!heat.is_complete);
    }

    #[test]
    fn test_empty_lanes_are_recorded() {
        let state = tournament(3, 4, 5);
        let race = generate_final_race(&state).unwrap();
        assert_eq!(race.lane_assignments.len(), 4);
        assert_eq!(race.lane_assignments.get(&4), Some(&None));
        assert_eq!(occupied(&race), 3);
    }

    #[test]
    fn test_assign_lanes_prefers_least_used_lane() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let mut usage = LaneUsage::new();
        usage.insert(a, BTreeMap::from([(1, 2), (2, 0), (3, 1), (4, 0)]));
        usage.insert(b, BTreeMap::from([(1, 0), (2, 0), (3, 0), (4, 3)]));

        let assignments = assign_lanes(&[a, b], &mut usage, 4);

        // a: lanes 2 and 4 tie at zero, lowest wins
        assert_eq!(assignments.get(&2), Some(&Some(a)));
        // b: lane 2 gone, lanes 1 and 3 tie at zero
        assert_eq!(assignments.get(&1), Some(&Some(b)));
        assert_eq!(assignments.get(&3), Some(&None));
        assert_eq!(assignments.get(&4), Some(&None));
        assert_eq!(usage[&a][&2], 1);
        assert_eq!(usage[&b][&1], 1);
    }

    #[test]
    fn test_lane_usage_counts_pending_races() {
        let state = generate_next_heat(&tournament(5, 4, 5)).unwrap();
        let usage = lane_usage(&state);
        for racer in &state.racers {
            let total: u32 = usage[&racer.id].values().sum();
            assert_eq!(total, 1);
        }
    }

    #[test]
    fn test_second_heat_avoids_repeating_lanes() {
        let mut state = tournament(8, 4, 50);
        for _ in 0..2 {
            state = generate_next_heat(&state).unwrap();
            let races = state.heats.last().unwrap().races.clone();
            for race in &races {
                state = complete_race(&state, race.id, lane_order_results(race)).unwrap();
            }
        }

        let usage = lane_usage(&state);
        for racer in &state.racers {
            assert!(usage[&racer.id].values().all(|&count| count <= 1));
        }
    }

    #[test]
    fn test_generate_final_rejects_large_field() {
        let state = tournament(5, 4, 5);
        assert_eq!(
            generate_final_race(&state),
            Err(TournamentError::TooManyFinalists {
                active: 5,
                lanes: 4
            })
        );
    }

    #[test]
    fn test_generate_final_race_fields() {
        let mut state = tournament(4, 4, 5);
        state.current_race_number = 11;
        let race = generate_final_race(&state).unwrap();
        assert_eq!(race.heat_number, 0);
        assert!(race.is_final_race);
        assert_eq!(race.race_number, 12);
        assert_eq!(occupied(&race), 4);
    }

    #[test]
    fn test_withdrawn_racers_are_not_scheduled() {
        let state = tournament(5, 4, 5);
        let withdrawn_id = state.racers[0].id;
        let state = update_racer(
            &state,
            withdrawn_id,
            RacerUpdate {
                withdrawn: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

        assert!(should_trigger_final_race(&state));
        let state = generate_next_heat(&state).unwrap();
        let race = state.r#final.as_ref().unwrap();
        assert!(race.lane_of(withdrawn_id).is_none());
        assert!(state.heats.is_empty());
    }

    #[test]
    fn test_generate_next_heat_updates_counters() {
        let state = tournament(9, 4, 5);
        let before = state.clone();
        let state = generate_next_heat(&state).unwrap();

        assert_eq!(before.heats.len(), 0);
        assert_eq!(state.heats.len(), 1);
        assert_eq!(state.current_heat_number, 1);
        assert_eq!(state.current_race_number, 3);
    }

    #[test]
    fn test_generate_next_heat_blocked_while_heat_pending() {
        let state = generate_next_heat(&tournament(6, 4, 5)).unwrap();
        assert!(!can_generate_next_heat(&state));
        assert_eq!(
            generate_next_heat(&state),
            Err(TournamentError::HeatInProgress { heat_number: 1 })
        );
    }

    #[test]
    fn test_generate_next_heat_after_final_fails() {
        let state = generate_next_heat(&tournament(3, 4, 5)).unwrap();
        assert!(state.r#final.is_some());
        assert_eq!(state.current_race_number, 1);
        assert_eq!(
            generate_next_heat(&state),
            Err(TournamentError::FinalAlreadyScheduled)
        );
    }

    #[test]
    fn test_race_numbers_never_reused_across_heats() {
        let mut state = tournament(12, 4, 50);
        state = generate_next_heat(&state).unwrap();
        let races = state.heats[0].races.clone();
        for race in &races {
            state = complete_race(&state, race.id, lane_order_results(race)).unwrap();
        }
        state = generate_next_heat(&state).unwrap();

        let numbers: Vec<u32> = state.all_races().iter().map(|r| r.race_number).collect();
        assert_eq!(numbers, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_regenerate_current_heat() {
        let state = generate_next_heat(&tournament(6, 4, 5)).unwrap();
        let old_ids: HashSet<Uuid> = state.heats[0].races.iter().map(|r| r.id).collect();

        let state = regenerate_current_heat(&state).unwrap();
        assert_eq!(state.heats.len(), 1);
        assert_eq!(state.current_heat_number, 1);

        let heat = &state.heats[0];
        assert_eq!(heat.heat_number, 1);
        assert!(heat.races.iter().all(|r| !old_ids.contains(&r.id)));
        let numbers: Vec<u32> = heat.races.iter().map(|r| r.race_number).collect();
        assert_eq!(numbers, vec![3, 4]);
        assert_eq!(state.current_race_number, 4);

        // Discarded assignments do not count toward lane usage
        let usage = lane_usage(&state);
        for racer in &state.racers {
            assert_eq!(usage[&racer.id].values().sum::<u32>(), 1);
        }
    }

    #[test]
    fn test_regenerate_rejected_once_racing_started() {
        assert_eq!(
            regenerate_current_heat(&tournament(6, 4, 5)),
            Err(TournamentError::NoCurrentHeat)
        );

        let state = generate_next_heat(&tournament(6, 4, 5)).unwrap();
        let race = state.heats[0].races[0].clone();
        let state = complete_race(&state, race.id, lane_order_results(&race)).unwrap();
        assert_eq!(
            regenerate_current_heat(&state),
            Err(TournamentError::HeatAlreadyStarted { heat_number: 1 })
        );
    }

    #[test]
    fn test_current_race_walks_heat_then_final() {
        let state = tournament(6, 4, 5);
        assert!(current_race(&state).is_none());

        let state = generate_next_heat(&state).unwrap();
        let first = state.heats[0].races[0].clone();
        assert_eq!(current_race(&state).map(|r| r.id), Some(first.id));

        let state = complete_race(&state, first.id, lane_order_results(&first)).unwrap();
        assert_eq!(
            current_race(&state).map(|r| r.id),
            Some(state.heats[0].races[1].id)
        );
    }
}
