//! Integration tests for snapshot persistence
//!
//! These tests verify that a tournament saved mid-run comes back from disk
//! unchanged and that concurrent writers are kept apart by the sequence.

use derby_master::store::{
    FileSnapshotStore, MemorySnapshotStore, SnapshotRepository, StoreConfig, StoreError,
};
use derby_master::tournament::{
    self, ConfigUpdate, RaceResults, TournamentConfig, TournamentError, TournamentState,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use uuid::Uuid;

struct TempPath(PathBuf);

impl TempPath {
    fn new() -> Self {
        Self(std::env::temp_dir().join(format!("derby-integration-{}.json", Uuid::new_v4())))
    }
}

impl Drop for TempPath {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.0);
    }
}

/// Five racers, first heat generated and its first race run
fn tournament_in_progress() -> TournamentState {
    let mut state = TournamentState::new(TournamentConfig::new(4, 5));
    state = tournament::add_racer(&state, "Alice", Some("Owls"), Some(4.5));
    for name in ["Bob", "Cara", "Dan", "Eve"] {
        state = tournament::add_racer(&state, name, None, None);
    }
    state = tournament::generate_next_heat(&state).unwrap();

    let race = state.heats[0].races[0].clone();
    let results: RaceResults = race
        .lane_assignments
        .iter()
        .filter(|(_, racer)| racer.is_some())
        .enumerate()
        .map(|(index, (&lane, _))| (lane, index as u32 + 1))
        .collect();
    tournament::complete_race(&state, race.id, results).unwrap()
}

#[test]
fn test_file_round_trip_preserves_state() {
    let tmp = TempPath::new();
    let store = FileSnapshotStore::from_config(&StoreConfig {
        state_path: tmp.0.clone(),
    });
    let state = tournament_in_progress();

    let sequence = store.save(0, &state).unwrap();
    let loaded = store.load().unwrap().unwrap();

    assert_eq!(loaded.sequence, sequence);
    assert_eq!(loaded.state, state);
    assert!(loaded.state.heats[0].races[0].is_completed());
    assert!(loaded.state.r#final.is_none());
}

#[test]
fn test_reopened_store_continues_sequence() {
    let tmp = TempPath::new();
    let state = tournament_in_progress();

    {
        let store = FileSnapshotStore::new(&tmp.0);
        store.save(0, &state).unwrap();
    }

    let store = FileSnapshotStore::new(&tmp.0);
    assert_eq!(store.sequence().unwrap(), 1);
    assert!(!store.has_changed_since(1).unwrap());

    let next = tournament::add_racer(&state, "Finn", None, None);
    assert_eq!(store.save(1, &next).unwrap(), 2);
    assert!(store.has_changed_since(1).unwrap());
}

#[test]
fn test_snapshot_file_uses_camel_case_fields() {
    let tmp = TempPath::new();
    let store = FileSnapshotStore::new(&tmp.0);
    store.save(0, &tournament_in_progress()).unwrap();

    let json = std::fs::read_to_string(&tmp.0).unwrap();
    assert!(json.contains("\"laneAssignments\""));
    assert!(json.contains("\"currentRaceNumber\""));
    assert!(json.contains("\"eliminationThreshold\""));
    // Absent optional fields are omitted rather than written as null
    assert!(!json.contains("\"final\""));
}

#[test]
fn test_hand_edited_lane_count_is_rejected_by_core() {
    let tmp = TempPath::new();
    let store = FileSnapshotStore::new(&tmp.0);
    let mut state = TournamentState::new(TournamentConfig::new(4, 5));
    for name in ["Alice", "Bob", "Cara", "Dan", "Eve"] {
        state = tournament::add_racer(&state, name, None, None);
    }
    store.save(0, &state).unwrap();

    let json = std::fs::read_to_string(&tmp.0).unwrap();
    assert!(json.contains("\"laneCount\": 4"));
    std::fs::write(&tmp.0, json.replace("\"laneCount\": 4", "\"laneCount\": 0")).unwrap();

    let loaded = store.load().unwrap().unwrap().state;
    assert_eq!(loaded.config.lane_count, 0);
    assert!(matches!(
        tournament::generate_next_heat(&loaded),
        Err(TournamentError::InvalidConfig(_))
    ));

    // The operator can repair the config and carry on
    let repaired = tournament::update_config(
        &loaded,
        ConfigUpdate {
            lane_count: Some(4),
            ..Default::default()
        },
    )
    .unwrap();
    assert!(tournament::generate_next_heat(&repaired).is_ok());
}

#[test]
fn test_only_one_concurrent_writer_wins() {
    let store = Arc::new(MemorySnapshotStore::new());
    let base = TournamentState::default();
    store.save(0, &base).unwrap();

    let handles: Vec<_> = (0..8)
        .map(|index| {
            let store = Arc::clone(&store);
            let state = tournament::add_racer(&base, &format!("Racer {index}"), None, None);
            thread::spawn(move || store.save(1, &state))
        })
        .collect();

    let outcomes: Vec<_> = handles
        .into_iter()
        .map(|handle| handle.join().unwrap())
        .collect();
    let winners = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    let stale = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(StoreError::StaleSnapshot { .. })))
        .count();

    assert_eq!(winners, 1);
    assert_eq!(stale, 7);
    assert_eq!(store.load().unwrap().unwrap().state.racers.len(), 1);
}
