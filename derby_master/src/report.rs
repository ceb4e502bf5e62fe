//! Plain-text tournament reports for printing.

use std::fmt;

use crate::tournament::{Race, Racer, RacerId, TournamentState, current_standings, racer_by_id};

/// Format a placement as an ordinal ("1st", "2nd", ...)
pub fn format_placement(place: u32) -> String {
    let suffix = match (place % 10, place % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{place}{suffix}")
}

/// Status label for a racer under the current threshold
pub fn racer_status(racer: &Racer, threshold: u32) -> &'static str {
    if racer.withdrawn {
        "Withdrawn"
    } else if racer.is_eliminated(threshold) {
        "Eliminated"
    } else {
        "Active"
    }
}

/// Printable view of a tournament: the roster, every race, and the standings
pub struct Report<'a>(pub &'a TournamentState);

impl fmt::Display for Report<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_report(out, self.0)
    }
}

/// Render the roster, every race, and the standings
pub fn render_report(state: &TournamentState) -> String {
    Report(state).to_string()
}

fn write_report(out: &mut fmt::Formatter<'_>, state: &TournamentState) -> fmt::Result {
    let threshold = state.config.elimination_threshold;

    writeln!(
        out,
        "Tournament: {} lanes, elimination at {} points, format {}",
        state.config.lane_count, threshold, state.config.race_format
    )?;
    writeln!(out)?;

    writeln!(out, "Registered Racers ({})", state.racers.len())?;
    writeln!(
        out,
        "{:>4}  {:<20} {:<14} {:>7} {:>5} {:>6}  Status",
        "Car", "Name", "Team", "Weight", "Races", "Points"
    )?;
    let mut by_car: Vec<&Racer> = state.racers.iter().collect();
    by_car.sort_by_key(|racer| racer.car_number);
    for racer in by_car {
        let weight = racer
            .weight
            .map(|w| format!("{w} oz"))
            .unwrap_or_else(|| "-".to_string());
        writeln!(
            out,
            "{:>4}  {:<20} {:<14} {:>7} {:>5} {:>6}  {}",
            racer.car_number,
            racer.name,
            racer.team.as_deref().unwrap_or("-"),
            weight,
            racer.races,
            racer.points,
            racer_status(racer, threshold)
        )?;
    }
    writeln!(out)?;

    let races = state.all_races();
    writeln!(out, "All Races ({})", races.len())?;
    for race in races {
        write_race(out, state, race)?;
    }
    writeln!(out)?;

    match &state.final_standings {
        Some(standings) if state.is_complete => {
            writeln!(out, "Final Standings")?;
            for (index, racer_id) in standings.iter().enumerate() {
                writeln!(
                    out,
                    "{:>5}  {}",
                    format_placement(index as u32 + 1),
                    racer_label(state, *racer_id)
                )?;
            }
        }
        _ => {
            writeln!(out, "Current Standings")?;
            for (index, racer) in current_standings(state).into_iter().enumerate() {
                writeln!(
                    out,
                    "{:>5}  #{} {} ({} pts)",
                    format_placement(index as u32 + 1),
                    racer.car_number,
                    racer.name,
                    racer.points
                )?;
            }
        }
    }

    Ok(())
}

fn write_race(out: &mut fmt::Formatter<'_>, state: &TournamentState, race: &Race) -> fmt::Result {
    let heat = if race.is_final_race {
        "Final".to_string()
    } else {
        format!("Heat {}", race.heat_number)
    };
    write!(out, "  Race #{:<3} {:<8}", race.race_number, heat)?;

    for (&lane, racer_id) in &race.lane_assignments {
        let car = racer_id
            .and_then(|id| racer_by_id(state, id))
            .map(|racer| format!("#{}", racer.car_number))
            .unwrap_or_else(|| "-".to_string());
        match race.placement_for_lane(lane).filter(|_| race.is_completed()) {
            Some(placement) => write!(out, " L{lane}: {car} {}", format_placement(placement))?,
            None => write!(out, " L{lane}: {car}")?,
        }
    }

    if !race.is_completed() {
        write!(out, " (pending)")?;
    }
    writeln!(out)
}

fn racer_label(state: &TournamentState, racer_id: RacerId) -> String {
    racer_by_id(state, racer_id)
        .map(|racer| format!("#{} {} ({} pts)", racer.car_number, racer.name, racer.points))
        .unwrap_or_else(|| racer_id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tournament::{
        RaceResults, TournamentConfig, add_racer, complete_race, generate_next_heat,
    };

    #[test]
    fn test_format_placement() {
        assert_eq!(format_placement(1), "1st");
        assert_eq!(format_placement(2), "2nd");
        assert_eq!(format_placement(3), "3rd");
        assert_eq!(format_placement(4), "4th");
        assert_eq!(format_placement(11), "11th");
        assert_eq!(format_placement(12), "12th");
        assert_eq!(format_placement(21), "21st");
    }

    #[test]
    fn test_racer_status() {
        let mut racer = Racer::new(1, "Alice".to_string(), None, None);
        assert_eq!(racer_status(&racer, 5), "Active");
        racer.points = 5;
        assert_eq!(racer_status(&racer, 5), "Eliminated");
        racer.withdrawn = true;
        assert_eq!(racer_status(&racer, 5), "Withdrawn");
    }

    #[test]
    fn test_report_lists_racers_races_and_standings() {
        let mut state = TournamentState::new(TournamentConfig::new(4, 5));
        state = add_racer(&state, "Alice", Some("Owls"), Some(5.0));
        state = add_racer(&state, "Bob", None, None);
        state = generate_next_heat(&state).unwrap();

        let report = render_report(&state);
        assert_eq!(report, Report(&state).to_string());
        assert!(report.contains("Registered Racers (2)"));
        assert!(report.contains("Alice"));
        assert!(report.contains("Owls"));
        assert!(report.contains("All Races (1)"));
        assert!(report.contains("Final"));
        assert!(report.contains("(pending)"));
        assert!(report.contains("Current Standings"));

        let final_race = state.r#final.clone().unwrap();
        let results = RaceResults::from([(1, 2), (2, 1)]);
        let state = complete_race(&state, final_race.id, results).unwrap();
        let report = render_report(&state);
        assert!(report.contains("Final Standings"));
        assert!(report.contains("1st  #2 Bob"));
    }
}
