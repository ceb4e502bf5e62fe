//! Operator commands: parsing and execution against a snapshot store.

use anyhow::{Context, bail};
use derby_master::{
    SnapshotRepository, TournamentConfig, TournamentState, format_placement, render_report,
    tournament::{
        self, ConfigUpdate, Race, RaceResults, Racer, RacerId, RacerUpdate, racer_by_id,
    },
};
use pico_args::Arguments;
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during command parsing.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// No subcommand given.
    #[error("Missing command. Run with --help to see available commands")]
    MissingCommand,
    /// Unrecognized subcommand.
    #[error("Unrecognized command '{0}'. Run with --help to see available commands")]
    UnrecognizedCommand(String),
    /// Bad or missing argument.
    #[error("Invalid arguments: {0}")]
    InvalidArgument(String),
    /// Leftover arguments nobody consumed.
    #[error("Unexpected arguments: {0}")]
    UnexpectedArguments(String),
}

impl From<pico_args::Error> for ParseError {
    fn from(err: pico_args::Error) -> Self {
        ParseError::InvalidArgument(err.to_string())
    }
}

/// A single operator command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Init {
        lanes: Option<u32>,
        threshold: Option<u32>,
        force: bool,
    },
    Add {
        name: String,
        team: Option<String>,
        weight: Option<f64>,
    },
    Update {
        racer: String,
        update: RacerUpdate,
    },
    Delete {
        racer: String,
    },
    Config(ConfigUpdate),
    NextHeat,
    Regenerate,
    Complete {
        race: String,
        placements: Vec<u32>,
    },
    Status,
    Standings,
    History {
        racer: String,
    },
    Report,
}

impl Command {
    /// Whether running this command writes a new snapshot
    pub fn is_mutating(&self) -> bool {
        !matches!(
            self,
            Command::Status | Command::Standings | Command::History { .. } | Command::Report
        )
    }
}

/// Parse the subcommand and its arguments.
pub fn parse_command(mut pargs: Arguments) -> Result<Command, ParseError> {
    let subcommand = pargs.subcommand()?.ok_or(ParseError::MissingCommand)?;

    let command = match subcommand.as_str() {
        "init" => Command::Init {
            lanes: pargs.opt_value_from_str("--lanes")?,
            threshold: pargs.opt_value_from_str("--threshold")?,
            force: pargs.contains("--force"),
        },
        "add" => {
            let team = pargs.opt_value_from_str("--team")?;
            let weight = pargs.opt_value_from_str("--weight")?;
            Command::Add {
                name: pargs.free_from_str()?,
                team,
                weight,
            }
        }
        "update" => parse_update(&mut pargs)?,
        "delete" => Command::Delete {
            racer: pargs.free_from_str()?,
        },
        "config" => Command::Config(ConfigUpdate {
            lane_count: pargs.opt_value_from_str("--lanes")?,
            elimination_threshold: pargs.opt_value_from_str("--threshold")?,
        }),
        "next-heat" => Command::NextHeat,
        "regenerate" => Command::Regenerate,
        "complete" => {
            let race = pargs.free_from_str()?;
            let mut placements = Vec::new();
            while let Some(placement) = pargs.opt_free_from_str::<u32>()? {
                placements.push(placement);
            }
            if placements.is_empty() {
                return Err(ParseError::InvalidArgument(
                    "complete needs one placement per occupied lane".to_string(),
                ));
            }
            Command::Complete { race, placements }
        }
        "status" => Command::Status,
        "standings" => Command::Standings,
        "history" => Command::History {
            racer: pargs.free_from_str()?,
        },
        "report" => Command::Report,
        other => return Err(ParseError::UnrecognizedCommand(other.to_string())),
    };

    let remaining = pargs.finish();
    if !remaining.is_empty() {
        let leftover: Vec<String> = remaining
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        return Err(ParseError::UnexpectedArguments(leftover.join(" ")));
    }

    Ok(command)
}

fn parse_update(pargs: &mut Arguments) -> Result<Command, ParseError> {
    let withdraw = pargs.contains("--withdraw");
    let reinstate = pargs.contains("--reinstate");
    if withdraw && reinstate {
        return Err(ParseError::InvalidArgument(
            "--withdraw and --reinstate are mutually exclusive".to_string(),
        ));
    }

    let name = pargs.opt_value_from_str("--name")?;
    let team = if pargs.contains("--no-team") {
        Some(None)
    } else {
        pargs.opt_value_from_str::<_, String>("--team")?.map(Some)
    };
    let weight = if pargs.contains("--no-weight") {
        Some(None)
    } else {
        pargs.opt_value_from_str::<_, f64>("--weight")?.map(Some)
    };
    let withdrawn = match (withdraw, reinstate) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
    };

    Ok(Command::Update {
        racer: pargs.free_from_str()?,
        update: RacerUpdate {
            name,
            team,
            weight,
            withdrawn,
        },
    })
}

/// Run a command: load the snapshot, apply one operation, save it back.
///
/// Returns the text to show the operator.
pub fn execute(command: Command, store: &dyn SnapshotRepository) -> anyhow::Result<String> {
    let loaded = store.load()?;
    let sequence = match &loaded {
        Some(snapshot) => snapshot.sequence,
        None => store.sequence()?,
    };

    if let Command::Init {
        lanes,
        threshold,
        force,
    } = command
    {
        if loaded.is_some() && !force {
            bail!("A tournament already exists; pass --force to start over");
        }
        let mut config = TournamentConfig::default();
        config.lane_count = lanes.unwrap_or(config.lane_count);
        config.elimination_threshold = threshold.unwrap_or(config.elimination_threshold);
        config.validate().map_err(|e| anyhow::anyhow!(e.client_message()))?;

        store.save(sequence, &TournamentState::new(config))?;
        return Ok("Started a new tournament".to_string());
    }

    let state = loaded
        .map(|snapshot| snapshot.state)
        .unwrap_or_default();
    let mutating = command.is_mutating();
    let (next, message) = apply(command, &state)?;

    if mutating {
        store.save(sequence, &next)?;
    }
    Ok(message)
}

fn apply(command: Command, state: &TournamentState) -> anyhow::Result<(TournamentState, String)> {
    let unchanged = || state.clone();

    let outcome = match command {
        Command::Init { .. } => bail!("A tournament can only be started from an empty store"),
        Command::Add { name, team, weight } => {
            let next = tournament::add_racer(state, &name, team.as_deref(), weight);
            let message = next
                .racers
                .last()
                .map(|racer| format!("Registered #{} {} ({})", racer.car_number, racer.name, racer.id))
                .unwrap_or_default();
            (next, message)
        }
        Command::Update { racer, update } => {
            let racer_id = resolve_racer(state, &racer)?;
            let next = checked(tournament::update_racer(state, racer_id, update))?;
            (next, format!("Updated racer {racer}"))
        }
        Command::Delete { racer } => {
            let racer_id = resolve_racer(state, &racer)?;
            let next = checked(tournament::delete_racer(state, racer_id))?;
            (next, format!("Deleted racer {racer}"))
        }
        Command::Config(update) => {
            let next = checked(tournament::update_config(state, update))?;
            let message = format!(
                "{} lanes, elimination at {} points",
                next.config.lane_count, next.config.elimination_threshold
            );
            (next, message)
        }
        Command::NextHeat => {
            let next = checked(tournament::generate_next_heat(state))?;
            let message = match (&next.r#final, next.heats.last()) {
                (Some(race), _) => format!("Final race scheduled\n{}", describe_race(&next, race)),
                (None, Some(heat)) => heat
                    .races
                    .iter()
                    .map(|race| describe_race(&next, race))
                    .collect::<Vec<_>>()
                    .join("\n"),
                (None, None) => String::new(),
            };
            (next, message)
        }
        Command::Regenerate => {
            let next = checked(tournament::regenerate_current_heat(state))?;
            let message = next
                .current_heat()
                .map(|heat| {
                    heat.races
                        .iter()
                        .map(|race| describe_race(&next, race))
                        .collect::<Vec<_>>()
                        .join("\n")
                })
                .unwrap_or_default();
            (next, message)
        }
        Command::Complete { race, placements } => {
            let target = resolve_race(state, &race)?;
            let results = results_in_lane_order(target, &placements)?;
            let race_number = target.race_number;
            let next = checked(tournament::complete_race(state, target.id, results))?;
            let message = if next.is_complete {
                format!("Recorded race #{race_number}. Tournament complete!")
            } else {
                format!("Recorded race #{race_number}")
            };
            (next, message)
        }
        Command::Status => (unchanged(), status(state)),
        Command::Standings => (unchanged(), standings(state)),
        Command::History { racer } => {
            let racer_id = resolve_racer(state, &racer)?;
            (unchanged(), history(state, racer_id))
        }
        Command::Report => (unchanged(), render_report(state)),
    };

    Ok(outcome)
}

fn checked<T>(result: tournament::TournamentResult<T>) -> anyhow::Result<T> {
    result.map_err(|e| {
        log::debug!("Operation rejected: {e}");
        anyhow::anyhow!(e.client_message())
    })
}

/// Resolve a racer by car number (`7` or `#7`) or by ID
fn resolve_racer(state: &TournamentState, reference: &str) -> anyhow::Result<RacerId> {
    let trimmed = reference.trim_start_matches('#');
    if let Ok(car_number) = trimmed.parse::<u32>() {
        return state
            .racers
            .iter()
            .find(|racer| racer.car_number == car_number)
            .map(|racer| racer.id)
            .with_context(|| format!("No racer with car #{car_number}"));
    }

    reference
        .parse::<RacerId>()
        .with_context(|| format!("'{reference}' is neither a car number nor a racer ID"))
}

/// Resolve a race by race number or by ID
fn resolve_race<'a>(state: &'a TournamentState, reference: &str) -> anyhow::Result<&'a Race> {
    if let Ok(race_number) = reference.trim_start_matches('#').parse::<u32>() {
        return state
            .all_races()
            .into_iter()
            .find(|race| race.race_number == race_number)
            .with_context(|| format!("No race #{race_number}"));
    }

    let race_id = reference
        .parse()
        .with_context(|| format!("'{reference}' is neither a race number nor a race ID"))?;
    state
        .find_race(race_id)
        .with_context(|| format!("No race with ID {race_id}"))
}

/// Pair placements with the race's occupied lanes, in lane order
fn results_in_lane_order(race: &Race, placements: &[u32]) -> anyhow::Result<RaceResults> {
    let lanes: Vec<u32> = race
        .lane_assignments
        .iter()
        .filter(|(_, racer)| racer.is_some())
        .map(|(&lane, _)| lane)
        .collect();

    if placements.len() != lanes.len() {
        bail!(
            "Race #{} has {} occupied lanes but {} placements were given",
            race.race_number,
            lanes.len(),
            placements.len()
        );
    }

    let mut seen = HashSet::new();
    for &placement in placements {
        if !seen.insert(placement) {
            bail!("{} place was given twice", format_placement(placement));
        }
    }

    Ok(lanes.into_iter().zip(placements.iter().copied()).collect())
}

fn racer_name(state: &TournamentState, racer_id: RacerId) -> String {
    racer_by_id(state, racer_id)
        .map(|racer| format!("#{} {}", racer.car_number, racer.name))
        .unwrap_or_else(|| "(removed)".to_string())
}

fn describe_race(state: &TournamentState, race: &Race) -> String {
    let title = if race.is_final_race {
        format!("Final race #{}", race.race_number)
    } else {
        format!("Heat {} race #{}", race.heat_number, race.race_number)
    };
    let lanes: Vec<String> = race
        .lane_assignments
        .iter()
        .map(|(lane, racer)| match racer {
            Some(id) => format!("  Lane {lane}: {}", racer_name(state, *id)),
            None => format!("  Lane {lane}: (empty)"),
        })
        .collect();
    format!("{title}\n{}", lanes.join("\n"))
}

fn status(state: &TournamentState) -> String {
    if state.is_complete {
        return "Tournament complete".to_string();
    }
    match tournament::current_race(state) {
        Some(race) => format!("Up next: {}", describe_race(state, race)),
        None if tournament::can_generate_next_heat(state) => {
            "Ready to generate the next heat".to_string()
        }
        None => format!(
            "{} racers registered, {} active",
            state.racers.len(),
            tournament::active_racers(state).len()
        ),
    }
}

fn standings(state: &TournamentState) -> String {
    let threshold = state.config.elimination_threshold;
    tournament::current_standings(state)
        .into_iter()
        .enumerate()
        .map(|(index, racer): (usize, &Racer)| {
            let mark = if racer.withdrawn {
                " [WITHDRAWN]"
            } else if racer.is_eliminated(threshold) {
                " [ELIMINATED]"
            } else {
                ""
            };
            format!(
                "{:>5}  #{} {}: {} pts, {} races{}",
                format_placement(index as u32 + 1),
                racer.car_number,
                racer.name,
                racer.points,
                racer.races,
                mark
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn history(state: &TournamentState, racer_id: RacerId) -> String {
    tournament::racer_history(state, racer_id)
        .into_iter()
        .map(|entry| {
            let heat = if entry.heat_number == 0 {
                "Final".to_string()
            } else {
                format!("Heat {}", entry.heat_number)
            };
            let result = entry
                .placement
                .map(|placement| {
                    format!(
                        "{} (+{} pts)",
                        format_placement(placement),
                        entry.points_earned.unwrap_or(0)
                    )
                })
                .unwrap_or_else(|| "pending".to_string());
            let opponents: Vec<String> = entry
                .opponents
                .iter()
                .map(|id| racer_name(state, *id))
                .collect();
            format!(
                "{heat} race #{} lane {}: {result} vs {}",
                entry.race_number,
                entry.lane,
                opponents.join(", ")
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}
