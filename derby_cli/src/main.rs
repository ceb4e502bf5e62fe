//! Operator command line for a points-elimination derby.
//!
//! Every invocation loads the saved tournament snapshot, applies one
//! command, and writes the result back.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Error;
use derby_master::FileSnapshotStore;
use log::{debug, error};
use pico_args::Arguments;

use commands::{execute, parse_command};
use config::CliConfig;

const HELP: &str = "\
Run a points-elimination derby tournament

USAGE:
  derby [OPTIONS] COMMAND [ARGS]

COMMANDS:
  init [--lanes N] [--threshold N] [--force]     Start a new tournament
  add NAME [--team T] [--weight W]               Register a racer
  update RACER [--name N] [--team T | --no-team]
         [--weight W | --no-weight]
         [--withdraw | --reinstate]              Edit a racer
  delete RACER                                   Remove a racer (before any race completes)
  config [--lanes N] [--threshold N]             Change lane count or elimination threshold
  next-heat                                      Generate the next heat or the final
  regenerate                                     Redraw the current heat before it starts
  complete RACE PLACEMENT...                     Record placements in lane order
  status                                         Show the next race to run
  standings                                      Show current standings
  history RACER                                  Show one racer's races
  report                                         Print the full tournament report

  RACER is a car number (3 or #3) or a racer ID.
  RACE is a race number or a race ID.

OPTIONS:
  --state      PATH        Snapshot file  [default: env DERBY_STATE_PATH or derby_state.json]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  DERBY_STATE_PATH         Snapshot file location
  RUST_LOG                 Log filter (e.g., info, debug)
";

fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let state_path: Option<PathBuf> = pargs.opt_value_from_str("--state")?;

    env_logger::builder().format_target(false).init();

    let config = CliConfig::from_env(state_path);
    debug!("Using snapshot file {}", config.store.state_path.display());
    let store = FileSnapshotStore::from_config(&config.store);

    let command = match parse_command(pargs) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(2);
        }
    };

    match execute(command, &store) {
        Ok(output) => {
            if !output.is_empty() {
                println!("{output}");
            }
            Ok(())
        }
        Err(err) => {
            error!("{err:#}");
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    }
}
