//! Pilot CLI: validate navigation profiles and plan routes offline.
//!
//! Driving a live environment needs concrete [`Perception`] and [`Device`]
//! implementations supplied by the embedding application; the CLI covers the
//! pure side of the crate, so profiles and routes can be checked without a
//! device attached.
//!
//! [`Perception`]: pilot::io::ports::Perception
//! [`Device`]: pilot::io::ports::Device

use clap::{Parser, Subcommand};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use pilot::core::planner::constrained_path;
use pilot::core::types::StateKind;
use pilot::error::{Error, Result};
use pilot::exit_codes;
use pilot::io::profile::load_profile;
use pilot::logging;

#[derive(Parser)]
#[command(name = "pilot", version, about = "Perception-driven state navigator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check a profile against the schema and graph invariants.
    Validate {
        /// Path to the profile JSON.
        profile: PathBuf,
    },
    /// List the states a profile defines.
    States {
        /// Path to the profile JSON.
        profile: PathBuf,
    },
    /// Plan a route between two states without driving anything.
    Plan {
        /// Path to the profile JSON.
        profile: PathBuf,
        /// State to start from.
        #[arg(long)]
        from: String,
        /// State to reach.
        #[arg(long)]
        to: String,
        /// States the route must pass through (repeatable).
        #[arg(long)]
        via: Vec<String>,
    },
}

fn main() {
    logging::init();
    let code = match run() {
        Ok(()) => exit_codes::OK,
        Err(err) => {
            eprintln!("{err}");
            match err {
                Error::NoPathFound { .. } => exit_codes::NO_PATH,
                _ => exit_codes::INVALID,
            }
        }
    };
    std::process::exit(code);
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Validate { profile } => cmd_validate(&profile),
        Command::States { profile } => cmd_states(&profile),
        Command::Plan {
            profile,
            from,
            to,
            via,
        } => cmd_plan(&profile, &from, &to, &via),
    }
}

fn cmd_validate(path: &Path) -> Result<()> {
    let graph = load_profile(path)?;
    println!("{}: {} states", graph.name(), graph.all_states().len());
    Ok(())
}

fn cmd_states(path: &Path) -> Result<()> {
    let graph = load_profile(path)?;
    for state in graph.all_states() {
        println!("{}\t{}", state.name, kind_label(state.kind));
    }
    Ok(())
}

fn cmd_plan(path: &Path, from: &str, to: &str, via: &[String]) -> Result<()> {
    let graph = load_profile(path)?;
    let waypoints: BTreeSet<String> = via.iter().cloned().collect();
    let route = constrained_path(&graph, from, to, &waypoints)?;
    for action in &route.actions {
        println!("{} -> {} ({})", action.source, action.successor, action.name);
    }
    Ok(())
}

fn kind_label(kind: StateKind) -> &'static str {
    match kind {
        StateKind::Normal => "normal",
        StateKind::Jump => "jump",
        StateKind::HorizontalSwipe => "horizontal_swipe",
        StateKind::VerticalSwipe => "vertical_swipe",
    }
}
