#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that runs Blast Grid scenarios headlessly.

mod scenario;
mod session;
mod snapshot_transfer;

use std::{fs, path::PathBuf};

use anyhow::{ensure, Context, Result};
use blast_grid_core::Command;
use blast_grid_world::{self as world, snapshot, World};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    scenario::Scenario,
    session::{Outcome, Session},
    snapshot_transfer::SavedSession,
};

/// Runs a scripted Blast Grid scenario and prints its event log.
#[derive(Parser, Debug)]
#[command(name = "blast-grid")]
#[command(about = "Headless Blast Grid scenario runner")]
struct Args {
    /// Scenario file in TOML format.
    scenario: PathBuf,

    /// Overrides the number of ticks declared by the scenario.
    #[arg(long)]
    ticks: Option<u64>,

    /// Resumes a saved session string instead of loading the scenario stage.
    #[arg(long)]
    resume: Option<PathBuf>,

    /// Writes the final world and player state to this file as a session string.
    #[arg(long)]
    export: Option<PathBuf>,

    /// Log filter, overriding `RUST_LOG`.
    #[arg(long)]
    log: Option<String>,
}

/// Entry point for the Blast Grid command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();

    let filter = match &args.log {
        Some(directives) => EnvFilter::try_new(directives)
            .with_context(|| format!("invalid log filter `{directives}`"))?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut scenario = Scenario::load(&args.scenario)?;
    if let Some(ticks) = args.ticks {
        scenario.ticks = ticks;
    }

    let mut session = match &args.resume {
        Some(path) => {
            let encoded = fs::read_to_string(path)
                .with_context(|| format!("failed to read session at {}", path.display()))?;
            let saved = snapshot_transfer::decode(&encoded)
                .with_context(|| format!("failed to decode session at {}", path.display()))?;
            let (columns, rows) = (saved.world.columns, saved.world.rows);
            for player in &saved.players {
                ensure!(
                    player.cell.column() < columns && player.cell.row() < rows,
                    "saved player {} stands outside the stage",
                    player.actor.get()
                );
            }
            let world = World::from_snapshot(saved.world, scenario.engine)
                .context("saved world is inconsistent")?;
            info!(path = %path.display(), players = saved.players.len(), "resumed session");
            Session::resume(world, &saved.players)
        }
        None => {
            let mut world = World::with_config(scenario.engine);
            let mut events = Vec::new();
            world::apply(
                &mut world,
                Command::LoadStage {
                    layout: scenario.layout.clone(),
                },
                &mut events,
            );
            Session::new(world, &scenario.players, events)
        }
    };

    let outcome = session.run(&scenario);

    for logged in session.log() {
        println!("{:>5} {:?}", logged.tick, logged.event);
    }

    match outcome {
        Outcome::ExitReached(actor) => println!("outcome: player {} reached the exit", actor.get()),
        Outcome::AllPlayersDown => println!("outcome: all players down"),
        Outcome::OutOfTicks => println!("outcome: ran out of ticks"),
    }
    let players = session.saved_players();
    for player in &players {
        if player.alive {
            println!(
                "player {} at ({}, {})",
                player.actor.get(),
                player.cell.column(),
                player.cell.row()
            );
        } else {
            println!("player {} is down", player.actor.get());
        }
    }

    if let Some(path) = &args.export {
        let saved = SavedSession {
            world: snapshot::capture(session.world()),
            players,
        };
        let encoded =
            snapshot_transfer::encode(&saved).context("failed to encode saved session")?;
        fs::write(path, format!("{encoded}\n"))
            .with_context(|| format!("failed to write session to {}", path.display()))?;
        info!(path = %path.display(), "exported session");
    }

    Ok(())
}
