//! Headless session wiring the world to the bomber and collision systems.

use std::{collections::BTreeMap, time::Duration};

use blast_grid_core::{ActorId, Capabilities, CellCoord, Command, Event, TileKind};
use blast_grid_system_bomber::{Bomber, BomberInput, Loadout};
use blast_grid_system_collision::{check_movement, ActorPosition, Collision, MovementOutcome};
use blast_grid_world::{self as world, query, World};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::scenario::{Action, PlayerSetup, Scenario, ScriptedInput};

/// How a session ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    /// A player stepped onto the open exit door.
    ExitReached(ActorId),
    /// Every player was caught by an explosion.
    AllPlayersDown,
    /// The configured number of ticks elapsed.
    OutOfTicks,
}

/// Player state saved next to the world snapshot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SavedPlayer {
    pub(crate) actor: ActorId,
    pub(crate) cell: CellCoord,
    pub(crate) alive: bool,
    pub(crate) max_bombs: u32,
    pub(crate) blast_range: u32,
    pub(crate) fuse: Duration,
    pub(crate) capabilities: Capabilities,
}

#[derive(Debug)]
struct Player {
    bomber: Bomber,
    cell: CellCoord,
    alive: bool,
}

/// Event tagged with the tick it was produced on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct LoggedEvent {
    pub(crate) tick: u64,
    pub(crate) event: Event,
}

/// Drives one stage tick by tick from scripted input.
#[derive(Debug)]
pub(crate) struct Session {
    world: World,
    players: BTreeMap<ActorId, Player>,
    collision: Collision,
    pending: Vec<Event>,
    log: Vec<LoggedEvent>,
}

impl Session {
    /// Wraps a world whose stage is already loaded.
    ///
    /// `initial_events` are the events produced while loading it, if any.
    pub(crate) fn new(world: World, players: &[PlayerSetup], initial_events: Vec<Event>) -> Self {
        let players = players
            .iter()
            .map(|setup| (setup.actor, setup.start, true, setup.loadout));
        Self::assemble(world, players, initial_events)
    }

    /// Continues a saved session on a world restored from its snapshot.
    pub(crate) fn resume(world: World, players: &[SavedPlayer]) -> Self {
        let players = players.iter().map(|saved| {
            let loadout = Loadout::new(
                saved.max_bombs,
                saved.blast_range,
                saved.fuse,
                saved.capabilities,
            );
            (saved.actor, saved.cell, saved.alive, loadout)
        });
        Self::assemble(world, players, Vec::new())
    }

    fn assemble<I>(world: World, players: I, initial_events: Vec<Event>) -> Self
    where
        I: IntoIterator<Item = (ActorId, CellCoord, bool, Loadout)>,
    {
        let revealed: Vec<CellCoord> = query::power_ups(&world)
            .into_iter()
            .map(|(cell, _)| cell)
            .collect();
        let players = players
            .into_iter()
            .map(|(actor, cell, alive, loadout)| {
                let mut bomber = Bomber::new(actor, loadout);
                bomber.sync_revealed(revealed.iter().copied());
                (
                    actor,
                    Player {
                        bomber,
                        cell,
                        alive,
                    },
                )
            })
            .collect();
        let log = initial_events
            .iter()
            .cloned()
            .map(|event| LoggedEvent { tick: 0, event })
            .collect();
        Self {
            world,
            players,
            collision: Collision::new(),
            pending: initial_events,
            log,
        }
    }

    /// Runs until a player escapes, every player is down, or the ticks run out.
    pub(crate) fn run(&mut self, scenario: &Scenario) -> Outcome {
        for _ in 0..scenario.ticks {
            let tick_number = query::tick_index(&self.world) + 1;
            if scenario.unlock_exit_tick == Some(tick_number) {
                self.unlock_exit(tick_number);
            }
            let scheduled: Vec<ScriptedInput> = scenario
                .inputs
                .iter()
                .filter(|input| input.tick == tick_number)
                .copied()
                .collect();

            self.step(scenario.tick, tick_number, &scheduled);

            if let Some(actor) = self.player_on_open_exit() {
                info!(actor = actor.get(), tick = tick_number, "exit reached");
                return Outcome::ExitReached(actor);
            }
            if self.players.values().all(|player| !player.alive) {
                info!(tick = tick_number, "all players down");
                return Outcome::AllPlayersDown;
            }
        }
        Outcome::OutOfTicks
    }

    /// Bomb input resolves at the cell a player starts the tick on; moves follow.
    fn step(&mut self, dt: Duration, tick_number: u64, scheduled: &[ScriptedInput]) {
        let pending = std::mem::take(&mut self.pending);
        let mut commands = Vec::new();
        for (actor, player) in &mut self.players {
            if !player.alive {
                continue;
            }
            let mut input = BomberInput::idle(player.cell);
            for scripted in scheduled.iter().filter(|scripted| scripted.actor == *actor) {
                match scripted.action {
                    Action::PlaceBomb => input.place_bomb = true,
                    Action::Detonate => input.detonate = true,
                    Action::Move(_) => {}
                }
            }
            player.bomber.handle(&pending, input, &mut commands);
        }

        let mut events = Vec::new();
        for command in commands {
            world::apply(&mut self.world, command, &mut events);
        }

        let tiles = query::tile_view(&self.world);
        for scripted in scheduled {
            let Action::Move(to) = scripted.action else {
                continue;
            };
            let Some(player) = self.players.get_mut(&scripted.actor) else {
                continue;
            };
            if !player.alive {
                continue;
            }
            let capabilities = player.bomber.loadout().capabilities();
            if player.cell.manhattan_distance(to) == 1
                && check_movement(&tiles, player.cell, to, capabilities) == MovementOutcome::Allowed
            {
                player.cell = to;
            } else {
                debug!(actor = scripted.actor.get(), ?to, "move blocked");
            }
        }

        world::apply(&mut self.world, Command::Tick { dt }, &mut events);

        let positions: Vec<ActorPosition> = self
            .players
            .iter()
            .filter(|(_, player)| player.alive)
            .map(|(actor, player)| ActorPosition::new(*actor, player.cell))
            .collect();
        let mut hits = Vec::new();
        self.collision.handle(
            &events,
            &query::hazard_view(&self.world),
            &positions,
            &mut hits,
        );
        for hit in &hits {
            if let Event::ActorHit { actor, .. } = hit {
                if let Some(player) = self.players.get_mut(actor) {
                    player.alive = false;
                }
            }
        }
        events.extend(hits);

        self.log.extend(events.iter().cloned().map(|event| LoggedEvent {
            tick: tick_number,
            event,
        }));
        self.pending = events;
    }

    fn player_on_open_exit(&self) -> Option<ActorId> {
        let tiles = query::tile_view(&self.world);
        if !tiles.door_open() {
            return None;
        }
        self.players
            .iter()
            .find(|(_, player)| player.alive && tiles.kind(player.cell) == Ok(TileKind::Door))
            .map(|(actor, _)| *actor)
    }

    /// Every event produced so far, in order.
    pub(crate) fn log(&self) -> &[LoggedEvent] {
        &self.log
    }

    /// World driven by the session.
    pub(crate) fn world(&self) -> &World {
        &self.world
    }

    /// State of every player, alive or down, in actor order.
    ///
    /// Pickups still waiting to reach a bomber are folded into its loadout.
    pub(crate) fn saved_players(&self) -> Vec<SavedPlayer> {
        self.players
            .iter()
            .map(|(actor, player)| {
                let mut loadout = *player.bomber.loadout();
                for event in &self.pending {
                    if let Event::PowerUpCollected {
                        actor: collector,
                        kind,
                        ..
                    } = event
                    {
                        if collector == actor {
                            loadout.apply_power_up(*kind);
                        }
                    }
                }
                SavedPlayer {
                    actor: *actor,
                    cell: player.cell,
                    alive: player.alive,
                    max_bombs: loadout.max_bombs(),
                    blast_range: loadout.blast_range(),
                    fuse: loadout.fuse(),
                    capabilities: loadout.capabilities(),
                }
            })
            .collect()
    }

    fn unlock_exit(&mut self, tick: u64) {
        let mut events = Vec::new();
        world::apply(&mut self.world, Command::UnlockExit, &mut events);
        self.log
            .extend(events.iter().cloned().map(|event| LoggedEvent { tick, event }));
        self.pending.extend(events);
    }
}
