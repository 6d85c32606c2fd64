#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Blast Grid.
//!
//! The world owns the tile grid, the bomb registry and the live hazard set.
//! Every mutation flows through [`apply`]; a single `Command::Tick` resolves
//! fuse expiry, chain reactions and hazard expiry atomically so callers only
//! ever observe consistent state between calls.

mod bombs;
mod explosion;
mod grid;
pub mod snapshot;

use std::time::Duration;

use blast_grid_core::{BombId, Command, DetonationCause, Event, StageLayout};
use tracing::{debug, warn};

use crate::{
    bombs::{BombRegistry, PlacementRequest},
    explosion::{propagate, HazardSet},
    grid::TileGrid,
};

pub use snapshot::{SnapshotError, WorldSnapshot};

const DEFAULT_HAZARD_DURATION: Duration = Duration::from_millis(500);

/// Tuning knobs for the world's timers and rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    hazard_duration: Duration,
    lock_exit_until_cleared: bool,
}

impl EngineConfig {
    /// Creates a configuration with the provided hazard window and exit rule.
    #[must_use]
    pub const fn new(hazard_duration: Duration, lock_exit_until_cleared: bool) -> Self {
        Self {
            hazard_duration,
            lock_exit_until_cleared,
        }
    }

    /// Time an explosion cell stays lethal before walls under it are destroyed.
    #[must_use]
    pub const fn hazard_duration(&self) -> Duration {
        self.hazard_duration
    }

    /// Whether the exit door blocks actors until `Command::UnlockExit`.
    #[must_use]
    pub const fn lock_exit_until_cleared(&self) -> bool {
        self.lock_exit_until_cleared
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(DEFAULT_HAZARD_DURATION, false)
    }
}

/// Represents the authoritative Blast Grid world state.
#[derive(Debug)]
pub struct World {
    config: EngineConfig,
    grid: TileGrid,
    bombs: BombRegistry,
    hazards: HazardSet,
    exit_unlocked: bool,
    tick_index: u64,
}

impl World {
    /// Creates an empty world using the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates an empty world using the provided configuration.
    #[must_use]
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            config,
            grid: TileGrid::default(),
            bombs: BombRegistry::new(0, 0),
            hazards: HazardSet::default(),
            exit_unlocked: false,
            tick_index: 0,
        }
    }

    fn load_stage(&mut self, layout: &StageLayout) {
        self.grid = TileGrid::from_layout(layout);
        self.bombs = BombRegistry::new(layout.columns(), layout.rows());
        self.hazards = HazardSet::default();
        self.exit_unlocked = false;
        self.tick_index = 0;
    }

    /// Detonates each seed in order, fully resolving its chain before the next.
    fn resolve_detonations<I>(&mut self, seeds: I, out_events: &mut Vec<Event>)
    where
        I: IntoIterator<Item = (BombId, DetonationCause)>,
    {
        let mut stack: Vec<(BombId, DetonationCause)> = Vec::new();

        for (seed, cause) in seeds {
            if !self.bombs.begin_detonation(seed) {
                continue;
            }
            stack.push((seed, cause));

            while let Some((bomb_id, cause)) = stack.pop() {
                self.detonate(bomb_id, cause, self.tick_index, &mut stack, out_events);
            }
        }
    }

    /// Resolves one bomb; its hazard starts aging on the tick after `born_tick`.
    fn detonate(
        &mut self,
        bomb_id: BombId,
        cause: DetonationCause,
        born_tick: u64,
        stack: &mut Vec<(BombId, DetonationCause)>,
        out_events: &mut Vec<Event>,
    ) {
        let Some(bomb) = self.bombs.get(bomb_id).cloned() else {
            return;
        };
        out_events.push(Event::BombDetonated {
            bomb: bomb.id,
            owner: bomb.owner,
            cell: bomb.cell,
            cause,
        });
        debug!(
            bomb = bomb.id.get(),
            owner = bomb.owner.get(),
            column = bomb.cell.column(),
            row = bomb.cell.row(),
            ?cause,
            "bomb detonated"
        );

        let blast = propagate(&bomb, &self.grid, &self.bombs);
        out_events.push(Event::ExplosionSpawned {
            bomb: bomb.id,
            cells: blast.cells.clone(),
        });

        for explosion in &blast.cells {
            if let Some(kind) = self.grid.take_power_up(explosion.cell) {
                out_events.push(Event::PowerUpDestroyed {
                    cell: explosion.cell,
                    kind,
                });
            }
        }

        if let Some(spent) = self.bombs.retire(bomb.id) {
            out_events.push(Event::BombSpent {
                bomb: spent.id,
                owner: spent.owner,
            });
        }

        self.hazards.insert(
            bomb.id,
            blast.cells,
            self.config.hazard_duration,
            born_tick,
        );

        // Reversed so the first arm's bomb is popped first.
        for chained in blast.chained.into_iter().rev() {
            if self.bombs.begin_detonation(chained) {
                debug!(bomb = chained.get(), by = bomb.id.get(), "chain detonation");
                stack.push((chained, DetonationCause::Chain { by: bomb.id }));
            }
        }
    }

    fn expire_hazards(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        for hazard in self.hazards.age(dt, self.tick_index) {
            for explosion in &hazard.cells {
                if let Err(error) = self.grid.destroy(explosion.cell, out_events) {
                    warn!(%error, "hazard cell outside grid");
                }
            }
            out_events.push(Event::HazardExpired { bomb: hazard.bomb });
        }
    }

    fn door_open(&self) -> bool {
        !self.config.lock_exit_until_cleared || self.exit_unlocked
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::LoadStage { layout } => {
            world.load_stage(&layout);
            out_events.push(Event::StageLoaded {
                columns: layout.columns(),
                rows: layout.rows(),
            });
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            out_events.push(Event::TimeAdvanced { dt });

            let expired = world.bombs.advance_fuses(dt);
            world.resolve_detonations(
                expired
                    .into_iter()
                    .map(|bomb| (bomb, DetonationCause::Fuse)),
                out_events,
            );

            world.expire_hazards(dt, out_events);
        }
        Command::PlaceBomb {
            owner,
            cell,
            blast_range,
            fuse,
            max_active,
        } => {
            debug_assert!(
                world.grid.contains(cell),
                "bomb placement at ({}, {}) outside the grid",
                cell.column(),
                cell.row()
            );
            let request = PlacementRequest {
                owner,
                cell,
                blast_range,
                fuse,
                max_active,
            };
            match world.bombs.place(request, &world.grid) {
                Ok(bomb) => {
                    debug!(
                        bomb = bomb.get(),
                        owner = owner.get(),
                        column = cell.column(),
                        row = cell.row(),
                        blast_range,
                        "bomb placed"
                    );
                    out_events.push(Event::BombPlaced {
                        bomb,
                        owner,
                        cell,
                        blast_range,
                        fuse,
                    });
                }
                Err(reason) => {
                    warn!(owner = owner.get(), ?reason, "bomb placement rejected");
                    out_events.push(Event::BombPlacementRejected {
                        owner,
                        cell,
                        reason,
                    });
                }
            }
        }
        Command::DetonateNext { owner } => {
            let Some(bomb) = world.bombs.detonate_next(owner) else {
                return;
            };
            // Already moved to `Detonating`; push straight onto the chain stack.
            // Hazards count as born in the upcoming tick, like fuse hazards.
            let born_tick = world.tick_index.saturating_add(1);
            let mut stack = vec![(bomb, DetonationCause::Remote)];
            while let Some((bomb_id, cause)) = stack.pop() {
                world.detonate(bomb_id, cause, born_tick, &mut stack, out_events);
            }
        }
        Command::CollectPowerUp { actor, cell } => {
            if let Some(kind) = world.grid.take_power_up(cell) {
                out_events.push(Event::PowerUpCollected { actor, cell, kind });
            }
        }
        Command::UnlockExit => {
            if !world.exit_unlocked {
                world.exit_unlocked = true;
                out_events.push(Event::ExitUnlocked);
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use blast_grid_core::{
        ActorId, BombView, Cell, CellCoord, GridError, HazardView, PowerUpKind, TileView,
    };

    use super::{EngineConfig, World};

    /// Exposes a read-only view of the tile and bomb occupancy grids.
    #[must_use]
    pub fn tile_view(world: &World) -> TileView<'_> {
        let (columns, rows) = world.grid.dimensions();
        TileView::new(
            world.grid.tiles(),
            world.bombs.occupancy(),
            columns,
            rows,
            world.door_open(),
        )
    }

    /// Returns the combined tile and occupancy state of a cell.
    pub fn cell_at(world: &World, cell: CellCoord) -> Result<Cell, GridError> {
        tile_view(world).cell(cell)
    }

    /// Reports whether an actor without capabilities may enter the cell.
    pub fn is_passable(world: &World, cell: CellCoord) -> Result<bool, GridError> {
        tile_view(world).is_passable(cell)
    }

    /// Captures a read-only view of every bomb still on the grid.
    #[must_use]
    pub fn bomb_view(world: &World) -> BombView {
        BombView::from_snapshots(world.bombs.iter().map(|bomb| bomb.snapshot()).collect())
    }

    /// Number of bombs the actor currently has on the grid.
    #[must_use]
    pub fn active_bombs(world: &World, owner: ActorId) -> u32 {
        world.bombs.active_count(owner)
    }

    /// Captures every live explosion cell, oldest explosion first.
    #[must_use]
    pub fn hazard_view(world: &World) -> HazardView {
        HazardView::from_cells(world.hazards.cells().copied().collect())
    }

    /// Reports whether any live explosion covers the cell.
    #[must_use]
    pub fn is_lethal(world: &World, cell: CellCoord) -> bool {
        world.hazards.contains(cell)
    }

    /// Revealed power-ups waiting to be collected, ordered by cell.
    #[must_use]
    pub fn power_ups(world: &World) -> Vec<(CellCoord, PowerUpKind)> {
        world
            .grid
            .power_ups()
            .iter()
            .map(|(cell, kind)| (*cell, *kind))
            .collect()
    }

    /// Provides the dimensions of the loaded stage.
    #[must_use]
    pub fn dimensions(world: &World) -> (u32, u32) {
        world.grid.dimensions()
    }

    /// Whether `Command::UnlockExit` has been applied to the current stage.
    #[must_use]
    pub fn exit_unlocked(world: &World) -> bool {
        world.exit_unlocked
    }

    /// Number of ticks applied since the stage was loaded.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> EngineConfig {
        world.config
    }
}
