//! Persisted world state used for save/restore.
//!
//! A snapshot holds everything the world needs to resume a stage with an
//! identical future: terrain, hidden and revealed items, armed bombs with
//! their remaining fuse, live hazards, the bomb identifier counter, the tick
//! index and the exit lock. Actor positions are owned by the caller.

use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use blast_grid_core::{
    BombId, BombSnapshot, BombState, CellCoord, ExplosionCell, HiddenPlacement, PowerUpKind,
    TileKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::{
    bombs::{Bomb, BombRegistry},
    explosion::HazardSet,
    grid::{cell_count, TileGrid},
    EngineConfig, World,
};

/// Power-up lying uncovered on the floor.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedPowerUp {
    /// Cell the power-up lies on.
    pub cell: CellCoord,
    /// Kind of power-up.
    pub kind: PowerUpKind,
}

/// Live explosion awaiting expiry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardSnapshot {
    /// Bomb whose detonation produced the explosion.
    pub bomb: BombId,
    /// Cells the explosion covers.
    pub cells: Vec<ExplosionCell>,
    /// Time left before the hazard expires.
    pub remaining: Duration,
    /// Tick the hazard was created for; it starts aging on the tick after.
    pub born_tick: u64,
}

/// Serializable copy of the authoritative world state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    /// Number of tile columns.
    pub columns: u32,
    /// Number of tile rows.
    pub rows: u32,
    /// Row-major terrain, including surviving destructible walls.
    pub tiles: Vec<TileKind>,
    /// Items still concealed beneath destructible walls.
    pub hidden: Vec<HiddenPlacement>,
    /// Revealed power-ups nobody has collected yet.
    pub power_ups: Vec<RevealedPowerUp>,
    /// Armed bombs in placement order.
    pub bombs: Vec<BombSnapshot>,
    /// Live hazards in creation order.
    pub hazards: Vec<HazardSnapshot>,
    /// Identifier the next placed bomb receives.
    pub next_bomb_id: u32,
    /// Number of ticks applied since the stage was loaded.
    pub tick_index: u64,
    /// Whether the exit has been unlocked.
    pub exit_unlocked: bool,
}

/// Reasons a snapshot cannot be restored.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The tile buffer does not match the declared dimensions.
    #[error("snapshot holds {actual} tiles but declares a {columns}x{rows} grid")]
    DimensionMismatch {
        /// Declared column count.
        columns: u32,
        /// Declared row count.
        rows: u32,
        /// Number of tiles present.
        actual: usize,
    },
    /// A bomb, hazard or item references a cell outside the grid.
    #[error("snapshot references cell ({}, {}) outside the grid", .cell.column(), .cell.row())]
    CellOutOfBounds {
        /// Offending cell.
        cell: CellCoord,
    },
    /// Two bombs claim the same cell.
    #[error("snapshot places more than one bomb at ({}, {})", .cell.column(), .cell.row())]
    DuplicateBombCell {
        /// Cell claimed twice.
        cell: CellCoord,
    },
    /// A bomb is not armed.
    #[error("snapshot bomb {} is {state:?}, expected armed", .bomb.get())]
    BombNotArmed {
        /// Offending bomb.
        bomb: BombId,
        /// State recorded for the bomb.
        state: BombState,
    },
    /// A bomb carries a blast range of zero.
    #[error("snapshot bomb {} has a blast range of zero", .bomb.get())]
    InvalidBlastRange {
        /// Offending bomb.
        bomb: BombId,
    },
    /// A bomb sits on a wall tile.
    #[error("snapshot bomb {} sits on a wall at ({}, {})", .bomb.get(), .cell.column(), .cell.row())]
    BombOnWall {
        /// Offending bomb.
        bomb: BombId,
        /// Cell holding both the bomb and the wall.
        cell: CellCoord,
    },
    /// A hazard claims to be born after the upcoming tick.
    #[error("snapshot hazard of bomb {} is born on tick {born_tick}, past snapshot tick {tick_index}", .bomb.get())]
    HazardFromFuture {
        /// Bomb that produced the hazard.
        bomb: BombId,
        /// Recorded birth tick.
        born_tick: u64,
        /// Tick index stored in the snapshot.
        tick_index: u64,
    },
    /// A bomb identifier is not below the identifier counter.
    #[error("snapshot bomb {} is not below the identifier counter {next}", .bomb.get())]
    IdentifierReused {
        /// Offending bomb.
        bomb: BombId,
        /// Identifier counter stored in the snapshot.
        next: u32,
    },
}

/// Captures the current world state.
#[must_use]
pub fn capture(world: &World) -> WorldSnapshot {
    let (columns, rows) = world.grid.dimensions();
    WorldSnapshot {
        columns,
        rows,
        tiles: world.grid.tiles().to_vec(),
        hidden: world
            .grid
            .hidden()
            .iter()
            .map(|(cell, item)| HiddenPlacement {
                cell: *cell,
                item: *item,
            })
            .collect(),
        power_ups: world
            .grid
            .power_ups()
            .iter()
            .map(|(cell, kind)| RevealedPowerUp {
                cell: *cell,
                kind: *kind,
            })
            .collect(),
        bombs: world.bombs.iter().map(Bomb::snapshot).collect(),
        hazards: world
            .hazards
            .iter()
            .map(|hazard| HazardSnapshot {
                bomb: hazard.bomb,
                cells: hazard.cells.clone(),
                remaining: hazard.remaining,
                born_tick: hazard.born_tick,
            })
            .collect(),
        next_bomb_id: world.bombs.next_bomb_id(),
        tick_index: world.tick_index,
        exit_unlocked: world.exit_unlocked,
    }
}

impl World {
    /// Rebuilds a world from a snapshot after checking it for consistency.
    pub fn from_snapshot(
        snapshot: WorldSnapshot,
        config: EngineConfig,
    ) -> Result<Self, SnapshotError> {
        validate(&snapshot).map_err(|error| {
            warn!(%error, "rejected world snapshot");
            error
        })?;

        let WorldSnapshot {
            columns,
            rows,
            tiles,
            hidden,
            power_ups,
            bombs,
            hazards,
            next_bomb_id,
            tick_index,
            exit_unlocked,
        } = snapshot;

        let hidden: BTreeMap<_, _> = hidden
            .into_iter()
            .map(|placement| (placement.cell, placement.item))
            .collect();
        let power_ups: BTreeMap<_, _> = power_ups
            .into_iter()
            .map(|power_up| (power_up.cell, power_up.kind))
            .collect();
        let grid = TileGrid::from_parts(columns, rows, tiles, hidden, power_ups);

        let mut registry = BombRegistry::new(columns, rows);
        for bomb in bombs {
            registry.restore(Bomb {
                id: bomb.id,
                owner: bomb.owner,
                cell: bomb.cell,
                blast_range: bomb.blast_range,
                fuse: bomb.fuse,
                state: bomb.state,
            });
        }
        registry.set_next_bomb_id(next_bomb_id);

        let mut hazard_set = HazardSet::default();
        for hazard in hazards {
            hazard_set.insert(hazard.bomb, hazard.cells, hazard.remaining, hazard.born_tick);
        }

        Ok(Self {
            config,
            grid,
            bombs: registry,
            hazards: hazard_set,
            exit_unlocked,
            tick_index,
        })
    }
}

fn validate(snapshot: &WorldSnapshot) -> Result<(), SnapshotError> {
    let (columns, rows) = (snapshot.columns, snapshot.rows);
    if snapshot.tiles.len() != cell_count(columns, rows) {
        return Err(SnapshotError::DimensionMismatch {
            columns,
            rows,
            actual: snapshot.tiles.len(),
        });
    }

    let in_bounds = |cell: CellCoord| {
        if cell.column() < columns && cell.row() < rows {
            Ok(())
        } else {
            Err(SnapshotError::CellOutOfBounds { cell })
        }
    };

    let tile_at = |cell: CellCoord| {
        let index = u64::from(cell.row()) * u64::from(columns) + u64::from(cell.column());
        snapshot.tiles.get(usize::try_from(index).ok()?).copied()
    };

    let mut occupied = BTreeSet::new();
    for bomb in &snapshot.bombs {
        in_bounds(bomb.cell)?;
        if bomb.state != BombState::Armed {
            return Err(SnapshotError::BombNotArmed {
                bomb: bomb.id,
                state: bomb.state,
            });
        }
        if bomb.blast_range == 0 {
            return Err(SnapshotError::InvalidBlastRange { bomb: bomb.id });
        }
        if tile_at(bomb.cell).is_some_and(TileKind::is_wall) {
            return Err(SnapshotError::BombOnWall {
                bomb: bomb.id,
                cell: bomb.cell,
            });
        }
        if bomb.id.get() >= snapshot.next_bomb_id {
            return Err(SnapshotError::IdentifierReused {
                bomb: bomb.id,
                next: snapshot.next_bomb_id,
            });
        }
        if !occupied.insert(bomb.cell) {
            return Err(SnapshotError::DuplicateBombCell { cell: bomb.cell });
        }
    }

    for placement in &snapshot.hidden {
        in_bounds(placement.cell)?;
    }
    for power_up in &snapshot.power_ups {
        in_bounds(power_up.cell)?;
    }
    for hazard in &snapshot.hazards {
        if hazard.born_tick > snapshot.tick_index.saturating_add(1) {
            return Err(SnapshotError::HazardFromFuture {
                bomb: hazard.bomb,
                born_tick: hazard.born_tick,
                tick_index: snapshot.tick_index,
            });
        }
        for explosion in &hazard.cells {
            in_bounds(explosion.cell)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{apply, query};
    use blast_grid_core::{ActorId, Command, Event, Fuse, StageLayout};

    fn busy_world() -> World {
        let mut world = World::new();
        let mut events = Vec::new();
        let layout = StageLayout::parse(&["#######", "#..+E.#", "#.#.#.#", "#..B..#", "#######"])
            .expect("valid drawing");
        apply(&mut world, Command::LoadStage { layout }, &mut events);
        apply(
            &mut world,
            Command::PlaceBomb {
                owner: ActorId::new(1),
                cell: CellCoord::new(1, 1),
                blast_range: 2,
                fuse: Fuse::timed(Duration::from_millis(300)),
                max_active: 2,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::Tick {
                dt: Duration::from_millis(100),
            },
            &mut events,
        );
        world
    }

    #[test]
    fn capture_records_bombs_and_hidden_items() {
        let world = busy_world();
        let snapshot = capture(&world);

        assert_eq!((snapshot.columns, snapshot.rows), (7, 5));
        assert_eq!(snapshot.tiles.len(), 35);
        assert_eq!(snapshot.hidden.len(), 2);
        assert_eq!(snapshot.bombs.len(), 1);
        assert_eq!(
            snapshot.bombs[0].fuse,
            Fuse::timed(Duration::from_millis(200))
        );
        assert_eq!(snapshot.next_bomb_id, 1);
        assert_eq!(snapshot.tick_index, 1);
    }

    #[test]
    fn restored_world_answers_queries_identically() {
        let world = busy_world();
        let restored = World::from_snapshot(capture(&world), EngineConfig::default())
            .expect("consistent snapshot");

        assert_eq!(capture(&restored), capture(&world));
        assert_eq!(
            query::is_passable(&restored, CellCoord::new(1, 1)),
            Ok(false)
        );
        assert_eq!(query::active_bombs(&restored, ActorId::new(1)), 1);
    }

    #[test]
    fn snapshot_survives_json_round_trip() {
        let snapshot = capture(&busy_world());
        let json = serde_json::to_string(&snapshot).expect("serialize snapshot");
        let decoded: WorldSnapshot = serde_json::from_str(&json).expect("deserialize snapshot");
        assert_eq!(decoded, snapshot);
    }

    #[test]
    fn restore_rejects_dimension_mismatch() {
        let mut snapshot = capture(&busy_world());
        let _ = snapshot.tiles.pop();

        let error = World::from_snapshot(snapshot, EngineConfig::default())
            .expect_err("short tile buffer");
        assert_eq!(
            error,
            SnapshotError::DimensionMismatch {
                columns: 7,
                rows: 5,
                actual: 34,
            }
        );
    }

    #[test]
    fn restore_rejects_stacked_bombs() {
        let mut snapshot = capture(&busy_world());
        let mut copy = snapshot.bombs[0];
        copy.id = BombId::new(0);
        snapshot.bombs.push(copy);

        let error = World::from_snapshot(snapshot, EngineConfig::default())
            .expect_err("two bombs on one cell");
        assert_eq!(
            error,
            SnapshotError::DuplicateBombCell {
                cell: CellCoord::new(1, 1),
            }
        );
    }

    #[test]
    fn restore_rejects_bombs_outside_grid() {
        let mut snapshot = capture(&busy_world());
        snapshot.bombs[0].cell = CellCoord::new(7, 0);

        let error = World::from_snapshot(snapshot, EngineConfig::default())
            .expect_err("bomb outside grid");
        assert_eq!(
            error,
            SnapshotError::CellOutOfBounds {
                cell: CellCoord::new(7, 0),
            }
        );
    }

    #[test]
    fn restore_rejects_zero_range_bombs() {
        let mut snapshot = capture(&busy_world());
        snapshot.bombs[0].blast_range = 0;

        let error = World::from_snapshot(snapshot, EngineConfig::default())
            .expect_err("zero blast range");
        assert_eq!(
            error,
            SnapshotError::InvalidBlastRange {
                bomb: BombId::new(0),
            }
        );
    }

    #[test]
    fn restore_rejects_bombs_on_walls() {
        let mut snapshot = capture(&busy_world());
        snapshot.bombs[0].cell = CellCoord::new(3, 1);

        let error = World::from_snapshot(snapshot, EngineConfig::default())
            .expect_err("bomb on destructible wall");
        assert_eq!(
            error,
            SnapshotError::BombOnWall {
                bomb: BombId::new(0),
                cell: CellCoord::new(3, 1),
            }
        );
    }

    #[test]
    fn remote_hazard_captured_between_ticks_keeps_full_window() {
        let mut world = World::new();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::LoadStage {
                layout: StageLayout::parse(&["....."]).expect("valid drawing"),
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::PlaceBomb {
                owner: ActorId::new(1),
                cell: CellCoord::new(2, 0),
                blast_range: 1,
                fuse: Fuse::Remote,
                max_active: 1,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::DetonateNext {
                owner: ActorId::new(1),
            },
            &mut events,
        );

        let snapshot = capture(&world);
        assert_eq!(snapshot.hazards[0].born_tick, 1);
        let mut restored =
            World::from_snapshot(snapshot, EngineConfig::default()).expect("consistent snapshot");

        let mut tick_events = Vec::new();
        apply(
            &mut restored,
            Command::Tick {
                dt: Duration::from_millis(500),
            },
            &mut tick_events,
        );
        assert!(query::is_lethal(&restored, CellCoord::new(3, 0)));

        apply(
            &mut restored,
            Command::Tick {
                dt: Duration::from_millis(500),
            },
            &mut tick_events,
        );
        assert!(!query::is_lethal(&restored, CellCoord::new(3, 0)));
    }

    #[test]
    fn restore_rejects_hazards_born_past_the_upcoming_tick() {
        let mut snapshot = capture(&busy_world());
        snapshot.hazards.push(HazardSnapshot {
            bomb: BombId::new(0),
            cells: Vec::new(),
            remaining: Duration::from_millis(500),
            born_tick: 3,
        });

        let error = World::from_snapshot(snapshot, EngineConfig::default())
            .expect_err("hazard from a later tick");
        assert_eq!(
            error,
            SnapshotError::HazardFromFuture {
                bomb: BombId::new(0),
                born_tick: 3,
                tick_index: 1,
            }
        );
    }

    #[test]
    fn restored_bombs_keep_detonating() {
        let world = busy_world();
        let mut restored = World::from_snapshot(capture(&world), EngineConfig::default())
            .expect("consistent snapshot");
        let mut events = Vec::new();
        apply(
            &mut restored,
            Command::Tick {
                dt: Duration::from_millis(200),
            },
            &mut events,
        );

        assert!(events
            .iter()
            .any(|event| matches!(event, Event::BombDetonated { bomb, .. } if *bomb == BombId::new(0))));
    }
}
