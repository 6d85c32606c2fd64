#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Blast Grid engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! views, and respond exclusively with new command or event batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod layout;

pub use layout::{HiddenPlacement, LayoutParseError, StageLayout};

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Replaces the current stage with the provided layout and clears all bombs.
    LoadStage {
        /// Tile layout, including hidden items, describing the new stage.
        layout: StageLayout,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Requests placement of a bomb on behalf of an actor.
    PlaceBomb {
        /// Actor that owns the bomb.
        owner: ActorId,
        /// Cell the bomb should occupy.
        cell: CellCoord,
        /// Number of tiles the explosion reaches in each direction.
        blast_range: u32,
        /// Detonation mode captured at placement time.
        fuse: Fuse,
        /// Maximum number of bombs the owner may have armed at once.
        max_active: u32,
    },
    /// Forces the owner's oldest armed bomb to detonate.
    DetonateNext {
        /// Actor whose bomb should detonate.
        owner: ActorId,
    },
    /// Requests that an actor pick up the revealed power-up lying on a cell.
    CollectPowerUp {
        /// Actor collecting the power-up.
        actor: ActorId,
        /// Cell holding the power-up.
        cell: CellCoord,
    },
    /// Marks the stage as cleared so the exit door admits actors.
    UnlockExit,
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Event {
    /// Confirms that a new stage replaced the previous one.
    StageLoaded {
        /// Number of tile columns in the stage.
        columns: u32,
        /// Number of tile rows in the stage.
        rows: u32,
    },
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a bomb was armed on the grid.
    BombPlaced {
        /// Identifier allocated to the bomb.
        bomb: BombId,
        /// Actor that owns the bomb.
        owner: ActorId,
        /// Cell occupied by the bomb.
        cell: CellCoord,
        /// Blast range captured at placement.
        blast_range: u32,
        /// Detonation mode captured at placement.
        fuse: Fuse,
    },
    /// Reports that a bomb placement request was rejected.
    BombPlacementRejected {
        /// Actor that requested the placement.
        owner: ActorId,
        /// Cell provided in the request.
        cell: CellCoord,
        /// Specific reason the placement failed.
        reason: PlacementError,
    },
    /// Announces that a bomb started detonating.
    BombDetonated {
        /// Identifier of the detonating bomb.
        bomb: BombId,
        /// Actor that owned the bomb.
        owner: ActorId,
        /// Cell the bomb occupied.
        cell: CellCoord,
        /// What triggered the detonation.
        cause: DetonationCause,
    },
    /// Lists the explosion cells produced by a single detonation.
    ExplosionSpawned {
        /// Bomb that produced the explosion.
        bomb: BombId,
        /// Cells that became lethal, center first.
        cells: Vec<ExplosionCell>,
    },
    /// Confirms that a bomb finished propagating and left the registry.
    BombSpent {
        /// Identifier of the spent bomb.
        bomb: BombId,
        /// Actor whose bomb slot was freed.
        owner: ActorId,
    },
    /// Announces that the hazard window of an explosion elapsed.
    HazardExpired {
        /// Bomb whose explosion cells were cleared.
        bomb: BombId,
    },
    /// Confirms that a destructible wall was cleared.
    WallDestroyed {
        /// Cell that became empty.
        cell: CellCoord,
    },
    /// Announces that a power-up hidden under a wall became collectible.
    PowerUpRevealed {
        /// Cell holding the power-up.
        cell: CellCoord,
        /// Kind of power-up revealed.
        kind: PowerUpKind,
    },
    /// Reports that a revealed power-up was burned by an explosion.
    PowerUpDestroyed {
        /// Cell that held the power-up.
        cell: CellCoord,
        /// Kind of power-up that was lost.
        kind: PowerUpKind,
    },
    /// Confirms that an actor picked up a power-up.
    PowerUpCollected {
        /// Actor that collected the power-up.
        actor: ActorId,
        /// Cell that held the power-up.
        cell: CellCoord,
        /// Kind of power-up collected.
        kind: PowerUpKind,
    },
    /// Announces that the exit door was revealed.
    StageCleared {
        /// Cell holding the exit door.
        exit: CellCoord,
    },
    /// Confirms that the exit door now admits actors.
    ExitUnlocked,
    /// Reports that an actor stands inside a live explosion cell.
    ActorHit {
        /// Actor caught by the explosion.
        actor: ActorId,
        /// Cell the actor occupies.
        cell: CellCoord,
        /// Bomb whose explosion covers the cell.
        bomb: BombId,
    },
}

/// Location of a single grid cell expressed as column and row coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: u32,
    row: u32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(column: u32, row: u32) -> Self {
        Self { column, row }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn column(&self) -> u32 {
        self.column
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn row(&self) -> u32 {
        self.row
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.column().abs_diff(other.column()) + self.row().abs_diff(other.row())
    }

    /// Returns the neighbouring cell in the provided direction.
    ///
    /// Yields `None` when the step would leave the non-negative coordinate
    /// space. Upper bounds are the caller's responsibility.
    #[must_use]
    pub fn step(self, direction: Direction) -> Option<CellCoord> {
        match direction {
            Direction::North => self.row.checked_sub(1).map(|row| Self::new(self.column, row)),
            Direction::East => self
                .column
                .checked_add(1)
                .map(|column| Self::new(column, self.row)),
            Direction::South => self.row.checked_add(1).map(|row| Self::new(self.column, row)),
            Direction::West => self
                .column
                .checked_sub(1)
                .map(|column| Self::new(column, self.row)),
        }
    }
}

/// Cardinal directions used by explosion propagation and movement.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Direction {
    /// Toward decreasing row indices.
    North,
    /// Toward increasing column indices.
    East,
    /// Toward increasing row indices.
    South,
    /// Toward decreasing column indices.
    West,
}

impl Direction {
    /// All directions in the order explosions walk them.
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];
}

/// Terrain stored in a single tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Free floor.
    #[default]
    Empty,
    /// Permanent wall that stops explosions and movement.
    IndestructibleWall,
    /// Wall that absorbs one explosion and is then cleared.
    DestructibleWall,
    /// Exit door.
    Door,
}

impl TileKind {
    /// Reports whether the tile is any kind of wall.
    #[must_use]
    pub const fn is_wall(self) -> bool {
        matches!(self, Self::IndestructibleWall | Self::DestructibleWall)
    }
}

/// Item concealed beneath a destructible wall.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HiddenItem {
    /// A collectible power-up.
    PowerUp(PowerUpKind),
    /// The stage exit door.
    Exit,
}

/// Power-ups that alter a player's loadout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerUpKind {
    /// Raises the number of bombs that may be armed at once.
    ExtraBomb,
    /// Extends the blast range by one tile.
    BlastRange,
    /// Grants remote detonation.
    RemoteDetonator,
    /// Allows walking through destructible walls.
    WallPass,
    /// Allows walking over bombs.
    BombPass,
}

/// Unique identifier assigned to an actor (player or enemy).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(u32);

impl ActorId {
    /// Creates a new actor identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Unique identifier assigned to a bomb.
///
/// Identifiers are allocated monotonically, so ordering by id matches
/// placement order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BombId(u32);

impl BombId {
    /// Creates a new bomb identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Detonation mode of a bomb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Fuse {
    /// Detonates once the remaining duration elapses.
    Timed {
        /// Simulated time left before detonation.
        remaining: Duration,
    },
    /// Waits indefinitely for a remote trigger or a chain reaction.
    Remote,
}

impl Fuse {
    /// Creates a timed fuse with the provided duration.
    #[must_use]
    pub const fn timed(remaining: Duration) -> Self {
        Self::Timed { remaining }
    }
}

/// Lifecycle stage of a bomb.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BombState {
    /// Waiting for its fuse or a trigger.
    Armed,
    /// Propagating its explosion.
    Detonating,
    /// Finished; about to leave the registry.
    Spent,
}

/// Reason a bomb detonated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetonationCause {
    /// The timed fuse ran out.
    Fuse,
    /// The owner triggered the detonator.
    Remote,
    /// Another bomb's explosion reached the bomb.
    Chain {
        /// Bomb whose explosion caused the chain.
        by: BombId,
    },
}

/// Presentation hint describing where a cell sits within an explosion.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentKind {
    /// The bomb's own cell.
    Center,
    /// A cell in the middle of an arm.
    Run(Direction),
    /// The last cell of an arm.
    Tip(Direction),
}

/// A cell that is lethal for the duration of an explosion's hazard window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ExplosionCell {
    /// Location of the lethal cell.
    pub cell: CellCoord,
    /// Bomb that produced the cell.
    pub bomb: BombId,
    /// Presentation hint for renderers.
    pub segment: SegmentKind,
}

/// Movement and detonation capabilities attached to an actor.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Capabilities {
    wall_pass: bool,
    bomb_pass: bool,
    remote_detonation: bool,
}

impl Capabilities {
    /// Capability set with every flag cleared.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            wall_pass: false,
            bomb_pass: false,
            remote_detonation: false,
        }
    }

    /// Returns a copy that may walk through destructible walls.
    #[must_use]
    pub const fn with_wall_pass(mut self) -> Self {
        self.wall_pass = true;
        self
    }

    /// Returns a copy that may walk over bombs.
    #[must_use]
    pub const fn with_bomb_pass(mut self) -> Self {
        self.bomb_pass = true;
        self
    }

    /// Returns a copy that may trigger bombs remotely.
    #[must_use]
    pub const fn with_remote_detonation(mut self) -> Self {
        self.remote_detonation = true;
        self
    }

    /// Whether destructible walls are ignored during movement.
    #[must_use]
    pub const fn wall_pass(&self) -> bool {
        self.wall_pass
    }

    /// Whether bomb occupancy is ignored during movement.
    #[must_use]
    pub const fn bomb_pass(&self) -> bool {
        self.bomb_pass
    }

    /// Whether bombs are placed with a remote fuse.
    #[must_use]
    pub const fn remote_detonation(&self) -> bool {
        self.remote_detonation
    }
}

/// Reasons a bomb placement request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlacementError {
    /// The requested cell lies outside the map.
    OutOfBounds,
    /// The requested cell holds a wall.
    Blocked,
    /// Another bomb already occupies the requested cell.
    Occupied,
    /// The owner already has its maximum number of bombs armed.
    LimitReached,
    /// The requested blast range was zero.
    InvalidBlastRange,
    /// Every bomb identifier for the stage has been handed out.
    IdentifiersExhausted,
}

/// Errors raised by tile grid queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum GridError {
    /// The coordinate lies outside the map extent.
    #[error("cell ({}, {}) lies outside the {columns}x{rows} grid", .cell.column(), .cell.row())]
    OutOfBounds {
        /// Offending coordinate.
        cell: CellCoord,
        /// Number of columns in the grid.
        columns: u32,
        /// Number of rows in the grid.
        rows: u32,
    },
}

/// Combined tile and occupancy state of a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Cell {
    /// Location of the cell.
    pub coord: CellCoord,
    /// Terrain stored in the cell.
    pub kind: TileKind,
    /// Bomb currently occupying the cell, if any.
    pub occupant: Option<BombId>,
}

/// Immutable representation of a single bomb's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BombSnapshot {
    /// Identifier allocated to the bomb.
    pub id: BombId,
    /// Actor that owns the bomb.
    pub owner: ActorId,
    /// Cell occupied by the bomb.
    pub cell: CellCoord,
    /// Tiles reached per direction.
    pub blast_range: u32,
    /// Current fuse state.
    pub fuse: Fuse,
    /// Lifecycle stage.
    pub state: BombState,
}

/// Read-only snapshot describing all bombs on the grid.
#[derive(Clone, Debug, Default)]
pub struct BombView {
    snapshots: Vec<BombSnapshot>,
}

impl BombView {
    /// Creates a new bomb view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<BombSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured bomb snapshots in placement order.
    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = &BombSnapshot> {
        self.snapshots.iter()
    }

    /// Counts the bombs owned by the provided actor.
    #[must_use]
    pub fn count_owned_by(&self, owner: ActorId) -> usize {
        self.snapshots
            .iter()
            .filter(|snapshot| snapshot.owner == owner)
            .count()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<BombSnapshot> {
        self.snapshots
    }
}

/// Read-only snapshot of every live explosion cell.
#[derive(Clone, Debug, Default)]
pub struct HazardView {
    cells: Vec<ExplosionCell>,
}

impl HazardView {
    /// Creates a hazard view from cells listed oldest explosion first.
    #[must_use]
    pub fn from_cells(cells: Vec<ExplosionCell>) -> Self {
        Self { cells }
    }

    /// Returns the oldest live explosion covering the cell, if any.
    #[must_use]
    pub fn hit_at(&self, cell: CellCoord) -> Option<BombId> {
        self.cells
            .iter()
            .find(|explosion| explosion.cell == cell)
            .map(|explosion| explosion.bomb)
    }

    /// Reports whether no explosion cell is live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Iterator over all live explosion cells.
    pub fn iter(&self) -> impl Iterator<Item = &ExplosionCell> {
        self.cells.iter()
    }
}

/// Read-only view into the dense tile and bomb occupancy grids.
#[derive(Clone, Copy, Debug)]
pub struct TileView<'a> {
    tiles: &'a [TileKind],
    occupancy: &'a [Option<BombId>],
    columns: u32,
    rows: u32,
    door_open: bool,
}

impl<'a> TileView<'a> {
    /// Captures a new tile view backed by the provided slices.
    #[must_use]
    pub fn new(
        tiles: &'a [TileKind],
        occupancy: &'a [Option<BombId>],
        columns: u32,
        rows: u32,
        door_open: bool,
    ) -> Self {
        Self {
            tiles,
            occupancy,
            columns,
            rows,
            door_open,
        }
    }

    /// Returns the terrain stored in the provided cell.
    pub fn kind(&self, cell: CellCoord) -> Result<TileKind, GridError> {
        let index = self.index(cell)?;
        Ok(self.tiles.get(index).copied().unwrap_or_default())
    }

    /// Returns the bomb occupying the provided cell, if any.
    #[must_use]
    pub fn occupant(&self, cell: CellCoord) -> Option<BombId> {
        self.index(cell)
            .ok()
            .and_then(|index| self.occupancy.get(index).copied().flatten())
    }

    /// Returns the combined tile and occupancy state of a cell.
    pub fn cell(&self, cell: CellCoord) -> Result<Cell, GridError> {
        Ok(Cell {
            coord: cell,
            kind: self.kind(cell)?,
            occupant: self.occupant(cell),
        })
    }

    /// Reports whether an actor without capabilities may enter the cell.
    pub fn is_passable(&self, cell: CellCoord) -> Result<bool, GridError> {
        let passable_terrain = match self.kind(cell)? {
            TileKind::Empty => true,
            TileKind::Door => self.door_open,
            TileKind::IndestructibleWall | TileKind::DestructibleWall => false,
        };
        Ok(passable_terrain && self.occupant(cell).is_none())
    }

    /// Whether the exit door currently admits actors.
    #[must_use]
    pub const fn door_open(&self) -> bool {
        self.door_open
    }

    /// Provides the dimensions of the underlying grid.
    #[must_use]
    pub const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    fn index(&self, cell: CellCoord) -> Result<usize, GridError> {
        let out_of_bounds = GridError::OutOfBounds {
            cell,
            columns: self.columns,
            rows: self.rows,
        };
        if cell.column() >= self.columns || cell.row() >= self.rows {
            return Err(out_of_bounds);
        }
        let row = usize::try_from(cell.row()).map_err(|_| out_of_bounds)?;
        let column = usize::try_from(cell.column()).map_err(|_| out_of_bounds)?;
        let width = usize::try_from(self.columns).map_err(|_| out_of_bounds)?;
        Ok(row * width + column)
    }
}
