#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Collision checks between actors, explosions and terrain.
//!
//! The system never mutates the world. Hazard hits are reported as
//! [`Event::ActorHit`] so the game rules layer can run its own death
//! sequence; movement checks return plain outcomes for the input layer.

use blast_grid_core::{
    ActorId, BombId, Capabilities, CellCoord, Event, HazardView, TileKind, TileView,
};

/// Result of testing a single actor against the live explosions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HitOutcome {
    /// The actor stands in a live explosion cell.
    Hit {
        /// Bomb whose explosion covers the actor.
        bomb: BombId,
    },
    /// No explosion covers the actor.
    Clear,
}

/// Result of testing a one-tile move.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MovementOutcome {
    /// The actor may enter the target cell.
    Allowed,
    /// The target cell rejects the actor.
    Blocked,
}

/// Tile an actor currently occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ActorPosition {
    /// Actor being tracked.
    pub actor: ActorId,
    /// Tile the actor is standing on.
    pub cell: CellCoord,
}

impl ActorPosition {
    /// Creates a new actor position.
    #[must_use]
    pub const fn new(actor: ActorId, cell: CellCoord) -> Self {
        Self { actor, cell }
    }
}

/// Continuous position expressed in tile units.
///
/// Tile `(c, r)` spans `[c, c + 1) x [r, r + 1)`, so its center sits at
/// `(c + 0.5, r + 0.5)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TilePosition {
    x: f32,
    y: f32,
}

impl TilePosition {
    /// Creates a position from tile-space coordinates.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate in tiles.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate in tiles.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }
}

/// Maps a continuous position to the tile beneath it.
///
/// Returns `None` when the position lies outside the positive quadrant or when
/// it is farther than `tolerance` from the tile's center on either axis, which
/// is the case while an actor is between two tiles.
#[must_use]
pub fn resolve_tile(position: TilePosition, tolerance: f32) -> Option<CellCoord> {
    let column = axis_tile(position.x, tolerance)?;
    let row = axis_tile(position.y, tolerance)?;
    Some(CellCoord::new(column, row))
}

fn axis_tile(value: f32, tolerance: f32) -> Option<u32> {
    if !value.is_finite() || value < 0.0 || value >= u32::MAX as f32 {
        return None;
    }
    let tile = value.floor();
    if (value - (tile + 0.5)).abs() > tolerance {
        return None;
    }
    Some(tile as u32)
}

/// Reports whether a live explosion covers the actor's cell.
#[must_use]
pub fn check_actor(hazards: &HazardView, cell: CellCoord) -> HitOutcome {
    match hazards.hit_at(cell) {
        Some(bomb) => HitOutcome::Hit { bomb },
        None => HitOutcome::Clear,
    }
}

/// Decides whether an actor may step from `from` into `to`.
///
/// Staying put is always allowed, so an actor can leave the bomb it just
/// dropped. Indestructible walls and cells outside the grid always block.
#[must_use]
pub fn check_movement(
    tiles: &TileView<'_>,
    from: CellCoord,
    to: CellCoord,
    capabilities: Capabilities,
) -> MovementOutcome {
    if from == to {
        return MovementOutcome::Allowed;
    }

    let Ok(cell) = tiles.cell(to) else {
        return MovementOutcome::Blocked;
    };

    let terrain_open = match cell.kind {
        TileKind::Empty => true,
        TileKind::Door => tiles.door_open(),
        TileKind::DestructibleWall => capabilities.wall_pass(),
        TileKind::IndestructibleWall => false,
    };
    let bomb_open = cell.occupant.is_none() || capabilities.bomb_pass();

    if terrain_open && bomb_open {
        MovementOutcome::Allowed
    } else {
        MovementOutcome::Blocked
    }
}

/// Pure system that reports actors caught in live explosions.
#[derive(Debug, Default)]
pub struct Collision;

impl Collision {
    /// Creates a new collision system.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Emits one `ActorHit` per actor standing in a live explosion.
    ///
    /// Hits are only reported for batches that advanced time or spawned an
    /// explosion; each actor is reported at most once per batch.
    pub fn handle(
        &mut self,
        events: &[Event],
        hazards: &HazardView,
        actors: &[ActorPosition],
        out: &mut Vec<Event>,
    ) {
        let triggered = events.iter().any(|event| {
            matches!(
                event,
                Event::TimeAdvanced { .. } | Event::ExplosionSpawned { .. }
            )
        });
        if !triggered || hazards.is_empty() {
            return;
        }

        for position in actors {
            if let HitOutcome::Hit { bomb } = check_actor(hazards, position.cell) {
                out.push(Event::ActorHit {
                    actor: position.actor,
                    cell: position.cell,
                    bomb,
                });
            }
        }
    }
}
