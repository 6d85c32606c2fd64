//! Explosion propagation and the live hazard set.

use std::time::Duration;

use blast_grid_core::{BombId, CellCoord, Direction, ExplosionCell, SegmentKind, TileKind};

use crate::{
    bombs::{Bomb, BombRegistry},
    grid::TileGrid,
};

/// Cells reached by a single detonation plus the bombs it sets off.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Blast {
    pub(crate) cells: Vec<ExplosionCell>,
    pub(crate) chained: Vec<BombId>,
}

/// Walks the four arms of an explosion starting at the bomb's cell.
///
/// Each arm advances at most `blast_range` tiles and stops at the grid edge,
/// before an indestructible wall, or on the first destructible wall or bomb it
/// reaches. Bombs reached by an arm are reported in `chained` in arm order.
pub(crate) fn propagate(origin: &Bomb, grid: &TileGrid, bombs: &BombRegistry) -> Blast {
    let mut blast = Blast::default();
    blast.cells.push(ExplosionCell {
        cell: origin.cell,
        bomb: origin.id,
        segment: SegmentKind::Center,
    });

    if grid.kind(origin.cell).map_or(true, TileKind::is_wall) {
        return blast;
    }

    for direction in Direction::ALL {
        let arm_start = blast.cells.len();
        let mut current = origin.cell;

        for _ in 0..origin.blast_range {
            let Some(next) = current.step(direction) else {
                break;
            };
            let Ok(kind) = grid.kind(next) else {
                break;
            };
            if kind == TileKind::IndestructibleWall {
                break;
            }

            blast.cells.push(ExplosionCell {
                cell: next,
                bomb: origin.id,
                segment: SegmentKind::Run(direction),
            });

            if kind == TileKind::DestructibleWall {
                break;
            }
            if let Some(occupant) = bombs.occupant(next) {
                if occupant != origin.id {
                    blast.chained.push(occupant);
                    break;
                }
            }
            current = next;
        }

        if blast.cells.len() > arm_start {
            if let Some(tip) = blast.cells.last_mut() {
                tip.segment = SegmentKind::Tip(direction);
            }
        }
    }

    blast
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Hazard {
    pub(crate) bomb: BombId,
    pub(crate) cells: Vec<ExplosionCell>,
    pub(crate) remaining: Duration,
    pub(crate) born_tick: u64,
}

/// Live explosion cells grouped per detonation, oldest first.
#[derive(Clone, Debug, Default)]
pub(crate) struct HazardSet {
    records: Vec<Hazard>,
}

impl HazardSet {
    pub(crate) fn insert(
        &mut self,
        bomb: BombId,
        cells: Vec<ExplosionCell>,
        remaining: Duration,
        born_tick: u64,
    ) {
        self.records.push(Hazard {
            bomb,
            cells,
            remaining,
            born_tick,
        });
    }

    /// Ages hazards created before `tick_index` and removes the expired ones.
    ///
    /// Hazards created during the current tick, or between ticks for the
    /// upcoming one, keep their full duration.
    /// Expired hazards are returned in creation order.
    pub(crate) fn age(&mut self, dt: Duration, tick_index: u64) -> Vec<Hazard> {
        let mut expired = Vec::new();
        let mut live = Vec::with_capacity(self.records.len());
        for mut hazard in self.records.drain(..) {
            if hazard.born_tick < tick_index {
                hazard.remaining = hazard.remaining.saturating_sub(dt);
            }
            if hazard.remaining.is_zero() {
                expired.push(hazard);
            } else {
                live.push(hazard);
            }
        }
        self.records = live;
        expired
    }

    pub(crate) fn cells(&self) -> impl Iterator<Item = &ExplosionCell> {
        self.records.iter().flat_map(|hazard| hazard.cells.iter())
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Hazard> {
        self.records.iter()
    }

    pub(crate) fn contains(&self, cell: CellCoord) -> bool {
        self.cells().any(|explosion| explosion.cell == cell)
    }
}
