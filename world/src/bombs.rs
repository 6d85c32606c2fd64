//! Authoritative bomb state management utilities.

use std::time::Duration;

use blast_grid_core::{
    ActorId, BombId, BombSnapshot, BombState, CellCoord, Fuse, PlacementError, TileKind,
};

use crate::grid::{cell_count, TileGrid};

/// Bomb stored inside the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Bomb {
    pub(crate) id: BombId,
    pub(crate) owner: ActorId,
    pub(crate) cell: CellCoord,
    pub(crate) blast_range: u32,
    pub(crate) fuse: Fuse,
    pub(crate) state: BombState,
}

impl Bomb {
    pub(crate) fn snapshot(&self) -> BombSnapshot {
        BombSnapshot {
            id: self.id,
            owner: self.owner,
            cell: self.cell,
            blast_range: self.blast_range,
            fuse: self.fuse,
            state: self.state,
        }
    }
}

/// Placement parameters captured from the owner's loadout.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PlacementRequest {
    pub(crate) owner: ActorId,
    pub(crate) cell: CellCoord,
    pub(crate) blast_range: u32,
    pub(crate) fuse: Fuse,
    pub(crate) max_active: u32,
}

/// Registry that stores bombs in placement order and manages identifier allocation.
#[derive(Clone, Debug, Default)]
pub(crate) struct BombRegistry {
    entries: Vec<Bomb>,
    occupancy: Vec<Option<BombId>>,
    columns: u32,
    rows: u32,
    next_bomb_id: u32,
}

impl BombRegistry {
    /// Creates an empty registry sized to the provided grid.
    pub(crate) fn new(columns: u32, rows: u32) -> Self {
        Self {
            entries: Vec::new(),
            occupancy: vec![None; cell_count(columns, rows)],
            columns,
            rows,
            next_bomb_id: 0,
        }
    }

    /// Validates and arms a new bomb.
    pub(crate) fn place(
        &mut self,
        request: PlacementRequest,
        grid: &TileGrid,
    ) -> Result<BombId, PlacementError> {
        if request.blast_range == 0 {
            return Err(PlacementError::InvalidBlastRange);
        }
        let Some(index) = self.index(request.cell) else {
            return Err(PlacementError::OutOfBounds);
        };
        match grid.kind(request.cell) {
            Ok(TileKind::Empty | TileKind::Door) => {}
            Ok(TileKind::IndestructibleWall | TileKind::DestructibleWall) => {
                return Err(PlacementError::Blocked)
            }
            Err(_) => return Err(PlacementError::OutOfBounds),
        }
        if self.occupancy[index].is_some() {
            return Err(PlacementError::Occupied);
        }
        if self.active_count(request.owner) >= request.max_active {
            return Err(PlacementError::LimitReached);
        }

        let next = self
            .next_bomb_id
            .checked_add(1)
            .ok_or(PlacementError::IdentifiersExhausted)?;
        let id = BombId::new(self.next_bomb_id);
        self.next_bomb_id = next;
        self.occupancy[index] = Some(id);
        self.entries.push(Bomb {
            id,
            owner: request.owner,
            cell: request.cell,
            blast_range: request.blast_range,
            fuse: request.fuse,
            state: BombState::Armed,
        });
        Ok(id)
    }

    /// Burns `dt` off every armed timed fuse and returns the bombs whose fuse ran out.
    ///
    /// The returned identifiers are in placement order. Bombs stay `Armed`
    /// until [`Self::begin_detonation`] is called for them.
    pub(crate) fn advance_fuses(&mut self, dt: Duration) -> Vec<BombId> {
        let mut expired = Vec::new();
        for bomb in &mut self.entries {
            if bomb.state != BombState::Armed {
                continue;
            }
            if let Fuse::Timed { remaining } = &mut bomb.fuse {
                *remaining = remaining.saturating_sub(dt);
                if remaining.is_zero() {
                    expired.push(bomb.id);
                }
            }
        }
        expired
    }

    /// Moves an armed bomb into `Detonating`.
    ///
    /// Returns `false` for unknown bombs and for bombs already detonating, so
    /// chain requests never detonate a bomb twice.
    pub(crate) fn begin_detonation(&mut self, bomb: BombId) -> bool {
        match self.entries.iter_mut().find(|entry| entry.id == bomb) {
            Some(entry) if entry.state == BombState::Armed => {
                entry.state = BombState::Detonating;
                true
            }
            _ => false,
        }
    }

    /// Selects the owner's oldest armed bomb and moves it into `Detonating`.
    pub(crate) fn detonate_next(&mut self, owner: ActorId) -> Option<BombId> {
        let entry = self
            .entries
            .iter_mut()
            .find(|entry| entry.owner == owner && entry.state == BombState::Armed)?;
        entry.state = BombState::Detonating;
        Some(entry.id)
    }

    /// Marks the bomb spent, removes it and frees its cell and owner slot.
    pub(crate) fn retire(&mut self, bomb: BombId) -> Option<Bomb> {
        let position = self.entries.iter().position(|entry| entry.id == bomb)?;
        let mut entry = self.entries.remove(position);
        entry.state = BombState::Spent;
        if let Some(index) = self.index(entry.cell) {
            if self.occupancy[index] == Some(bomb) {
                self.occupancy[index] = None;
            }
        }
        Some(entry)
    }

    /// Re-inserts a persisted bomb, preserving its identifier.
    pub(crate) fn restore(&mut self, bomb: Bomb) {
        if let Some(index) = self.index(bomb.cell) {
            self.occupancy[index] = Some(bomb.id);
        }
        self.entries.push(bomb);
    }

    pub(crate) fn set_next_bomb_id(&mut self, next: u32) {
        self.next_bomb_id = next;
    }

    pub(crate) const fn next_bomb_id(&self) -> u32 {
        self.next_bomb_id
    }

    pub(crate) fn get(&self, bomb: BombId) -> Option<&Bomb> {
        self.entries.iter().find(|entry| entry.id == bomb)
    }

    /// Bomb occupying the cell, if any.
    pub(crate) fn occupant(&self, cell: CellCoord) -> Option<BombId> {
        self.index(cell).and_then(|index| self.occupancy[index])
    }

    /// Number of bombs owned by the actor that have not finished detonating.
    pub(crate) fn active_count(&self, owner: ActorId) -> u32 {
        let count = self
            .entries
            .iter()
            .filter(|entry| entry.owner == owner)
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Bomb> {
        self.entries.iter()
    }

    pub(crate) fn occupancy(&self) -> &[Option<BombId>] {
        &self.occupancy
    }

    fn index(&self, cell: CellCoord) -> Option<usize> {
        if cell.column() < self.columns && cell.row() < self.rows {
            let row = usize::try_from(cell.row()).ok()?;
            let column = usize::try_from(cell.column()).ok()?;
            let width = usize::try_from(self.columns).ok()?;
            Some(row * width + column)
        } else {
            None
        }
    }
}
