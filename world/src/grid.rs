//! Authoritative tile grid owning terrain and hidden items.

use std::collections::BTreeMap;

use blast_grid_core::{
    CellCoord, Event, GridError, HiddenItem, PowerUpKind, StageLayout, TileKind,
};
use tracing::debug;

/// Dense row-major terrain grid plus the items concealed in or lying on it.
#[derive(Clone, Debug, Default)]
pub(crate) struct TileGrid {
    columns: u32,
    rows: u32,
    tiles: Vec<TileKind>,
    hidden: BTreeMap<CellCoord, HiddenItem>,
    power_ups: BTreeMap<CellCoord, PowerUpKind>,
}

impl TileGrid {
    /// Builds a grid from a stage layout.
    ///
    /// Hidden items are kept only where the layout holds a destructible wall.
    pub(crate) fn from_layout(layout: &StageLayout) -> Self {
        let columns = layout.columns();
        let rows = layout.rows();
        let mut tiles = Vec::with_capacity(cell_count(columns, rows));
        for row in 0..rows {
            for column in 0..columns {
                tiles.push(layout.kind(CellCoord::new(column, row)).unwrap_or_default());
            }
        }

        let mut grid = Self {
            columns,
            rows,
            tiles,
            hidden: BTreeMap::new(),
            power_ups: BTreeMap::new(),
        };
        for placement in layout.hidden() {
            if grid.kind(placement.cell) == Ok(TileKind::DestructibleWall) {
                let _ = grid.hidden.insert(placement.cell, placement.item);
            }
        }
        grid
    }

    /// Rebuilds a grid from persisted parts without validation.
    pub(crate) fn from_parts(
        columns: u32,
        rows: u32,
        tiles: Vec<TileKind>,
        hidden: BTreeMap<CellCoord, HiddenItem>,
        power_ups: BTreeMap<CellCoord, PowerUpKind>,
    ) -> Self {
        Self {
            columns,
            rows,
            tiles,
            hidden,
            power_ups,
        }
    }

    /// Terrain stored in the cell.
    pub(crate) fn kind(&self, cell: CellCoord) -> Result<TileKind, GridError> {
        let index = self.index(cell).ok_or(GridError::OutOfBounds {
            cell,
            columns: self.columns,
            rows: self.rows,
        })?;
        Ok(self.tiles[index])
    }

    /// Reports whether the cell lies inside the grid.
    pub(crate) fn contains(&self, cell: CellCoord) -> bool {
        self.index(cell).is_some()
    }

    /// Clears a destructible wall and reveals whatever it concealed.
    ///
    /// Returns `Ok(false)` without emitting events when the cell holds anything
    /// other than a destructible wall.
    pub(crate) fn destroy(
        &mut self,
        cell: CellCoord,
        out_events: &mut Vec<Event>,
    ) -> Result<bool, GridError> {
        if self.kind(cell)? != TileKind::DestructibleWall {
            return Ok(false);
        }
        let Some(index) = self.index(cell) else {
            return Ok(false);
        };

        self.tiles[index] = TileKind::Empty;
        out_events.push(Event::WallDestroyed { cell });
        debug!(column = cell.column(), row = cell.row(), "wall destroyed");

        match self.hidden.remove(&cell) {
            Some(HiddenItem::PowerUp(kind)) => {
                let _ = self.power_ups.insert(cell, kind);
                out_events.push(Event::PowerUpRevealed { cell, kind });
            }
            Some(HiddenItem::Exit) => {
                self.tiles[index] = TileKind::Door;
                out_events.push(Event::StageCleared { exit: cell });
                debug!(column = cell.column(), row = cell.row(), "exit revealed");
            }
            None => {}
        }

        Ok(true)
    }

    /// Removes and returns the revealed power-up lying on the cell.
    pub(crate) fn take_power_up(&mut self, cell: CellCoord) -> Option<PowerUpKind> {
        self.power_ups.remove(&cell)
    }

    pub(crate) fn power_ups(&self) -> &BTreeMap<CellCoord, PowerUpKind> {
        &self.power_ups
    }

    pub(crate) fn hidden(&self) -> &BTreeMap<CellCoord, HiddenItem> {
        &self.hidden
    }

    pub(crate) fn tiles(&self) -> &[TileKind] {
        &self.tiles
    }

    pub(crate) const fn dimensions(&self) -> (u32, u32) {
        (self.columns, self.rows)
    }

    pub(crate) fn index(&self, cell: CellCoord) -> Option<usize> {
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

pub(crate) fn cell_count(columns: u32, rows: u32) -> usize {
    usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&str]) -> TileGrid {
        TileGrid::from_layout(&StageLayout::parse(rows).expect("valid drawing"))
    }

    #[test]
    fn destroy_clears_destructible_wall_once() {
        let mut grid = grid(&["+.#"]);
        let cell = CellCoord::new(0, 0);
        let mut events = Vec::new();

        assert_eq!(grid.destroy(cell, &mut events), Ok(true));
        assert_eq!(grid.kind(cell), Ok(TileKind::Empty));
        assert_eq!(events, vec![Event::WallDestroyed { cell }]);

        events.clear();
        assert_eq!(grid.destroy(cell, &mut events), Ok(false));
        assert!(events.is_empty(), "second destroy must not re-emit");
    }

    #[test]
    fn destroy_ignores_indestructible_walls_and_doors() {
        let mut grid = grid(&["#D"]);
        let mut events = Vec::new();

        assert_eq!(grid.destroy(CellCoord::new(0, 0), &mut events), Ok(false));
        assert_eq!(grid.destroy(CellCoord::new(1, 0), &mut events), Ok(false));
        assert_eq!(grid.kind(CellCoord::new(0, 0)), Ok(TileKind::IndestructibleWall));
        assert!(events.is_empty());
    }

    #[test]
    fn destroy_out_of_bounds_reports_error() {
        let mut grid = grid(&["..", ".."]);
        let mut events = Vec::new();
        let cell = CellCoord::new(2, 0);

        assert_eq!(
            grid.destroy(cell, &mut events),
            Err(GridError::OutOfBounds {
                cell,
                columns: 2,
                rows: 2,
            })
        );
    }

    #[test]
    fn destroy_reveals_power_up_and_exit() {
        let mut grid = grid(&["WE"]);
        let power_up_cell = CellCoord::new(0, 0);
        let exit_cell = CellCoord::new(1, 0);
        let mut events = Vec::new();

        assert_eq!(grid.destroy(power_up_cell, &mut events), Ok(true));
        assert_eq!(grid.destroy(exit_cell, &mut events), Ok(true));

        assert_eq!(
            events,
            vec![
                Event::WallDestroyed {
                    cell: power_up_cell
                },
                Event::PowerUpRevealed {
                    cell: power_up_cell,
                    kind: PowerUpKind::WallPass,
                },
                Event::WallDestroyed { cell: exit_cell },
                Event::StageCleared { exit: exit_cell },
            ]
        );
        assert_eq!(grid.kind(exit_cell), Ok(TileKind::Door));
        assert_eq!(grid.take_power_up(power_up_cell), Some(PowerUpKind::WallPass));
        assert_eq!(grid.take_power_up(power_up_cell), None);
    }

    #[test]
    fn hidden_items_on_open_floor_are_discarded() {
        let mut layout = StageLayout::filled(2, 1, TileKind::Empty);
        layout.hide(CellCoord::new(0, 0), HiddenItem::Exit);

        let grid = TileGrid::from_layout(&layout);
        assert!(grid.hidden().is_empty());
    }
}
