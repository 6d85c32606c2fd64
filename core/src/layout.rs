//! Stage layout description consumed by `Command::LoadStage`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CellCoord, HiddenItem, PowerUpKind, TileKind};

/// Item hidden beneath a destructible wall at a specific cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HiddenPlacement {
    /// Cell holding the destructible wall.
    pub cell: CellCoord,
    /// Item revealed when the wall is destroyed.
    pub item: HiddenItem,
}

/// Complete description of a stage's terrain and hidden items.
///
/// Tiles are stored row-major. Every constructor keeps the tile buffer sized
/// to `columns * rows`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageLayout {
    columns: u32,
    rows: u32,
    tiles: Vec<TileKind>,
    hidden: Vec<HiddenPlacement>,
}

impl StageLayout {
    /// Creates a layout where every tile holds the provided kind.
    #[must_use]
    pub fn filled(columns: u32, rows: u32, kind: TileKind) -> Self {
        let capacity = usize::try_from(u64::from(columns) * u64::from(rows)).unwrap_or(0);
        Self {
            columns,
            rows,
            tiles: vec![kind; capacity],
            hidden: Vec::new(),
        }
    }

    /// Creates an empty layout whose outermost ring is indestructible.
    #[must_use]
    pub fn bordered(columns: u32, rows: u32) -> Self {
        let mut layout = Self::filled(columns, rows, TileKind::Empty);
        for row in 0..rows {
            for column in 0..columns {
                let on_border =
                    row == 0 || column == 0 || row + 1 == rows || column + 1 == columns;
                if on_border {
                    layout.set(CellCoord::new(column, row), TileKind::IndestructibleWall);
                }
            }
        }
        layout
    }

    /// Parses an ASCII stage drawing, one string per row.
    ///
    /// Legend: `#` indestructible wall, `+` destructible wall, `.` empty,
    /// `D` door, `E` destructible wall hiding the exit, and destructible walls
    /// hiding power-ups: `B` extra bomb, `F` blast range, `R` remote
    /// detonator, `W` wall pass, `P` bomb pass.
    pub fn parse<S: AsRef<str>>(rows: &[S]) -> Result<Self, LayoutParseError> {
        let row_count = u32::try_from(rows.len()).map_err(|_| LayoutParseError::TooLarge)?;
        let Some(first) = rows.first() else {
            return Err(LayoutParseError::Empty);
        };
        let column_count = u32::try_from(first.as_ref().chars().count())
            .map_err(|_| LayoutParseError::TooLarge)?;
        if column_count == 0 {
            return Err(LayoutParseError::Empty);
        }

        let mut layout = Self::filled(column_count, row_count, TileKind::Empty);
        for (row_index, line) in rows.iter().enumerate() {
            let row = row_index as u32;
            let line = line.as_ref();
            let width = line.chars().count() as u32;
            if width != column_count {
                return Err(LayoutParseError::RaggedRow {
                    row,
                    expected: column_count,
                    actual: width,
                });
            }

            for (column_index, symbol) in line.chars().enumerate() {
                let cell = CellCoord::new(column_index as u32, row);
                let (kind, item) = match symbol {
                    '.' | ' ' => (TileKind::Empty, None),
                    '#' => (TileKind::IndestructibleWall, None),
                    '+' => (TileKind::DestructibleWall, None),
                    'D' => (TileKind::Door, None),
                    'E' => (TileKind::DestructibleWall, Some(HiddenItem::Exit)),
                    'B' => (
                        TileKind::DestructibleWall,
                        Some(HiddenItem::PowerUp(PowerUpKind::ExtraBomb)),
                    ),
                    'F' => (
                        TileKind::DestructibleWall,
                        Some(HiddenItem::PowerUp(PowerUpKind::BlastRange)),
                    ),
                    'R' => (
                        TileKind::DestructibleWall,
                        Some(HiddenItem::PowerUp(PowerUpKind::RemoteDetonator)),
                    ),
                    'W' => (
                        TileKind::DestructibleWall,
                        Some(HiddenItem::PowerUp(PowerUpKind::WallPass)),
                    ),
                    'P' => (
                        TileKind::DestructibleWall,
                        Some(HiddenItem::PowerUp(PowerUpKind::BombPass)),
                    ),
                    other => {
                        return Err(LayoutParseError::UnknownSymbol {
                            symbol: other,
                            cell,
                        })
                    }
                };
                layout.set(cell, kind);
                if let Some(item) = item {
                    layout.hide(cell, item);
                }
            }
        }

        Ok(layout)
    }

    /// Overwrites the terrain of a single cell. Out-of-range cells are ignored.
    pub fn set(&mut self, cell: CellCoord, kind: TileKind) {
        if let Some(index) = self.index(cell) {
            self.tiles[index] = kind;
        }
    }

    /// Conceals an item beneath the cell, replacing any previous item there.
    ///
    /// Items only take effect on cells that hold a destructible wall when the
    /// stage is loaded.
    pub fn hide(&mut self, cell: CellCoord, item: HiddenItem) {
        self.hidden.retain(|placement| placement.cell != cell);
        self.hidden.push(HiddenPlacement { cell, item });
    }

    /// Terrain stored in the provided cell, if it lies inside the layout.
    #[must_use]
    pub fn kind(&self, cell: CellCoord) -> Option<TileKind> {
        self.index(cell).and_then(|index| self.tiles.get(index).copied())
    }

    /// Items concealed beneath destructible walls.
    #[must_use]
    pub fn hidden(&self) -> &[HiddenPlacement] {
        &self.hidden
    }

    /// Number of tile columns.
    #[must_use]
    pub const fn columns(&self) -> u32 {
        self.columns
    }

    /// Number of tile rows.
    #[must_use]
    pub const fn rows(&self) -> u32 {
        self.rows
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

/// Errors produced while parsing an ASCII stage drawing.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LayoutParseError {
    /// The drawing contained no rows or an empty first row.
    #[error("stage drawing is empty")]
    Empty,
    /// The drawing exceeds the addressable grid size.
    #[error("stage drawing is too large")]
    TooLarge,
    /// A row's width differs from the first row.
    #[error("row {row} has {actual} columns, expected {expected}")]
    RaggedRow {
        /// Zero-based index of the offending row.
        row: u32,
        /// Width of the first row.
        expected: u32,
        /// Width of the offending row.
        actual: u32,
    },
    /// A character outside the legend was encountered.
    #[error("unknown stage symbol {symbol:?} at ({}, {})", .cell.column(), .cell.row())]
    UnknownSymbol {
        /// Character that could not be interpreted.
        symbol: char,
        /// Cell where the character appeared.
        cell: CellCoord,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bordered_layout_walls_outer_ring_only() {
        let layout = StageLayout::bordered(5, 4);
        assert_eq!(
            layout.kind(CellCoord::new(0, 0)),
            Some(TileKind::IndestructibleWall)
        );
        assert_eq!(
            layout.kind(CellCoord::new(4, 3)),
            Some(TileKind::IndestructibleWall)
        );
        assert_eq!(layout.kind(CellCoord::new(2, 1)), Some(TileKind::Empty));
        assert_eq!(layout.kind(CellCoord::new(5, 0)), None);
    }

    #[test]
    fn parse_reads_terrain_and_hidden_items() {
        let layout = StageLayout::parse(&["#####", "#.+E#", "#F.D#", "#####"])
            .expect("valid drawing");

        assert_eq!(layout.columns(), 5);
        assert_eq!(layout.rows(), 4);
        assert_eq!(
            layout.kind(CellCoord::new(2, 1)),
            Some(TileKind::DestructibleWall)
        );
        assert_eq!(layout.kind(CellCoord::new(3, 2)), Some(TileKind::Door));
        assert_eq!(
            layout.hidden(),
            &[
                HiddenPlacement {
                    cell: CellCoord::new(3, 1),
                    item: HiddenItem::Exit,
                },
                HiddenPlacement {
                    cell: CellCoord::new(1, 2),
                    item: HiddenItem::PowerUp(PowerUpKind::BlastRange),
                },
            ]
        );
    }

    #[test]
    fn parse_rejects_ragged_rows() {
        let error = StageLayout::parse(&["###", "##"]).expect_err("ragged drawing");
        assert_eq!(
            error,
            LayoutParseError::RaggedRow {
                row: 1,
                expected: 3,
                actual: 2,
            }
        );
    }

    #[test]
    fn parse_rejects_unknown_symbols() {
        let error = StageLayout::parse(&["#?#"]).expect_err("unknown symbol");
        assert_eq!(
            error,
            LayoutParseError::UnknownSymbol {
                symbol: '?',
                cell: CellCoord::new(1, 0),
            }
        );
    }
}
