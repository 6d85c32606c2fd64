#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic stage generation.
//!
//! Stages follow the classic arena shape: an indestructible border, pillars on
//! every even interior coordinate, and destructible walls scattered over the
//! remaining floor. The exit and one power-up are hidden under two distinct
//! destructible walls. The same global seed and stage number always produce
//! the same layout.

use blast_grid_core::{CellCoord, HiddenItem, PowerUpKind, StageLayout, TileKind};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sha2::{Digest, Sha256};
use thiserror::Error;

const MIN_DIMENSION: u32 = 5;
const MIN_DESTRUCTIBLE_WALLS: usize = 2;
const SEED_DOMAIN: &str = "blast-grid/stage";
const SPAWN_CELL: CellCoord = CellCoord::new(1, 1);
const SAFE_CELLS: [CellCoord; 3] = [SPAWN_CELL, CellCoord::new(2, 1), CellCoord::new(1, 2)];
const POWER_UPS: [PowerUpKind; 5] = [
    PowerUpKind::ExtraBomb,
    PowerUpKind::BlastRange,
    PowerUpKind::RemoteDetonator,
    PowerUpKind::WallPass,
    PowerUpKind::BombPass,
];

/// Parameters shared by every stage of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageConfig {
    columns: u32,
    rows: u32,
    wall_density: f32,
    global_seed: u64,
}

impl StageConfig {
    /// Creates a configuration for arenas of the provided size.
    ///
    /// `wall_density` is the share of free floor covered by destructible walls.
    #[must_use]
    pub const fn new(columns: u32, rows: u32, wall_density: f32, global_seed: u64) -> Self {
        Self {
            columns,
            rows,
            wall_density,
            global_seed,
        }
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

    /// Share of free floor covered by destructible walls.
    #[must_use]
    pub const fn wall_density(&self) -> f32 {
        self.wall_density
    }

    /// Seed every stage seed is derived from.
    #[must_use]
    pub const fn global_seed(&self) -> u64 {
        self.global_seed
    }
}

impl Default for StageConfig {
    fn default() -> Self {
        Self::new(15, 13, 0.35, 0)
    }
}

/// Errors reported when a configuration cannot produce a playable stage.
#[derive(Clone, Copy, Debug, PartialEq, Error)]
pub enum StageGenerationError {
    /// The arena is too small to hold a spawn area and two hidden items.
    #[error("stage of {columns}x{rows} is too small, both sides need at least 5 tiles")]
    TooSmall {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },
    /// The density lies outside `0.0..=1.0`.
    #[error("wall density {0} must lie between 0 and 1")]
    InvalidDensity(f32),
}

/// Stage generator producing layouts for `Command::LoadStage`.
#[derive(Clone, Debug)]
pub struct StageGeneration {
    config: StageConfig,
}

impl StageGeneration {
    /// Creates a generator using the provided configuration.
    #[must_use]
    pub fn new(config: StageConfig) -> Self {
        Self { config }
    }

    /// Cell where the player starts; it and its two neighbours stay clear.
    #[must_use]
    pub const fn spawn_cell() -> CellCoord {
        SPAWN_CELL
    }

    /// Generates the layout for a stage number.
    pub fn generate(&self, stage: u32) -> Result<StageLayout, StageGenerationError> {
        let StageConfig {
            columns,
            rows,
            wall_density,
            global_seed,
        } = self.config;
        if columns < MIN_DIMENSION || rows < MIN_DIMENSION {
            return Err(StageGenerationError::TooSmall { columns, rows });
        }
        if !(0.0..=1.0).contains(&wall_density) {
            return Err(StageGenerationError::InvalidDensity(wall_density));
        }

        let mut layout = StageLayout::bordered(columns, rows);
        let mut floor = Vec::new();
        for row in 1..rows - 1 {
            for column in 1..columns - 1 {
                let cell = CellCoord::new(column, row);
                if column % 2 == 0 && row % 2 == 0 {
                    layout.set(cell, TileKind::IndestructibleWall);
                } else if !SAFE_CELLS.contains(&cell) {
                    floor.push(cell);
                }
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(derive_stage_seed(global_seed, stage));
        floor.shuffle(&mut rng);

        let wall_count = ((floor.len() as f32) * wall_density).round() as usize;
        let wall_count = wall_count.clamp(MIN_DESTRUCTIBLE_WALLS, floor.len());
        let walls = &floor[..wall_count];
        for cell in walls {
            layout.set(*cell, TileKind::DestructibleWall);
        }

        let power_up = POWER_UPS[rng.gen_range(0..POWER_UPS.len())];
        layout.hide(walls[0], HiddenItem::Exit);
        layout.hide(walls[1], HiddenItem::PowerUp(power_up));

        Ok(layout)
    }
}

fn derive_stage_seed(global_seed: u64, stage: u32) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(SEED_DOMAIN.as_bytes());
    hasher.update(global_seed.to_le_bytes());
    hasher.update(stage.to_le_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0_u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn count(layout: &StageLayout, kind: TileKind) -> usize {
        (0..layout.rows())
            .flat_map(|row| (0..layout.columns()).map(move |column| CellCoord::new(column, row)))
            .filter(|cell| layout.kind(*cell) == Some(kind))
            .count()
    }

    #[test]
    fn same_seed_and_stage_yield_same_layout() {
        let generator = StageGeneration::new(StageConfig::new(13, 11, 0.4, 0xdead_beef));
        assert_eq!(generator.generate(3), generator.generate(3));
    }

    #[test]
    fn stage_seeds_differ_per_stage() {
        assert_ne!(derive_stage_seed(7, 1), derive_stage_seed(7, 2));
        assert_ne!(derive_stage_seed(7, 1), derive_stage_seed(8, 1));
    }

    #[test]
    fn pillars_sit_on_even_interior_coordinates() {
        let layout = StageGeneration::new(StageConfig::new(9, 7, 0.0, 1))
            .generate(1)
            .expect("valid config");

        assert_eq!(
            layout.kind(CellCoord::new(2, 2)),
            Some(TileKind::IndestructibleWall)
        );
        assert_eq!(
            layout.kind(CellCoord::new(6, 4)),
            Some(TileKind::IndestructibleWall)
        );
        assert_ne!(
            layout.kind(CellCoord::new(3, 2)),
            Some(TileKind::IndestructibleWall)
        );
    }

    #[test]
    fn zero_density_still_hides_exit_and_power_up() {
        let layout = StageGeneration::new(StageConfig::new(7, 7, 0.0, 9))
            .generate(1)
            .expect("valid config");

        assert_eq!(count(&layout, TileKind::DestructibleWall), 2);
        assert_eq!(layout.hidden().len(), 2);
    }

    #[test]
    fn rejects_tiny_arenas_and_bad_density() {
        assert_eq!(
            StageGeneration::new(StageConfig::new(4, 9, 0.3, 0)).generate(1),
            Err(StageGenerationError::TooSmall {
                columns: 4,
                rows: 9
            })
        );
        assert_eq!(
            StageGeneration::new(StageConfig::new(9, 9, 1.5, 0)).generate(1),
            Err(StageGenerationError::InvalidDensity(1.5))
        );
    }
}
