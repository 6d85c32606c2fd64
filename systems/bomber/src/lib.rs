#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Bomber system translating player input into bomb commands.
//!
//! Each bomber owns the loadout of a single actor. Collected power-ups raise
//! the loadout, and the loadout is copied into every `Command::PlaceBomb` so
//! later upgrades never affect bombs already on the grid.

use std::{collections::BTreeSet, time::Duration};

use blast_grid_core::{ActorId, Capabilities, CellCoord, Command, Event, Fuse, PowerUpKind};

const DEFAULT_FUSE: Duration = Duration::from_secs(2);
/// Highest number of bombs a loadout can hold at once.
pub const MAX_BOMBS_CAP: u32 = 10;
/// Highest blast range a loadout can reach.
pub const BLAST_RANGE_CAP: u32 = 10;

/// Bomb settings and capabilities carried by one actor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Loadout {
    max_bombs: u32,
    blast_range: u32,
    fuse: Duration,
    capabilities: Capabilities,
}

impl Loadout {
    /// Creates a loadout, clamping counts into `1..=cap`.
    #[must_use]
    pub fn new(max_bombs: u32, blast_range: u32, fuse: Duration, capabilities: Capabilities) -> Self {
        Self {
            max_bombs: max_bombs.clamp(1, MAX_BOMBS_CAP),
            blast_range: blast_range.clamp(1, BLAST_RANGE_CAP),
            fuse,
            capabilities,
        }
    }

    /// Raises the loadout according to a collected power-up.
    pub fn apply_power_up(&mut self, kind: PowerUpKind) {
        match kind {
            PowerUpKind::ExtraBomb => {
                self.max_bombs = self.max_bombs.saturating_add(1).min(MAX_BOMBS_CAP);
            }
            PowerUpKind::BlastRange => {
                self.blast_range = self.blast_range.saturating_add(1).min(BLAST_RANGE_CAP);
            }
            PowerUpKind::RemoteDetonator => {
                self.capabilities = self.capabilities.with_remote_detonation();
            }
            PowerUpKind::WallPass => self.capabilities = self.capabilities.with_wall_pass(),
            PowerUpKind::BombPass => self.capabilities = self.capabilities.with_bomb_pass(),
        }
    }

    /// Number of bombs the actor may have on the grid at once.
    #[must_use]
    pub const fn max_bombs(&self) -> u32 {
        self.max_bombs
    }

    /// Tiles reached by each explosion arm.
    #[must_use]
    pub const fn blast_range(&self) -> u32 {
        self.blast_range
    }

    /// Fuse length used while the actor lacks a remote detonator.
    #[must_use]
    pub const fn fuse(&self) -> Duration {
        self.fuse
    }

    /// Capabilities granted by collected power-ups.
    #[must_use]
    pub const fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn placement_fuse(&self) -> Fuse {
        if self.capabilities.remote_detonation() {
            Fuse::Remote
        } else {
            Fuse::timed(self.fuse)
        }
    }
}

impl Default for Loadout {
    fn default() -> Self {
        Self::new(1, 1, DEFAULT_FUSE, Capabilities::none())
    }
}

/// Input sampled for one actor during a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BomberInput {
    /// Tile the actor stands on.
    pub cell: CellCoord,
    /// Whether the bomb button was pressed.
    pub place_bomb: bool,
    /// Whether the detonate button was pressed.
    pub detonate: bool,
}

impl BomberInput {
    /// Input with no buttons pressed.
    #[must_use]
    pub const fn idle(cell: CellCoord) -> Self {
        Self {
            cell,
            place_bomb: false,
            detonate: false,
        }
    }
}

/// Pure system that issues bomb and pickup commands for one actor.
#[derive(Debug)]
pub struct Bomber {
    actor: ActorId,
    loadout: Loadout,
    revealed: BTreeSet<CellCoord>,
}

impl Bomber {
    /// Creates a bomber for the actor using the provided loadout.
    #[must_use]
    pub fn new(actor: ActorId, loadout: Loadout) -> Self {
        Self {
            actor,
            loadout,
            revealed: BTreeSet::new(),
        }
    }

    /// Actor driven by this bomber.
    #[must_use]
    pub const fn actor(&self) -> ActorId {
        self.actor
    }

    /// Current loadout, including collected power-ups.
    #[must_use]
    pub const fn loadout(&self) -> &Loadout {
        &self.loadout
    }

    /// Replaces the known revealed power-ups with the world's current set.
    ///
    /// Needed when the bomber starts on a world it did not watch from stage
    /// load, such as one restored from a snapshot.
    pub fn sync_revealed<I>(&mut self, cells: I)
    where
        I: IntoIterator<Item = CellCoord>,
    {
        self.revealed = cells.into_iter().collect();
    }

    /// Consumes world events and the actor's input to emit commands.
    ///
    /// Power-ups collected by this actor are applied before the input is
    /// translated, so a pickup and a bomb in the same frame use the raised
    /// loadout.
    pub fn handle(&mut self, events: &[Event], input: BomberInput, out: &mut Vec<Command>) {
        for event in events {
            match event {
                Event::StageLoaded { .. } => self.revealed.clear(),
                Event::PowerUpRevealed { cell, .. } => {
                    let _ = self.revealed.insert(*cell);
                }
                Event::PowerUpDestroyed { cell, .. } => {
                    let _ = self.revealed.remove(cell);
                }
                Event::PowerUpCollected { actor, cell, kind } => {
                    let _ = self.revealed.remove(cell);
                    if *actor == self.actor {
                        self.loadout.apply_power_up(*kind);
                    }
                }
                _ => {}
            }
        }

        if self.revealed.contains(&input.cell) {
            out.push(Command::CollectPowerUp {
                actor: self.actor,
                cell: input.cell,
            });
        }

        if input.place_bomb {
            out.push(Command::PlaceBomb {
                owner: self.actor,
                cell: input.cell,
                blast_range: self.loadout.blast_range,
                fuse: self.loadout.placement_fuse(),
                max_active: self.loadout.max_bombs,
            });
        }

        if input.detonate && self.loadout.capabilities.remote_detonation() {
            out.push(Command::DetonateNext { owner: self.actor });
        }
    }
}
