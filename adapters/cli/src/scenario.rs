//! TOML scenario files driving a headless run.

use std::{fs, path::Path, time::Duration};

use anyhow::{bail, ensure, Context, Result};
use blast_grid_core::{ActorId, Capabilities, CellCoord, StageLayout};
use blast_grid_system_bomber::Loadout;
use blast_grid_system_stage_generation::{StageConfig, StageGeneration};
use blast_grid_world::EngineConfig;
use serde::Deserialize;

const DEFAULT_TICK_MS: u64 = 100;
const DEFAULT_TICKS: u64 = 100;
const DEFAULT_HAZARD_MS: u64 = 500;
const DEFAULT_FUSE_MS: u64 = 2_000;

/// Fully validated scenario ready to be run.
#[derive(Clone, Debug)]
pub(crate) struct Scenario {
    pub(crate) tick: Duration,
    pub(crate) ticks: u64,
    pub(crate) engine: EngineConfig,
    pub(crate) layout: StageLayout,
    pub(crate) players: Vec<PlayerSetup>,
    pub(crate) inputs: Vec<ScriptedInput>,
    pub(crate) unlock_exit_tick: Option<u64>,
}

/// Starting state of one player.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PlayerSetup {
    pub(crate) actor: ActorId,
    pub(crate) start: CellCoord,
    pub(crate) loadout: Loadout,
}

/// Action a player performs on a given tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    PlaceBomb,
    Detonate,
    Move(CellCoord),
}

/// Input scheduled for a tick, numbered from 1 since the stage loaded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ScriptedInput {
    pub(crate) tick: u64,
    pub(crate) actor: ActorId,
    pub(crate) action: Action,
}

impl Scenario {
    /// Reads and validates a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid scenario at {}", path.display()))
    }

    /// Parses and validates scenario TOML.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        let file: ScenarioFile =
            toml::from_str(contents).context("failed to parse scenario toml contents")?;

        let layout = match file.stage {
            StageSource::Drawing { rows } => {
                StageLayout::parse(rows.as_slice()).context("failed to parse stage drawing")?
            }
            StageSource::Generated {
                columns,
                rows,
                density,
                seed,
                stage,
            } => StageGeneration::new(StageConfig::new(columns, rows, density, seed))
                .generate(stage)
                .context("failed to generate stage")?,
        };

        let engine = file.engine.unwrap_or_default();
        let engine = EngineConfig::new(
            Duration::from_millis(engine.hazard_ms.unwrap_or(DEFAULT_HAZARD_MS)),
            engine.lock_exit.unwrap_or(false),
        );

        ensure!(!file.players.is_empty(), "scenario declares no players");
        let mut players = Vec::with_capacity(file.players.len());
        for player in file.players {
            let actor = ActorId::new(player.id);
            if players
                .iter()
                .any(|existing: &PlayerSetup| existing.actor == actor)
            {
                bail!("player {} is declared twice", player.id);
            }
            let start = CellCoord::new(player.start[0], player.start[1]);
            ensure!(
                start.column() < layout.columns() && start.row() < layout.rows(),
                "player {} starts outside the stage",
                player.id
            );
            let loadout = Loadout::new(
                player.max_bombs.unwrap_or(1),
                player.blast_range.unwrap_or(1),
                Duration::from_millis(player.fuse_ms.unwrap_or(DEFAULT_FUSE_MS)),
                Capabilities::none(),
            );
            players.push(PlayerSetup {
                actor,
                start,
                loadout,
            });
        }

        let mut inputs = Vec::with_capacity(file.inputs.len());
        for input in file.inputs {
            let actor = ActorId::new(input.player);
            ensure!(
                players.iter().any(|player| player.actor == actor),
                "input on tick {} names unknown player {}",
                input.tick,
                input.player
            );
            let action = match (input.action, input.to) {
                (ActionKind::PlaceBomb, None) => Action::PlaceBomb,
                (ActionKind::Detonate, None) => Action::Detonate,
                (ActionKind::Move, Some([column, row])) => Action::Move(CellCoord::new(column, row)),
                (ActionKind::Move, None) => {
                    bail!("move on tick {} is missing its `to` cell", input.tick)
                }
                (_, Some(_)) => bail!("only moves take a `to` cell (tick {})", input.tick),
            };
            inputs.push(ScriptedInput {
                tick: input.tick,
                actor,
                action,
            });
        }
        inputs.sort_by_key(|input| input.tick);

        Ok(Self {
            tick: Duration::from_millis(file.tick_ms.unwrap_or(DEFAULT_TICK_MS)),
            ticks: file.ticks.unwrap_or(DEFAULT_TICKS),
            engine,
            layout,
            players,
            inputs,
            unlock_exit_tick: file.unlock_exit_tick,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScenarioFile {
    tick_ms: Option<u64>,
    ticks: Option<u64>,
    unlock_exit_tick: Option<u64>,
    stage: StageSource,
    engine: Option<EngineSection>,
    players: Vec<PlayerSection>,
    #[serde(default)]
    inputs: Vec<InputSection>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum StageSource {
    Drawing {
        rows: Vec<String>,
    },
    Generated {
        columns: u32,
        rows: u32,
        density: f32,
        seed: u64,
        stage: u32,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct EngineSection {
    hazard_ms: Option<u64>,
    lock_exit: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PlayerSection {
    id: u32,
    start: [u32; 2],
    max_bombs: Option<u32>,
    blast_range: Option<u32>,
    fuse_ms: Option<u64>,
}

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ActionKind {
    PlaceBomb,
    Detonate,
    Move,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct InputSection {
    tick: u64,
    player: u32,
    action: ActionKind,
    to: Option<[u32; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use blast_grid_core::TileKind;

    #[test]
    fn bundled_scenarios_parse() {
        for contents in [
            include_str!("../scenarios/chain_reaction.toml"),
            include_str!("../scenarios/generated_stage.toml"),
        ] {
            let scenario = Scenario::parse(contents).expect("bundled scenario parses");
            assert!(!scenario.players.is_empty());
        }
    }

    #[test]
    fn drawing_stage_and_defaults() {
        let scenario = Scenario::parse(
            r########"
            [stage.drawing]
            rows = ["#####", "#...#", "#####"]

            [[players]]
            id = 1
            start = [1, 1]

            [[inputs]]
            tick = 2
            player = 1
            action = "move"
            to = [2, 1]

            [[inputs]]
            tick = 1
            player = 1
            action = "place_bomb"
            "########,
        )
        .expect("valid scenario");

        assert_eq!(scenario.tick, Duration::from_millis(DEFAULT_TICK_MS));
        assert_eq!(scenario.engine, EngineConfig::default());
        assert_eq!(
            scenario.layout.kind(CellCoord::new(0, 0)),
            Some(TileKind::IndestructibleWall)
        );
        assert_eq!(scenario.players[0].loadout, Loadout::default());
        assert_eq!(
            scenario.inputs.iter().map(|input| input.action).collect::<Vec<_>>(),
            vec![Action::PlaceBomb, Action::Move(CellCoord::new(2, 1))]
        );
    }

    #[test]
    fn rejects_inputs_for_unknown_players() {
        let error = Scenario::parse(
            r########"
            [stage.drawing]
            rows = ["..."]

            [[players]]
            id = 1
            start = [0, 0]

            [[inputs]]
            tick = 1
            player = 2
            action = "detonate"
            "########,
        )
        .expect_err("unknown player");

        assert!(error.to_string().contains("unknown player 2"), "{error}");
    }

    #[test]
    fn rejects_moves_without_target() {
        let error = Scenario::parse(
            r########"
            [stage.drawing]
            rows = ["..."]

            [[players]]
            id = 1
            start = [0, 0]

            [[inputs]]
            tick = 1
            player = 1
            action = "move"
            "########,
        )
        .expect_err("move without target");

        assert!(error.to_string().contains("missing its `to` cell"), "{error}");
    }
}
