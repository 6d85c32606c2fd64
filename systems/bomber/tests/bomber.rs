use std::time::Duration;

use blast_grid_core::{ActorId, CellCoord, Command, Event, Fuse, PowerUpKind, StageLayout};
use blast_grid_system_bomber::{Bomber, BomberInput, Loadout};
use blast_grid_world::{self as world, query, snapshot, EngineConfig, World};

fn run(world: &mut World, commands: Vec<Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

fn load(rows: &[&str]) -> (World, Vec<Event>) {
    let mut world = World::new();
    let events = run(
        &mut world,
        vec![Command::LoadStage {
            layout: StageLayout::parse(rows).expect("valid drawing"),
        }],
    );
    (world, events)
}

fn tick(world: &mut World, millis: u64) -> Vec<Event> {
    run(
        world,
        vec![Command::Tick {
            dt: Duration::from_millis(millis),
        }],
    )
}

#[test]
fn place_bomb_captures_loadout() {
    let (mut world, events) = load(&["....."]);
    let actor = ActorId::new(1);
    let mut bomber = Bomber::new(actor, Loadout::default());

    let mut commands = Vec::new();
    bomber.handle(
        &events,
        BomberInput {
            cell: CellCoord::new(2, 0),
            place_bomb: true,
            detonate: false,
        },
        &mut commands,
    );

    assert_eq!(
        commands,
        vec![Command::PlaceBomb {
            owner: actor,
            cell: CellCoord::new(2, 0),
            blast_range: 1,
            fuse: Fuse::timed(Duration::from_secs(2)),
            max_active: 1,
        }]
    );

    let placed = run(&mut world, commands);
    assert!(matches!(placed.as_slice(), [Event::BombPlaced { .. }]));
    assert_eq!(query::active_bombs(&world, actor), 1);
}

#[test]
fn second_bomb_is_rejected_until_the_first_is_spent() {
    let (mut world, events) = load(&["....."]);
    let actor = ActorId::new(1);
    let mut bomber = Bomber::new(actor, Loadout::default());

    let mut commands = Vec::new();
    bomber.handle(
        &events,
        BomberInput {
            cell: CellCoord::new(1, 0),
            place_bomb: true,
            detonate: false,
        },
        &mut commands,
    );
    bomber.handle(
        &[],
        BomberInput {
            cell: CellCoord::new(3, 0),
            place_bomb: true,
            detonate: false,
        },
        &mut commands,
    );

    let events = run(&mut world, commands);
    assert!(matches!(
        events.as_slice(),
        [Event::BombPlaced { .. }, Event::BombPlacementRejected { .. }]
    ));
}

#[test]
fn walking_onto_revealed_power_up_collects_and_upgrades() {
    let (mut world, mut events) = load(&["F.."]);
    let actor = ActorId::new(1);
    let mut bomber = Bomber::new(actor, Loadout::default());

    let mut commands = Vec::new();
    bomber.handle(
        &events,
        BomberInput {
            cell: CellCoord::new(1, 0),
            place_bomb: true,
            detonate: false,
        },
        &mut commands,
    );
    events = run(&mut world, commands);
    events.extend(tick(&mut world, 2_000));
    events.extend(tick(&mut world, 500));
    assert!(events.contains(&Event::PowerUpRevealed {
        cell: CellCoord::new(0, 0),
        kind: PowerUpKind::BlastRange,
    }));

    let mut commands = Vec::new();
    bomber.handle(&events, BomberInput::idle(CellCoord::new(0, 0)), &mut commands);
    assert_eq!(
        commands,
        vec![Command::CollectPowerUp {
            actor,
            cell: CellCoord::new(0, 0),
        }]
    );

    let collected = run(&mut world, commands);
    let mut commands = Vec::new();
    bomber.handle(&collected, BomberInput::idle(CellCoord::new(0, 0)), &mut commands);

    assert!(commands.is_empty(), "power-up already collected");
    assert_eq!(bomber.loadout().blast_range(), 2);
}

#[test]
fn remote_detonator_switches_to_remote_fuses() {
    let (mut world, events) = load(&["....."]);
    let actor = ActorId::new(2);
    let mut bomber = Bomber::new(actor, Loadout::default());
    let upgrade = [Event::PowerUpCollected {
        actor,
        cell: CellCoord::new(4, 0),
        kind: PowerUpKind::RemoteDetonator,
    }];

    let mut commands = Vec::new();
    bomber.handle(&events, BomberInput::idle(CellCoord::new(0, 0)), &mut commands);
    bomber.handle(
        &upgrade,
        BomberInput {
            cell: CellCoord::new(2, 0),
            place_bomb: true,
            detonate: false,
        },
        &mut commands,
    );
    let placed = run(&mut world, commands);
    assert!(matches!(
        placed.as_slice(),
        [Event::BombPlaced {
            fuse: Fuse::Remote,
            ..
        }]
    ));

    assert!(tick(&mut world, 60_000)
        .iter()
        .all(|event| !matches!(event, Event::BombDetonated { .. })));

    let mut commands = Vec::new();
    bomber.handle(
        &[],
        BomberInput {
            cell: CellCoord::new(0, 0),
            place_bomb: false,
            detonate: true,
        },
        &mut commands,
    );
    assert_eq!(commands, vec![Command::DetonateNext { owner: actor }]);
    let detonated = run(&mut world, commands);
    assert!(detonated
        .iter()
        .any(|event| matches!(event, Event::BombDetonated { .. })));
}

#[test]
fn power_ups_collected_by_others_do_not_upgrade() {
    let mut bomber = Bomber::new(ActorId::new(1), Loadout::default());
    let mut commands = Vec::new();
    bomber.handle(
        &[Event::PowerUpCollected {
            actor: ActorId::new(9),
            cell: CellCoord::new(0, 0),
            kind: PowerUpKind::ExtraBomb,
        }],
        BomberInput::idle(CellCoord::new(0, 0)),
        &mut commands,
    );

    assert_eq!(bomber.loadout().max_bombs(), 1);
    assert!(commands.is_empty());
}

#[test]
fn bomber_on_restored_world_collects_power_ups_revealed_before_the_save() {
    let (mut world, _) = load(&["B.."]);
    let _ = run(
        &mut world,
        vec![
            Command::PlaceBomb {
                owner: ActorId::new(1),
                cell: CellCoord::new(2, 0),
                blast_range: 2,
                fuse: Fuse::Remote,
                max_active: 1,
            },
            Command::DetonateNext {
                owner: ActorId::new(1),
            },
        ],
    );
    let _ = tick(&mut world, 500);
    let _ = tick(&mut world, 500);

    let mut restored = World::from_snapshot(snapshot::capture(&world), EngineConfig::default())
        .expect("consistent snapshot");
    let revealed = query::power_ups(&restored);
    assert_eq!(revealed, vec![(CellCoord::new(0, 0), PowerUpKind::ExtraBomb)]);

    let actor = ActorId::new(3);
    let mut bomber = Bomber::new(actor, Loadout::default());
    bomber.sync_revealed(revealed.into_iter().map(|(cell, _)| cell));

    let mut commands = Vec::new();
    bomber.handle(&[], BomberInput::idle(CellCoord::new(0, 0)), &mut commands);
    assert_eq!(
        commands,
        vec![Command::CollectPowerUp {
            actor,
            cell: CellCoord::new(0, 0),
        }]
    );

    let collected = run(&mut restored, commands);
    let mut commands = Vec::new();
    bomber.handle(&collected, BomberInput::idle(CellCoord::new(0, 0)), &mut commands);
    assert!(commands.is_empty());
    assert_eq!(bomber.loadout().max_bombs(), 2);
}
