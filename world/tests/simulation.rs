use std::time::Duration;

use contraption_core::{
    CellCoord, Command, Event, FixtureSpec, LevelDescriptor, PieceId, PieceKind, PlayMode,
    Rotation,
};
use contraption_world::{apply, grid::region_center, query, World, WorldConfig};

const FRAME: Duration = Duration::from_millis(16);

fn fixture(kind: PieceKind, column: i32, row: i32) -> FixtureSpec {
    FixtureSpec::new(kind, CellCoord::new(column, row), Rotation::Deg0)
}

fn load_into(mut world: World, level: LevelDescriptor) -> World {
    let mut events = Vec::new();
    apply(&mut world, Command::LoadLevel { level }, &mut events).expect("level loads");
    world
}

fn load(level: LevelDescriptor) -> World {
    load_into(World::new(), level)
}

fn execute(world: &mut World, command: Command) -> Vec<Event> {
    let mut events = Vec::new();
    apply(world, command, &mut events).expect("command accepted");
    events
}

fn place(world: &mut World, kind: PieceKind, column: i32, row: i32, rotation: Rotation) -> PieceId {
    execute(
        world,
        Command::PlacePiece {
            kind,
            origin: CellCoord::new(column, row),
            rotation,
        },
    )
    .iter()
    .find_map(|event| match event {
        Event::PieceCreated { piece, .. } => Some(*piece),
        _ => None,
    })
    .expect("placement reports the new piece")
}

fn run_ticks(world: &mut World, ticks: usize) -> Vec<Event> {
    let mut events = Vec::new();
    for _ in 0..ticks {
        events.extend(execute(world, Command::Tick { dt: FRAME }));
    }
    events
}

fn sandbox() -> LevelDescriptor {
    LevelDescriptor::named("sandbox")
        .with_fixture(fixture(PieceKind::Ball, 3, 2))
        .with_fixture(fixture(PieceKind::Basket, 14, 11))
        .with_stock(PieceKind::Ramp, 3)
        .with_stock(PieceKind::Fan, 1)
        .with_stock(PieceKind::PressurePlate, 1)
        .with_stock(PieceKind::Seesaw, 1)
}

#[test]
fn start_then_reset_reproduces_the_layout() {
    let mut world = load(sandbox());
    let _ = place(&mut world, PieceKind::Ramp, 2, 4, Rotation::Deg0);
    let fan = place(&mut world, PieceKind::Fan, 8, 8, Rotation::Deg0);
    let _ = execute(&mut world, Command::RotatePiece { piece: fan });
    let plate = place(&mut world, PieceKind::PressurePlate, 6, 10, Rotation::Deg0);
    let _ = execute(
        &mut world,
        Command::LinkTrigger {
            source: plate,
            target: fan,
        },
    );

    let before = query::piece_view(&world).into_vec();
    let inventory_before = query::inventory(&world).clone();

    let started = execute(&mut world, Command::StartSimulation);
    assert_eq!(
        started,
        vec![Event::PlayModeChanged {
            mode: PlayMode::Simulate
        }]
    );
    assert!(query::has_snapshot(&world));
    let _ = run_ticks(&mut world, 20);

    let events = execute(&mut world, Command::ResetLevel);
    assert!(events.contains(&Event::SnapshotRestored));
    assert_eq!(
        events.last(),
        Some(&Event::PlayModeChanged {
            mode: PlayMode::Edit
        })
    );

    assert_eq!(query::piece_view(&world).into_vec(), before);
    assert_eq!(query::inventory(&world), &inventory_before);
    assert_eq!(query::trigger_target(&world, plate), Some(fan));
    assert!(!query::has_snapshot(&world));
    assert!(!query::can_undo(&world));
    assert!(query::occupancy_is_consistent(&world));
    assert_eq!(query::elapsed(&world), Duration::ZERO);
}

#[test]
fn reset_returns_the_fixture_ball_to_its_cell() {
    let mut world = load(sandbox());
    let ball = PieceId::new(0);
    let _ = execute(&mut world, Command::StartSimulation);
    let _ = run_ticks(&mut world, 30);
    let fallen = query::pose(&world, ball).expect("ball exists");
    assert!(fallen.position.y > 140.0, "ball did not fall: {fallen:?}");

    let _ = execute(&mut world, Command::ResetLevel);
    let pose = query::pose(&world, ball).expect("ball exists");
    let home = region_center(query::piece(&world, ball).expect("ball exists").region);
    assert!(pose.position.distance(home) < 1e-3, "{pose:?} is not at {home}");
    assert!(pose.velocity.length() < 1e-3);
}

#[test]
fn ticks_outside_simulation_are_ignored() {
    let mut world = load(sandbox());
    let before = query::pose(&world, PieceId::new(0));

    assert!(run_ticks(&mut world, 10).is_empty());
    assert_eq!(query::pose(&world, PieceId::new(0)), before);
    assert_eq!(query::elapsed(&world), Duration::ZERO);
}

#[test]
fn ball_dropping_into_the_basket_completes_the_level() {
    let level = LevelDescriptor::named("drop")
        .with_fixture(fixture(PieceKind::Ball, 14, 8))
        .with_fixture(fixture(PieceKind::Basket, 14, 11));
    let mut world = load(level);
    let _ = execute(&mut world, Command::StartSimulation);

    let events = run_ticks(&mut world, 240);
    let goals: Vec<&Event> = events
        .iter()
        .filter(|event| matches!(event, Event::GoalReached { .. }))
        .collect();
    assert_eq!(
        goals,
        vec![&Event::GoalReached {
            goal: PieceId::new(1),
            ball: PieceId::new(0),
        }]
    );
    assert!(events.contains(&Event::PlayModeChanged {
        mode: PlayMode::Complete
    }));
    assert_eq!(query::play_mode(&world), PlayMode::Complete);
    assert!(query::goal_reached(&world));

    let frozen = query::pose(&world, PieceId::new(0));
    assert!(run_ticks(&mut world, 5).is_empty());
    assert_eq!(query::pose(&world, PieceId::new(0)), frozen);

    let _ = execute(&mut world, Command::ResetLevel);
    assert!(!query::goal_reached(&world));
    assert_eq!(query::play_mode(&world), PlayMode::Edit);
}

#[test]
fn ball_passing_a_plate_toggles_the_linked_fan_once() {
    let level = LevelDescriptor::named("wiring")
        .with_fixture(fixture(PieceKind::Ball, 5, 2))
        .with_fixture(fixture(PieceKind::PressurePlate, 5, 6).linked_to("blower"))
        .with_fixture(fixture(PieceKind::Fan, 12, 12).tagged("blower"));
    let mut world = load(level);
    let plate = PieceId::new(1);
    let fan = PieceId::new(2);
    assert_eq!(query::trigger_links(&world), vec![(plate, fan)]);

    let _ = execute(&mut world, Command::StartSimulation);
    let events = run_ticks(&mut world, 120);

    let triggers: Vec<&Event> = events
        .iter()
        .filter(|event| matches!(event, Event::PieceTriggered { .. }))
        .collect();
    assert_eq!(
        triggers,
        vec![&Event::PieceTriggered {
            piece: fan,
            source: plate,
            active: false,
        }]
    );
    let sensor: Vec<&Event> = events
        .iter()
        .filter(|event| matches!(event, Event::SensorChanged { .. }))
        .collect();
    assert_eq!(
        sensor,
        vec![
            &Event::SensorChanged {
                piece: plate,
                engaged: true,
            },
            &Event::SensorChanged {
                piece: plate,
                engaged: false,
            },
        ]
    );
    assert_eq!(query::fan_active(&world, fan), Some(false));

    let _ = execute(&mut world, Command::ResetLevel);
    assert_eq!(query::fan_active(&world, fan), Some(true));
    assert_eq!(query::trigger_links(&world), vec![(plate, fan)]);
}

#[test]
fn platforms_catch_the_ball() {
    let level = LevelDescriptor::named("catch")
        .with_fixture(fixture(PieceKind::Ball, 5, 2))
        .with_fixture(fixture(PieceKind::Platform, 4, 6));
    let mut world = load(level);
    let _ = execute(&mut world, Command::StartSimulation);
    let _ = run_ticks(&mut world, 180);

    let pose = query::pose(&world, PieceId::new(0)).expect("ball exists");
    assert!(pose.position.y < 288.0, "ball fell through: {pose:?}");
    assert!(pose.position.y > 200.0, "ball floated: {pose:?}");
}

#[test]
fn trampolines_send_the_ball_higher_than_it_started() {
    let level = LevelDescriptor::named("bounce")
        .with_fixture(fixture(PieceKind::Ball, 5, 2))
        .with_fixture(fixture(PieceKind::Trampoline, 4, 10));
    let mut world = load(level);
    let ball = PieceId::new(0);
    let start = query::pose(&world, ball).expect("ball exists").position.y;
    let _ = execute(&mut world, Command::StartSimulation);

    let mut bounced = false;
    let mut peak = f32::MAX;
    for _ in 0..180 {
        let _ = execute(&mut world, Command::Tick { dt: FRAME });
        let pose = query::pose(&world, ball).expect("ball exists");
        if pose.velocity.y < 0.0 {
            bounced = true;
        }
        if bounced {
            peak = peak.min(pose.position.y);
        }
    }

    assert!(bounced, "ball never left the trampoline");
    assert!(peak < start, "peak {peak} stayed below start {start}");
}

#[test]
fn seesaw_tilts_under_a_rider() {
    let level = LevelDescriptor::named("lever")
        .with_fixture(fixture(PieceKind::Ball, 10, 5))
        .with_fixture(fixture(PieceKind::Seesaw, 8, 8));
    let mut world = load(level);
    let seesaw = PieceId::new(1);
    let _ = execute(&mut world, Command::StartSimulation);
    let _ = run_ticks(&mut world, 120);

    let angle = query::seesaw_angle(&world, seesaw).expect("seesaw exists");
    assert!(angle > 0.0, "board did not tilt toward the ball: {angle}");
    assert!(angle <= std::f32::consts::FRAC_PI_4 + 1e-6);

    let _ = execute(&mut world, Command::ResetLevel);
    assert_eq!(query::seesaw_angle(&world, seesaw), Some(0.0));
}

#[test]
fn fans_push_balls_along_their_facing() {
    let weightless = WorldConfig {
        gravity: 0.0,
        ..WorldConfig::default()
    };
    let level = LevelDescriptor::named("breeze")
        .with_fixture(fixture(PieceKind::Ball, 8, 5))
        .with_fixture(FixtureSpec::new(
            PieceKind::Fan,
            CellCoord::new(5, 5),
            Rotation::Deg90,
        ));
    let mut world = load_into(World::with_config(weightless), level);
    let ball = PieceId::new(0);
    let start = query::pose(&world, ball).expect("ball exists").position;

    let _ = execute(&mut world, Command::StartSimulation);
    let _ = run_ticks(&mut world, 30);

    let pose = query::pose(&world, ball).expect("ball exists");
    assert!(pose.position.x > start.x + 1.0, "ball did not move: {pose:?}");
    assert!((pose.position.y - start.y).abs() < 1.0);
}

#[test]
fn fans_only_reach_along_their_facing() {
    let weightless = WorldConfig {
        gravity: 0.0,
        ..WorldConfig::default()
    };
    let level = LevelDescriptor::named("calm")
        .with_fixture(fixture(PieceKind::Ball, 8, 5))
        .with_fixture(fixture(PieceKind::Fan, 5, 5));
    let mut world = load_into(World::with_config(weightless), level);
    let ball = PieceId::new(0);
    let start = query::pose(&world, ball).expect("ball exists").position;

    let _ = execute(&mut world, Command::StartSimulation);
    let _ = run_ticks(&mut world, 30);

    let pose = query::pose(&world, ball).expect("ball exists");
    assert!(pose.position.distance(start) < 1e-3, "ball beside an upward fan moved: {pose:?}");
}

#[test]
fn reset_without_snapshot_returns_player_pieces() {
    let mut world = load(sandbox());
    let _ = place(&mut world, PieceKind::Ramp, 2, 4, Rotation::Deg0);
    let _ = place(&mut world, PieceKind::Ramp, 6, 6, Rotation::Deg0);
    assert_eq!(query::remaining(&world, PieceKind::Ramp), 1);

    let events = execute(&mut world, Command::ResetLevel);
    assert!(!events.contains(&Event::SnapshotRestored));
    assert_eq!(query::remaining(&world, PieceKind::Ramp), 3);
    assert_eq!(query::piece_view(&world).iter().count(), 2);
    assert!(!query::can_undo(&world));
}

#[test]
fn placed_pieces_keep_their_ids_across_resets() {
    let mut world = load(sandbox());
    let ramp = place(&mut world, PieceKind::Ramp, 2, 4, Rotation::Deg0);
    assert_eq!(ramp, PieceId::new(2));

    let _ = execute(&mut world, Command::StartSimulation);
    let _ = execute(&mut world, Command::ResetLevel);
    assert!(query::piece(&world, ramp).is_some());

    let next = place(&mut world, PieceKind::Ramp, 8, 4, Rotation::Deg0);
    assert_eq!(next, PieceId::new(3));
}

#[test]
fn loading_tolerates_broken_fixtures_and_links() {
    let level = LevelDescriptor::named("broken")
        .with_fixture(fixture(PieceKind::Ball, 3, 2))
        .with_fixture(fixture(PieceKind::Ramp, 2, 2))
        .with_fixture(fixture(PieceKind::PressurePlate, 6, 6).linked_to("nowhere"))
        .with_fixture(FixtureSpec::new(
            PieceKind::Platform,
            CellCoord::new(10, 10),
            Rotation::Deg270,
        ));
    let world = load(level);

    let kinds: Vec<PieceKind> = query::piece_view(&world).iter().map(|p| p.kind).collect();
    assert_eq!(kinds, vec![PieceKind::Ball, PieceKind::PressurePlate]);
    assert!(query::trigger_links(&world).is_empty());
    assert!(query::occupancy_is_consistent(&world));
}

#[test]
fn reloading_replaces_the_previous_level() {
    let mut world = load(sandbox());
    let _ = place(&mut world, PieceKind::Ramp, 2, 4, Rotation::Deg0);

    let events = execute(
        &mut world,
        Command::LoadLevel {
            level: LevelDescriptor::named("empty"),
        },
    );
    let destroyed = events
        .iter()
        .filter(|event| matches!(event, Event::PieceDestroyed { .. }))
        .count();
    assert_eq!(destroyed, 3);
    assert_eq!(query::grid(&world).occupied_count(), 0);
    assert!(query::inventory(&world).is_empty());
    assert_eq!(
        events.last(),
        Some(&Event::LevelLoaded {
            name: "empty".to_owned()
        })
    );
}
