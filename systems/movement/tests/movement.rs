use glam::Vec2;
use tiletrek_core::{
    CellCoord, Command, Direction, EntityId, Event, Motion, Path, TileKind, UnitKind,
};
use tiletrek_system_movement::{
    request_move, tick, MoveOutcome, MovementSystem, StepOutcome, ARRIVAL_THRESHOLD,
};
use tiletrek_world::{self as world, query, RosterError, TerrainTable, TileGrid, World};

const TILE: f32 = 32.0;

fn grass(width: u32, height: u32) -> TileGrid {
    TileGrid::new(width, height, TILE).expect("valid grid")
}

/// Motion walking straight at `target` as if it were the last step of a path.
fn heading_for(grid: &TileGrid, position: Vec2, target: Vec2, speed: f32) -> Motion {
    let mut motion = Motion::new(position, Vec2::splat(20.0), speed);
    let cell = grid.world_to_grid(target + motion.half_size());
    motion.begin_path(Path::single(cell), target);
    motion
}

fn run_until_idle(system: &MovementSystem<'_>, motion: &mut Motion, limit: usize) -> usize {
    for ticks in 1..=limit {
        if system.update(&mut *motion) == StepOutcome::Arrived {
            return ticks;
        }
    }
    panic!("entity still moving after {limit} ticks");
}

#[test]
fn grass_walk_of_twenty_units_takes_seven_ticks() {
    let grid = grass(20, 20);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let target = Vec2::new(120.0, 100.0);
    let mut motion = heading_for(&grid, Vec2::new(100.0, 100.0), target, 3.0);

    let ticks = run_until_idle(&system, &mut motion, 20);

    assert_eq!(ticks, 7);
    assert_eq!(motion.position(), target);
    assert!(!motion.is_moving());
    assert_eq!(motion.facing(), Direction::East);
}

#[test]
fn every_start_distance_ends_exactly_on_target() {
    let grid = grass(20, 20);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let target = Vec2::new(200.0, 200.0);
    let distances = [
        0.0, 0.2, 0.5, 0.7, 1.0, 1.1, 1.5, 2.0, 2.9, 3.0, 3.1, 4.4, 7.5, 12.25,
    ];
    let headings = [
        Vec2::new(1.0, 0.0),
        Vec2::new(0.0, -1.0),
        Vec2::new(0.6, 0.8),
        Vec2::new(-0.8, 0.6),
    ];

    for speed in [1.0_f32, 3.0] {
        for distance in distances {
            for heading in headings {
                let start = target - heading * distance;
                let mut motion = heading_for(&grid, start, target, speed);
                let bound = (distance / speed).ceil() as usize + 1;

                let ticks = run_until_idle(&system, &mut motion, bound);

                assert!(ticks <= bound);
                assert_eq!(
                    motion.position(),
                    target,
                    "speed {speed}, distance {distance}, heading {heading:?}"
                );
            }
        }
    }
}

#[test]
fn distance_to_target_never_grows() {
    let grid = grass(20, 20);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let target = Vec2::new(300.0, 90.0);
    let mut motion = heading_for(&grid, Vec2::new(37.5, 251.25), target, 1.75);
    let mut previous = motion.position().distance(target);

    loop {
        let outcome = system.update(&mut motion);
        let current = motion.position().distance(target);
        assert!(current <= previous, "{current} > {previous}");
        previous = current;
        if outcome == StepOutcome::Arrived {
            break;
        }
    }

    assert_eq!(previous, 0.0);
}

#[test]
fn arrival_threshold_snaps_without_moving_further() {
    let grid = grass(10, 10);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let target = Vec2::new(64.0, 64.0);
    let start = target - Vec2::new(ARRIVAL_THRESHOLD, 0.0);
    let mut motion = heading_for(&grid, start, target, 0.1);

    assert_eq!(system.update(&mut motion), StepOutcome::Arrived);
    assert_eq!(motion.position(), target);
}

#[test]
fn dirt_paths_speed_travellers_up() {
    let mut grid = grass(10, 10);
    let _ = grid.fill_rect_on_layer(0, CellCoord::new(0, 0), 10, 10, TileKind::DirtPath);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let start = Vec2::new(50.0, 50.0);
    let mut motion = heading_for(&grid, start, Vec2::new(150.0, 50.0), 2.0);

    assert_eq!(system.effective_speed(&motion), 3.0);
    assert_eq!(system.update(&mut motion), StepOutcome::Advanced);
    assert_eq!(motion.position(), Vec2::new(53.0, 50.0));
}

#[test]
fn impassable_footing_borrows_the_next_cells_speed() {
    let mut grid = grass(10, 10);
    let _ = grid.set_tile(CellCoord::new(2, 2), TileKind::Water);
    let _ = grid.set_tile(CellCoord::new(3, 2), TileKind::DirtPath);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);

    let mut motion = Motion::new(Vec2::ZERO, Vec2::splat(16.0), 2.0);
    let origin = grid.grid_to_world(CellCoord::new(2, 2)) - motion.half_size();
    motion.set_position(origin);
    let path = Path::from_cells(vec![CellCoord::new(2, 2), CellCoord::new(3, 2)]).expect("path");
    motion.begin_path(path, motion.position());
    let _ = motion.advance_step();

    assert_eq!(system.current_cell(&motion), CellCoord::new(2, 2));
    assert_eq!(system.effective_speed(&motion), 3.0);
}

#[test]
fn move_to_tile_walks_a_path_to_its_destination() {
    let grid = grass(10, 10);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let start = CellCoord::new(1, 1);
    let destination = CellCoord::new(8, 5);
    let mut motion = Motion::new(Vec2::ZERO, Vec2::splat(16.0), 3.0);
    motion.set_position(grid.grid_to_world(start) - motion.half_size());

    let outcome = system.move_to_tile(&mut motion, destination);
    assert_eq!(
        outcome,
        MoveOutcome::Started {
            destination,
            steps: 8
        }
    );
    assert_eq!(motion.path().map(Path::first), Some(start));
    assert_eq!(motion.path_step(), 0);

    let mut reached_steps = 0;
    for _ in 0..200 {
        match system.update(&mut motion) {
            StepOutcome::ReachedStep => reached_steps += 1,
            StepOutcome::Arrived => break,
            StepOutcome::Advanced => {}
            StepOutcome::Idle => panic!("went idle before arriving"),
        }
    }

    assert_eq!(reached_steps, 7);
    assert!(!motion.is_moving());
    assert_eq!(system.current_cell(&motion), destination);
    assert_eq!(
        motion.position(),
        grid.grid_to_world(destination) - motion.half_size()
    );
}

#[test]
fn a_new_order_replaces_the_current_path() {
    let grid = grass(12, 12);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let mut motion = Motion::new(Vec2::ZERO, Vec2::splat(16.0), 2.0);
    let origin = grid.grid_to_world(CellCoord::new(0, 0)) - motion.half_size();
    motion.set_position(origin);

    let _ = system.move_to_tile(&mut motion, CellCoord::new(11, 0));
    for _ in 0..10 {
        let _ = system.update(&mut motion);
    }
    let replanned = system.move_to_tile(&mut motion, CellCoord::new(0, 11));

    assert!(matches!(replanned, MoveOutcome::Started { .. }));
    assert_eq!(motion.path().map(Path::last), Some(CellCoord::new(0, 11)));
    assert_eq!(motion.path_step(), 0);
}

#[test]
fn orders_for_the_current_cell_or_unreachable_cells_leave_entities_idle() {
    let mut grid = grass(9, 9);
    let _ = grid.fill_rect_on_layer(0, CellCoord::new(5, 5), 3, 3, TileKind::Water);
    let _ = grid.set_tile(CellCoord::new(6, 6), TileKind::Grass);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let mut motion = Motion::new(Vec2::ZERO, Vec2::splat(16.0), 2.0);
    let origin = grid.grid_to_world(CellCoord::new(1, 1)) - motion.half_size();
    motion.set_position(origin);

    assert_eq!(
        system.move_to_tile(&mut motion, CellCoord::new(1, 1)),
        MoveOutcome::AlreadyThere
    );
    assert!(!motion.is_moving());

    let _ = system.move_to_tile(&mut motion, CellCoord::new(4, 4));
    assert!(motion.is_moving());
    assert_eq!(
        system.move_to_tile(&mut motion, CellCoord::new(6, 6)),
        MoveOutcome::NoPath
    );
    assert!(!motion.is_moving());
    assert_eq!(motion.path_step(), 0);
}

#[test]
fn idle_entities_do_not_move() {
    let grid = grass(4, 4);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let mut motion = Motion::new(Vec2::new(12.0, 7.0), Vec2::splat(16.0), 2.0);
    motion.set_target(Vec2::new(80.0, 80.0));

    assert_eq!(system.update(&mut motion), StepOutcome::Idle);
    assert_eq!(motion.position(), Vec2::new(12.0, 7.0));
}

#[test]
fn clamping_keeps_box_and_target_inside_the_map() {
    let grid = grass(10, 10);
    let terrain = TerrainTable::standard();
    let system = MovementSystem::new(&grid, &terrain);
    let mut motion = Motion::new(Vec2::new(-5.0, 700.0), Vec2::splat(20.0), 2.0);
    motion.set_target(Vec2::new(400.0, -3.0));

    system.clamp_to_map_bounds(&mut motion);

    assert_eq!(motion.position(), Vec2::new(0.0, 300.0));
    assert_eq!(motion.target(), Vec2::new(300.0, 0.0));
}

#[test]
fn world_driver_reports_paths_and_arrivals() {
    let mut world = World::new(10, 10, TILE).expect("world");
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::SpawnPlayer {
            cell: CellCoord::new(1, 1),
        },
        &mut events,
    );
    let player = EntityId::new(0);
    events.clear();

    let outcome = request_move(&mut world, player, CellCoord::new(6, 1), &mut events)
        .expect("known entity");
    assert_eq!(
        outcome,
        MoveOutcome::Started {
            destination: CellCoord::new(6, 1),
            steps: 6
        }
    );

    let mut ticks = 0;
    while tick(&mut world, &mut events) > 0 {
        ticks += 1;
        assert!(ticks < 500, "player never arrived");
    }

    assert_eq!(
        events,
        vec![
            Event::PathAssigned {
                entity: player,
                destination: CellCoord::new(6, 1),
                steps: 6
            },
            Event::EntityArrived {
                entity: player,
                cell: CellCoord::new(6, 1)
            },
        ]
    );
    let snapshot = query::actor_view(&world)
        .get(player)
        .cloned()
        .expect("player snapshot");
    assert_eq!(snapshot.cell, CellCoord::new(6, 1));
    assert!(!snapshot.moving);
    assert_eq!(snapshot.facing, Direction::East);
}

#[test]
fn world_driver_reports_unreachable_orders_and_unknown_entities() {
    let mut world = World::new(6, 6, TILE).expect("world");
    let mut events = Vec::new();
    world::apply(
        &mut world,
        Command::AddLayer {
            title: "Moat".to_owned(),
            draw_order: 1,
            visible: true,
        },
        &mut events,
    );
    for y in 0..6 {
        world::apply(
            &mut world,
            Command::PaintTile {
                layer: 1,
                cell: CellCoord::new(3, y),
                kind: TileKind::Water,
            },
            &mut events,
        );
    }
    world::apply(
        &mut world,
        Command::SpawnUnit {
            kind: UnitKind::Warrior,
            cell: CellCoord::new(0, 0),
        },
        &mut events,
    );
    let warrior = EntityId::new(0);
    events.clear();

    let outcome =
        request_move(&mut world, warrior, CellCoord::new(5, 5), &mut events).expect("known");
    assert_eq!(outcome, MoveOutcome::NoPath);
    assert_eq!(
        events,
        vec![Event::PathUnavailable {
            entity: warrior,
            requested: CellCoord::new(5, 5)
        }]
    );

    let ghost = EntityId::new(42);
    assert_eq!(
        request_move(&mut world, ghost, CellCoord::new(1, 1), &mut events),
        Err(RosterError::UnknownEntity(ghost))
    );
}

#[test]
fn units_move_at_their_archetype_speed() {
    let mut world = World::new(10, 10, TILE).expect("world");
    let mut events = Vec::new();
    for (index, kind) in UnitKind::ALL.into_iter().enumerate() {
        world::apply(
            &mut world,
            Command::SpawnUnit {
                kind,
                cell: CellCoord::new(0, index as i32 * 2),
            },
            &mut events,
        );
        let _ = request_move(
            &mut world,
            EntityId::new(index as u32),
            CellCoord::new(9, index as i32 * 2),
            &mut events,
        )
        .expect("known entity");
    }

    // First tick settles every unit onto its own cell centre.
    let _ = tick(&mut world, &mut events);
    let before = query::actor_view(&world).into_vec();
    let _ = tick(&mut world, &mut events);
    let after = query::actor_view(&world).into_vec();

    for ((old, new), kind) in before.iter().zip(&after).zip(UnitKind::ALL) {
        let travelled = new.position.distance(old.position);
        assert!(
            (travelled - kind.move_speed()).abs() < 1e-4,
            "{kind:?} travelled {travelled}"
        );
    }
}
