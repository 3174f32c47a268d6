//! Stages a scenario into a world and drives it to completion.

use std::collections::BTreeMap;

use serde::Serialize;
use tiletrek_core::{CellCoord, Command, Direction, EntityId, Event, Movable, TileKind};
use tiletrek_system_movement::{request_move, tick, MoveOutcome};
use tiletrek_system_pathfinding::Pathfinder;
use tiletrek_world::{self as world, generate, query, World};
use tracing::{debug, info, warn};

use crate::scenario::{paint_list, RectSpec, Scenario, ScenarioError};

/// World after the run plus the report describing it.
#[derive(Debug)]
pub(crate) struct RunOutcome {
    pub(crate) world: World,
    pub(crate) report: RunReport,
}

/// Machine-readable summary printed by the binary.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub(crate) struct RunReport {
    pub(crate) ticks: usize,
    pub(crate) settled: bool,
    pub(crate) entities: Vec<EntityReport>,
}

/// Final state of a single entity.
#[derive(Clone, Debug, Serialize, PartialEq)]
pub(crate) struct EntityReport {
    pub(crate) id: EntityId,
    pub(crate) name: String,
    pub(crate) position: [f32; 2],
    pub(crate) cell: CellCoord,
    pub(crate) facing: Direction,
    pub(crate) requested: Option<CellCoord>,
    pub(crate) path_steps: Option<usize>,
    pub(crate) arrived: bool,
}

#[derive(Clone, Copy, Debug, Default)]
struct OrderLog {
    requested: Option<CellCoord>,
    path_steps: Option<usize>,
    arrived: bool,
}

/// Builds the scenario's world, issues its orders, and ticks until every
/// entity is idle or the tick limit is hit.
pub(crate) fn run(scenario: &Scenario) -> Result<RunOutcome, ScenarioError> {
    let mut world = stage_world(scenario)?;
    let ids = spawn_entities(&mut world, scenario)?;
    let mut orders: BTreeMap<EntityId, OrderLog> = BTreeMap::new();
    let mut events = Vec::new();

    for (index, order) in scenario.orders.iter().enumerate() {
        let Some(&entity) = ids.get(order.entity) else {
            return Err(ScenarioError::UnknownOrderEntity {
                order: index,
                entity: order.entity,
            });
        };
        let log = orders.entry(entity).or_default();
        log.requested = Some(order.destination());
        log.path_steps = None;
        log.arrived = false;
        match request_move(&mut world, entity, order.destination(), &mut events) {
            Ok(MoveOutcome::Started { steps, .. }) => log.path_steps = Some(steps),
            Ok(MoveOutcome::AlreadyThere) => log.arrived = true,
            Ok(MoveOutcome::NoPath) => {
                let destination = order.destination();
                warn!(entity = entity.get(), ?destination, "order has no path");
            }
            Err(error) => warn!(%error, "order skipped"),
        }
    }

    let mut ticks = 0;
    let mut moving = count_moving(&world);
    while moving > 0 && ticks < scenario.max_ticks {
        moving = tick(&mut world, &mut events);
        ticks += 1;
    }
    let settled = moving == 0;

    for event in &events {
        if let Event::EntityArrived { entity, cell } = event {
            info!(entity = entity.get(), ?cell, "entity arrived");
            orders.entry(*entity).or_default().arrived = true;
        }
    }
    if settled {
        info!(ticks, "all entities idle");
    } else {
        warn!(ticks, moving, "tick limit reached before all settled");
    }

    let report = build_report(&world, &orders, ticks, settled);
    Ok(RunOutcome { world, report })
}

fn stage_world(scenario: &Scenario) -> Result<World, ScenarioError> {
    let dims = scenario.grid;
    let mut world = World::new(dims.width, dims.height, dims.tile_size)?;
    let mut events = Vec::new();

    if scenario.terrain.generate {
        let mut grid = query::tile_grid(&world).clone();
        let summary = generate(&mut grid, &scenario.terrain.recipe());
        info!(
            seed = scenario.terrain.seed,
            water = summary.water_cells,
            dirt = summary.dirt_cells,
            "generated terrain"
        );
        for y in 0..dims.height as i32 {
            for x in 0..dims.width as i32 {
                let cell = CellCoord::new(x, y);
                let Some(kind) = grid.tile_on_layer(0, cell) else {
                    continue;
                };
                if !kind.is_default() {
                    paint_cell(&mut world, 0, cell, kind, &mut events);
                }
            }
        }
    }

    for (rect, kind) in paint_list(&scenario.terrain.water, &scenario.terrain.dirt) {
        paint_rect(&mut world, 0, rect, kind, &mut events);
    }

    for layer in &scenario.layers {
        world::apply(
            &mut world,
            Command::AddLayer {
                title: layer.title.clone(),
                draw_order: layer.draw_order,
                visible: layer.visible,
            },
            &mut events,
        );
        let index = query::tile_grid(&world).layers().len() - 1;
        for (rect, kind) in layer.paint_list() {
            paint_rect(&mut world, index, rect, kind, &mut events);
        }
    }

    let rejected = events
        .iter()
        .filter(|event| matches!(event, Event::LayerRejected { .. }))
        .count();
    if rejected > 0 {
        debug!(rejected, "clipped painted cells outside the grid");
    }
    Ok(world)
}

fn paint_rect(
    world: &mut World,
    layer: usize,
    rect: RectSpec,
    kind: TileKind,
    events: &mut Vec<Event>,
) {
    for dy in 0..rect.height as i32 {
        for dx in 0..rect.width as i32 {
            let cell = rect.origin().offset(dx, dy);
            paint_cell(world, layer, cell, kind, events);
        }
    }
}

fn paint_cell(
    world: &mut World,
    layer: usize,
    cell: CellCoord,
    kind: TileKind,
    events: &mut Vec<Event>,
) {
    let command = Command::PaintTile { layer, cell, kind };
    world::apply(world, command, events);
}

fn spawn_entities(world: &mut World, scenario: &Scenario) -> Result<Vec<EntityId>, ScenarioError> {
    let mut ids = Vec::with_capacity(scenario.entities.len());

    for (index, entry) in scenario.entities.iter().enumerate() {
        let requested = entry.cell();
        let cell = if entry.snap_to_walkable {
            let pathfinder = Pathfinder::new(query::tile_grid(world), query::terrain(world));
            pathfinder.nearest_walkable(requested)
        } else {
            requested
        };

        let command = match entry.kind.unit_kind() {
            Some(kind) => Command::SpawnUnit { kind, cell },
            None => Command::SpawnPlayer { cell },
        };
        let mut events = Vec::new();
        world::apply(world, command, &mut events);

        let entity = spawned_entity(index, cell, &events)?;
        debug!(entity = entity.get(), ?cell, kind = ?entry.kind, "spawned");
        ids.push(entity);
    }

    Ok(ids)
}

fn spawned_entity(
    index: usize,
    cell: CellCoord,
    events: &[Event],
) -> Result<EntityId, ScenarioError> {
    for event in events {
        match event {
            Event::EntitySpawned { entity, .. } => return Ok(*entity),
            Event::SpawnRejected { reason, .. } => {
                return Err(ScenarioError::Spawn {
                    index,
                    x: cell.x(),
                    y: cell.y(),
                    reason: *reason,
                });
            }
            _ => {}
        }
    }
    Err(ScenarioError::SpawnUnconfirmed { index })
}

fn count_moving(world: &World) -> usize {
    query::roster(world)
        .iter()
        .filter(|(_, actor)| actor.motion().is_moving())
        .count()
}

fn build_report(
    world: &World,
    orders: &BTreeMap<EntityId, OrderLog>,
    ticks: usize,
    settled: bool,
) -> RunReport {
    let roster = query::roster(world);
    let entities = query::actor_view(world)
        .iter()
        .map(|snapshot| {
            let log = orders.get(&snapshot.id).copied().unwrap_or_default();
            EntityReport {
                id: snapshot.id,
                name: roster
                    .get(snapshot.id)
                    .map(|actor| actor.name().to_owned())
                    .unwrap_or_default(),
                position: snapshot.position.to_array(),
                cell: snapshot.cell,
                facing: snapshot.facing,
                requested: log.requested,
                path_steps: log.path_steps,
                arrived: log.arrived,
            }
        })
        .collect();

    RunReport {
        ticks,
        settled,
        entities,
    }
}
