#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic movement system that walks entities along planned paths.
//!
//! [`MovementSystem`] works on anything implementing [`Movable`]; the
//! [`request_move`] and [`tick`] drivers apply it to the roster of a
//! [`World`] and report what happened as [`Event`] values.

use glam::Vec2;
use tiletrek_core::{CellCoord, Direction, EntityId, Event, Movable};
use tiletrek_system_pathfinding::{Pathfinder, PathfinderConfig};
use tiletrek_world::{RosterError, TerrainTable, TileGrid, World};
use tracing::{debug, trace};

/// Distance in world units under which an entity counts as standing on its
/// target. Applies in every state; there is no second, larger threshold.
pub const ARRIVAL_THRESHOLD: f32 = 0.5;

/// Result of asking an entity to walk to a cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The entity already stands on the destination and was left idle.
    AlreadyThere,
    /// A path was installed.
    Started {
        /// Final cell of the path, after any walkability repair.
        destination: CellCoord,
        /// Number of cells in the path.
        steps: usize,
    },
    /// No route exists; the entity was left idle.
    NoPath,
}

/// Result of advancing an entity by one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// The entity was not following a path.
    Idle,
    /// The entity moved toward its target without reaching it.
    Advanced,
    /// The entity reached a path step and now targets the next one.
    ReachedStep,
    /// The entity reached the final step and returned to idle.
    Arrived,
}

/// Pure system translating paths into per-tick displacement.
#[derive(Clone, Copy, Debug)]
pub struct MovementSystem<'a> {
    grid: &'a TileGrid,
    pathfinder: Pathfinder<'a>,
}

impl<'a> MovementSystem<'a> {
    /// Creates a movement system with the default pathfinder configuration.
    #[must_use]
    pub fn new(grid: &'a TileGrid, terrain: &'a TerrainTable) -> Self {
        Self::with_config(grid, terrain, PathfinderConfig::default())
    }

    /// Creates a movement system whose pathfinder uses `config`.
    #[must_use]
    pub fn with_config(
        grid: &'a TileGrid,
        terrain: &'a TerrainTable,
        config: PathfinderConfig,
    ) -> Self {
        Self {
            grid,
            pathfinder: Pathfinder::with_config(grid, terrain, config),
        }
    }

    /// Pathfinder used to plan routes.
    #[must_use]
    pub const fn pathfinder(&self) -> &Pathfinder<'a> {
        &self.pathfinder
    }

    /// Cell containing the centre of the entity's bounding box.
    #[must_use]
    pub fn current_cell<M>(&self, entity: &M) -> CellCoord
    where
        M: Movable + ?Sized,
    {
        self.grid.world_to_grid(entity.motion().center())
    }

    /// Plans a route to `destination` and installs it on the entity.
    ///
    /// Any previous path is discarded. An entity already on the destination
    /// cell, or one with no route to it, is left idle.
    pub fn move_to_tile<M>(&self, entity: &mut M, destination: CellCoord) -> MoveOutcome
    where
        M: Movable + ?Sized,
    {
        let current = self.current_cell(&*entity);
        if current == destination {
            entity.motion_mut().stop();
            return MoveOutcome::AlreadyThere;
        }

        let Some(path) = self.pathfinder.find_path(current, destination) else {
            entity.motion_mut().stop();
            return MoveOutcome::NoPath;
        };

        let outcome = MoveOutcome::Started {
            destination: path.last(),
            steps: path.len(),
        };
        let first_target = self.step_target(&*entity, path.first());
        entity.motion_mut().begin_path(path, first_target);
        outcome
    }

    /// Advances the entity by one tick.
    ///
    /// Within [`ARRIVAL_THRESHOLD`] or within one tick's travel of the target
    /// the entity lands exactly on it and moves on to the next path step.
    /// Otherwise it covers its terrain-adjusted speed along the straight line
    /// to the target.
    pub fn update<M>(&self, entity: &mut M) -> StepOutcome
    where
        M: Movable + ?Sized,
    {
        if !entity.motion().is_moving() {
            return StepOutcome::Idle;
        }

        let position = entity.motion().position();
        let target = entity.motion().target();
        let offset = target - position;
        let distance = offset.length();

        if distance <= ARRIVAL_THRESHOLD {
            return self.land_on_target(entity, position);
        }

        let speed = self.effective_speed(&*entity);
        if distance <= speed {
            return self.land_on_target(entity, position);
        }

        let next = position + offset / distance * speed;
        let motion = entity.motion_mut();
        motion.set_position(next);
        if let Some(facing) = Direction::from_vector(next - position) {
            motion.set_facing(facing);
        }
        StepOutcome::Advanced
    }

    /// Keeps the entity's bounding box and target inside the map.
    pub fn clamp_to_map_bounds<M>(&self, entity: &mut M)
    where
        M: Movable + ?Sized,
    {
        let motion = entity.motion_mut();
        let max = (Vec2::new(self.grid.world_width(), self.grid.world_height()) - motion.size())
            .max(Vec2::ZERO);
        let position = motion.position().clamp(Vec2::ZERO, max);
        let target = motion.target().clamp(Vec2::ZERO, max);
        motion.set_position(position);
        motion.set_target(target);
    }

    /// Base speed scaled by the terrain under the entity's centre.
    ///
    /// An entity standing on impassable terrain (for instance after the map
    /// was repainted under it) borrows the multiplier of the cell it is
    /// heading to, and the base speed when that is impassable too.
    #[must_use]
    pub fn effective_speed<M>(&self, entity: &M) -> f32
    where
        M: Movable + ?Sized,
    {
        let motion = entity.motion();
        let mut multiplier = self.pathfinder.speed_at(self.current_cell(entity));
        if multiplier <= 0.0 {
            multiplier = motion
                .path()
                .and_then(|path| path.get(motion.path_step()))
                .map(|cell| self.pathfinder.speed_at(cell))
                .filter(|speed| *speed > 0.0)
                .unwrap_or(1.0);
        }
        motion.move_speed() * multiplier
    }

    fn land_on_target<M>(&self, entity: &mut M, previous: Vec2) -> StepOutcome
    where
        M: Movable + ?Sized,
    {
        let target = entity.motion().target();
        {
            let motion = entity.motion_mut();
            motion.set_position(target);
            if let Some(facing) = Direction::from_vector(target - previous) {
                motion.set_facing(facing);
            }
        }

        match entity.motion_mut().advance_step() {
            Some(cell) => {
                let next_target = self.step_target(&*entity, cell);
                entity.motion_mut().set_target(next_target);
                StepOutcome::ReachedStep
            }
            None => StepOutcome::Arrived,
        }
    }

    fn step_target<M>(&self, entity: &M, cell: CellCoord) -> Vec2
    where
        M: Movable + ?Sized,
    {
        self.grid.grid_to_world(cell) - entity.motion().half_size()
    }
}

/// Orders an entity of the world to walk to `destination`.
///
/// Emits [`Event::PathAssigned`] when a route was installed and
/// [`Event::PathUnavailable`] when none exists. Fails only when the entity is
/// not on the roster.
pub fn request_move(
    world: &mut World,
    entity: EntityId,
    destination: CellCoord,
    out_events: &mut Vec<Event>,
) -> Result<MoveOutcome, RosterError> {
    let (grid, terrain, roster) = world.movement_parts();
    let actor = roster
        .get_mut(entity)
        .ok_or(RosterError::UnknownEntity(entity))?;
    let system = MovementSystem::new(grid, terrain);
    let outcome = system.move_to_tile(actor, destination);

    match outcome {
        MoveOutcome::Started { destination, steps } => {
            debug!(entity = entity.get(), ?destination, steps, "path assigned");
            out_events.push(Event::PathAssigned {
                entity,
                destination,
                steps,
            });
        }
        MoveOutcome::NoPath => {
            debug!(entity = entity.get(), requested = ?destination, "no path");
            out_events.push(Event::PathUnavailable {
                entity,
                requested: destination,
            });
        }
        MoveOutcome::AlreadyThere => {}
    }
    Ok(outcome)
}

/// Advances every entity of the world by one tick in identifier order.
///
/// Entities are clamped to the map after moving. Emits
/// [`Event::EntityArrived`] for each entity that finished its path and
/// returns the number of entities still moving.
pub fn tick(world: &mut World, out_events: &mut Vec<Event>) -> usize {
    let (grid, terrain, roster) = world.movement_parts();
    let system = MovementSystem::new(grid, terrain);
    let mut moving = 0;

    for (entity, actor) in roster.iter_mut() {
        let outcome = system.update(&mut *actor);
        system.clamp_to_map_bounds(&mut *actor);
        trace!(entity = entity.get(), ?outcome, "movement step");

        match outcome {
            StepOutcome::Arrived => {
                let cell = system.current_cell(&*actor);
                debug!(entity = entity.get(), ?cell, "entity arrived");
                out_events.push(Event::EntityArrived { entity, cell });
            }
            StepOutcome::Advanced | StepOutcome::ReachedStep => moving += 1,
            StepOutcome::Idle => {}
        }
    }

    moving
}
