#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for tiletrek.
//!
//! The world owns the layered tile grid, the terrain table, and the roster of
//! movable entities. All mutations flow through [`apply`], which reports its
//! outcome as [`Event`] values; read access goes through [`query`].

mod actors;
mod generation;
mod grid;
mod terrain;

pub use actors::{
    actor_cell, Actor, Player, Roster, RosterError, Unit, PLAYER_SIZE, PLAYER_SPEED, UNIT_SIZE,
};
pub use generation::{generate, GenerationSummary, TerrainRecipe};
pub use grid::{GridError, Layer, TileGrid, BASE_LAYER_TITLE};
pub use terrain::{TerrainTable, DIRT_PATH_SPEED, GRASS_SPEED};

use tiletrek_core::{Command, Event, LayerError};
use tracing::debug;

/// Represents the authoritative tiletrek world state.
#[derive(Clone, Debug)]
pub struct World {
    grid: TileGrid,
    terrain: TerrainTable,
    roster: Roster,
}

impl World {
    /// Creates an all-grass world with the stock terrain table.
    pub fn new(width: u32, height: u32, tile_size: f32) -> Result<Self, GridError> {
        Ok(Self::from_parts(
            TileGrid::new(width, height, tile_size)?,
            TerrainTable::standard(),
        ))
    }

    /// Wraps an authored grid and terrain table with an empty roster.
    #[must_use]
    pub fn from_parts(grid: TileGrid, terrain: TerrainTable) -> Self {
        Self {
            grid,
            terrain,
            roster: Roster::new(),
        }
    }

    /// Splits the world into the borrows the movement system needs.
    ///
    /// The grid and terrain stay read-only while entities are mutated.
    pub fn movement_parts(&mut self) -> (&TileGrid, &TerrainTable, &mut Roster) {
        (&self.grid, &self.terrain, &mut self.roster)
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::AddLayer {
            title,
            draw_order,
            visible,
        } => {
            let index = world.grid.add_layer(title, draw_order, visible);
            out_events.push(Event::LayerAdded { index });
        }
        Command::RemoveLayer { index } => {
            if world.grid.remove_layer(index) {
                out_events.push(Event::LayerRemoved { index });
            } else {
                let reason = if index < world.grid.layers().len() {
                    LayerError::LastLayer
                } else {
                    LayerError::MissingLayer
                };
                reject_layer(index, reason, out_events);
            }
        }
        Command::SetLayerVisibility { index, visible } => {
            if world.grid.set_layer_visibility(index, visible) {
                out_events.push(Event::LayerVisibilityChanged { index, visible });
            } else {
                reject_layer(index, LayerError::MissingLayer, out_events);
            }
        }
        Command::SetLayerDrawOrder { index, draw_order } => {
            if world.grid.set_layer_draw_order(index, draw_order) {
                out_events.push(Event::LayerDrawOrderChanged { index, draw_order });
            } else {
                reject_layer(index, LayerError::MissingLayer, out_events);
            }
        }
        Command::PaintTile { layer, cell, kind } => {
            if layer >= world.grid.layers().len() {
                reject_layer(layer, LayerError::MissingLayer, out_events);
            } else if world.grid.set_tile_on_layer(layer, cell, kind) {
                out_events.push(Event::TilePainted { layer, cell, kind });
            } else {
                reject_layer(layer, LayerError::OutOfBounds, out_events);
            }
        }
        Command::SpawnUnit { kind, cell } => {
            let result = world
                .roster
                .spawn_unit(&world.grid, &world.terrain, kind, cell);
            report_spawn(cell, result, out_events);
        }
        Command::SpawnPlayer { cell } => {
            let result = world.roster.spawn_player(&world.grid, &world.terrain, cell);
            report_spawn(cell, result, out_events);
        }
        Command::RemoveEntity { entity } => match world.roster.remove(entity) {
            Ok(_) => out_events.push(Event::EntityRemoved { entity }),
            Err(error) => {
                debug!(%error, "removal rejected");
                out_events.push(Event::RemovalRejected { entity });
            }
        },
    }
}

fn reject_layer(index: usize, reason: LayerError, out_events: &mut Vec<Event>) {
    debug!(index, ?reason, "layer command rejected");
    out_events.push(Event::LayerRejected { index, reason });
}

fn report_spawn(
    cell: tiletrek_core::CellCoord,
    result: Result<tiletrek_core::EntityId, RosterError>,
    out_events: &mut Vec<Event>,
) {
    match result {
        Ok(entity) => out_events.push(Event::EntitySpawned { entity, cell }),
        Err(error) => {
            debug!(%error, "spawn rejected");
            if let Some(reason) = error.spawn_reason() {
                out_events.push(Event::SpawnRejected { cell, reason });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use glam::Vec2;
    use tiletrek_core::{CellCoord, Direction, EntityId, Movable, UnitKind};

    use super::{actor_cell, Roster, TerrainTable, TileGrid, World};

    /// Provides read-only access to the world's tile grid.
    #[must_use]
    pub fn tile_grid(world: &World) -> &TileGrid {
        &world.grid
    }

    /// Provides read-only access to the terrain table.
    #[must_use]
    pub fn terrain(world: &World) -> &TerrainTable {
        &world.terrain
    }

    /// Provides read-only access to the roster.
    #[must_use]
    pub fn roster(world: &World) -> &Roster {
        &world.roster
    }

    /// Captures a read-only view of every entity in identifier order.
    #[must_use]
    pub fn actor_view(world: &World) -> ActorView {
        let snapshots = world
            .roster
            .iter()
            .map(|(id, actor)| {
                let motion = actor.motion();
                ActorSnapshot {
                    id,
                    unit_kind: actor.unit_kind(),
                    position: motion.position(),
                    cell: actor_cell(&world.grid, actor),
                    facing: motion.facing(),
                    moving: motion.is_moving(),
                    destination: motion.path().map(|path| path.last()),
                }
            })
            .collect();
        ActorView { snapshots }
    }

    /// Read-only snapshot describing all entities in the world.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ActorView {
        snapshots: Vec<ActorSnapshot>,
    }

    impl ActorView {
        /// Iterator over the captured snapshots in deterministic order.
        pub fn iter(&self) -> impl Iterator<Item = &ActorSnapshot> {
            self.snapshots.iter()
        }

        /// Snapshot of a specific entity.
        #[must_use]
        pub fn get(&self, id: EntityId) -> Option<&ActorSnapshot> {
            self.snapshots.iter().find(|snapshot| snapshot.id == id)
        }

        /// Consumes the view, yielding the underlying snapshots.
        pub fn into_vec(self) -> Vec<ActorSnapshot> {
            self.snapshots
        }
    }

    /// Immutable representation of a single entity used for queries.
    #[derive(Clone, Debug, PartialEq)]
    pub struct ActorSnapshot {
        /// Identifier assigned by the roster.
        pub id: EntityId,
        /// Unit archetype, or `None` for the player.
        pub unit_kind: Option<UnitKind>,
        /// Top-left corner of the bounding box in world units.
        pub position: Vec2,
        /// Cell containing the bounding box centre.
        pub cell: CellCoord,
        /// Heading of the most recent movement.
        pub facing: Direction,
        /// Whether the entity is following a path.
        pub moving: bool,
        /// Final cell of the current path, if any.
        pub destination: Option<CellCoord>,
    }
}
