//! Player and unit bookkeeping.

use std::collections::BTreeMap;

use glam::Vec2;
use thiserror::Error;
use tiletrek_core::{CellCoord, EntityId, Motion, Movable, SpawnError, UnitKind};

use crate::{grid::TileGrid, terrain::TerrainTable};

/// Edge length of the player's square bounding box.
pub const PLAYER_SIZE: f32 = 20.0;
/// Base move speed of the player in world units per tick.
pub const PLAYER_SPEED: f32 = 3.0;
/// Edge length of a unit's square bounding box.
pub const UNIT_SIZE: f32 = 16.0;

/// Failures raised by roster mutations.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
pub enum RosterError {
    /// The requested cell lies outside the grid.
    #[error("cell ({}, {}) lies outside the grid", .0.x(), .0.y())]
    OutOfBounds(CellCoord),
    /// The requested cell cannot be walked on.
    #[error("cell ({}, {}) is not walkable", .0.x(), .0.y())]
    NotWalkable(CellCoord),
    /// Another entity already stands on the requested cell.
    #[error("cell ({}, {}) is occupied by entity {}", .0.x(), .0.y(), .1.get())]
    Occupied(CellCoord, EntityId),
    /// No entity with the identifier exists.
    #[error("entity {} is not on the roster", .0.get())]
    UnknownEntity(EntityId),
}

impl RosterError {
    /// Event-level reason matching a spawn failure, if this is one.
    #[must_use]
    pub fn spawn_reason(self) -> Option<SpawnError> {
        match self {
            Self::OutOfBounds(_) => Some(SpawnError::OutOfBounds),
            Self::NotWalkable(_) => Some(SpawnError::NotWalkable),
            Self::Occupied(..) => Some(SpawnError::Occupied),
            Self::UnknownEntity(_) => None,
        }
    }
}

/// The user-controlled traveller.
#[derive(Clone, Debug, PartialEq)]
pub struct Player {
    motion: Motion,
}

impl Player {
    /// Player standing with its top-left corner at `position`.
    #[must_use]
    pub fn new(position: Vec2) -> Self {
        Self {
            motion: Motion::new(position, Vec2::splat(PLAYER_SIZE), PLAYER_SPEED),
        }
    }
}

impl Movable for Player {
    fn motion(&self) -> &Motion {
        &self.motion
    }

    fn motion_mut(&mut self) -> &mut Motion {
        &mut self.motion
    }
}

/// Computer-controlled traveller.
#[derive(Clone, Debug, PartialEq)]
pub struct Unit {
    kind: UnitKind,
    name: String,
    motion: Motion,
}

impl Unit {
    /// Unit of the given archetype with its top-left corner at `position`.
    #[must_use]
    pub fn new(kind: UnitKind, name: impl Into<String>, position: Vec2) -> Self {
        Self {
            kind,
            name: name.into(),
            motion: Motion::new(position, Vec2::splat(UNIT_SIZE), kind.move_speed()),
        }
    }

    /// Archetype of the unit.
    #[must_use]
    pub const fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Display name of the unit.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Movable for Unit {
    fn motion(&self) -> &Motion {
        &self.motion
    }

    fn motion_mut(&mut self) -> &mut Motion {
        &mut self.motion
    }
}

/// Any entity stored on the roster.
#[derive(Clone, Debug, PartialEq)]
pub enum Actor {
    /// The player.
    Player(Player),
    /// A computer-controlled unit.
    Unit(Unit),
}

impl Actor {
    /// Unit archetype, or `None` for the player.
    #[must_use]
    pub fn unit_kind(&self) -> Option<UnitKind> {
        match self {
            Self::Player(_) => None,
            Self::Unit(unit) => Some(unit.kind()),
        }
    }

    /// Display name of the actor.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Player(_) => "Player",
            Self::Unit(unit) => unit.name(),
        }
    }
}

impl Movable for Actor {
    fn motion(&self) -> &Motion {
        match self {
            Self::Player(player) => player.motion(),
            Self::Unit(unit) => unit.motion(),
        }
    }

    fn motion_mut(&mut self) -> &mut Motion {
        match self {
            Self::Player(player) => player.motion_mut(),
            Self::Unit(unit) => unit.motion_mut(),
        }
    }
}

/// Cell containing the centre of the actor's bounding box.
#[must_use]
pub fn actor_cell(grid: &TileGrid, actor: &impl Movable) -> CellCoord {
    grid.world_to_grid(actor.motion().center())
}

/// Every entity in the world keyed by identifier.
///
/// Identifiers are handed out in increasing order and never reused.
#[derive(Clone, Debug, Default)]
pub struct Roster {
    actors: BTreeMap<EntityId, Actor>,
    next_id: u32,
    player: Option<EntityId>,
}

impl Roster {
    /// Empty roster.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entities on the roster.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Reports whether the roster holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    /// Identifier of the player, if one has been spawned.
    #[must_use]
    pub const fn player(&self) -> Option<EntityId> {
        self.player
    }

    /// Creates a unit centred on `cell`.
    pub fn spawn_unit(
        &mut self,
        grid: &TileGrid,
        terrain: &TerrainTable,
        kind: UnitKind,
        cell: CellCoord,
    ) -> Result<EntityId, RosterError> {
        self.validate_spawn(grid, terrain, cell, None)?;
        let id = self.allocate_id();
        let name = format!("{} {}", kind.name(), id.get());
        let position = top_left_for(grid, cell, UNIT_SIZE);
        let _ = self
            .actors
            .insert(id, Actor::Unit(Unit::new(kind, name, position)));
        Ok(id)
    }

    /// Creates the player centred on `cell`.
    ///
    /// An existing player is replaced in place and keeps its identifier; it
    /// does not count as occupying its own cell.
    pub fn spawn_player(
        &mut self,
        grid: &TileGrid,
        terrain: &TerrainTable,
        cell: CellCoord,
    ) -> Result<EntityId, RosterError> {
        self.validate_spawn(grid, terrain, cell, self.player)?;
        let id = match self.player {
            Some(existing) => existing,
            None => self.allocate_id(),
        };
        let position = top_left_for(grid, cell, PLAYER_SIZE);
        let _ = self.actors.insert(id, Actor::Player(Player::new(position)));
        self.player = Some(id);
        Ok(id)
    }

    /// Deletes an entity and returns it.
    pub fn remove(&mut self, id: EntityId) -> Result<Actor, RosterError> {
        let actor = self
            .actors
            .remove(&id)
            .ok_or(RosterError::UnknownEntity(id))?;
        if self.player == Some(id) {
            self.player = None;
        }
        Ok(actor)
    }

    /// Read access to an entity.
    #[must_use]
    pub fn get(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Write access to an entity.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Entities in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Actor)> {
        self.actors.iter().map(|(id, actor)| (*id, actor))
    }

    /// Mutable entities in identifier order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (EntityId, &mut Actor)> {
        self.actors.iter_mut().map(|(id, actor)| (*id, actor))
    }

    /// Identifiers in increasing order.
    #[must_use]
    pub fn ids(&self) -> Vec<EntityId> {
        self.actors.keys().copied().collect()
    }

    /// Cell occupied by the entity, if it exists.
    #[must_use]
    pub fn actor_cell(&self, grid: &TileGrid, id: EntityId) -> Option<CellCoord> {
        self.get(id).map(|actor| actor_cell(grid, actor))
    }

    /// Entity standing on `cell`, if any. Lowest identifier wins.
    #[must_use]
    pub fn occupant(&self, grid: &TileGrid, cell: CellCoord) -> Option<EntityId> {
        self.iter()
            .find(|(_, actor)| actor_cell(grid, *actor) == cell)
            .map(|(id, _)| id)
    }

    /// Reports whether any entity stands on `cell`.
    #[must_use]
    pub fn occupied(&self, grid: &TileGrid, cell: CellCoord) -> bool {
        self.occupant(grid, cell).is_some()
    }

    fn validate_spawn(
        &self,
        grid: &TileGrid,
        terrain: &TerrainTable,
        cell: CellCoord,
        ignore: Option<EntityId>,
    ) -> Result<(), RosterError> {
        if !grid.contains(cell) {
            return Err(RosterError::OutOfBounds(cell));
        }
        if !terrain.lookup(grid.get_tile(cell)).is_walkable() {
            return Err(RosterError::NotWalkable(cell));
        }
        let blocker = self
            .iter()
            .filter(|(id, _)| Some(*id) != ignore)
            .find(|(_, actor)| actor_cell(grid, *actor) == cell);
        if let Some((id, _)) = blocker {
            return Err(RosterError::Occupied(cell, id));
        }
        Ok(())
    }

    fn allocate_id(&mut self) -> EntityId {
        let id = EntityId::new(self.next_id);
        self.next_id = self.next_id.saturating_add(1);
        id
    }
}

fn top_left_for(grid: &TileGrid, cell: CellCoord, size: f32) -> Vec2 {
    grid.grid_to_world(cell) - Vec2::splat(size / 2.0)
}
