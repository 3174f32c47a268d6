#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the tiletrek workspace.
//!
//! This crate defines the value types that connect the authoritative world,
//! the pure systems, and the adapters. Map authoring submits [`Command`]
//! values describing layer and roster mutations, the world executes them via
//! its `apply` entry point, and then broadcasts [`Event`] values. Anything
//! that can walk the grid implements [`Movable`] so that one movement system
//! drives players and computer-controlled units alike.

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Location of a single grid cell expressed as column (`x`) and row (`y`).
///
/// Coordinates are signed so that callers can describe cells outside the
/// grid; the grid answers such queries with an impassable tile instead of
/// failing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    x: i32,
    y: i32,
}

impl CellCoord {
    /// Creates a new grid cell coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index of the cell.
    #[must_use]
    pub const fn x(&self) -> i32 {
        self.x
    }

    /// Zero-based row index of the cell.
    #[must_use]
    pub const fn y(&self) -> i32 {
        self.y
    }

    /// Returns the cell displaced by the provided column and row deltas.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    /// Computes the Manhattan distance between two cell coordinates.
    #[must_use]
    pub fn manhattan_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x) + self.y.abs_diff(other.y)
    }

    /// Computes the Chebyshev (king move) distance between two cells.
    #[must_use]
    pub fn chebyshev_distance(self, other: CellCoord) -> u32 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }

    /// Straight-line distance between the two cells measured in cells.
    #[must_use]
    pub fn euclidean_distance(self, other: CellCoord) -> f32 {
        let dx = self.x.abs_diff(other.x) as f32;
        let dy = self.y.abs_diff(other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }

    /// Reports whether the two cells touch orthogonally or diagonally.
    #[must_use]
    pub fn is_adjacent(self, other: CellCoord) -> bool {
        self.chebyshev_distance(other) == 1
    }
}

/// Terrain type stored in a single layer cell.
///
/// [`TileKind::Grass`] doubles as the "transparent" value when layers are
/// composited: an overlay cell holding grass lets the layers beneath show
/// through.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TileKind {
    /// Open ground walked at the base speed.
    #[default]
    Grass,
    /// Impassable water. Also reported for every out-of-bounds query.
    Water,
    /// Packed dirt that speeds travellers up.
    DirtPath,
}

impl TileKind {
    /// Every tile kind in declaration order.
    pub const ALL: [TileKind; 3] = [TileKind::Grass, TileKind::Water, TileKind::DirtPath];

    /// Reports whether the kind is the default, transparent tile.
    #[must_use]
    pub fn is_default(self) -> bool {
        self == Self::default()
    }
}

/// Walkability and relative speed associated with a tile kind.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainProfile {
    walkable: bool,
    speed_multiplier: f32,
}

impl TerrainProfile {
    /// Walkable terrain travelled at `speed_multiplier` times the base speed.
    ///
    /// Negative or non-finite multipliers collapse to an impassable profile so
    /// that a walkable entry always carries a positive speed.
    #[must_use]
    pub fn walkable(speed_multiplier: f32) -> Self {
        if !speed_multiplier.is_finite() || speed_multiplier <= 0.0 {
            return Self::impassable();
        }

        Self {
            walkable: true,
            speed_multiplier,
        }
    }

    /// Terrain that can never be entered.
    #[must_use]
    pub const fn impassable() -> Self {
        Self {
            walkable: false,
            speed_multiplier: 0.0,
        }
    }

    /// Reports whether entities may occupy or cross the terrain.
    #[must_use]
    pub const fn is_walkable(&self) -> bool {
        self.walkable
    }

    /// Speed factor applied to an entity's base move speed on this terrain.
    #[must_use]
    pub const fn speed_multiplier(&self) -> f32 {
        self.speed_multiplier
    }
}

/// Eight-way compass heading. Rows grow southward, matching screen space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward decreasing rows.
    North,
    /// Toward decreasing rows and increasing columns.
    NorthEast,
    /// Toward increasing columns.
    East,
    /// Toward increasing rows and columns.
    SouthEast,
    /// Toward increasing rows.
    #[default]
    South,
    /// Toward increasing rows and decreasing columns.
    SouthWest,
    /// Toward decreasing columns.
    West,
    /// Toward decreasing rows and columns.
    NorthWest,
}

impl Direction {
    /// Quantizes a world-space displacement into the nearest heading.
    ///
    /// Returns `None` for a zero (or non-finite) displacement.
    #[must_use]
    pub fn from_vector(delta: Vec2) -> Option<Self> {
        if !delta.is_finite() || delta.length_squared() <= f32::EPSILON {
            return None;
        }

        // atan2 with y flipped so that north is +90 degrees.
        let angle = (-delta.y).atan2(delta.x);
        let sector = (angle / std::f32::consts::FRAC_PI_4).round() as i32;
        let heading = match sector.rem_euclid(8) {
            0 => Self::East,
            1 => Self::NorthEast,
            2 => Self::North,
            3 => Self::NorthWest,
            4 => Self::West,
            5 => Self::SouthWest,
            6 => Self::South,
            _ => Self::SouthEast,
        };
        Some(heading)
    }

    /// Heading between two adjacent cells, if they differ.
    #[must_use]
    pub fn between(from: CellCoord, to: CellCoord) -> Option<Self> {
        let dx = (to.x() - from.x()).signum();
        let dy = (to.y() - from.y()).signum();
        Self::from_vector(Vec2::new(dx as f32, dy as f32))
    }
}

/// Ordered, non-empty sequence of grid cells from a start to an end cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Path {
    cells: Vec<CellCoord>,
}

impl Path {
    /// Wraps the provided cells, returning `None` when the sequence is empty.
    #[must_use]
    pub fn from_cells(cells: Vec<CellCoord>) -> Option<Self> {
        if cells.is_empty() {
            None
        } else {
            Some(Self { cells })
        }
    }

    /// Single-cell path used when the start and end coincide.
    #[must_use]
    pub fn single(cell: CellCoord) -> Self {
        Self { cells: vec![cell] }
    }

    /// Cells composing the path in travel order.
    #[must_use]
    pub fn cells(&self) -> &[CellCoord] {
        &self.cells
    }

    /// Number of cells in the path, including both endpoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Always `false`; provided for API symmetry with collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cell the path starts from.
    #[must_use]
    pub fn first(&self) -> CellCoord {
        self.cells[0]
    }

    /// Cell the path ends on.
    #[must_use]
    pub fn last(&self) -> CellCoord {
        self.cells[self.cells.len() - 1]
    }

    /// Cell stored at the provided step index, if it exists.
    #[must_use]
    pub fn get(&self, step: usize) -> Option<CellCoord> {
        self.cells.get(step).copied()
    }

    /// Reports whether the cell appears anywhere along the path.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.cells.contains(&cell)
    }
}

/// Movement state of an entity.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum MotionPhase {
    /// Standing still without a path.
    #[default]
    Idle,
    /// Walking toward `path[step]`.
    Following {
        /// Path owned by the entity for the duration of the walk.
        path: Path,
        /// Index of the step currently targeted.
        step: usize,
    },
}

/// Kinematic state shared by every movable entity.
///
/// `position` and `target` address the top-left corner of the entity's
/// bounding box in world units; the entity's cell is derived from the box
/// centre.
#[derive(Clone, Debug, PartialEq)]
pub struct Motion {
    position: Vec2,
    size: Vec2,
    move_speed: f32,
    target: Vec2,
    phase: MotionPhase,
    facing: Direction,
}

impl Motion {
    /// Creates an idle motion state resting at `position`.
    #[must_use]
    pub fn new(position: Vec2, size: Vec2, move_speed: f32) -> Self {
        Self {
            position,
            size,
            move_speed,
            target: position,
            phase: MotionPhase::Idle,
            facing: Direction::default(),
        }
    }

    /// Top-left corner of the bounding box.
    #[must_use]
    pub const fn position(&self) -> Vec2 {
        self.position
    }

    /// Moves the bounding box so that its top-left corner sits at `position`.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    /// Width and height of the bounding box.
    #[must_use]
    pub const fn size(&self) -> Vec2 {
        self.size
    }

    /// Half of the bounding box extent.
    #[must_use]
    pub fn half_size(&self) -> Vec2 {
        self.size * 0.5
    }

    /// Centre of the bounding box.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        self.position + self.half_size()
    }

    /// Base distance covered per tick on terrain with a multiplier of one.
    #[must_use]
    pub const fn move_speed(&self) -> f32 {
        self.move_speed
    }

    /// Position the entity is currently walking toward.
    #[must_use]
    pub const fn target(&self) -> Vec2 {
        self.target
    }

    /// Replaces the position the entity walks toward.
    pub fn set_target(&mut self, target: Vec2) {
        self.target = target;
    }

    /// Reports whether the entity is following a path.
    #[must_use]
    pub fn is_moving(&self) -> bool {
        matches!(self.phase, MotionPhase::Following { .. })
    }

    /// Path being followed, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.phase {
            MotionPhase::Idle => None,
            MotionPhase::Following { path, .. } => Some(path),
        }
    }

    /// Index of the targeted path step; zero while idle.
    #[must_use]
    pub fn path_step(&self) -> usize {
        match self.phase {
            MotionPhase::Idle => 0,
            MotionPhase::Following { step, .. } => step,
        }
    }

    /// Current movement phase.
    #[must_use]
    pub const fn phase(&self) -> &MotionPhase {
        &self.phase
    }

    /// Heading of the most recent movement.
    #[must_use]
    pub const fn facing(&self) -> Direction {
        self.facing
    }

    /// Records the heading the entity is turned toward.
    pub fn set_facing(&mut self, facing: Direction) {
        self.facing = facing;
    }

    /// Installs a fresh path, discarding any previous one, and targets step zero.
    pub fn begin_path(&mut self, path: Path, first_target: Vec2) {
        self.phase = MotionPhase::Following { path, step: 0 };
        self.target = first_target;
    }

    /// Advances the step cursor.
    ///
    /// Returns the newly targeted cell, or `None` after clearing the path
    /// when the cursor runs off the end.
    pub fn advance_step(&mut self) -> Option<CellCoord> {
        let MotionPhase::Following { path, step } = &mut self.phase else {
            return None;
        };

        *step += 1;
        if let Some(cell) = path.get(*step) {
            return Some(cell);
        }

        self.phase = MotionPhase::Idle;
        None
    }

    /// Drops the path and returns to idle.
    pub fn stop(&mut self) {
        self.phase = MotionPhase::Idle;
    }
}

/// Capability contract implemented by every entity the movement system drives.
pub trait Movable {
    /// Read access to the entity's kinematic state.
    fn motion(&self) -> &Motion;

    /// Write access to the entity's kinematic state.
    fn motion_mut(&mut self) -> &mut Motion;
}

impl Movable for Motion {
    fn motion(&self) -> &Motion {
        self
    }

    fn motion_mut(&mut self) -> &mut Motion {
        self
    }
}

/// Unique identifier assigned to an entity by the roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u32);

impl EntityId {
    /// Creates a new entity identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Computer-controlled unit archetypes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Heavy melee fighter; the slowest walker.
    Warrior,
    /// Ranged fighter.
    Archer,
    /// Spell caster.
    Mage,
    /// Reconnaissance unit; the fastest walker.
    Scout,
}

impl UnitKind {
    /// Every unit kind in declaration order.
    pub const ALL: [UnitKind; 4] = [
        UnitKind::Warrior,
        UnitKind::Archer,
        UnitKind::Mage,
        UnitKind::Scout,
    ];

    /// Human readable name of the archetype.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Warrior => "Warrior",
            Self::Archer => "Archer",
            Self::Mage => "Mage",
            Self::Scout => "Scout",
        }
    }

    /// Base move speed in world units per tick.
    #[must_use]
    pub const fn move_speed(self) -> f32 {
        match self {
            Self::Warrior => 1.5,
            Self::Archer => 2.0,
            Self::Mage => 1.75,
            Self::Scout => 3.0,
        }
    }
}

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Appends an all-grass layer to the tile grid.
    AddLayer {
        /// Display title of the layer.
        title: String,
        /// Compositing priority; higher values win.
        draw_order: i32,
        /// Whether the layer takes part in compositing.
        visible: bool,
    },
    /// Removes the layer stored at `index`.
    RemoveLayer {
        /// Index of the layer in insertion order.
        index: usize,
    },
    /// Shows or hides the layer stored at `index`.
    SetLayerVisibility {
        /// Index of the layer in insertion order.
        index: usize,
        /// New visibility flag.
        visible: bool,
    },
    /// Changes the compositing priority of the layer stored at `index`.
    SetLayerDrawOrder {
        /// Index of the layer in insertion order.
        index: usize,
        /// New compositing priority.
        draw_order: i32,
    },
    /// Overwrites a single cell on the layer stored at `layer`.
    PaintTile {
        /// Index of the layer in insertion order.
        layer: usize,
        /// Cell to paint.
        cell: CellCoord,
        /// Tile kind written into the cell.
        kind: TileKind,
    },
    /// Creates a computer-controlled unit centred on `cell`.
    SpawnUnit {
        /// Archetype of the unit.
        kind: UnitKind,
        /// Cell the unit starts on.
        cell: CellCoord,
    },
    /// Creates the player centred on `cell`, replacing any previous player.
    SpawnPlayer {
        /// Cell the player starts on.
        cell: CellCoord,
    },
    /// Deletes an entity from the roster.
    RemoveEntity {
        /// Identifier of the entity to remove.
        entity: EntityId,
    },
}

/// Events broadcast by the world and the movement system.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Event {
    /// Confirms that a layer was appended.
    LayerAdded {
        /// Index assigned to the new layer.
        index: usize,
    },
    /// Confirms that a layer was removed.
    LayerRemoved {
        /// Index the layer occupied before removal.
        index: usize,
    },
    /// Confirms that a layer changed visibility.
    LayerVisibilityChanged {
        /// Index of the affected layer.
        index: usize,
        /// Visibility after the change.
        visible: bool,
    },
    /// Confirms that a layer changed compositing priority.
    LayerDrawOrderChanged {
        /// Index of the affected layer.
        index: usize,
        /// Priority after the change.
        draw_order: i32,
    },
    /// Confirms that a cell was painted.
    TilePainted {
        /// Index of the painted layer.
        layer: usize,
        /// Painted cell.
        cell: CellCoord,
        /// Tile kind written into the cell.
        kind: TileKind,
    },
    /// Reports that a layer command was rejected.
    LayerRejected {
        /// Index named by the rejected command.
        index: usize,
        /// Specific reason the command failed.
        reason: LayerError,
    },
    /// Confirms that an entity joined the roster.
    EntitySpawned {
        /// Identifier assigned to the entity.
        entity: EntityId,
        /// Cell the entity occupies after spawning.
        cell: CellCoord,
    },
    /// Reports that a spawn request was rejected.
    SpawnRejected {
        /// Cell named by the rejected request.
        cell: CellCoord,
        /// Specific reason the spawn failed.
        reason: SpawnError,
    },
    /// Confirms that an entity left the roster.
    EntityRemoved {
        /// Identifier of the removed entity.
        entity: EntityId,
    },
    /// Reports that a removal request named an unknown entity.
    RemovalRejected {
        /// Identifier named by the rejected request.
        entity: EntityId,
    },
    /// Confirms that an entity started following a new path.
    PathAssigned {
        /// Entity that received the path.
        entity: EntityId,
        /// Final cell of the path, after any walkability repair.
        destination: CellCoord,
        /// Number of cells in the path.
        steps: usize,
    },
    /// Reports that no path exists toward the requested cell.
    PathUnavailable {
        /// Entity that requested the move.
        entity: EntityId,
        /// Cell originally requested.
        requested: CellCoord,
    },
    /// Confirms that an entity consumed the last step of its path.
    EntityArrived {
        /// Entity that arrived.
        entity: EntityId,
        /// Cell the entity came to rest on.
        cell: CellCoord,
    },
}

/// Reasons a layer command may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerError {
    /// No layer exists at the provided index.
    MissingLayer,
    /// The command would remove the last remaining layer.
    LastLayer,
    /// The painted cell lies outside the grid.
    OutOfBounds,
}

/// Reasons a spawn request may be rejected by the world.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpawnError {
    /// The requested cell lies outside the grid.
    OutOfBounds,
    /// The requested cell cannot be walked on.
    NotWalkable,
    /// Another entity already stands on the requested cell.
    Occupied,
}

#[cfg(test)]
mod tests {
    use super::{CellCoord, Direction, Motion, Path, SpawnError, TerrainProfile, TileKind};
    use glam::Vec2;
    use serde::{de::DeserializeOwned, Serialize};

    #[test]
    fn manhattan_distance_matches_expectation() {
        let origin = CellCoord::new(1, 1);
        let destination = CellCoord::new(4, 3);
        assert_eq!(origin.manhattan_distance(destination), 5);
        assert_eq!(destination.manhattan_distance(origin), 5);
    }

    #[test]
    fn adjacency_includes_diagonals_but_not_self() {
        let origin = CellCoord::new(2, 2);
        assert!(origin.is_adjacent(CellCoord::new(3, 3)));
        assert!(origin.is_adjacent(CellCoord::new(2, 1)));
        assert!(!origin.is_adjacent(origin));
        assert!(!origin.is_adjacent(CellCoord::new(4, 2)));
    }

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn boundary_types_round_trip_through_bincode() {
        assert_round_trip(&CellCoord::new(-3, 17));
        assert_round_trip(&TileKind::DirtPath);
        assert_round_trip(&SpawnError::Occupied);
    }

    #[test]
    fn walkable_profile_rejects_non_positive_speed() {
        assert_eq!(TerrainProfile::walkable(0.0), TerrainProfile::impassable());
        assert_eq!(
            TerrainProfile::walkable(f32::NAN),
            TerrainProfile::impassable()
        );
        assert!(TerrainProfile::walkable(1.5).is_walkable());
    }

    #[test]
    fn direction_quantizes_screen_space_vectors() {
        assert_eq!(
            Direction::from_vector(Vec2::new(0.0, -4.0)),
            Some(Direction::North)
        );
        assert_eq!(
            Direction::from_vector(Vec2::new(3.0, 3.0)),
            Some(Direction::SouthEast)
        );
        assert_eq!(
            Direction::from_vector(Vec2::new(-1.0, 0.1)),
            Some(Direction::West)
        );
        assert_eq!(Direction::from_vector(Vec2::ZERO), None);
    }

    #[test]
    fn empty_cell_list_is_not_a_path() {
        assert!(Path::from_cells(Vec::new()).is_none());
        let path = Path::from_cells(vec![CellCoord::new(0, 0), CellCoord::new(1, 1)])
            .expect("non-empty path");
        assert_eq!(path.first(), CellCoord::new(0, 0));
        assert_eq!(path.last(), CellCoord::new(1, 1));
    }

    #[test]
    fn advancing_past_the_last_step_returns_to_idle() {
        let mut motion = Motion::new(Vec2::ZERO, Vec2::splat(10.0), 2.0);
        let path = Path::from_cells(vec![CellCoord::new(0, 0), CellCoord::new(1, 0)])
            .expect("non-empty path");
        motion.begin_path(path, Vec2::new(5.0, 5.0));

        assert!(motion.is_moving());
        assert_eq!(motion.advance_step(), Some(CellCoord::new(1, 0)));
        assert_eq!(motion.path_step(), 1);
        assert_eq!(motion.advance_step(), None);
        assert!(!motion.is_moving());
        assert!(motion.path().is_none());
        assert_eq!(motion.path_step(), 0);
    }
}
