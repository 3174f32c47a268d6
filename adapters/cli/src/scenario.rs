//! TOML scenario files describing a map, its inhabitants, and their orders.

use std::{fs, path::Path};

use serde::Deserialize;
use thiserror::Error;
use tiletrek_core::{CellCoord, SpawnError, TileKind, UnitKind};
use tiletrek_world::{GridError, TerrainRecipe};

/// Scenario format version understood by this build.
pub(crate) const SUPPORTED_SCENARIO_VERSION: u32 = 1;

const DEFAULT_MAX_TICKS: usize = 5_000;

/// Failures raised while loading or staging a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The scenario file could not be read.
    #[error("failed to read scenario file")]
    Io(#[from] std::io::Error),
    /// The scenario file is not valid TOML for the expected schema.
    #[error("failed to parse scenario toml")]
    Parse(#[from] toml::de::Error),
    /// The scenario declares a format this build does not understand.
    #[error("unsupported scenario version {found}; expected {expected}")]
    UnsupportedVersion {
        /// Version declared by the file.
        found: u32,
        /// Version supported by this build.
        expected: u32,
    },
    /// The grid section describes an invalid grid.
    #[error("invalid grid")]
    Grid(#[from] GridError),
    /// An entity could not be placed.
    #[error("entity #{index} cannot spawn at ({x}, {y}): {reason:?}")]
    Spawn {
        /// Position of the entity in the scenario list.
        index: usize,
        /// Requested column.
        x: i32,
        /// Requested row.
        y: i32,
        /// Reason reported by the world.
        reason: SpawnError,
    },
    /// The world neither confirmed nor rejected a spawn.
    #[error("entity #{index} was neither spawned nor rejected")]
    SpawnUnconfirmed {
        /// Position of the entity in the scenario list.
        index: usize,
    },
    /// An order names an entity the scenario does not declare.
    #[error("order #{order} refers to unknown entity #{entity}")]
    UnknownOrderEntity {
        /// Position of the order in the scenario list.
        order: usize,
        /// Entity index named by the order.
        entity: usize,
    },
}

/// Complete scenario description.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    pub(crate) version: u32,
    #[serde(default = "default_max_ticks")]
    pub(crate) max_ticks: usize,
    #[serde(default)]
    pub(crate) grid: GridSpec,
    #[serde(default)]
    pub(crate) terrain: TerrainSpec,
    #[serde(default)]
    pub(crate) layers: Vec<LayerSpec>,
    #[serde(default)]
    pub(crate) entities: Vec<EntitySpec>,
    #[serde(default)]
    pub(crate) orders: Vec<OrderSpec>,
}

/// Grid dimensions.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct GridSpec {
    pub(crate) width: u32,
    pub(crate) height: u32,
    pub(crate) tile_size: f32,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width: 48,
            height: 32,
            tile_size: 32.0,
        }
    }
}

/// Base layer contents: an optional generated map plus painted rectangles.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct TerrainSpec {
    pub(crate) generate: bool,
    pub(crate) seed: u64,
    pub(crate) lakes: u32,
    pub(crate) rivers: bool,
    pub(crate) ponds: u32,
    pub(crate) dirt_paths: u32,
    pub(crate) water: Vec<RectSpec>,
    pub(crate) dirt: Vec<RectSpec>,
}

impl TerrainSpec {
    pub(crate) fn recipe(&self) -> TerrainRecipe {
        TerrainRecipe {
            seed: self.seed,
            lakes: self.lakes,
            rivers: self.rivers,
            ponds: self.ponds,
            dirt_paths: self.dirt_paths,
        }
    }
}

impl Default for TerrainSpec {
    fn default() -> Self {
        let recipe = TerrainRecipe::default();
        Self {
            generate: false,
            seed: recipe.seed,
            lakes: recipe.lakes,
            rivers: recipe.rivers,
            ponds: recipe.ponds,
            dirt_paths: recipe.dirt_paths,
            water: Vec::new(),
            dirt: Vec::new(),
        }
    }
}

/// Rectangle of cells painted with a single tile kind.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct RectSpec {
    pub(crate) x: i32,
    pub(crate) y: i32,
    pub(crate) width: u32,
    pub(crate) height: u32,
}

impl RectSpec {
    pub(crate) fn origin(&self) -> CellCoord {
        CellCoord::new(self.x, self.y)
    }
}

/// Extra layer stacked above the base terrain.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub(crate) struct LayerSpec {
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) draw_order: i32,
    #[serde(default = "default_visible")]
    pub(crate) visible: bool,
    #[serde(default)]
    pub(crate) water: Vec<RectSpec>,
    #[serde(default)]
    pub(crate) dirt: Vec<RectSpec>,
}

impl LayerSpec {
    /// Rectangles in painting order, water first.
    pub(crate) fn paint_list(&self) -> impl Iterator<Item = (RectSpec, TileKind)> + '_ {
        paint_list(&self.water, &self.dirt)
    }
}

pub(crate) fn paint_list<'a>(
    water: &'a [RectSpec],
    dirt: &'a [RectSpec],
) -> impl Iterator<Item = (RectSpec, TileKind)> + 'a {
    water
        .iter()
        .map(|rect| (*rect, TileKind::Water))
        .chain(dirt.iter().map(|rect| (*rect, TileKind::DirtPath)))
}

/// Kind of entity declared by a scenario.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub(crate) enum ActorKind {
    Player,
    Warrior,
    Archer,
    Mage,
    Scout,
}

impl ActorKind {
    /// Unit archetype, or `None` for the player.
    pub(crate) fn unit_kind(self) -> Option<UnitKind> {
        match self {
            Self::Player => None,
            Self::Warrior => Some(UnitKind::Warrior),
            Self::Archer => Some(UnitKind::Archer),
            Self::Mage => Some(UnitKind::Mage),
            Self::Scout => Some(UnitKind::Scout),
        }
    }
}

/// Entity placed when the scenario starts.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct EntitySpec {
    pub(crate) kind: ActorKind,
    pub(crate) x: i32,
    pub(crate) y: i32,
    /// Moves the spawn to the nearest walkable cell when the requested one
    /// is water.
    #[serde(default = "default_snap")]
    pub(crate) snap_to_walkable: bool,
}

impl EntitySpec {
    pub(crate) fn cell(&self) -> CellCoord {
        CellCoord::new(self.x, self.y)
    }
}

/// Walk order issued right after spawning.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub(crate) struct OrderSpec {
    /// Index into the scenario's entity list.
    pub(crate) entity: usize,
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl OrderSpec {
    pub(crate) fn destination(&self) -> CellCoord {
        CellCoord::new(self.x, self.y)
    }
}

impl Scenario {
    /// Reads and validates a scenario file.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates scenario text.
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = toml::from_str(contents)?;
        if scenario.version != SUPPORTED_SCENARIO_VERSION {
            return Err(ScenarioError::UnsupportedVersion {
                found: scenario.version,
                expected: SUPPORTED_SCENARIO_VERSION,
            });
        }
        for (order, entry) in scenario.orders.iter().enumerate() {
            if entry.entity >= scenario.entities.len() {
                return Err(ScenarioError::UnknownOrderEntity {
                    order,
                    entity: entry.entity,
                });
            }
        }
        Ok(scenario)
    }

    /// Replaces the terrain seed and switches generation on.
    ///
    /// Returns `true` when the scenario had generation switched off, so its
    /// generated map now lies under the painted rectangles.
    pub(crate) fn reseed(&mut self, seed: u64) -> bool {
        let switched_on = !self.terrain.generate;
        self.terrain.generate = true;
        self.terrain.seed = seed;
        switched_on
    }

    /// Generated demo map: a player and one unit of each archetype crossing
    /// it corner to corner.
    pub(crate) fn demo() -> Self {
        let grid = GridSpec::default();
        let right = grid.width as i32 - 3;
        let bottom = grid.height as i32 - 3;
        let middle = (grid.width / 2) as i32;
        let placements = [
            (ActorKind::Player, (2, 2), (right, bottom)),
            (ActorKind::Warrior, (right, 2), (2, bottom)),
            (ActorKind::Archer, (2, bottom), (right, 2)),
            (ActorKind::Mage, (right, bottom), (2, 2)),
            (ActorKind::Scout, (middle, bottom), (middle, 2)),
        ];

        let entities = placements
            .iter()
            .map(|(kind, (x, y), _)| EntitySpec {
                kind: *kind,
                x: *x,
                y: *y,
                snap_to_walkable: true,
            })
            .collect();
        let orders = placements
            .iter()
            .enumerate()
            .map(|(entity, (_, _, (x, y)))| OrderSpec {
                entity,
                x: *x,
                y: *y,
            })
            .collect();

        Self {
            version: SUPPORTED_SCENARIO_VERSION,
            max_ticks: DEFAULT_MAX_TICKS,
            grid,
            terrain: TerrainSpec {
                generate: true,
                ..TerrainSpec::default()
            },
            layers: Vec::new(),
            entities,
            orders,
        }
    }
}

fn default_max_ticks() -> usize {
    DEFAULT_MAX_TICKS
}

fn default_visible() -> bool {
    true
}

fn default_snap() -> bool {
    true
}
