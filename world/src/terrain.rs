//! Terrain properties keyed by tile kind.

use std::collections::BTreeMap;

use tiletrek_core::{TerrainProfile, TileKind};

/// Speed multiplier of ordinary grass.
pub const GRASS_SPEED: f32 = 1.0;
/// Speed multiplier of dirt paths; half again as fast as grass.
pub const DIRT_PATH_SPEED: f32 = 1.5;

/// Lookup table mapping tile kinds to walkability and speed.
///
/// Kinds without an entry resolve to the default kind's profile. The default
/// kind itself always has an entry.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainTable {
    fallback: TerrainProfile,
    profiles: BTreeMap<TileKind, TerrainProfile>,
}

impl TerrainTable {
    /// Table containing only the default kind's profile.
    #[must_use]
    pub fn with_default(profile: TerrainProfile) -> Self {
        let mut profiles = BTreeMap::new();
        let _ = profiles.insert(TileKind::default(), profile);
        Self {
            fallback: profile,
            profiles,
        }
    }

    /// Grass, water and dirt path with their stock properties.
    #[must_use]
    pub fn standard() -> Self {
        let mut table = Self::with_default(TerrainProfile::walkable(GRASS_SPEED));
        table.register(TileKind::Water, TerrainProfile::impassable());
        let dirt = TerrainProfile::walkable(DIRT_PATH_SPEED);
        table.register(TileKind::DirtPath, dirt);
        table
    }

    /// Adds or replaces the profile of `kind`.
    pub fn register(&mut self, kind: TileKind, profile: TerrainProfile) {
        if kind.is_default() {
            self.fallback = profile;
        }
        let _ = self.profiles.insert(kind, profile);
    }

    /// Profile of `kind`, falling back to the default kind's profile.
    #[must_use]
    pub fn lookup(&self, kind: TileKind) -> TerrainProfile {
        self.profiles.get(&kind).copied().unwrap_or(self.fallback)
    }
}

impl Default for TerrainTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_matches_stock_terrain() {
        let table = TerrainTable::standard();

        let grass = table.lookup(TileKind::Grass);
        assert!(grass.is_walkable());
        assert_eq!(grass.speed_multiplier(), GRASS_SPEED);
        let water = table.lookup(TileKind::Water);
        assert!(!water.is_walkable());
        assert_eq!(water.speed_multiplier(), 0.0);
        let dirt = table.lookup(TileKind::DirtPath);
        assert_eq!(dirt.speed_multiplier(), DIRT_PATH_SPEED);
    }

    #[test]
    fn unregistered_kinds_fall_back_to_the_default_entry() {
        let slow = TerrainProfile::walkable(0.75);
        let table = TerrainTable::with_default(slow);

        assert_eq!(table.lookup(TileKind::DirtPath), slow);
        assert_eq!(table.lookup(TileKind::Water), slow);
    }

    #[test]
    fn registering_the_default_kind_moves_the_fallback() {
        let mut table = TerrainTable::with_default(TerrainProfile::walkable(1.0));
        table.register(TileKind::Grass, TerrainProfile::walkable(2.0));

        assert_eq!(table.lookup(TileKind::Water).speed_multiplier(), 2.0);
    }
}
