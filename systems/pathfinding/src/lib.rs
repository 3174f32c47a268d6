#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Terrain-aware A* search over the composited tile grid.
//!
//! The pathfinder borrows the grid and terrain table for the duration of a
//! query and never mutates them. Impassable or out-of-bounds endpoints are
//! relocated to the nearest walkable cell before the search begins, so a
//! request for a lake cell yields a route to its shore.

use std::{cmp::Ordering, collections::BinaryHeap, f32::consts::SQRT_2};

use tiletrek_core::{CellCoord, Path};
use tiletrek_world::{TerrainTable, TileGrid};
use tracing::{debug, trace};

/// Largest ring radius examined when relocating an unwalkable cell.
pub const MAX_NEAREST_RADIUS: i32 = 20;

/// Expansion budget expressed as a multiple of the grid's cell count.
///
/// A* expands every cell at most once, so the budget only trips when the
/// search is pathological.
pub const SEARCH_BUDGET_FACTOR: usize = 8;

/// Neighbour offsets: cardinals first, then diagonals.
const NEIGHBOR_OFFSETS: [(i32, i32); 8] = [
    (0, 1),
    (1, 0),
    (0, -1),
    (-1, 0),
    (1, 1),
    (-1, -1),
    (1, -1),
    (-1, 1),
];

/// Tunables steering the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathfinderConfig {
    /// Largest ring radius examined by [`Pathfinder::nearest_walkable`].
    pub max_nearest_radius: i32,
    /// Expansion budget as a multiple of the cell count.
    pub search_budget_factor: usize,
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            max_nearest_radius: MAX_NEAREST_RADIUS,
            search_budget_factor: SEARCH_BUDGET_FACTOR,
        }
    }
}

/// Read-only A* planner bound to a grid and terrain table.
#[derive(Clone, Copy, Debug)]
pub struct Pathfinder<'a> {
    grid: &'a TileGrid,
    terrain: &'a TerrainTable,
    config: PathfinderConfig,
}

impl<'a> Pathfinder<'a> {
    /// Creates a pathfinder with the default configuration.
    #[must_use]
    pub fn new(grid: &'a TileGrid, terrain: &'a TerrainTable) -> Self {
        Self::with_config(grid, terrain, PathfinderConfig::default())
    }

    /// Creates a pathfinder with explicit tunables.
    #[must_use]
    pub fn with_config(
        grid: &'a TileGrid,
        terrain: &'a TerrainTable,
        config: PathfinderConfig,
    ) -> Self {
        Self {
            grid,
            terrain,
            config,
        }
    }

    /// Reports whether the cell lies inside the grid on walkable terrain.
    #[must_use]
    pub fn is_walkable(&self, cell: CellCoord) -> bool {
        self.grid.contains(cell) && self.terrain.lookup(self.grid.get_tile(cell)).is_walkable()
    }

    /// Speed multiplier of the cell, or zero when it cannot be entered.
    #[must_use]
    pub fn speed_at(&self, cell: CellCoord) -> f32 {
        if !self.grid.contains(cell) {
            return 0.0;
        }
        let profile = self.terrain.lookup(self.grid.get_tile(cell));
        if profile.is_walkable() {
            profile.speed_multiplier()
        } else {
            0.0
        }
    }

    /// Maximum number of node expansions a single search may perform.
    #[must_use]
    pub fn expansion_budget(&self) -> usize {
        self.grid
            .cell_count()
            .saturating_mul(self.config.search_budget_factor)
    }

    /// Finds an eight-connected route between two cells.
    ///
    /// The search is guided by the straight-line distance in cells, so on
    /// maps with terrain faster than grass the route is not always the
    /// cheapest one. Endpoints that cannot be stood on are first relocated with
    /// [`Pathfinder::nearest_walkable`]; the returned path starts and ends on
    /// the relocated cells. Returns `None` when no route exists or the
    /// expansion budget runs out.
    #[must_use]
    pub fn find_path(&self, start: CellCoord, end: CellCoord) -> Option<Path> {
        let start = self.repair_endpoint(start)?;
        let end = self.repair_endpoint(end)?;
        if start == end {
            return Some(Path::single(start));
        }

        let width = self.grid.width() as usize;
        let cell_count = self.grid.cell_count();
        let index_of = |cell: CellCoord| cell.y() as usize * width + cell.x() as usize;
        let cell_at = |index: usize| CellCoord::new((index % width) as i32, (index / width) as i32);

        let heuristic = |cell: CellCoord| cell.euclidean_distance(end);

        let mut best_cost = vec![f32::INFINITY; cell_count];
        let mut parent: Vec<Option<usize>> = vec![None; cell_count];
        let mut closed = vec![false; cell_count];
        let mut open = BinaryHeap::new();
        let mut sequence = 0_u64;

        let start_index = index_of(start);
        let end_index = index_of(end);
        best_cost[start_index] = 0.0;
        open.push(OpenEntry {
            estimate: heuristic(start),
            cost: 0.0,
            sequence,
            index: start_index,
        });

        let budget = self.expansion_budget();
        let mut expansions = 0_usize;

        while let Some(entry) = open.pop() {
            if closed[entry.index] || entry.cost > best_cost[entry.index] {
                continue;
            }

            expansions += 1;
            if expansions > budget {
                debug!(
                    start = ?start,
                    end = ?end,
                    budget,
                    "path search exhausted its expansion budget"
                );
                return None;
            }

            if entry.index == end_index {
                let path = self.walk_back(end_index, &parent, &cell_at);
                trace!(steps = path.len(), expansions, "path found");
                return Some(path);
            }
            closed[entry.index] = true;

            let current = cell_at(entry.index);
            for (dx, dy) in NEIGHBOR_OFFSETS {
                let neighbor = current.offset(dx, dy);
                let speed = self.speed_at(neighbor);
                if speed <= 0.0 {
                    continue;
                }
                let neighbor_index = index_of(neighbor);
                if closed[neighbor_index] {
                    continue;
                }

                let step = if dx != 0 && dy != 0 { SQRT_2 } else { 1.0 };
                let tentative = entry.cost + step / speed;
                if tentative < best_cost[neighbor_index] {
                    best_cost[neighbor_index] = tentative;
                    parent[neighbor_index] = Some(entry.index);
                    sequence += 1;
                    open.push(OpenEntry {
                        estimate: tentative + heuristic(neighbor),
                        cost: tentative,
                        sequence,
                        index: neighbor_index,
                    });
                }
            }
        }

        debug!(start = ?start, end = ?end, expansions, "no path between cells");
        None
    }

    /// Closest walkable cell to `target`.
    ///
    /// A walkable target is returned unchanged. Otherwise rings of growing
    /// radius are examined; a cell belongs to ring `r` when its Euclidean
    /// distance lies in `(r - 1, r]`. Within a ring the closest walkable cell
    /// wins, ties going to the first in row-major scan order. When nothing
    /// walkable lies within the configured radius the grid centre is
    /// returned, walkable or not.
    #[must_use]
    pub fn nearest_walkable(&self, target: CellCoord) -> CellCoord {
        if self.is_walkable(target) {
            return target;
        }

        for radius in 1..=self.config.max_nearest_radius {
            let outer = radius * radius;
            let inner = (radius - 1) * (radius - 1);
            let mut best: Option<(i32, CellCoord)> = None;

            for dy in -radius..=radius {
                for dx in -radius..=radius {
                    let distance = dx * dx + dy * dy;
                    if distance > outer || distance <= inner {
                        continue;
                    }
                    let candidate = target.offset(dx, dy);
                    if !self.is_walkable(candidate) {
                        continue;
                    }
                    if best.map_or(true, |(closest, _)| distance < closest) {
                        best = Some((distance, candidate));
                    }
                }
            }

            if let Some((_, cell)) = best {
                return cell;
            }
        }

        self.grid.center_cell()
    }

    fn repair_endpoint(&self, cell: CellCoord) -> Option<CellCoord> {
        if self.is_walkable(cell) {
            return Some(cell);
        }

        let relocated = self.nearest_walkable(cell);
        if self.is_walkable(relocated) {
            debug!(requested = ?cell, relocated = ?relocated, "relocated path endpoint");
            Some(relocated)
        } else {
            debug!(requested = ?cell, "no walkable cell near path endpoint");
            None
        }
    }

    fn walk_back<F>(&self, end_index: usize, parent: &[Option<usize>], cell_at: F) -> Path
    where
        F: Fn(usize) -> CellCoord,
    {
        let mut cells = vec![cell_at(end_index)];
        let mut cursor = end_index;
        while let Some(previous) = parent[cursor] {
            cells.push(cell_at(previous));
            cursor = previous;
        }
        cells.reverse();
        Path::from_cells(cells).unwrap_or_else(|| Path::single(cell_at(end_index)))
    }
}

/// Open-set entry ordered so that `BinaryHeap` pops the lowest estimate
/// first, earlier insertions winning ties.
#[derive(Clone, Copy, Debug)]
struct OpenEntry {
    estimate: f32,
    cost: f32,
    sequence: u64,
    index: usize,
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .estimate
            .total_cmp(&self.estimate)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}
