//! Deterministic procedural terrain for the base layer.
//!
//! Lakes with irregular shores, rivers linking them, scattered ponds, and
//! snaking dirt paths. Everything is drawn from a seeded ChaCha stream so the
//! same recipe always yields the same map.

use std::f32::consts::PI;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tiletrek_core::{CellCoord, TileKind};

use crate::grid::TileGrid;

/// Parameters steering [`generate`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TerrainRecipe {
    /// Seed for the random stream.
    pub seed: u64,
    /// Number of elliptical lakes.
    pub lakes: u32,
    /// Whether consecutive lakes are joined by rivers.
    pub rivers: bool,
    /// Number of small ponds.
    pub ponds: u32,
    /// Number of dirt paths crossing the map.
    pub dirt_paths: u32,
}

impl Default for TerrainRecipe {
    fn default() -> Self {
        Self {
            seed: 0x7117_e7ec,
            lakes: 3,
            rivers: true,
            ponds: 5,
            dirt_paths: 2,
        }
    }
}

/// Counts of the tiles written by a generation pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GenerationSummary {
    /// Base-layer cells holding water afterwards.
    pub water_cells: usize,
    /// Base-layer cells holding dirt afterwards.
    pub dirt_cells: usize,
}

#[derive(Clone, Copy, Debug)]
struct Lake {
    center_x: f32,
    center_y: f32,
    radius_x: f32,
    radius_y: f32,
    irregularity: f32,
}

/// Repaints the base layer of `grid` according to `recipe`.
pub fn generate(grid: &mut TileGrid, recipe: &TerrainRecipe) -> GenerationSummary {
    let mut rng = ChaCha8Rng::seed_from_u64(recipe.seed);
    let width = grid.width();
    let height = grid.height();
    let _ = grid.fill_rect_on_layer(0, CellCoord::new(0, 0), width, height, TileKind::Grass);

    let lakes: Vec<Lake> = (0..recipe.lakes)
        .map(|_| roll_lake(&mut rng, width, height))
        .collect();
    for lake in &lakes {
        paint_lake(grid, lake);
    }

    if recipe.rivers {
        let amplitude = (width.min(height) as f32 / 10.0).min(4.0);
        for pair in lakes.windows(2) {
            paint_river(grid, &pair[0], &pair[1], amplitude);
        }
    }

    for _ in 0..recipe.ponds {
        let x = rng.gen_range(0..width) as i32;
        let y = rng.gen_range(0..height) as i32;
        let radius = rng.gen_range(1..=3);
        paint_pond(grid, CellCoord::new(x, y), radius);
    }

    for _ in 0..recipe.dirt_paths {
        let (start, end) = roll_crossing(&mut rng, width, height);
        paint_snaking_path(grid, start, end);
    }

    summarize(grid)
}

fn roll_lake(rng: &mut ChaCha8Rng, width: u32, height: u32) -> Lake {
    let max_x = (width as f32 / 6.0).max(1.5);
    let max_y = (height as f32 / 6.0).max(1.5);
    Lake {
        center_x: rng.gen_range(0.0..width as f32),
        center_y: rng.gen_range(0.0..height as f32),
        radius_x: rng.gen_range(1.0..=max_x),
        radius_y: rng.gen_range(1.0..=max_y),
        irregularity: rng.gen_range(0.2..=0.5),
    }
}

fn paint_lake(grid: &mut TileGrid, lake: &Lake) {
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            let dx = x as f32 - lake.center_x;
            let dy = y as f32 - lake.center_y;
            let angle = dy.atan2(dx);
            let noise = (angle * 6.0).sin() * lake.irregularity
                + (angle * 4.0 + 2.5).sin() * lake.irregularity * 0.5;
            let norm_x = dx / (lake.radius_x + noise);
            let norm_y = dy / (lake.radius_y + noise * 0.7);
            if (norm_x * norm_x + norm_y * norm_y).sqrt() < 1.0 {
                let _ = grid.set_tile(CellCoord::new(x, y), TileKind::Water);
            }
        }
    }
}

fn paint_river(grid: &mut TileGrid, from: &Lake, to: &Lake, amplitude: f32) {
    let span_x = to.center_x - from.center_x;
    let span_y = to.center_y - from.center_y;
    let steps = (span_x * span_x + span_y * span_y).sqrt() as u32;
    if steps == 0 {
        return;
    }

    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        let curve = (t * PI * 2.0).sin() * amplitude;
        let x = (from.center_x + span_x * t + curve) as i32;
        let y = (from.center_y + span_y * t) as i32;
        paint_disc(grid, CellCoord::new(x, y), 1, TileKind::Water, |_| true);
    }
}

fn paint_pond(grid: &mut TileGrid, center: CellCoord, radius: i32) {
    let inner = (radius - 1) * (radius - 1);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let distance = dx * dx + dy * dy;
            if distance > radius * radius {
                continue;
            }
            let cell = center.offset(dx, dy);
            // Ragged rim: keep the core solid, thin out the edge.
            if distance <= inner || (cell.x() + cell.y()).rem_euclid(3) == 0 {
                let _ = grid.set_tile(cell, TileKind::Water);
            }
        }
    }
}

fn roll_crossing(rng: &mut ChaCha8Rng, width: u32, height: u32) -> (CellCoord, CellCoord) {
    let last_x = width.saturating_sub(1) as i32;
    let last_y = height.saturating_sub(1) as i32;
    if rng.gen_bool(0.5) {
        let start = CellCoord::new(0, rng.gen_range(0..=last_y));
        let end = CellCoord::new(last_x, rng.gen_range(0..=last_y));
        (start, end)
    } else {
        let start = CellCoord::new(rng.gen_range(0..=last_x), 0);
        let end = CellCoord::new(rng.gen_range(0..=last_x), last_y);
        (start, end)
    }
}

fn paint_snaking_path(grid: &mut TileGrid, start: CellCoord, end: CellCoord) {
    let span_x = (end.x() - start.x()) as f32;
    let span_y = (end.y() - start.y()) as f32;
    let length = (span_x * span_x + span_y * span_y).sqrt();
    if length == 0.0 {
        return;
    }

    let amplitude = (length / 12.0).min(8.0);
    let perpendicular_x = -span_y / length;
    let perpendicular_y = span_x / length;
    let steps = length as u32;

    for step in 0..=steps {
        let t = step as f32 / steps.max(1) as f32;
        let sway = (t * PI * 3.0).sin() * amplitude + (t * PI * 7.0).sin() * amplitude * 0.3;
        let x = start.x() as f32 + span_x * t + perpendicular_x * sway;
        let y = start.y() as f32 + span_y * t + perpendicular_y * sway;
        let cell = CellCoord::new(x.round() as i32, y.round() as i32);
        // Radius one with a Manhattan mask keeps the path four-connected.
        paint_disc(grid, cell, 1, TileKind::DirtPath, is_grass);
    }
}

fn is_grass(kind: TileKind) -> bool {
    kind == TileKind::Grass
}

fn paint_disc<F>(grid: &mut TileGrid, center: CellCoord, radius: i32, kind: TileKind, paintable: F)
where
    F: Fn(TileKind) -> bool,
{
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx.abs() + dy.abs() > radius {
                continue;
            }
            let cell = center.offset(dx, dy);
            match grid.tile_on_layer(0, cell) {
                Some(existing) if paintable(existing) => {
                    let _ = grid.set_tile(cell, kind);
                }
                _ => {}
            }
        }
    }
}

fn summarize(grid: &TileGrid) -> GenerationSummary {
    let mut summary = GenerationSummary::default();
    for y in 0..grid.height() as i32 {
        for x in 0..grid.width() as i32 {
            match grid.tile_on_layer(0, CellCoord::new(x, y)) {
                Some(TileKind::Water) => summary.water_cells += 1,
                Some(TileKind::DirtPath) => summary.dirt_cells += 1,
                _ => {}
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_layer(grid: &TileGrid) -> Vec<TileKind> {
        let mut tiles = Vec::with_capacity(grid.cell_count());
        for y in 0..grid.height() as i32 {
            for x in 0..grid.width() as i32 {
                let cell = CellCoord::new(x, y);
                tiles.push(grid.tile_on_layer(0, cell).unwrap_or_default());
            }
        }
        tiles
    }

    #[test]
    fn same_seed_produces_identical_terrain() {
        let recipe = TerrainRecipe::default();
        let mut first = TileGrid::new(40, 30, 16.0).expect("grid");
        let mut second = TileGrid::new(40, 30, 16.0).expect("grid");

        let first_summary = generate(&mut first, &recipe);
        let second_summary = generate(&mut second, &recipe);

        assert_eq!(first_summary, second_summary);
        assert_eq!(base_layer(&first), base_layer(&second));
    }

    #[test]
    fn recipe_features_leave_their_mark() {
        let mut grid = TileGrid::new(48, 32, 16.0).expect("grid");
        let summary = generate(&mut grid, &TerrainRecipe::default());

        assert!(summary.water_cells > 0, "lakes and ponds paint water");
        assert!(summary.dirt_cells > 0, "dirt paths paint dirt");
        assert!(
            summary.water_cells + summary.dirt_cells < grid.cell_count(),
            "some grass must survive"
        );
    }

    #[test]
    fn empty_recipe_resets_to_grass() {
        let mut grid = TileGrid::new(8, 8, 16.0).expect("grid");
        let _ = grid.set_tile(CellCoord::new(2, 2), TileKind::Water);
        let recipe = TerrainRecipe {
            lakes: 0,
            ponds: 0,
            dirt_paths: 0,
            ..TerrainRecipe::default()
        };

        assert_eq!(generate(&mut grid, &recipe), GenerationSummary::default());
        assert_eq!(grid.get_tile(CellCoord::new(2, 2)), TileKind::Grass);
    }
}
