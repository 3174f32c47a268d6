//! Layered tile grid and world/grid coordinate conversion.

use glam::Vec2;
use thiserror::Error;
use tiletrek_core::{CellCoord, TileKind};

/// Title given to the layer every grid is created with.
pub const BASE_LAYER_TITLE: &str = "Base Terrain";

/// Reasons a tile grid cannot be constructed.
#[derive(Clone, Copy, Debug, Error, PartialEq)]
pub enum GridError {
    /// Width or height was zero.
    #[error("grid dimensions must be positive, got {width}x{height}")]
    ZeroDimension {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },
    /// Width or height does not fit signed cell coordinates.
    #[error("grid dimensions {width}x{height} exceed the addressable range")]
    TooLarge {
        /// Requested number of columns.
        width: u32,
        /// Requested number of rows.
        height: u32,
    },
    /// Tile size was zero, negative, or not finite.
    #[error("tile size must be a positive finite number, got {0}")]
    InvalidTileSize(f32),
}

/// Single full-grid array of tile kinds plus its compositing metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Layer {
    title: String,
    draw_order: i32,
    visible: bool,
    rows: Vec<Vec<TileKind>>,
}

impl Layer {
    /// Creates a layer of `width`×`height` grass tiles.
    #[must_use]
    pub fn filled(
        title: impl Into<String>,
        draw_order: i32,
        visible: bool,
        width: u32,
        height: u32,
    ) -> Self {
        let row = vec![TileKind::default(); width as usize];
        Self {
            title: title.into(),
            draw_order,
            visible,
            rows: vec![row; height as usize],
        }
    }

    /// Wraps rows produced by map authoring.
    ///
    /// Rows are taken as-is: a short or missing row simply reads back as
    /// grass wherever cells are absent.
    #[must_use]
    pub fn from_rows(
        title: impl Into<String>,
        draw_order: i32,
        visible: bool,
        rows: Vec<Vec<TileKind>>,
    ) -> Self {
        Self {
            title: title.into(),
            draw_order,
            visible,
            rows,
        }
    }

    /// Display title of the layer.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Compositing priority; higher values are consulted first.
    #[must_use]
    pub const fn draw_order(&self) -> i32 {
        self.draw_order
    }

    /// Whether the layer takes part in compositing.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Raw tile stored at the cell, or grass where the row data is missing.
    #[must_use]
    pub fn tile(&self, x: usize, y: usize) -> TileKind {
        self.rows
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or_default()
    }

    fn set(&mut self, x: usize, y: usize, kind: TileKind) -> bool {
        match self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            Some(slot) => {
                *slot = kind;
                true
            }
            None => false,
        }
    }
}

/// Fixed-size grid of cells whose effective tile is composited from layers.
#[derive(Clone, Debug)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_size: f32,
    layers: Vec<Layer>,
}

impl TileGrid {
    /// Creates a grid with a single visible, all-grass base layer.
    pub fn new(width: u32, height: u32, tile_size: f32) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::ZeroDimension { width, height });
        }
        if i32::try_from(width).is_err() || i32::try_from(height).is_err() {
            return Err(GridError::TooLarge { width, height });
        }
        if !tile_size.is_finite() || tile_size <= 0.0 {
            return Err(GridError::InvalidTileSize(tile_size));
        }

        Ok(Self {
            width,
            height,
            tile_size,
            layers: vec![Layer::filled(BASE_LAYER_TITLE, 0, true, width, height)],
        })
    }

    /// Number of columns contained in the grid.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows contained in the grid.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Number of cells contained in the grid.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Side length of a single square tile expressed in world units.
    #[must_use]
    pub const fn tile_size(&self) -> f32 {
        self.tile_size
    }

    /// Total width of the grid measured in world units.
    #[must_use]
    pub fn world_width(&self) -> f32 {
        self.width as f32 * self.tile_size
    }

    /// Total height of the grid measured in world units.
    #[must_use]
    pub fn world_height(&self) -> f32 {
        self.height as f32 * self.tile_size
    }

    /// Reports whether the cell lies within `[0, width) × [0, height)`.
    #[must_use]
    pub fn contains(&self, cell: CellCoord) -> bool {
        self.offsets(cell).is_some()
    }

    /// Cell at the middle of the grid.
    #[must_use]
    pub fn center_cell(&self) -> CellCoord {
        CellCoord::new((self.width / 2) as i32, (self.height / 2) as i32)
    }

    /// Effective tile at the cell.
    ///
    /// Visible layers are consulted from the highest draw order down (ties go
    /// to the later layer) and the first non-grass value wins. Cells outside
    /// the grid are water.
    #[must_use]
    pub fn get_tile(&self, cell: CellCoord) -> TileKind {
        let Some((x, y)) = self.offsets(cell) else {
            return TileKind::Water;
        };

        self.visible_layers_sorted()
            .into_iter()
            .rev()
            .map(|layer| layer.tile(x, y))
            .find(|kind| !kind.is_default())
            .unwrap_or_default()
    }

    /// Raw tile stored on a specific layer, ignoring visibility.
    #[must_use]
    pub fn tile_on_layer(&self, index: usize, cell: CellCoord) -> Option<TileKind> {
        let layer = self.layers.get(index)?;
        let (x, y) = self.offsets(cell)?;
        Some(layer.tile(x, y))
    }

    /// Paints a cell of the base layer. Returns `false` outside the grid.
    pub fn set_tile(&mut self, cell: CellCoord, kind: TileKind) -> bool {
        self.set_tile_on_layer(0, cell, kind)
    }

    /// Paints a cell of the layer stored at `index`.
    pub fn set_tile_on_layer(&mut self, index: usize, cell: CellCoord, kind: TileKind) -> bool {
        let Some((x, y)) = self.offsets(cell) else {
            return false;
        };
        match self.layers.get_mut(index) {
            Some(layer) => layer.set(x, y, kind),
            None => false,
        }
    }

    /// Paints every in-bounds cell of a rectangle on the layer at `index`.
    ///
    /// Portions of the rectangle outside the grid are clipped. Returns the
    /// number of painted cells.
    pub fn fill_rect_on_layer(
        &mut self,
        index: usize,
        origin: CellCoord,
        width: u32,
        height: u32,
        kind: TileKind,
    ) -> usize {
        let mut painted = 0;
        for dy in 0..height {
            for dx in 0..width {
                let cell = origin.offset(dx as i32, dy as i32);
                if self.set_tile_on_layer(index, cell, kind) {
                    painted += 1;
                }
            }
        }
        painted
    }

    /// Converts a world position into the cell containing it.
    #[must_use]
    pub fn world_to_grid(&self, position: Vec2) -> CellCoord {
        let x = (position.x / self.tile_size).floor() as i32;
        let y = (position.y / self.tile_size).floor() as i32;
        CellCoord::new(x, y)
    }

    /// World position of the centre of the cell.
    #[must_use]
    pub fn grid_to_world(&self, cell: CellCoord) -> Vec2 {
        let half = self.tile_size / 2.0;
        Vec2::new(
            cell.x() as f32 * self.tile_size + half,
            cell.y() as f32 * self.tile_size + half,
        )
    }

    /// Layers in insertion order.
    #[must_use]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Visible layers in render order: ascending draw order, ties by position.
    #[must_use]
    pub fn visible_layers_sorted(&self) -> Vec<&Layer> {
        let mut visible: Vec<&Layer> = self.layers.iter().filter(|layer| layer.visible).collect();
        // Stable sort keeps list position as the tie-break.
        visible.sort_by_key(|layer| layer.draw_order);
        visible
    }

    /// Appends an all-grass layer and returns its index.
    pub fn add_layer(&mut self, title: impl Into<String>, draw_order: i32, visible: bool) -> usize {
        self.push_layer(Layer::filled(
            title,
            draw_order,
            visible,
            self.width,
            self.height,
        ))
    }

    /// Appends an authored layer and returns its index.
    pub fn push_layer(&mut self, layer: Layer) -> usize {
        self.layers.push(layer);
        self.layers.len() - 1
    }

    /// Removes the layer at `index`.
    ///
    /// Fails without mutating when the index is out of range or names the
    /// only remaining layer.
    pub fn remove_layer(&mut self, index: usize) -> bool {
        if index >= self.layers.len() || self.layers.len() <= 1 {
            return false;
        }
        let _ = self.layers.remove(index);
        true
    }

    /// Shows or hides the layer at `index`. Fails when out of range.
    pub fn set_layer_visibility(&mut self, index: usize, visible: bool) -> bool {
        match self.layers.get_mut(index) {
            Some(layer) => {
                layer.visible = visible;
                true
            }
            None => false,
        }
    }

    /// Changes the compositing priority of the layer at `index`.
    pub fn set_layer_draw_order(&mut self, index: usize, draw_order: i32) -> bool {
        match self.layers.get_mut(index) {
            Some(layer) => {
                layer.draw_order = draw_order;
                true
            }
            None => false,
        }
    }

    fn offsets(&self, cell: CellCoord) -> Option<(usize, usize)> {
        let x = u32::try_from(cell.x()).ok()?;
        let y = u32::try_from(cell.y()).ok()?;
        if x < self.width && y < self.height {
            Some((x as usize, y as usize))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(width: u32, height: u32) -> TileGrid {
        TileGrid::new(width, height, 32.0).expect("valid grid")
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert_eq!(
            TileGrid::new(0, 4, 32.0).unwrap_err(),
            GridError::ZeroDimension {
                width: 0,
                height: 4
            }
        );
        assert_eq!(
            TileGrid::new(4, 4, 0.0).unwrap_err(),
            GridError::InvalidTileSize(0.0)
        );
        assert!(TileGrid::new(4, 4, f32::INFINITY).is_err());
    }

    #[test]
    fn out_of_bounds_reads_as_water() {
        let grid = grid(3, 3);
        assert_eq!(grid.get_tile(CellCoord::new(-1, 0)), TileKind::Water);
        assert_eq!(grid.get_tile(CellCoord::new(0, 3)), TileKind::Water);
        assert_eq!(grid.get_tile(CellCoord::new(2, 2)), TileKind::Grass);
    }

    #[test]
    fn world_and_grid_coordinates_round_trip() {
        let grid = grid(7, 5);
        for y in 0..5 {
            for x in 0..7 {
                let cell = CellCoord::new(x, y);
                assert_eq!(grid.world_to_grid(grid.grid_to_world(cell)), cell);
            }
        }
        assert_eq!(
            grid.grid_to_world(CellCoord::new(1, 2)),
            Vec2::new(48.0, 80.0)
        );
        assert_eq!(
            grid.world_to_grid(Vec2::new(-0.5, 31.9)),
            CellCoord::new(-1, 0)
        );
    }

    #[test]
    fn higher_draw_order_overrides_and_hiding_reverts() {
        let mut grid = grid(4, 4);
        let cell = CellCoord::new(1, 2);
        let overlay = grid.add_layer("Flood", 1, true);
        assert!(grid.set_tile_on_layer(overlay, cell, TileKind::Water));

        assert_eq!(grid.get_tile(cell), TileKind::Water);
        assert_eq!(grid.get_tile(CellCoord::new(0, 0)), TileKind::Grass);

        assert!(grid.set_layer_visibility(overlay, false));
        assert_eq!(grid.get_tile(cell), TileKind::Grass);
        assert_eq!(grid.tile_on_layer(overlay, cell), Some(TileKind::Water));
    }

    #[test]
    fn grass_on_upper_layers_is_transparent() {
        let mut grid = grid(4, 4);
        let cell = CellCoord::new(3, 3);
        assert!(grid.set_tile(cell, TileKind::DirtPath));
        let _ = grid.add_layer("Empty overlay", 5, true);

        assert_eq!(grid.get_tile(cell), TileKind::DirtPath);
    }

    #[test]
    fn draw_order_ties_break_by_list_position() {
        let mut grid = grid(2, 2);
        let cell = CellCoord::new(0, 0);
        let first = grid.add_layer("First", 3, true);
        let second = grid.add_layer("Second", 3, true);
        assert!(grid.set_tile_on_layer(first, cell, TileKind::Water));
        assert!(grid.set_tile_on_layer(second, cell, TileKind::DirtPath));

        assert_eq!(grid.get_tile(cell), TileKind::DirtPath);

        assert!(grid.set_layer_draw_order(first, 4));
        assert_eq!(grid.get_tile(cell), TileKind::Water);
    }

    #[test]
    fn the_last_layer_cannot_be_removed() {
        let mut grid = grid(2, 2);
        assert!(!grid.remove_layer(0));
        assert!(!grid.remove_layer(5));

        let extra = grid.add_layer("Extra", 1, true);
        assert!(grid.remove_layer(extra));
        assert_eq!(grid.layers().len(), 1);
        assert_eq!(grid.layers()[0].title(), BASE_LAYER_TITLE);
        assert!(!grid.set_layer_visibility(3, false));
    }

    #[test]
    fn short_authored_rows_read_as_grass() {
        let mut grid = grid(4, 2);
        let rows = vec![vec![TileKind::Water, TileKind::Water], Vec::new()];
        let _ = grid.push_layer(Layer::from_rows("Ragged", 2, true, rows));

        assert_eq!(grid.get_tile(CellCoord::new(1, 0)), TileKind::Water);
        assert_eq!(grid.get_tile(CellCoord::new(3, 0)), TileKind::Grass);
        assert_eq!(grid.get_tile(CellCoord::new(2, 1)), TileKind::Grass);
    }

    #[test]
    fn fill_rect_clips_to_the_grid() {
        let mut grid = grid(5, 5);
        let painted = grid.fill_rect_on_layer(0, CellCoord::new(3, -2), 4, 4, TileKind::Water);

        assert_eq!(painted, 4);
        assert_eq!(grid.get_tile(CellCoord::new(4, 1)), TileKind::Water);
        assert_eq!(grid.get_tile(CellCoord::new(2, 1)), TileKind::Grass);
    }
}
