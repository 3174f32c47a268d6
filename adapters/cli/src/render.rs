//! Plain-text map dump used by `--ascii`.

use tiletrek_core::{CellCoord, TileKind, UnitKind};
use tiletrek_world::{actor_cell, query, World};

fn tile_glyph(kind: TileKind) -> char {
    match kind {
        TileKind::Grass => '.',
        TileKind::Water => '~',
        TileKind::DirtPath => ':',
    }
}

fn actor_glyph(kind: Option<UnitKind>) -> char {
    match kind {
        None => '@',
        Some(UnitKind::Warrior) => 'W',
        Some(UnitKind::Archer) => 'A',
        Some(UnitKind::Mage) => 'M',
        Some(UnitKind::Scout) => 'S',
    }
}

/// Renders the composited terrain with every actor drawn on its cell.
///
/// Later actors overwrite earlier ones sharing a cell.
pub(crate) fn render_ascii(world: &World) -> String {
    let grid = query::tile_grid(world);
    let width = grid.width() as usize;
    let height = grid.height() as usize;
    let mut rows: Vec<Vec<char>> = (0..height)
        .map(|y| {
            (0..width)
                .map(|x| {
                    let cell = CellCoord::new(x as i32, y as i32);
                    tile_glyph(grid.get_tile(cell))
                })
                .collect()
        })
        .collect();

    for (_, actor) in query::roster(world).iter() {
        let cell = actor_cell(grid, actor);
        if grid.contains(cell) {
            rows[cell.y() as usize][cell.x() as usize] = actor_glyph(actor.unit_kind());
        }
    }

    let mut out = String::with_capacity((width + 1) * height);
    for row in rows {
        out.extend(row);
        out.push('\n');
    }
    out
}
