use crate::{
    canvas::bitmap::{CHANNELS, RgbaBitmap},
    foundation::{
        core::{CanvasLayout, Quadrant},
        error::{PlacerError, PlacerResult},
    },
};

/// Join two bitmaps of equal height side by side (`left` then `right`, row by row).
pub fn join_horizontal(left: &RgbaBitmap, right: &RgbaBitmap) -> PlacerResult<RgbaBitmap> {
    if left.height != right.height {
        return Err(PlacerError::geometry(format!(
            "horizontal join needs equal heights, got {} and {}",
            left.height, right.height
        )));
    }
    let (lrow, rrow) = (left.row_bytes(), right.row_bytes());
    let mut data = Vec::with_capacity(left.data.len() + right.data.len());
    for (l, r) in left
        .data
        .chunks_exact(lrow.max(1))
        .zip(right.data.chunks_exact(rrow.max(1)))
    {
        data.extend_from_slice(l);
        data.extend_from_slice(r);
    }
    RgbaBitmap::new(left.width + right.width, left.height, data)
}

/// Stack two bitmaps of equal width (`top` rows first).
pub fn join_vertical(top: &RgbaBitmap, bottom: &RgbaBitmap) -> PlacerResult<RgbaBitmap> {
    if top.width != bottom.width {
        return Err(PlacerError::geometry(format!(
            "vertical join needs equal widths, got {} and {}",
            top.width, bottom.width
        )));
    }
    let mut data = Vec::with_capacity(top.data.len() + bottom.data.len());
    data.extend_from_slice(&top.data);
    data.extend_from_slice(&bottom.data);
    RgbaBitmap::new(top.width, top.height + bottom.height, data)
}

/// Compose four tiles, indexed by quadrant id, into the full canvas.
///
/// Tiles 0 and 1 form the top band, 2 and 3 the bottom band. Every tile must match the
/// layout's tile size exactly.
pub fn assemble(tiles: &[RgbaBitmap; 4], layout: CanvasLayout) -> PlacerResult<RgbaBitmap> {
    for (q, tile) in Quadrant::ALL.iter().zip(tiles) {
        if tile.width != layout.tile_width || tile.height != layout.tile_height {
            return Err(PlacerError::geometry(format!(
                "tile {q} is {}x{}, expected {}x{}",
                tile.width, tile.height, layout.tile_width, layout.tile_height
            )));
        }
        if tile.data.len() != tile.pixel_count() * CHANNELS {
            return Err(PlacerError::geometry(format!(
                "tile {q} has {} bytes, expected {}",
                tile.data.len(),
                tile.pixel_count() * CHANNELS
            )));
        }
    }
    let top = join_horizontal(&tiles[0], &tiles[1])?;
    let bottom = join_horizontal(&tiles[2], &tiles[3])?;
    join_vertical(&top, &bottom)
}

/// Copy one quadrant back out of an assembled canvas.
pub fn extract_quadrant(
    canvas: &RgbaBitmap,
    quadrant: Quadrant,
    layout: CanvasLayout,
) -> PlacerResult<RgbaBitmap> {
    if canvas.width != layout.width() || canvas.height != layout.height() {
        return Err(PlacerError::geometry(format!(
            "canvas is {}x{}, layout expects {}x{}",
            canvas.width,
            canvas.height,
            layout.width(),
            layout.height()
        )));
    }
    let tile_row = layout.tile_width as usize * CHANNELS;
    let x0 = if quadrant.is_right() { tile_row } else { 0 };
    let y0 = if quadrant.is_bottom() {
        layout.tile_height as usize
    } else {
        0
    };

    let mut data = Vec::with_capacity(tile_row * layout.tile_height as usize);
    for row in y0..y0 + layout.tile_height as usize {
        let start = row * canvas.row_bytes() + x0;
        data.extend_from_slice(&canvas.data[start..start + tile_row]);
    }
    RgbaBitmap::new(layout.tile_width, layout.tile_height, data)
}

#[cfg(test)]
#[path = "../../tests/unit/canvas/tiles.rs"]
mod tests;
