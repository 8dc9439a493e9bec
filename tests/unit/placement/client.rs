use std::collections::BTreeSet;

use super::*;
use crate::canvas::{bitmap::RgbaBitmap, palette::PALETTE};
use crate::foundation::core::Quadrant;

#[test]
fn select_pixel_is_none_for_empty_work() {
    let mut rng = StdRng::seed_from_u64(1);
    assert_eq!(select_pixel(&[], &mut rng), None);
}

#[test]
fn select_pixel_spreads_over_all_candidates() {
    let mut rng = StdRng::seed_from_u64(7);
    let pending = [3usize, 10, 11, 42];
    let seen: BTreeSet<usize> = (0..200)
        .filter_map(|_| select_pixel(&pending, &mut rng))
        .collect();
    assert_eq!(seen, pending.into_iter().collect());
}

#[test]
fn plan_placement_maps_to_tile_local_coordinates() {
    let layout = CanvasLayout::new(4, 4).unwrap();
    let mut bmp = RgbaBitmap::filled(8, 8, [0, 0, 0, 0]);
    let pos = Position { x: 6, y: 5 };
    let c = PALETTE[12];
    bmp.put(layout.index(pos), [c.r, c.g, c.b, 255]);
    let order = TargetOrder::new(bmp, layout).unwrap();

    let (pixel, req) = plan_placement(layout.index(pos), &order, layout).unwrap();
    assert_eq!(pixel, pos);
    assert_eq!(req.local, Position { x: 2, y: 1 });
    assert_eq!(req.quadrant, Quadrant::BOTTOM_RIGHT);
    assert_eq!(req.color.get(), 12);
}

#[test]
fn plan_placement_rejects_off_palette_order_color() {
    let layout = CanvasLayout::new(1, 1).unwrap();
    let mut bmp = RgbaBitmap::filled(2, 2, [0, 0, 0, 0]);
    bmp.put(0, [1, 2, 3, 255]);
    let order = TargetOrder::new(bmp, layout).unwrap();
    assert!(matches!(
        plan_placement(0, &order, layout),
        Err(PlacerError::UnknownColor(_))
    ));
}
